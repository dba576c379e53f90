// Action Catalog
//
// Static table of probed operations plus the scheduling rules that keep a
// run from leaving residual state behind:
//
// - a destructive action runs after everything else
// - a grant is immediately followed by its revoke, in one sequential unit
//
// Architecture:
//   catalog.rs (static records, pure builders)
//       ↑
//   mod.rs (lookup, selection, scheduling)
//       ↑
//   engine.rs (runs execution units)

pub mod catalog;

pub use catalog::{ACTIONS, API_VERSION};

use crate::error::{ProbeError, Result};
use crate::models::{ActionCategory, ParamMap};
use tracing::warn;

/// Scheduling constraint declared by an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOrder {
    /// No constraint
    Free,
    /// Grants access; the named revoke must run right after it.
    Grant { revoke: &'static str },
    /// Revokes what a grant added.
    Revoke,
    /// Must run after every other action against the target.
    Destructive,
}

/// One probed API operation.
#[derive(Debug, Clone, Copy)]
pub struct Action {
    pub name: &'static str,
    pub category: ActionCategory,
    /// Whether the baseline request is free of persistent side effects.
    pub safe: bool,
    pub order: ActionOrder,
    /// Wire name of the parameter carrying the target ARN.
    pub resource_param: &'static str,
    /// Baseline parameters for a target identifier.
    pub build: fn(&str) -> ParamMap,
}

impl Action {
    pub fn baseline(&self, target_id: &str) -> ParamMap {
        (self.build)(target_id)
    }

    pub fn is_destructive(&self) -> bool {
        self.order == ActionOrder::Destructive
    }
}

impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// Look up an action by its exact API name.
pub fn find_action(name: &str) -> Option<&'static Action> {
    ACTIONS.iter().find(|a| a.name == name)
}

/// Resolve the actions for a run.
///
/// An empty name list selects the whole catalog. Unknown names are a
/// configuration error; unsafe actions are dropped unless allowed.
pub fn select_actions(names: &[String], allow_unsafe: bool) -> Result<Vec<&'static Action>> {
    let requested: Vec<&'static Action> = if names.is_empty() {
        ACTIONS.iter().collect()
    } else {
        names
            .iter()
            .map(|name| {
                find_action(name)
                    .ok_or_else(|| ProbeError::Config(format!("unknown action `{}`", name)))
            })
            .collect::<Result<Vec<_>>>()?
    };

    let mut selected = Vec::new();
    for action in requested {
        if selected.contains(&action) {
            continue;
        }
        if !action.safe && !allow_unsafe {
            warn!(action = action.name, "skipping unsafe action (pass --include-unsafe to probe it)");
            continue;
        }
        selected.push(action);
    }
    Ok(selected)
}

/// A group of actions that must run in order, without interleaving.
#[derive(Debug, Clone)]
pub struct ExecutionUnit {
    pub actions: Vec<&'static Action>,
}

impl ExecutionUnit {
    pub fn is_destructive(&self) -> bool {
        self.actions.iter().any(|a| a.is_destructive())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.actions.iter().map(|a| a.name).collect()
    }
}

/// Arrange selected actions into execution units.
///
/// Units keep the selection order, except that destructive units are moved
/// to the end. A selected grant pulls its revoke into the same unit even if
/// the revoke was not selected, so access is never left behind.
pub fn schedule(selected: &[&'static Action]) -> Vec<ExecutionUnit> {
    let paired_revokes: Vec<&'static str> = selected
        .iter()
        .filter_map(|a| match a.order {
            ActionOrder::Grant { revoke } => Some(revoke),
            _ => None,
        })
        .collect();

    let mut units = Vec::new();
    let mut destructive = Vec::new();

    for action in selected {
        match action.order {
            ActionOrder::Free => units.push(ExecutionUnit { actions: vec![*action] }),
            ActionOrder::Grant { revoke } => {
                let mut actions = vec![*action];
                match find_action(revoke) {
                    Some(revoke_action) => actions.push(revoke_action),
                    None => warn!(grant = action.name, revoke, "revoke action missing from catalog"),
                }
                units.push(ExecutionUnit { actions });
            }
            ActionOrder::Revoke => {
                // Already scheduled right behind its grant.
                if !paired_revokes.contains(&action.name) {
                    units.push(ExecutionUnit { actions: vec![*action] });
                }
            }
            ActionOrder::Destructive => destructive.push(ExecutionUnit { actions: vec![*action] }),
        }
    }

    units.extend(destructive);
    units
}
