// Core data models for authorder

use crate::arn::{Arn, IdentityGenerator};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Request parameters of one query-protocol call, keyed by wire name.
///
/// Ordered so that traces, signatures and reports are stable.
pub type ParamMap = BTreeMap<String, String>;

/// Whether an action only reads state or may change it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionCategory {
    Read,
    Write,
}

impl fmt::Display for ActionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionCategory::Read => write!(f, "read"),
            ActionCategory::Write => write!(f, "write"),
        }
    }
}

/// The three legs of a probe triple, in the order they are always sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetRole {
    Allowed,
    Denied,
    Nonexistent,
}

impl TargetRole {
    pub const ORDER: [TargetRole; 3] = [TargetRole::Allowed, TargetRole::Denied, TargetRole::Nonexistent];
}

impl fmt::Display for TargetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetRole::Allowed => write!(f, "allowed"),
            TargetRole::Denied => write!(f, "denied"),
            TargetRole::Nonexistent => write!(f, "nonexistent"),
        }
    }
}

/// Static AWS credentials used to sign requests for one target
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

// Keep secrets out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// One leg of the triple: a resource plus everything needed to reach it.
#[derive(Debug, Clone)]
pub struct Target {
    pub role: TargetRole,
    pub arn: Arn,
    pub region: String,
    pub endpoint: String,
    pub credentials: Credentials,
}

impl Target {
    pub fn new(role: TargetRole, arn: Arn, credentials: Credentials) -> Self {
        Self {
            role,
            region: arn.region.clone(),
            endpoint: arn.default_endpoint(),
            arn,
            credentials,
        }
    }

    /// Override the endpoint, e.g. for a VPC endpoint or a local mock.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn id(&self) -> String {
        self.arn.to_string()
    }
}

/// Allowed, denied and nonexistent targets for a whole run.
#[derive(Debug, Clone)]
pub struct ProbeTriple {
    pub allowed: Target,
    pub denied: Target,
    pub nonexistent: Target,
}

impl ProbeTriple {
    /// Build the triple, deriving the nonexistent leg from the allowed one.
    ///
    /// The nonexistent target shares the allowed target's region, endpoint
    /// and credentials so that only the resource differs.
    pub fn new(allowed: Target, denied: Target, generator: &dyn IdentityGenerator) -> Self {
        let nonexistent = Target {
            role: TargetRole::Nonexistent,
            arn: generator.nonexistent_for(&allowed.arn),
            region: allowed.region.clone(),
            endpoint: allowed.endpoint.clone(),
            credentials: allowed.credentials.clone(),
        };
        Self {
            allowed: Target { role: TargetRole::Allowed, ..allowed },
            denied: Target { role: TargetRole::Denied, ..denied },
            nonexistent,
        }
    }

    pub fn get(&self, role: TargetRole) -> &Target {
        match role {
            TargetRole::Allowed => &self.allowed,
            TargetRole::Denied => &self.denied,
            TargetRole::Nonexistent => &self.nonexistent,
        }
    }

    /// Targets in fixed send order.
    pub fn members(&self) -> [&Target; 3] {
        [&self.allowed, &self.denied, &self.nonexistent]
    }
}

/// What one request produced, reduced to the fields the classifier needs
/// plus the raw body for manual review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseOutcome {
    pub status: u16,
    pub error_code: Option<String>,
    pub error_type: Option<String>,
    pub message: Option<String>,
    pub body: String,
    pub duration_ms: u64,
}

impl ResponseOutcome {
    /// Outcome with only status and code, mostly for tests and fixtures.
    pub fn new(status: u16, error_code: Option<&str>) -> Self {
        Self {
            status,
            error_code: error_code.map(str::to_string),
            error_type: None,
            message: None,
            body: String::new(),
            duration_ms: 0,
        }
    }
}

/// Responses from all three legs for one request shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TripleOutcome {
    pub allowed: ResponseOutcome,
    pub denied: ResponseOutcome,
    pub nonexistent: ResponseOutcome,
}

impl TripleOutcome {
    pub fn statuses(&self) -> (u16, u16, u16) {
        (self.allowed.status, self.denied.status, self.nonexistent.status)
    }
}

/// Verdict category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum VerdictCategory {
    #[serde(rename = "no-op probe")]
    NoOpProbe,
    #[serde(rename = "safe probe")]
    SafeProbe,
    #[serde(rename = "pre-auth")]
    PreAuth,
    #[serde(rename = "inconclusive")]
    Inconclusive,
    #[serde(rename = "other")]
    Other,
}

impl VerdictCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictCategory::NoOpProbe => "no-op probe",
            VerdictCategory::SafeProbe => "safe probe",
            VerdictCategory::PreAuth => "pre-auth",
            VerdictCategory::Inconclusive => "inconclusive",
            VerdictCategory::Other => "other",
        }
    }
}

impl fmt::Display for VerdictCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an (action, mutation) pair tells us anything about auth order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationVerdict {
    pub useful: bool,
    pub category: VerdictCategory,
    pub reason: String,
}

impl MutationVerdict {
    pub fn useful(category: VerdictCategory, reason: impl Into<String>) -> Self {
        Self { useful: true, category, reason: reason.into() }
    }

    pub fn not_useful(category: VerdictCategory, reason: impl Into<String>) -> Self {
        Self { useful: false, category, reason: reason.into() }
    }
}

/// Evidence and verdict for one (action, mutation) pair.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeRecord {
    pub action: String,
    pub mutation: String,
    /// Absent when any leg failed before producing a response.
    pub outcomes: Option<TripleOutcome>,
    pub failure: Option<String>,
    pub verdict: MutationVerdict,
}

/// Everything observed for one action: its baseline and every mutation.
#[derive(Debug, Clone, Serialize)]
pub struct ActionReport {
    pub action: String,
    pub category: ActionCategory,
    pub baseline: Option<TripleOutcome>,
    pub baseline_failure: Option<String>,
    pub records: Vec<ProbeRecord>,
    /// Mutations skipped because they did not change the baseline.
    pub skipped: Vec<String>,
}

impl ActionReport {
    pub fn useful_records(&self) -> impl Iterator<Item = &ProbeRecord> {
        self.records.iter().filter(|r| r.verdict.useful)
    }
}
