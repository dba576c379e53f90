// Differential probing engine for authorder
// Sends every (action, mutation) pair to the allowed, denied and nonexistent targets
//
// Within one action everything is sequential: the baseline triple first, then
// each mutation, each triple in allowed → denied → nonexistent order. Actions
// share nothing mutable, so execution units may run concurrently; destructive
// units always wait for the rest.

use crate::actions::{Action, ExecutionUnit};
use crate::auth::{Signer, SigningContext, UnsignedRequest};
use crate::error::{ProbeError, Result};
use crate::models::{
    ActionReport, MutationVerdict, ParamMap, ProbeRecord, ProbeTriple, ResponseOutcome, Target,
    TargetRole, TripleOutcome, VerdictCategory,
};
use crate::mutator::{Mutation, MUTATIONS};
use crate::parameters::{changed_keys, encode_form, params_changed};
use crate::response_analysis::ResponseParser;
use crate::transport::Transport;
use crate::verdict::{classify, AbsentCodePolicy};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Knobs for one run
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    /// Bound on any single request; exceeding it is a transport failure.
    pub timeout: Duration,
    pub absent_codes: AbsentCodePolicy,
    /// Execution units allowed in flight at once.
    pub concurrency: usize,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            absent_codes: AbsentCodePolicy::default(),
            concurrency: 1,
        }
    }
}

/// Receives progress as the run advances; presentation lives here, not in
/// the prober.
pub trait ProgressSink: Send + Sync {
    fn action_started(&self, _action: &Action) {}
    fn record(&self, record: &ProbeRecord);
    fn action_finished(&self, _report: &ActionReport) {}
}

/// Discards all progress.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn record(&self, _record: &ProbeRecord) {}
}

/// One line per record on stdout.
pub struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn action_started(&self, action: &Action) {
        println!("== {} ({})", action.name, action.category);
    }

    fn record(&self, record: &ProbeRecord) {
        let tag = if record.failure.is_some() {
            "ERROR"
        } else if record.verdict.useful {
            "USEFUL"
        } else if record.verdict.category == VerdictCategory::Inconclusive {
            "INCONCLUSIVE"
        } else {
            "NOT USEFUL"
        };
        match &record.outcomes {
            Some(o) => {
                let (a, d, n) = o.statuses();
                println!(
                    "[{}] {} / {} ({}/{}/{}): {}",
                    tag, record.action, record.mutation, a, d, n, record.verdict.reason
                );
            }
            None => println!(
                "[{}] {} / {}: {}",
                tag, record.action, record.mutation, record.verdict.reason
            ),
        }
    }

    fn action_finished(&self, report: &ActionReport) {
        println!(
            "   {} useful of {} probed, {} skipped",
            report.useful_records().count(),
            report.records.len(),
            report.skipped.len()
        );
    }
}

/// A failed leg: which target, and why.
#[derive(Debug)]
pub struct LegFailure {
    pub role: TargetRole,
    pub error: ProbeError,
}

impl std::fmt::Display for LegFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} leg: {}", self.role, self.error)
    }
}

pub struct Prober {
    pub signer: Arc<dyn Signer>,
    pub transport: Arc<dyn Transport>,
    pub parser: Arc<dyn ResponseParser>,
    pub sink: Arc<dyn ProgressSink>,
    pub options: ProbeOptions,
}

impl Prober {
    pub fn new(
        signer: Arc<dyn Signer>,
        transport: Arc<dyn Transport>,
        parser: Arc<dyn ResponseParser>,
        sink: Arc<dyn ProgressSink>,
        options: ProbeOptions,
    ) -> Self {
        Self { signer, transport, parser, sink, options }
    }

    /// Sign and send one request, bounded by the configured timeout.
    ///
    /// Signing happens here, right before the send, because signatures
    /// expire.
    pub async fn send_leg(&self, target: &Target, params: &ParamMap) -> Result<ResponseOutcome> {
        let request = UnsignedRequest {
            url: target.endpoint.clone(),
            body: encode_form(params),
        };
        let ctx = SigningContext {
            service: &target.arn.service,
            region: &target.region,
            credentials: &target.credentials,
        };
        let signed = self.signer.sign(request, &ctx)?;

        let timeout_ms = u64::try_from(self.options.timeout.as_millis()).unwrap_or(u64::MAX);
        let raw = tokio::time::timeout(self.options.timeout, self.transport.send(&signed))
            .await
            .map_err(|_| ProbeError::Timeout(timeout_ms))??;

        let fields = self.parser.parse(&raw.body);
        debug!(
            role = %target.role,
            status = raw.status,
            code = fields.code.as_deref().unwrap_or("-"),
            duration_ms = raw.duration_ms,
            "response"
        );

        Ok(ResponseOutcome {
            status: raw.status,
            error_code: fields.code,
            error_type: fields.error_type,
            message: fields.message,
            body: raw.body,
            duration_ms: raw.duration_ms,
        })
    }

    /// Send one parameter set per triple member, in fixed order.
    ///
    /// Stops at the first failing leg; the remaining legs are not sent.
    pub async fn send_triple(
        &self,
        triple: &ProbeTriple,
        params: &[ParamMap; 3],
    ) -> std::result::Result<TripleOutcome, LegFailure> {
        let mut outcomes = Vec::with_capacity(3);
        for (role, leg_params) in TargetRole::ORDER.into_iter().zip(params.iter()) {
            let target = triple.get(role);
            match self.send_leg(target, leg_params).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(error) => return Err(LegFailure { role: target.role, error }),
            }
        }
        let mut it = outcomes.into_iter();
        match (it.next(), it.next(), it.next()) {
            (Some(allowed), Some(denied), Some(nonexistent)) => Ok(TripleOutcome { allowed, denied, nonexistent }),
            _ => Err(LegFailure {
                role: TargetRole::Nonexistent,
                error: ProbeError::Transport("incomplete triple".to_string()),
            }),
        }
    }

    fn baselines(action: &Action, triple: &ProbeTriple) -> [ParamMap; 3] {
        triple.members().map(|t| action.baseline(&t.id()))
    }

    /// Apply a mutation to each member's own baseline.
    ///
    /// Returns `None` when the mutation leaves the allowed baseline as is,
    /// or when it would redirect any leg to a different resource.
    fn mutate(
        action: &Action,
        mutation: &Mutation,
        triple: &ProbeTriple,
        baselines: &[ParamMap; 3],
    ) -> Option<[ParamMap; 3]> {
        let members = triple.members();
        let mutated = [
            mutation.apply(&baselines[0], &members[0].id()),
            mutation.apply(&baselines[1], &members[1].id()),
            mutation.apply(&baselines[2], &members[2].id()),
        ];

        if !params_changed(&baselines[0], &mutated[0]) {
            return None;
        }

        for (before, after) in baselines.iter().zip(mutated.iter()) {
            if before.get(action.resource_param) != after.get(action.resource_param) {
                warn!(
                    action = action.name,
                    mutation = mutation.id,
                    param = action.resource_param,
                    "mutation rewrote the resource parameter, dropping it"
                );
                return None;
            }
        }

        debug!(
            action = action.name,
            mutation = mutation.id,
            changed = ?changed_keys(&baselines[0], &mutated[0]),
            "applying mutation"
        );
        Some(mutated)
    }

    /// Probe one action: baseline first, then every applicable mutation.
    pub async fn probe_action(&self, action: &Action, triple: &ProbeTriple) -> ActionReport {
        self.sink.action_started(action);
        info!(action = action.name, "probing action");

        let baselines = Self::baselines(action, triple);
        let (baseline, baseline_failure) = match self.send_triple(triple, &baselines).await {
            Ok(outcomes) => (Some(outcomes), None),
            Err(failure) => {
                warn!(action = action.name, %failure, "baseline failed");
                (None, Some(failure.to_string()))
            }
        };

        let mut records = Vec::new();
        let mut skipped = Vec::new();

        for mutation in MUTATIONS {
            let mutated = match Self::mutate(action, mutation, triple, &baselines) {
                Some(m) => m,
                None => {
                    skipped.push(mutation.id.to_string());
                    continue;
                }
            };

            let record = match self.send_triple(triple, &mutated).await {
                Ok(outcomes) => {
                    let verdict = classify(&outcomes, Some((action.name, mutation.id)), self.options.absent_codes);
                    ProbeRecord {
                        action: action.name.to_string(),
                        mutation: mutation.id.to_string(),
                        outcomes: Some(outcomes),
                        failure: None,
                        verdict,
                    }
                }
                Err(failure) => {
                    warn!(action = action.name, mutation = mutation.id, %failure, "mutation aborted");
                    let reason = if failure.error.is_transport() {
                        format!("inconclusive: transport failure on {}", failure)
                    } else {
                        format!("inconclusive: request never sent, {}", failure)
                    };
                    ProbeRecord {
                        action: action.name.to_string(),
                        mutation: mutation.id.to_string(),
                        outcomes: None,
                        failure: Some(failure.to_string()),
                        verdict: MutationVerdict::not_useful(VerdictCategory::Inconclusive, reason),
                    }
                }
            };

            self.sink.record(&record);
            records.push(record);
        }

        let report = ActionReport {
            action: action.name.to_string(),
            category: action.category,
            baseline,
            baseline_failure,
            records,
            skipped,
        };
        info!(
            action = action.name,
            useful = report.useful_records().count(),
            probed = report.records.len(),
            "action done"
        );
        self.sink.action_finished(&report);
        report
    }

    async fn run_unit(&self, unit: &ExecutionUnit, triple: &ProbeTriple) -> Vec<ActionReport> {
        let mut reports = Vec::with_capacity(unit.actions.len());
        for action in &unit.actions {
            reports.push(self.probe_action(action, triple).await);
        }
        reports
    }

    /// Run scheduled units and return reports in schedule order.
    ///
    /// Non-destructive units run up to `concurrency` at a time; destructive
    /// units run one by one after all of them have finished.
    pub async fn run(&self, units: &[ExecutionUnit], triple: &ProbeTriple) -> Vec<ActionReport> {
        let concurrency = self.options.concurrency.max(1);
        let (destructive, regular): (Vec<_>, Vec<_>) =
            units.iter().enumerate().partition(|(_, unit)| unit.is_destructive());

        let mut finished: Vec<(usize, Vec<ActionReport>)> = stream::iter(regular)
            .map(|(idx, unit)| async move { (idx, self.run_unit(unit, triple).await) })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        for (idx, unit) in destructive {
            finished.push((idx, self.run_unit(unit, triple).await));
        }

        finished.sort_by_key(|(idx, _)| *idx);
        finished.into_iter().flat_map(|(_, reports)| reports).collect()
    }
}
