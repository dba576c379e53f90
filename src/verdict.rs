// Usefulness classifier for authorder
// Decides whether a response triple reveals that authorization ran before validation

use crate::models::{MutationVerdict, ResponseOutcome, TripleOutcome, VerdictCategory};
use crate::mutator::is_no_op_safe;
use serde::Deserialize;

/// How two missing error codes compare in the pre-auth rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbsentCodePolicy {
    /// Absent equals absent, so two code-less failures count as identical.
    #[default]
    Match,
    /// A comparison involving an absent code proves nothing; the pair is
    /// reported as inconclusive instead of pre-auth.
    Inconclusive,
}

impl std::str::FromStr for AbsentCodePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "match" => Ok(AbsentCodePolicy::Match),
            "inconclusive" => Ok(AbsentCodePolicy::Inconclusive),
            other => Err(format!("unknown absent-code policy `{}` (expected match or inconclusive)", other)),
        }
    }
}

/// Result of comparing two optional error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodeMatch {
    Same,
    Different,
    /// Both absent under `AbsentCodePolicy::Inconclusive`.
    Unknown,
}

fn compare_codes(a: &ResponseOutcome, b: &ResponseOutcome, policy: AbsentCodePolicy) -> CodeMatch {
    match (a.error_code.as_deref(), b.error_code.as_deref()) {
        (None, None) => match policy {
            AbsentCodePolicy::Match => CodeMatch::Same,
            AbsentCodePolicy::Inconclusive => CodeMatch::Unknown,
        },
        (x, y) if x == y => CodeMatch::Same,
        _ => CodeMatch::Different,
    }
}

fn inconclusive(triple: &TripleOutcome) -> MutationVerdict {
    let (allowed, denied, nonexistent) = triple.statuses();
    MutationVerdict::not_useful(
        VerdictCategory::Inconclusive,
        format!(
            "inconclusive: allowed={} denied={} nonexistent={}, needs manual review",
            allowed, denied, nonexistent
        ),
    )
}

/// Classify a response triple.
///
/// `pair` is the (action, mutation) being judged; only pairs on the no-op
/// safe list may turn a 200 into a useful verdict. Rules are checked in
/// order and the first match wins.
///
/// 1. No-op probe: safe pair, allowed 200, denied 403 → useful
/// 2. allowed 403 → auth itself failed where it should pass
/// 3. denied not 403 → pre-auth if codes match, otherwise unexpected
/// 4. nonexistent reproduces allowed status and code → pre-auth
/// 5. nonexistent 403/404, allowed other 4xx → useful safe probe
/// 6. allowed 200 outside the safe list → side effects not ruled out
/// 7. anything else → inconclusive
pub fn classify(
    triple: &TripleOutcome,
    pair: Option<(&str, &str)>,
    policy: AbsentCodePolicy,
) -> MutationVerdict {
    let allowed = &triple.allowed;
    let denied = &triple.denied;
    let nonexistent = &triple.nonexistent;
    let safe_pair = pair.map_or(false, |(action, mutation)| is_no_op_safe(action, mutation));

    if safe_pair && allowed.status == 200 && denied.status == 403 {
        return MutationVerdict::useful(
            VerdictCategory::NoOpProbe,
            "no-op probe: request succeeded without side effects and the denied target was refused",
        );
    }

    if allowed.status == 403 {
        return MutationVerdict::not_useful(
            VerdictCategory::Other,
            "auth failed on allowed target: validation order cannot be observed",
        );
    }

    if denied.status != 403 {
        return match compare_codes(denied, allowed, policy) {
            CodeMatch::Same => MutationVerdict::not_useful(
                VerdictCategory::PreAuth,
                "pre-auth validation: identical failure on both targets",
            ),
            CodeMatch::Different => MutationVerdict::not_useful(
                VerdictCategory::Other,
                format!("unexpected denied-target status {}", denied.status),
            ),
            CodeMatch::Unknown => inconclusive(triple),
        };
    }

    if nonexistent.status == allowed.status {
        match compare_codes(nonexistent, allowed, policy) {
            CodeMatch::Same => {
                return MutationVerdict::not_useful(
                    VerdictCategory::PreAuth,
                    "pre-auth validation: a target with no possible authorization reproduces the allowed error",
                )
            }
            CodeMatch::Unknown => return inconclusive(triple),
            CodeMatch::Different => {}
        }
    }

    let allowed_client_error = (400..500).contains(&allowed.status) && allowed.status != 403;
    if matches!(nonexistent.status, 403 | 404) && allowed_client_error {
        return MutationVerdict::useful(
            VerdictCategory::SafeProbe,
            "safe probe: auth passed then validation failed",
        );
    }

    if allowed.status == 200 {
        return MutationVerdict::not_useful(
            VerdictCategory::Other,
            "200 but mutation not recognized as side-effect-free",
        );
    }

    inconclusive(triple)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status: u16, code: Option<&str>) -> ResponseOutcome {
        ResponseOutcome::new(status, code)
    }

    fn triple(
        allowed: (u16, Option<&str>),
        denied: (u16, Option<&str>),
        nonexistent: (u16, Option<&str>),
    ) -> TripleOutcome {
        TripleOutcome {
            allowed: outcome(allowed.0, allowed.1),
            denied: outcome(denied.0, denied.1),
            nonexistent: outcome(nonexistent.0, nonexistent.1),
        }
    }

    const AUTHZ: Option<&str> = Some("AuthorizationError");

    #[test]
    fn no_op_probe_on_safe_pair() {
        let t = triple((200, None), (403, AUTHZ), (403, AUTHZ));
        let v = classify(&t, Some(("UntagResource", "nonexistent-tag-key")), AbsentCodePolicy::Match);
        assert!(v.useful);
        assert_eq!(v.category, VerdictCategory::NoOpProbe);
        assert_eq!(v.category.to_string(), "no-op probe");
    }

    #[test]
    fn success_outside_safe_list_is_not_useful() {
        let t = triple((200, None), (403, AUTHZ), (404, Some("NotFound")));
        let v = classify(&t, Some(("Publish", "drop-version")), AbsentCodePolicy::Match);
        assert!(!v.useful);
        assert!(v.reason.contains("side-effect-free"));

        let anonymous = classify(&t, None, AbsentCodePolicy::Match);
        assert_eq!(anonymous, v);
    }

    #[test]
    fn allowed_forbidden_is_never_useful() {
        for denied in [200, 400, 403, 404, 500] {
            for nonexistent in [200, 400, 403, 404] {
                let t = triple((403, AUTHZ), (denied, None), (nonexistent, None));
                let v = classify(&t, Some(("UntagResource", "nonexistent-tag-key")), AbsentCodePolicy::Match);
                assert!(!v.useful);
                assert!(v.reason.contains("auth failed"));
            }
        }
    }

    #[test]
    fn identical_validation_error_everywhere_is_pre_auth() {
        let v_err = Some("ValidationError");
        let t = triple((400, v_err), (400, v_err), (400, v_err));
        let v = classify(&t, None, AbsentCodePolicy::Match);
        assert!(!v.useful);
        assert_eq!(v.category, VerdictCategory::PreAuth);
        assert!(v.reason.contains("pre-auth"));
    }

    #[test]
    fn denied_with_different_code_is_unexpected() {
        let t = triple((400, Some("InvalidParameter")), (404, Some("NotFound")), (404, Some("NotFound")));
        let v = classify(&t, None, AbsentCodePolicy::Match);
        assert!(!v.useful);
        assert_eq!(v.category, VerdictCategory::Other);
        assert!(v.reason.contains("unexpected denied-target status"));
    }

    #[test]
    fn nonexistent_reproducing_allowed_error_is_pre_auth() {
        let t = triple((400, Some("InvalidParameter")), (403, AUTHZ), (400, Some("InvalidParameter")));
        let v = classify(&t, None, AbsentCodePolicy::Match);
        assert!(!v.useful);
        assert_eq!(v.category, VerdictCategory::PreAuth);
        assert!(v.reason.contains("no possible authorization"));
    }

    #[test]
    fn auth_then_validation_is_a_safe_probe() {
        let t = triple((400, Some("InvalidParameter")), (403, AUTHZ), (403, AUTHZ));
        let v = classify(&t, None, AbsentCodePolicy::Match);
        assert!(v.useful);
        assert_eq!(v.category, VerdictCategory::SafeProbe);
        assert!(v.reason.contains("auth passed"));

        let not_found = triple((400, Some("InvalidParameter")), (403, AUTHZ), (404, Some("NotFound")));
        assert!(classify(&not_found, None, AbsentCodePolicy::Match).useful);
    }

    #[test]
    fn server_error_is_inconclusive_with_statuses() {
        let t = triple((500, Some("InternalError")), (403, AUTHZ), (403, AUTHZ));
        let v = classify(&t, None, AbsentCodePolicy::Match);
        assert!(!v.useful);
        assert_eq!(v.category, VerdictCategory::Inconclusive);
        assert!(v.reason.contains("allowed=500"));
        assert!(v.reason.contains("denied=403"));
        assert!(v.reason.contains("nonexistent=403"));
    }

    #[test]
    fn absent_codes_match_by_default() {
        let t = triple((400, None), (400, None), (400, None));
        let v = classify(&t, None, AbsentCodePolicy::Match);
        assert_eq!(v.category, VerdictCategory::PreAuth);
    }

    #[test]
    fn absent_codes_can_route_to_inconclusive() {
        let t = triple((400, None), (400, None), (400, None));
        let v = classify(&t, None, AbsentCodePolicy::Inconclusive);
        assert_eq!(v.category, VerdictCategory::Inconclusive);

        let rule_four = triple((400, None), (403, AUTHZ), (400, None));
        let v = classify(&rule_four, None, AbsentCodePolicy::Inconclusive);
        assert_eq!(v.category, VerdictCategory::Inconclusive);
    }

    #[test]
    fn one_absent_code_never_matches() {
        let t = triple((400, Some("InvalidParameter")), (400, None), (403, AUTHZ));
        for policy in [AbsentCodePolicy::Match, AbsentCodePolicy::Inconclusive] {
            let v = classify(&t, None, policy);
            assert_eq!(v.category, VerdictCategory::Other);
        }
    }

    #[test]
    fn classification_is_deterministic() {
        let t = triple((400, Some("InvalidParameter")), (403, AUTHZ), (403, AUTHZ));
        let first = classify(&t, Some(("Publish", "oversized-subject")), AbsentCodePolicy::Match);
        for _ in 0..10 {
            assert_eq!(classify(&t, Some(("Publish", "oversized-subject")), AbsentCodePolicy::Match), first);
        }
    }

    #[test]
    fn policy_parses_from_cli_text() {
        assert_eq!("match".parse::<AbsentCodePolicy>().unwrap(), AbsentCodePolicy::Match);
        assert_eq!("inconclusive".parse::<AbsentCodePolicy>().unwrap(), AbsentCodePolicy::Inconclusive);
        assert!("maybe".parse::<AbsentCodePolicy>().is_err());
    }
}
