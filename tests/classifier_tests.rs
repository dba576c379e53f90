/// Classifier tests for authorder
/// Decision-list behavior through the public API
use authorder::models::{ResponseOutcome, TripleOutcome, VerdictCategory};
use authorder::verdict::{classify, AbsentCodePolicy};

fn triple(a: (u16, Option<&str>), d: (u16, Option<&str>), n: (u16, Option<&str>)) -> TripleOutcome {
    TripleOutcome {
        allowed: ResponseOutcome::new(a.0, a.1),
        denied: ResponseOutcome::new(d.0, d.1),
        nonexistent: ResponseOutcome::new(n.0, n.1),
    }
}

const AUTHZ: Option<&str> = Some("AuthorizationError");

#[test]
fn no_op_probe_on_safe_list() {
    let t = triple((200, None), (403, AUTHZ), (403, AUTHZ));
    let verdict = classify(&t, Some(("UntagResource", "nonexistent-tag-key")), AbsentCodePolicy::Match);
    assert!(verdict.useful);
    assert_eq!(verdict.category.as_str(), "no-op probe");
}

#[test]
fn identical_validation_errors_are_pre_auth() {
    let code = Some("ValidationError");
    let t = triple((400, code), (400, code), (400, code));
    let verdict = classify(&t, None, AbsentCodePolicy::Match);
    assert!(!verdict.useful);
    assert!(verdict.reason.contains("pre-auth"));
}

#[test]
fn validation_after_auth_is_useful() {
    let t = triple((400, Some("InvalidParameter")), (403, AUTHZ), (403, AUTHZ));
    let verdict = classify(&t, None, AbsentCodePolicy::Match);
    assert!(verdict.useful);
    assert!(verdict.reason.contains("auth passed"));
}

#[test]
fn allowed_forbidden_never_useful() {
    let statuses = [200u16, 400, 403, 404, 500];
    for d in statuses {
        for n in statuses {
            let t = triple((403, AUTHZ), (d, AUTHZ), (n, None));
            for pair in [None, Some(("UntagResource", "nonexistent-tag-key"))] {
                assert!(!classify(&t, pair, AbsentCodePolicy::Match).useful);
            }
        }
    }
}

#[test]
fn no_op_needs_denied_refusal() {
    // Success on both targets means the gate was never observed.
    let t = triple((200, None), (200, None), (404, Some("NotFound")));
    let verdict = classify(&t, Some(("UntagResource", "nonexistent-tag-key")), AbsentCodePolicy::Match);
    assert!(!verdict.useful);
    assert_eq!(verdict.category, VerdictCategory::PreAuth);
}

#[test]
fn only_safe_probes_and_no_ops_are_useful() {
    let statuses = [200u16, 400, 403, 404, 500];
    let codes = [None, AUTHZ, Some("InvalidParameter")];
    for a in statuses {
        for d in statuses {
            for n in statuses {
                for code in codes {
                    let t = triple((a, code), (d, code), (n, code));
                    for policy in [AbsentCodePolicy::Match, AbsentCodePolicy::Inconclusive] {
                        let verdict = classify(&t, Some(("Publish", "oversized-subject")), policy);
                        if verdict.useful {
                            assert_eq!(verdict.category, VerdictCategory::SafeProbe);
                            assert_eq!(d, 403);
                            assert!((400..500).contains(&a) && a != 403);
                        }
                        // Pure function
                        assert_eq!(verdict, classify(&t, Some(("Publish", "oversized-subject")), policy));
                    }
                }
            }
        }
    }
}
