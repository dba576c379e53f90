use authorder::arn::{Arn, IdentityGenerator};
use authorder::models::{
    ActionCategory, ActionReport, Credentials, MutationVerdict, ProbeRecord, ProbeTriple,
    ResponseOutcome, Target, TargetRole, TripleOutcome, VerdictCategory,
};
use authorder::reporting::{export_csv, export_json, export_markdown, RunReport};
use chrono::Utc;
use std::fs;

struct FixedGenerator;

impl IdentityGenerator for FixedGenerator {
    fn nonexistent_for(&self, allowed: &Arn) -> Arn {
        allowed.with_resource("authorder-nonexistent-fixed")
    }
}

fn creds() -> Credentials {
    Credentials {
        access_key_id: "AKIDTEST".to_string(),
        secret_access_key: "secret".to_string(),
        session_token: None,
    }
}

fn triple() -> ProbeTriple {
    let allowed = Target::new(
        TargetRole::Allowed,
        Arn::parse("arn:aws:sns:us-east-1:111122223333:allowed").unwrap(),
        creds(),
    );
    let denied = Target::new(
        TargetRole::Denied,
        Arn::parse("arn:aws:sns:us-east-1:444455556666:denied").unwrap(),
        creds(),
    );
    ProbeTriple::new(allowed, denied, &FixedGenerator)
}

fn outcomes(a: u16, d: u16, n: u16) -> TripleOutcome {
    TripleOutcome {
        allowed: ResponseOutcome::new(a, (a != 200).then_some("InvalidParameter")),
        denied: ResponseOutcome::new(d, Some("AuthorizationError")),
        nonexistent: ResponseOutcome::new(n, Some("NotFound")),
    }
}

fn sample_report() -> RunReport {
    let useful = ProbeRecord {
        action: "UntagResource".to_string(),
        mutation: "nonexistent-tag-key".to_string(),
        outcomes: Some(outcomes(200, 403, 404)),
        failure: None,
        verdict: MutationVerdict::useful(VerdictCategory::NoOpProbe, "no-op probe: fine"),
    };
    let failed = ProbeRecord {
        action: "UntagResource".to_string(),
        mutation: "drop-version".to_string(),
        outcomes: None,
        failure: Some("denied leg: transport failure: reset".to_string()),
        verdict: MutationVerdict::not_useful(
            VerdictCategory::Inconclusive,
            "inconclusive: transport failure on denied leg",
        ),
    };
    let actions = vec![
        ActionReport {
            action: "UntagResource".to_string(),
            category: ActionCategory::Write,
            baseline: Some(outcomes(200, 403, 404)),
            baseline_failure: None,
            records: vec![useful, failed],
            skipped: vec!["oversized-subject".to_string()],
        },
        ActionReport {
            action: "GetTopicAttributes".to_string(),
            category: ActionCategory::Read,
            baseline: None,
            baseline_failure: Some("allowed leg: request timed out after 10 ms".to_string()),
            records: Vec::new(),
            skipped: Vec::new(),
        },
    ];
    RunReport::new(&triple(), Utc::now(), Utc::now(), actions)
}

#[test]
fn summary_counts_every_record() {
    let report = sample_report();
    let s = &report.summary;
    assert_eq!(s.actions, 2);
    assert_eq!(s.probed, 2);
    assert_eq!(s.useful, 1);
    assert_eq!(s.skipped, 1);
    assert_eq!(s.transport_failures, 1);
    assert_eq!(s.by_category.get("no-op probe"), Some(&1));
    assert_eq!(s.by_category.get("inconclusive"), Some(&1));
    assert_eq!(report.useful_pairs(), vec![("UntagResource", "nonexistent-tag-key")]);
}

#[test]
fn reporting_exports_create_files() {
    let dir = tempfile::tempdir().unwrap();
    let report = sample_report();

    let csv = export_csv(&report, dir.path()).expect("CSV export should succeed");
    let md = export_markdown(&report, dir.path()).expect("Markdown export should succeed");
    let json = export_json(&report, dir.path()).expect("JSON export should succeed");

    for (path, ext) in [(&csv, "csv"), (&md, "md"), (&json, "json")] {
        assert!(path.exists(), "{} should exist", path.display());
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("authorder_report_"));
        assert!(name.ends_with(&format!(".{}", ext)));
    }
}

#[test]
fn csv_has_one_row_per_record() {
    let dir = tempfile::tempdir().unwrap();
    let csv = export_csv(&sample_report(), dir.path()).unwrap();
    let content = fs::read_to_string(csv).unwrap();
    let lines: Vec<&str> = content.lines().collect();

    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("Action,Mutation,Useful,Category"));
    assert!(lines[1].starts_with("UntagResource,nonexistent-tag-key,yes,no-op probe,200,,403,AuthorizationError,404,NotFound"));
    // Failed records keep their row with empty status cells.
    assert!(lines[2].starts_with("UntagResource,drop-version,no,inconclusive,,,,,,,"));
}

#[test]
fn markdown_lists_useful_pairs_and_baseline_failures() {
    let dir = tempfile::tempdir().unwrap();
    let md = export_markdown(&sample_report(), dir.path()).unwrap();
    let content = fs::read_to_string(md).unwrap();

    assert!(content.contains("# authorder report"));
    assert!(content.contains("## Useful probes"));
    assert!(content.contains("- **UntagResource** / nonexistent-tag-key"));
    assert!(content.contains("| nonexistent-tag-key | 200 | 403 AuthorizationError | 404 NotFound |"));
    assert!(content.contains("Baseline failed: allowed leg: request timed out"));
    assert!(content.contains("No applicable mutations."));
    assert!(content.contains("`arn:aws:sns:us-east-1:111122223333:authorder-nonexistent-fixed`"));
}

#[test]
fn json_keeps_structure_and_verdict_strings() {
    let dir = tempfile::tempdir().unwrap();
    let json = export_json(&sample_report(), dir.path()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(json).unwrap()).unwrap();

    assert_eq!(value["summary"]["useful"], 1);
    assert_eq!(value["actions"][0]["action"], "UntagResource");
    assert_eq!(value["actions"][0]["category"], "write");
    assert_eq!(value["actions"][0]["records"][0]["verdict"]["category"], "no-op probe");
    assert_eq!(value["actions"][0]["records"][0]["outcomes"]["denied"]["status"], 403);
    assert!(value["actions"][1]["baseline"].is_null());
}
