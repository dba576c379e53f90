// Reporting and output for authorder
// Assembles the run report and exports it as CSV, Markdown and JSON

use crate::models::{ActionReport, ProbeRecord, ProbeTriple, ResponseOutcome};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Counts over every probed pair
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Summary {
    pub actions: usize,
    pub probed: usize,
    pub useful: usize,
    pub skipped: usize,
    pub transport_failures: usize,
    pub by_category: BTreeMap<String, usize>,
}

impl Summary {
    pub fn from_reports(reports: &[ActionReport]) -> Self {
        let mut summary = Summary { actions: reports.len(), ..Default::default() };
        for report in reports {
            summary.skipped += report.skipped.len();
            for record in &report.records {
                summary.probed += 1;
                if record.verdict.useful {
                    summary.useful += 1;
                }
                if record.failure.is_some() {
                    summary.transport_failures += 1;
                }
                *summary
                    .by_category
                    .entry(record.verdict.category.to_string())
                    .or_insert(0) += 1;
            }
        }
        summary
    }
}

/// Everything a run produced, in execution order.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub allowed_target: String,
    pub denied_target: String,
    pub nonexistent_target: String,
    pub summary: Summary,
    pub actions: Vec<ActionReport>,
}

impl RunReport {
    pub fn new(
        triple: &ProbeTriple,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        actions: Vec<ActionReport>,
    ) -> Self {
        Self {
            started_at,
            finished_at,
            allowed_target: triple.allowed.id(),
            denied_target: triple.denied.id(),
            nonexistent_target: triple.nonexistent.id(),
            summary: Summary::from_reports(&actions),
            actions,
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &ProbeRecord> {
        self.actions.iter().flat_map(|a| a.records.iter())
    }

    /// (action, mutation) pairs that proved auth runs first.
    pub fn useful_pairs(&self) -> Vec<(&str, &str)> {
        self.records()
            .filter(|r| r.verdict.useful)
            .map(|r| (r.action.as_str(), r.mutation.as_str()))
            .collect()
    }
}

/// Escape CSV field to prevent formula injection attacks
/// Cells starting with =, +, -, @, or tab are prefixed with single quote
fn escape_csv_field(field: &str) -> String {
    let first_char = match field.chars().next() {
        Some(c) => c,
        None => return String::new(),
    };
    let needs_escaping = matches!(first_char, '=' | '+' | '-' | '@' | '\t');

    // Also escape if field contains comma, quotes or a line break
    if needs_escaping || field.contains(',') || field.contains('"') || field.contains('\n') {
        if needs_escaping {
            // Prefix with single quote to prevent formula injection
            format!("\"'{}\"", field.replace('"', "\"\""))
        } else {
            format!("\"{}\"", field.replace('"', "\"\""))
        }
    } else {
        field.to_string()
    }
}

fn report_path(dir: &Path, extension: &str) -> PathBuf {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("authorder_report_{}.{}", timestamp, extension))
}

fn outcome_cells(outcome: Option<&ResponseOutcome>) -> (String, String) {
    match outcome {
        Some(o) => (o.status.to_string(), o.error_code.clone().unwrap_or_default()),
        None => (String::new(), String::new()),
    }
}

/// One CSV row per probed (action, mutation) pair.
pub fn export_csv(report: &RunReport, dir: &Path) -> Result<PathBuf, std::io::Error> {
    let path = report_path(dir, "csv");
    let mut file = BufWriter::new(File::create(&path)?);

    writeln!(
        file,
        "Action,Mutation,Useful,Category,AllowedStatus,AllowedCode,DeniedStatus,DeniedCode,NonexistentStatus,NonexistentCode,Reason"
    )?;
    for record in report.records() {
        let o = record.outcomes.as_ref();
        let (a_status, a_code) = outcome_cells(o.map(|o| &o.allowed));
        let (d_status, d_code) = outcome_cells(o.map(|o| &o.denied));
        let (n_status, n_code) = outcome_cells(o.map(|o| &o.nonexistent));
        let cells: [&str; 11] = [
            record.action.as_str(),
            record.mutation.as_str(),
            if record.verdict.useful { "yes" } else { "no" },
            record.verdict.category.as_str(),
            &a_status,
            &a_code,
            &d_status,
            &d_code,
            &n_status,
            &n_code,
            &record.verdict.reason,
        ];
        let row: Vec<String> = cells.iter().map(|c| escape_csv_field(c)).collect();
        writeln!(file, "{}", row.join(","))?;
    }
    file.flush()?;

    Ok(path)
}

fn status_cell(outcome: Option<&ResponseOutcome>) -> String {
    match outcome {
        Some(o) => match &o.error_code {
            Some(code) => format!("{} {}", o.status, code),
            None => o.status.to_string(),
        },
        None => "-".to_string(),
    }
}

/// Escape pipes so reasons cannot break the table
fn md_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

pub fn export_markdown(report: &RunReport, dir: &Path) -> Result<PathBuf, std::io::Error> {
    let path = report_path(dir, "md");
    let mut file = BufWriter::new(File::create(&path)?);
    let s = &report.summary;

    writeln!(file, "# authorder report\n")?;
    writeln!(file, "- Started: {}", report.started_at.to_rfc3339())?;
    writeln!(file, "- Finished: {}", report.finished_at.to_rfc3339())?;
    writeln!(file, "- Allowed target: `{}`", report.allowed_target)?;
    writeln!(file, "- Denied target: `{}`", report.denied_target)?;
    writeln!(file, "- Nonexistent target: `{}`\n", report.nonexistent_target)?;

    writeln!(file, "## Summary\n")?;
    writeln!(
        file,
        "{} actions, {} pairs probed, {} useful, {} skipped, {} transport failures\n",
        s.actions, s.probed, s.useful, s.skipped, s.transport_failures
    )?;
    for (category, count) in &s.by_category {
        writeln!(file, "- {}: {}", category, count)?;
    }

    let useful = report.useful_pairs();
    if !useful.is_empty() {
        writeln!(file, "\n## Useful probes\n")?;
        for (action, mutation) in useful {
            writeln!(file, "- **{}** / {}", action, mutation)?;
        }
    }

    for action in &report.actions {
        writeln!(file, "\n## {} ({})\n", action.action, action.category)?;
        match (&action.baseline, &action.baseline_failure) {
            (Some(b), _) => writeln!(
                file,
                "Baseline: allowed {}, denied {}, nonexistent {}\n",
                status_cell(Some(&b.allowed)),
                status_cell(Some(&b.denied)),
                status_cell(Some(&b.nonexistent))
            )?,
            (None, Some(err)) => writeln!(file, "Baseline failed: {}\n", md_cell(err))?,
            (None, None) => {}
        }
        if action.records.is_empty() {
            writeln!(file, "No applicable mutations.")?;
            continue;
        }
        writeln!(file, "| Mutation | Allowed | Denied | Nonexistent | Verdict | Reason |")?;
        writeln!(file, "|---|---|---|---|---|---|")?;
        for record in &action.records {
            let o = record.outcomes.as_ref();
            writeln!(
                file,
                "| {} | {} | {} | {} | {}{} | {} |",
                record.mutation,
                status_cell(o.map(|o| &o.allowed)),
                status_cell(o.map(|o| &o.denied)),
                status_cell(o.map(|o| &o.nonexistent)),
                if record.verdict.useful { "✅ " } else { "" },
                record.verdict.category,
                md_cell(&record.verdict.reason)
            )?;
        }
    }
    file.flush()?;

    Ok(path)
}

/// Full report, raw bodies included, for later manual review.
pub fn export_json(report: &RunReport, dir: &Path) -> Result<PathBuf, std::io::Error> {
    let path = report_path(dir, "json");
    let mut file = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(&mut file, report)?;
    file.flush()?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_formula_prefixes() {
        assert_eq!(escape_csv_field("=1+1"), "\"'=1+1\"");
        assert_eq!(escape_csv_field("-2"), "\"'-2\"");
        assert_eq!(escape_csv_field("@SUM(A1)"), "\"'@SUM(A1)\"");
    }

    #[test]
    fn quotes_commas_and_quotes() {
        assert_eq!(escape_csv_field("a,b"), "\"a,b\"");
        assert_eq!(escape_csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn plain_fields_pass_through() {
        assert_eq!(escape_csv_field("UntagResource"), "UntagResource");
        assert_eq!(escape_csv_field(""), "");
    }

    #[test]
    fn markdown_cells_escape_pipes() {
        assert_eq!(md_cell("a|b\nc"), "a\\|b c");
    }
}
