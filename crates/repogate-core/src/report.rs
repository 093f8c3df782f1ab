//! Rendering of a [`PipelineResult`] for people and for machines.
//!
//! - `render_text`: step-numbered narration followed by the run summary
//! - `render_json`: the serialized result, pretty-printed

use crate::checks::{CheckKind, CheckOutcome};
use crate::error::Result;
use crate::pipeline::{ArtifactSummary, PipelineResult};

/// Titles in the summary are cut to this many characters.
pub const SUMMARY_TITLE_CHARS: usize = 30;

const RULE: &str = "============================================================";

/// Output format of the compliance report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl ReportFormat {
    pub fn render(&self, result: &PipelineResult) -> Result<String> {
        match self {
            ReportFormat::Text => Ok(render_text(result)),
            ReportFormat::Json => render_json(result),
        }
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!("unknown report format '{}' (text|json)", other)),
        }
    }
}

/// First `max` characters of `title`, with an ellipsis when cut.
pub fn truncate_title(title: &str, max: usize) -> String {
    let mut chars = title.chars();
    let head: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

fn artifact_line(label: &str, artifact: &Option<ArtifactSummary>) -> String {
    match artifact {
        Some(a) => format!(
            "{:<11}#{} ({})\n",
            label,
            a.number,
            truncate_title(&a.title, SUMMARY_TITLE_CHARS)
        ),
        None => format!("{:<11}not discovered\n", label),
    }
}

fn outcome_lines(outcome: &CheckOutcome) -> String {
    let total = CheckKind::ALL.len();
    let mark = if outcome.passed { "✓" } else { "✗" };
    let mut out = format!(
        "[{}/{}] {}\n  {} {}\n",
        outcome.check.step(),
        total,
        outcome.check.description(),
        mark,
        outcome.detail
    );
    for missing in &outcome.missing {
        out.push_str(&format!("    - missing {}\n", missing));
    }
    for warning in &outcome.warnings {
        out.push_str(&format!("  ! {}\n", warning));
    }
    out
}

/// Human-readable report: one block per check that ran, then the summary.
pub fn render_text(result: &PipelineResult) -> String {
    let mut out = String::new();
    out.push_str(RULE);
    out.push('\n');
    out.push_str(&format!("Compliance check: {}\n", result.repository.slug()));
    out.push_str(&format!("Run: {}\n", result.run_id));
    out.push_str(RULE);
    out.push_str("\n\n");

    for outcome in &result.outcomes {
        out.push_str(&outcome_lines(outcome));
    }

    let skipped = CheckKind::ALL.len() - result.outcomes.len();
    if skipped > 0 {
        out.push_str(&format!("\n{} check(s) not run\n", skipped));
    }

    out.push('\n');
    out.push_str(RULE);
    out.push('\n');
    if result.passed() {
        out.push_str("✓ PASSED: every compliance check passed\n");
    } else {
        let failed = result
            .failed_check()
            .map(|o| o.check.name())
            .unwrap_or("unknown");
        out.push_str(&format!("✗ FAILED at {}\n", failed));
    }

    let summary = &result.summary;
    out.push_str(&format!("{:<11}{}\n", "Repository:", result.repository.slug()));
    out.push_str(&format!("{:<11}{}\n", "Branch:", result.repository.branch));
    out.push_str(&artifact_line("Issue:", &summary.issue));
    out.push_str(&artifact_line("PR:", &summary.pull_request));
    match summary.document_rows {
        Some(rows) => out.push_str(&format!("{:<11}{} row(s)\n", "Document:", rows)),
        None => out.push_str(&format!("{:<11}not read\n", "Document:")),
    }
    out.push_str(&format!(
        "Expected:  {} entries, {} labels\n",
        summary.expected_entries, summary.expected_labels
    ));
    let warnings = result.warnings();
    if !warnings.is_empty() {
        out.push_str(&format!("Warnings:  {}\n", warnings.len()));
    }
    out.push_str(&format!(
        "Checks:    {}/{} passed in {} ms\n",
        result.passed_count(),
        CheckKind::ALL.len(),
        result.duration_ms
    ));
    out.push_str(RULE);
    out
}

/// Machine-readable report.
pub fn render_json(result: &PipelineResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}
