//! End-to-end compliance runs against an in-memory repository.

use std::io::Write;
use std::sync::Arc;

use repogate_core::source::endpoints;
use repogate_core::{
    render_text, CheckKind, Comment, ComplianceConfig, CompliancePipeline, FetchError, Issue,
    MemorySource, MissingKind, PipelineState, PullRequest,
};
use serde_json::json;

const ORG: &str = "acme";
const BRANCH: &str = "feature/ci-cd-workflow";
const DOC: &str = "docs/workflow-compliance.md";

const STEPS: [&str; 8] = [
    "Code checkout",
    "Dependency installation",
    "Unit testing",
    "Integration testing",
    "Build artifact",
    "Deploy staging",
    "Deploy production",
    "Health check",
];

fn workflow_doc(rows: &[&str]) -> String {
    let mut doc = String::from("# Workflow compliance\n\n| Workflow Step | Status | Owner |\n|---|---|---|\n");
    for row in rows {
        doc.push_str(&format!("| {} | Done | platform |\n", row));
    }
    doc.push_str("\nReviewed by the release team.\n");
    doc
}

fn compliant_issue() -> Issue {
    Issue::new(
        7,
        "Implement CI/CD workflow and Workflow automation",
        "## Problem Statement\nReleases are manual.\n\
         ## Proposed Solution\nAutomate the CI/CD workflow.\n\
         ## Implementation Plan\nStand up a CI/CD pipeline.",
        &["workflow", "automation", "ci-cd", "enhancement"],
    )
}

fn compliant_pr() -> PullRequest {
    PullRequest::new(
        8,
        "Add CI/CD workflow (Workflow implementation)",
        "Closes #7\n\n## Summary\nWorkflow implementation for releases, reference issue #7.\n\
         ## Changes\nNew CI/CD pipeline definition.\n## Testing\nRan on staging.",
        &["workflow", "ci-cd", "enhancement"],
    )
}

fn compliant_comment() -> Comment {
    Comment::new(
        "PR #8 merged: workflow implemented, pipeline tested and deployment verified. \
         All 8 steps ran in all environments with a 100% success rate.",
    )
}

/// Repository that satisfies the workflow checklist end to end.
fn compliant_source() -> MemorySource {
    MemorySource::new()
        .with_branch(BRANCH)
        .with_file(DOC, BRANCH, &workflow_doc(&STEPS))
        .with_issues("open", vec![compliant_issue()])
        .with_pulls("open", vec![compliant_pr()])
        .with_comments(
            7,
            vec![Comment::new("Looks good to me"), compliant_comment()],
        )
}

async fn run(config: ComplianceConfig, source: Arc<MemorySource>) -> repogate_core::PipelineResult {
    let pipeline = CompliancePipeline::new(config, ORG, source).expect("valid config");
    pipeline.run().await
}

#[tokio::test]
async fn missing_branch_fails_first_check_and_stops() {
    let source = Arc::new(MemorySource::new());
    let result = run(ComplianceConfig::workflow_compliance(), source.clone()).await;

    assert_eq!(result.state, PipelineState::Failed);
    assert_eq!(result.outcomes.len(), 1);
    assert_eq!(
        result.failed_check().map(|o| o.check),
        Some(CheckKind::BranchExists)
    );
    // nothing else was fetched once the branch lookup failed
    assert_eq!(source.calls(), vec![endpoints::branch(BRANCH).to_string()]);
}

#[tokio::test]
async fn compliant_repository_passes_every_check() {
    let source = Arc::new(compliant_source());
    let result = run(ComplianceConfig::workflow_compliance(), source).await;

    assert!(result.passed(), "{}", render_text(&result));
    assert_eq!(result.outcomes.len(), 7);
    let order: Vec<CheckKind> = result.outcomes.iter().map(|o| o.check).collect();
    assert_eq!(order, CheckKind::ALL.to_vec());

    let summary = &result.summary;
    assert_eq!(summary.issue.as_ref().map(|i| i.number), Some(7));
    assert_eq!(summary.pull_request.as_ref().map(|p| p.number), Some(8));
    assert_eq!(summary.document_rows, Some(8));
    assert_eq!(summary.expected_entries, 8);
    assert_eq!(summary.expected_labels, 4);
    assert!(result.warnings().is_empty());
    assert_eq!(result.repository.slug(), "acme/label-project");
}

#[tokio::test]
async fn short_document_fails_with_row_count() {
    let source = Arc::new(
        MemorySource::new()
            .with_branch(BRANCH)
            .with_file(DOC, BRANCH, &workflow_doc(&STEPS[..4])),
    );
    let result = run(ComplianceConfig::workflow_compliance(), source).await;

    assert_eq!(result.state, PipelineState::Failed);
    let failed = result.failed_check().expect("a failed check");
    assert_eq!(failed.check, CheckKind::DocumentComplete);
    assert!(failed.detail.contains("4 rows"));
    assert_eq!(failed.missing[0].kind, MissingKind::RowCount);
    assert_eq!(result.summary.document_rows, Some(4));
    assert!(result.summary.issue.is_none());
}

#[tokio::test]
async fn issue_missing_one_initial_label_fails_naming_it() {
    let mut config = ComplianceConfig::workflow_compliance();
    config.issue.initial_labels = vec![
        "enhancement".to_string(),
        "automation".to_string(),
        "needs-review".to_string(),
    ];
    let source = Arc::new(compliant_source());
    let result = run(config, source).await;

    let failed = result.failed_check().expect("a failed check");
    assert_eq!(failed.check, CheckKind::IssueCompliant);
    assert_eq!(failed.missing.len(), 1);
    assert_eq!(failed.missing[0].kind, MissingKind::Label);
    assert_eq!(failed.missing[0].item, "needs-review");
    assert_eq!(result.outcomes.len(), 3);
}

#[tokio::test]
async fn requirements_split_across_comments_do_not_pass() {
    let source = Arc::new(
        compliant_source().with_comments(
            7,
            vec![
                Comment::new("PR #8: workflow implemented, pipeline tested, deployment verified"),
                Comment::new("8 steps, all environments, success rate 100%"),
            ],
        ),
    );
    let result = run(ComplianceConfig::workflow_compliance(), source).await;

    let failed = result.failed_check().expect("a failed check");
    assert_eq!(failed.check, CheckKind::CommentCompliant);
    assert!(!failed.missing.is_empty());
}

#[tokio::test]
async fn pr_must_reference_the_discovered_issue() {
    let mut pr = compliant_pr();
    pr.body = Some(pr.body_text().replace("Closes #7", "Relates to the tracking issue"));
    let source = Arc::new(compliant_source().with_pulls("open", vec![pr]));
    let result = run(ComplianceConfig::workflow_compliance(), source).await;

    let failed = result.failed_check().expect("a failed check");
    assert_eq!(failed.check, CheckKind::PullRequestCompliant);
    assert_eq!(failed.missing.len(), 1);
    assert_eq!(failed.missing[0].kind, MissingKind::Reference);
    assert_eq!(failed.missing[0].item, "Closes #7");
}

#[tokio::test]
async fn closed_issue_is_found_when_no_open_issue_matches() {
    let source = Arc::new(
        compliant_source()
            .with_issues("open", vec![Issue::new(3, "Unrelated chore", "", &[])])
            .with_issues("closed", vec![compliant_issue()]),
    );
    let result = run(ComplianceConfig::workflow_compliance(), source).await;

    assert!(result.passed(), "{}", render_text(&result));
    assert_eq!(result.summary.issue.as_ref().map(|i| i.number), Some(7));
}

#[tokio::test]
async fn unexpected_document_rows_are_warnings_only() {
    let mut rows = STEPS.to_vec();
    rows.push("Smoke test");
    let source = Arc::new(compliant_source().with_file(DOC, BRANCH, &workflow_doc(&rows)));
    let result = run(ComplianceConfig::workflow_compliance(), source).await;

    assert!(result.passed());
    assert_eq!(result.warnings().len(), 1);
    assert!(result.warnings()[0].contains("Smoke test"));
}

#[tokio::test]
async fn listing_failure_fails_discovery() {
    let endpoint = endpoints::issues("open", 30, 1);
    let source = Arc::new(compliant_source().with_error(
        &endpoint,
        FetchError::Status {
            endpoint: endpoint.to_string(),
            status: 502,
        },
    ));
    let result = run(ComplianceConfig::workflow_compliance(), source).await;

    let failed = result.failed_check().expect("a failed check");
    assert_eq!(failed.check, CheckKind::IssueCompliant);
    assert!(failed.detail.contains("502"));
}

#[tokio::test]
async fn missing_document_fails_second_check() {
    let source = Arc::new(MemorySource::new().with_branch(BRANCH));
    let result = run(ComplianceConfig::workflow_compliance(), source).await;

    assert_eq!(result.outcomes.len(), 2);
    let failed = result.failed_check().expect("a failed check");
    assert_eq!(failed.check, CheckKind::DocumentComplete);
    assert!(failed.detail.contains("404"), "{}", failed.detail);
    assert_eq!(failed.missing[0].kind, MissingKind::Artifact);
    assert_eq!(failed.missing[0].item, DOC);
    assert_eq!(result.summary.document_rows, None);
}

#[tokio::test]
async fn undecodable_document_fails_second_check() {
    let source = Arc::new(MemorySource::new().with_branch(BRANCH).with_json(
        &endpoints::contents(DOC, BRANCH),
        json!({ "encoding": "base64", "content": "!!!not base64" }),
    ));
    let result = run(ComplianceConfig::workflow_compliance(), source).await;

    assert_eq!(result.outcomes.len(), 2);
    let failed = result.failed_check().expect("a failed check");
    assert_eq!(failed.check, CheckKind::DocumentComplete);
    assert!(failed.detail.contains("could not decode"), "{}", failed.detail);
    assert_eq!(result.summary.document_rows, None);
}

#[tokio::test]
async fn undiscovered_issue_fails_after_open_and_closed_lookups() {
    let source = Arc::new(
        MemorySource::new()
            .with_branch(BRANCH)
            .with_file(DOC, BRANCH, &workflow_doc(&STEPS)),
    );
    let result = run(ComplianceConfig::workflow_compliance(), source.clone()).await;

    assert_eq!(result.outcomes.len(), 3);
    let failed = result.failed_check().expect("a failed check");
    assert_eq!(failed.check, CheckKind::IssueCompliant);
    assert_eq!(failed.missing.len(), 1);
    assert_eq!(failed.missing[0].kind, MissingKind::Artifact);
    assert!(failed.missing[0].item.contains("Implement CI/CD workflow"));
    assert!(result.summary.issue.is_none());

    let calls = source.calls();
    assert!(calls.contains(&endpoints::issues("open", 30, 1).to_string()));
    assert!(calls.contains(&endpoints::issues("closed", 30, 1).to_string()));
}

#[tokio::test]
async fn undiscovered_pull_request_fails_fourth_check() {
    let source = Arc::new(
        MemorySource::new()
            .with_branch(BRANCH)
            .with_file(DOC, BRANCH, &workflow_doc(&STEPS))
            .with_issues("open", vec![compliant_issue()])
            .with_pulls("open", vec![PullRequest::new(2, "Bump dependencies", "", &[])]),
    );
    let result = run(ComplianceConfig::workflow_compliance(), source).await;

    assert_eq!(result.outcomes.len(), 4);
    let failed = result.failed_check().expect("a failed check");
    assert_eq!(failed.check, CheckKind::PullRequestCompliant);
    assert_eq!(failed.missing[0].kind, MissingKind::Artifact);
    assert!(failed.missing[0].item.contains("Add CI/CD workflow"));
    assert_eq!(result.summary.issue.as_ref().map(|i| i.number), Some(7));
    assert!(result.summary.pull_request.is_none());
}

#[tokio::test]
async fn issue_lacking_an_expected_label_fails_cross_check() {
    let mut issue = compliant_issue();
    issue.labels.retain(|l| l.name != "ci-cd");
    let source = Arc::new(compliant_source().with_issues("open", vec![issue]));
    let result = run(ComplianceConfig::workflow_compliance(), source).await;

    // the initial labels are still there, so the issue itself passes
    assert_eq!(result.outcomes.len(), 5);
    assert!(result.outcomes[2].passed);
    let failed = result.failed_check().expect("a failed check");
    assert_eq!(failed.check, CheckKind::IssueLabels);
    assert_eq!(failed.missing.len(), 1);
    assert_eq!(failed.missing[0].kind, MissingKind::Label);
    assert_eq!(failed.missing[0].item, "ci-cd");
}

#[tokio::test]
async fn document_missing_an_expected_entry_fails_last_check() {
    let mut rows: Vec<&str> = STEPS.iter().copied().filter(|s| *s != "Health check").collect();
    rows.push("Smoke test");
    let source = Arc::new(compliant_source().with_file(DOC, BRANCH, &workflow_doc(&rows)));
    let result = run(ComplianceConfig::workflow_compliance(), source).await;

    assert_eq!(result.state, PipelineState::Failed);
    assert_eq!(result.outcomes.len(), 7);
    let failed = result.failed_check().expect("a failed check");
    assert_eq!(failed.check, CheckKind::DocumentEntries);
    assert_eq!(failed.missing.len(), 1);
    assert_eq!(failed.missing[0].kind, MissingKind::Entry);
    assert_eq!(failed.missing[0].item, "Health check");
    assert!(failed.warnings[0].contains("Smoke test"));
}

#[tokio::test]
async fn config_loaded_from_file_drives_the_run() {
    let toml = ComplianceConfig::workflow_compliance()
        .with_repository("ops-handbook")
        .to_toml_string()
        .unwrap();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(toml.as_bytes()).unwrap();

    let config = ComplianceConfig::load(file.path()).unwrap();
    assert_eq!(config.repository.name, "ops-handbook");

    let source = Arc::new(compliant_source());
    let result = run(config, source).await;
    assert!(result.passed());
    assert_eq!(result.repository.slug(), "acme/ops-handbook");
}

#[test]
fn invalid_config_is_rejected_before_running() {
    let mut config = ComplianceConfig::workflow_compliance();
    config.comment.pr_reference = "PR merged".to_string();
    let err = CompliancePipeline::new(config, ORG, Arc::new(MemorySource::new()))
        .err()
        .expect("invalid config");
    assert!(err.to_string().contains("pr_number"));
}

#[test]
fn run_future_is_send() {
    fn assert_send<T: Send>(_: &T) {}
    let pipeline = CompliancePipeline::new(
        ComplianceConfig::workflow_compliance(),
        ORG,
        Arc::new(MemorySource::new()),
    )
    .unwrap();
    let run = pipeline.run();
    assert_send(&run);
}
