//! Compliance pipeline orchestration.
//!
//! Runs the checkers in dependency order (branch, document, issue, pull
//! request, issue labels, comment, document entries) against one repository.
//! The first failing check ends the run; there is no continue-on-failure mode.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::checks::{self, CheckKind, CheckOutcome, Missing, MissingKind};
use crate::config::ComplianceConfig;
use crate::error::Result;
use crate::model::{Issue, PullRequest, RepositoryRef, Titled};
use crate::obs;
use crate::source::{ArtifactSource, RepoApi};
use crate::table::parse_table;

/// Lifecycle of one run. `Passed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    NotStarted,
    Running,
    Passed,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Passed | PipelineState::Failed)
    }

    /// Next state after a check outcome (or `None` once every check ran).
    ///
    /// `NotStarted` moves to `Running` on any input; terminal states stay put.
    pub fn advance(self, check_passed: Option<bool>) -> PipelineState {
        match (self, check_passed) {
            (PipelineState::NotStarted, _) => PipelineState::Running,
            (PipelineState::Running, Some(true)) => PipelineState::Running,
            (PipelineState::Running, Some(false)) => PipelineState::Failed,
            (PipelineState::Running, None) => PipelineState::Passed,
            (terminal, _) => terminal,
        }
    }
}

/// Identity of a discovered issue or pull request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactSummary {
    pub number: u64,
    pub title: String,
    pub label_count: usize,
}

impl ArtifactSummary {
    fn of<T: Titled>(item: &T, label_count: usize) -> Self {
        Self {
            number: item.number(),
            title: item.title().to_string(),
            label_count,
        }
    }
}

/// Facts gathered during a run, reported whatever the verdict.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunSummary {
    pub issue: Option<ArtifactSummary>,
    pub pull_request: Option<ArtifactSummary>,
    /// Rows parsed from the document table.
    pub document_rows: Option<usize>,
    pub expected_entries: usize,
    pub expected_labels: usize,
}

/// Result of a complete compliance run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineResult {
    pub run_id: String,
    pub repository: RepositoryRef,
    /// Digest of the checklist the run evaluated.
    pub config_digest: String,
    pub state: PipelineState,
    /// Outcomes of the checks that ran, in order.
    pub outcomes: Vec<CheckOutcome>,
    pub summary: RunSummary,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl PipelineResult {
    pub fn passed(&self) -> bool {
        self.state == PipelineState::Passed
    }

    /// The check that ended a failed run.
    pub fn failed_check(&self) -> Option<&CheckOutcome> {
        self.outcomes.iter().find(|o| !o.passed)
    }

    /// Number of checks that passed.
    pub fn passed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed).count()
    }

    /// Warnings from every check that ran.
    pub fn warnings(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .flat_map(|o| o.warnings.iter().map(String::as_str))
            .collect()
    }
}

/// Accumulates outcomes while the pipeline runs.
struct RunContext {
    state: PipelineState,
    outcomes: Vec<CheckOutcome>,
    summary: RunSummary,
}

impl RunContext {
    /// Record an outcome; `None` when it ends the run.
    fn require(&mut self, outcome: CheckOutcome) -> Option<()> {
        obs::emit_check_finished(&outcome);
        self.state = self.state.advance(Some(outcome.passed));
        let passed = outcome.passed;
        self.outcomes.push(outcome);
        passed.then_some(())
    }
}

/// Compliance pipeline bound to one configuration and one artifact source.
pub struct CompliancePipeline {
    config: ComplianceConfig,
    org: String,
    source: Arc<dyn ArtifactSource>,
    config_digest: String,
}

impl CompliancePipeline {
    /// Validate the configuration and bind the pipeline to `source`.
    pub fn new(config: ComplianceConfig, org: &str, source: Arc<dyn ArtifactSource>) -> Result<Self> {
        config.validate()?;
        let config_digest = config.digest()?;
        Ok(Self {
            config,
            org: org.to_string(),
            source,
            config_digest,
        })
    }

    pub fn repository(&self) -> RepositoryRef {
        RepositoryRef::new(
            &self.org,
            &self.config.repository.name,
            &self.config.branch.name,
        )
    }

    /// Run every check in order, stopping at the first failure.
    pub async fn run(&self) -> PipelineResult {
        let run_id = Uuid::new_v4().to_string();
        let span = obs::run_span(&run_id);
        self.run_as(run_id).instrument(span).await
    }

    async fn run_as(&self, run_id: String) -> PipelineResult {
        let started_at = Utc::now();
        let start = Instant::now();
        let repository = self.repository();

        obs::emit_run_started(&run_id, &repository.slug(), &self.config_digest);
        info!(repository = %repository, "Starting compliance pipeline");

        let mut ctx = RunContext {
            state: PipelineState::NotStarted.advance(None),
            outcomes: Vec::new(),
            summary: RunSummary {
                expected_entries: self.config.document.expected_entries.len(),
                expected_labels: self.config.issue.expected_labels.len(),
                ..RunSummary::default()
            },
        };

        if self.run_checks(&mut ctx).await.is_some() {
            ctx.state = ctx.state.advance(None);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        let passed = ctx.state == PipelineState::Passed;
        obs::emit_run_finished(&run_id, duration_ms, ctx.outcomes.len(), passed);

        PipelineResult {
            run_id,
            repository,
            config_digest: self.config_digest.clone(),
            state: ctx.state,
            outcomes: ctx.outcomes,
            summary: ctx.summary,
            started_at,
            duration_ms,
        }
    }

    async fn run_checks(&self, ctx: &mut RunContext) -> Option<()> {
        let cfg = &self.config;
        let api = RepoApi::new(self.source.as_ref(), &cfg.api);

        // 1. branch
        let lookup = api.branch_exists(&cfg.branch.name).await;
        ctx.require(checks::check_branch(&cfg.branch.name, &lookup))?;

        // 2. document
        let rows = match api.file_content(&cfg.branch.doc_file, &cfg.branch.name).await {
            Ok(text) => parse_table(&text, &cfg.document.table_header),
            Err(err) => {
                return ctx.require(CheckOutcome::fetch_failed(
                    CheckKind::DocumentComplete,
                    &cfg.branch.doc_file,
                    &err,
                ));
            }
        };
        ctx.summary.document_rows = Some(rows.len());
        ctx.require(checks::check_document(&rows, &cfg.document))?;

        // 3. issue
        let issue = self.discover_issue(&api, ctx).await?;
        ctx.summary.issue = Some(ArtifactSummary::of(&issue, issue.labels.len()));
        ctx.require(checks::check_issue(&issue, &cfg.issue))?;

        // 4. pull request
        let pr = self.discover_pull(&api, ctx).await?;
        ctx.summary.pull_request = Some(ArtifactSummary::of(&pr, pr.labels.len()));
        ctx.require(checks::check_pull_request(
            &pr,
            issue.number,
            &cfg.pull_request,
        ))?;

        // 5. issue labels
        ctx.require(checks::check_issue_labels(
            &issue,
            &cfg.issue.expected_labels,
        ))?;

        // 6. comment
        let comments = match api.issue_comments(issue.number).await {
            Ok(comments) => comments,
            Err(err) => {
                return ctx.require(CheckOutcome::fetch_failed(
                    CheckKind::CommentCompliant,
                    &format!("comments on issue #{}", issue.number),
                    &err,
                ));
            }
        };
        ctx.require(checks::check_comments(
            &comments,
            issue.number,
            pr.number,
            &cfg.comment,
        ))?;

        // 7. document entries
        ctx.require(checks::check_document_entries(&rows, &cfg.document))
    }

    async fn discover_issue(&self, api: &RepoApi<'_>, ctx: &mut RunContext) -> Option<Issue> {
        let keywords = &self.config.issue.title_keywords;
        match api.discover_issue(keywords).await {
            Ok(Some(issue)) => Some(issue),
            Ok(None) => {
                ctx.require(not_discovered(CheckKind::IssueCompliant, "issue", keywords));
                None
            }
            Err(err) => {
                ctx.require(CheckOutcome::fetch_failed(
                    CheckKind::IssueCompliant,
                    "issue listing",
                    &err,
                ));
                None
            }
        }
    }

    async fn discover_pull(&self, api: &RepoApi<'_>, ctx: &mut RunContext) -> Option<PullRequest> {
        let keywords = &self.config.pull_request.title_keywords;
        match api.discover_pull(keywords).await {
            Ok(Some(pr)) => Some(pr),
            Ok(None) => {
                ctx.require(not_discovered(
                    CheckKind::PullRequestCompliant,
                    "pull request",
                    keywords,
                ));
                None
            }
            Err(err) => {
                ctx.require(CheckOutcome::fetch_failed(
                    CheckKind::PullRequestCompliant,
                    "pull request listing",
                    &err,
                ));
                None
            }
        }
    }
}

fn not_discovered(check: CheckKind, what: &str, keywords: &[String]) -> CheckOutcome {
    let wanted = format!("{} titled with {}", what, keywords.join(" + "));
    CheckOutcome::fail(
        check,
        format!("no open or closed {} matches the title keywords", what),
        vec![Missing::new(MissingKind::Artifact, wanted)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        let s = PipelineState::NotStarted.advance(None);
        assert_eq!(s, PipelineState::Running);
        assert_eq!(s.advance(Some(true)), PipelineState::Running);
        assert_eq!(s.advance(Some(false)), PipelineState::Failed);
        assert_eq!(s.advance(None), PipelineState::Passed);
    }

    #[test]
    fn test_terminal_states_are_sticky() {
        assert_eq!(
            PipelineState::Failed.advance(Some(true)),
            PipelineState::Failed
        );
        assert_eq!(PipelineState::Passed.advance(None), PipelineState::Passed);
        assert!(PipelineState::Failed.is_terminal());
        assert!(!PipelineState::Running.is_terminal());
    }

    #[test]
    fn test_pipeline_result_counts() {
        let result = PipelineResult {
            run_id: "run123".to_string(),
            repository: RepositoryRef::new("acme", "repo", "main"),
            config_digest: "abc".to_string(),
            state: PipelineState::Failed,
            outcomes: vec![
                CheckOutcome::pass(CheckKind::BranchExists, "ok"),
                CheckOutcome::fail(CheckKind::DocumentComplete, "short", Vec::new()),
            ],
            summary: RunSummary::default(),
            started_at: Utc::now(),
            duration_ms: 3,
        };

        assert!(!result.passed());
        assert_eq!(result.passed_count(), 1);
        assert_eq!(
            result.failed_check().map(|o| o.check),
            Some(CheckKind::DocumentComplete)
        );
    }
}
