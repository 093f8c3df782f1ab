//! Requirement checkers.
//!
//! Each checker is a pure function of one fetched artifact and one
//! requirement set, returning a [`CheckOutcome`] that lists exactly what is
//! missing. Keyword and reference comparisons ignore case; section headers
//! and label names are compared case-sensitively.

use serde::{Deserialize, Serialize};

use crate::config::{
    render_issue_reference, render_pr_reference, CommentRequirements, DocumentRequirements,
    IssueRequirements, PullRequestRequirements,
};
use crate::error::FetchError;
use crate::model::{Comment, Issue, PullRequest};

// ---------------------------------------------------------------------------
// Check identity
// ---------------------------------------------------------------------------

/// The checks of a compliance run, in pipeline order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    BranchExists,
    DocumentComplete,
    IssueCompliant,
    PullRequestCompliant,
    IssueLabels,
    CommentCompliant,
    DocumentEntries,
}

impl CheckKind {
    /// Every check, in the order the pipeline runs them.
    pub const ALL: [CheckKind; 7] = [
        CheckKind::BranchExists,
        CheckKind::DocumentComplete,
        CheckKind::IssueCompliant,
        CheckKind::PullRequestCompliant,
        CheckKind::IssueLabels,
        CheckKind::CommentCompliant,
        CheckKind::DocumentEntries,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CheckKind::BranchExists => "branch_exists",
            CheckKind::DocumentComplete => "document_complete",
            CheckKind::IssueCompliant => "issue_compliant",
            CheckKind::PullRequestCompliant => "pull_request_compliant",
            CheckKind::IssueLabels => "issue_labels",
            CheckKind::CommentCompliant => "comment_compliant",
            CheckKind::DocumentEntries => "document_entries",
        }
    }

    /// 1-based position in the pipeline.
    pub fn step(&self) -> usize {
        match self {
            CheckKind::BranchExists => 1,
            CheckKind::DocumentComplete => 2,
            CheckKind::IssueCompliant => 3,
            CheckKind::PullRequestCompliant => 4,
            CheckKind::IssueLabels => 5,
            CheckKind::CommentCompliant => 6,
            CheckKind::DocumentEntries => 7,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CheckKind::BranchExists => "feature branch exists",
            CheckKind::DocumentComplete => "document table is complete",
            CheckKind::IssueCompliant => "tracking issue is compliant",
            CheckKind::PullRequestCompliant => "pull request is compliant",
            CheckKind::IssueLabels => "issue carries the expected labels",
            CheckKind::CommentCompliant => "issue has a compliant closing comment",
            CheckKind::DocumentEntries => "document lists every expected entry",
        }
    }
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Category of a missing item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MissingKind {
    /// Branch, document, issue or pull request could not be obtained.
    Artifact,
    Section,
    Keyword,
    Label,
    Reference,
    ContentFlag,
    RowCount,
    LabelCount,
    Entry,
    Comment,
}

impl MissingKind {
    pub fn name(&self) -> &'static str {
        match self {
            MissingKind::Artifact => "artifact",
            MissingKind::Section => "section",
            MissingKind::Keyword => "keyword",
            MissingKind::Label => "label",
            MissingKind::Reference => "reference",
            MissingKind::ContentFlag => "content flag",
            MissingKind::RowCount => "row count",
            MissingKind::LabelCount => "label count",
            MissingKind::Entry => "entry",
            MissingKind::Comment => "comment",
        }
    }
}

/// One item a checker expected but did not find.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Missing {
    pub kind: MissingKind,
    pub item: String,
}

impl Missing {
    pub fn new(kind: MissingKind, item: impl Into<String>) -> Self {
        Self {
            kind,
            item: item.into(),
        }
    }
}

impl std::fmt::Display for Missing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} `{}`", self.kind.name(), self.item)
    }
}

/// Result of one checker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckOutcome {
    pub check: CheckKind,
    pub passed: bool,
    /// One-line summary of what was found.
    pub detail: String,
    /// Items whose absence failed the check (empty when passed).
    pub missing: Vec<Missing>,
    /// Non-fatal findings.
    pub warnings: Vec<String>,
}

impl CheckOutcome {
    pub fn pass(check: CheckKind, detail: impl Into<String>) -> Self {
        Self {
            check,
            passed: true,
            detail: detail.into(),
            missing: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn fail(check: CheckKind, detail: impl Into<String>, missing: Vec<Missing>) -> Self {
        Self {
            check,
            passed: false,
            detail: detail.into(),
            missing,
            warnings: Vec::new(),
        }
    }

    /// Passes iff `missing` is empty.
    fn from_missing(
        check: CheckKind,
        missing: Vec<Missing>,
        passed_detail: impl Into<String>,
        failed_detail: impl Into<String>,
    ) -> Self {
        if missing.is_empty() {
            Self::pass(check, passed_detail)
        } else {
            Self::fail(check, failed_detail, missing)
        }
    }

    /// The artifact a check needs could not be fetched.
    pub fn fetch_failed(check: CheckKind, what: &str, error: &FetchError) -> Self {
        Self::fail(
            check,
            format!("could not fetch {}: {}", what, error),
            vec![Missing::new(MissingKind::Artifact, what)],
        )
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

// ---------------------------------------------------------------------------
// Matching primitives
// ---------------------------------------------------------------------------

/// Sections (case-sensitive substrings) absent from `body`.
pub fn missing_sections(body: &str, sections: &[String]) -> Vec<Missing> {
    sections
        .iter()
        .filter(|s| !body.contains(s.as_str()))
        .map(|s| Missing::new(MissingKind::Section, s.as_str()))
        .collect()
}

/// Keywords (case-insensitive substrings) absent from `body`.
pub fn missing_keywords(body: &str, keywords: &[String], kind: MissingKind) -> Vec<Missing> {
    let body = body.to_lowercase();
    keywords
        .iter()
        .filter(|kw| !body.contains(&kw.to_lowercase()))
        .map(|kw| Missing::new(kind, kw.as_str()))
        .collect()
}

/// Required labels absent from `labels` (exact names).
pub fn missing_labels(labels: &[&str], required: &[String]) -> Vec<Missing> {
    required
        .iter()
        .filter(|r| !labels.contains(&r.as_str()))
        .map(|r| Missing::new(MissingKind::Label, r.as_str()))
        .collect()
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

// ---------------------------------------------------------------------------
// Checkers
// ---------------------------------------------------------------------------

/// Branch existence: passes only on a successful lookup.
pub fn check_branch(branch: &str, lookup: &Result<(), FetchError>) -> CheckOutcome {
    match lookup {
        Ok(()) => CheckOutcome::pass(
            CheckKind::BranchExists,
            format!("branch `{}` exists", branch),
        ),
        Err(err) => CheckOutcome::fail(
            CheckKind::BranchExists,
            format!("branch `{}` not available: {}", branch, err),
            vec![Missing::new(MissingKind::Artifact, branch)],
        ),
    }
}

/// Document completeness: the parsed table must reach `min_rows`.
pub fn check_document(rows: &[String], req: &DocumentRequirements) -> CheckOutcome {
    if rows.len() >= req.min_rows {
        CheckOutcome::pass(
            CheckKind::DocumentComplete,
            format!("document table lists {} rows", rows.len()),
        )
    } else {
        CheckOutcome::fail(
            CheckKind::DocumentComplete,
            format!(
                "document table lists {} rows, at least {} required",
                rows.len(),
                req.min_rows
            ),
            vec![Missing::new(
                MissingKind::RowCount,
                format!("{} of {} rows", rows.len(), req.min_rows),
            )],
        )
    }
}

/// Issue compliance: sections, body keywords and initial labels.
pub fn check_issue(issue: &Issue, req: &IssueRequirements) -> CheckOutcome {
    let body = issue.body_text();
    let mut missing = missing_sections(body, &req.required_sections);
    missing.extend(missing_keywords(body, &req.body_keywords, MissingKind::Keyword));
    missing.extend(missing_labels(&issue.label_names(), &req.initial_labels));

    CheckOutcome::from_missing(
        CheckKind::IssueCompliant,
        missing,
        format!("issue #{} is compliant ({})", issue.number, issue.title),
        format!("issue #{} is not compliant", issue.number),
    )
}

/// Pull request compliance: issue reference, sections, keywords and a
/// minimum label count.
pub fn check_pull_request(
    pr: &PullRequest,
    issue_number: u64,
    req: &PullRequestRequirements,
) -> CheckOutcome {
    let body = pr.body_text();
    let mut missing = Vec::new();

    let reference = render_issue_reference(&req.issue_reference, issue_number);
    if !contains_ignore_case(body, &reference) {
        missing.push(Missing::new(MissingKind::Reference, reference));
    }
    missing.extend(missing_sections(body, &req.required_sections));
    missing.extend(missing_keywords(body, &req.body_keywords, MissingKind::Keyword));
    if pr.labels.len() < req.min_labels {
        missing.push(Missing::new(
            MissingKind::LabelCount,
            format!("{} of {} labels", pr.labels.len(), req.min_labels),
        ));
    }

    CheckOutcome::from_missing(
        CheckKind::PullRequestCompliant,
        missing,
        format!("pull request #{} is compliant ({})", pr.number, pr.title),
        format!("pull request #{} is not compliant", pr.number),
    )
}

/// Issue label cross-check: the issue must carry every expected label.
pub fn check_issue_labels(issue: &Issue, expected: &[String]) -> CheckOutcome {
    let missing = missing_labels(&issue.label_names(), expected);
    let failed_detail = format!(
        "issue #{} lacks {} of {} expected labels",
        issue.number,
        missing.len(),
        expected.len()
    );
    CheckOutcome::from_missing(
        CheckKind::IssueLabels,
        missing,
        format!(
            "issue #{} carries all {} expected labels",
            issue.number,
            expected.len()
        ),
        failed_detail,
    )
}

/// What one comment lacks: PR reference, keywords, content flags.
fn comment_gaps(comment: &Comment, reference: &str, req: &CommentRequirements) -> Vec<Missing> {
    let body = comment.body_text();
    let mut gaps = Vec::new();
    if !contains_ignore_case(body, reference) {
        gaps.push(Missing::new(MissingKind::Reference, reference));
    }
    gaps.extend(missing_keywords(body, &req.keywords, MissingKind::Keyword));
    gaps.extend(missing_keywords(
        body,
        &req.content_flags,
        MissingKind::ContentFlag,
    ));
    gaps
}

/// Comment compliance: one single comment must hold the PR reference, every
/// keyword and every content flag.
///
/// On failure the gaps of the closest comment are reported.
pub fn check_comments(
    comments: &[Comment],
    issue_number: u64,
    pr_number: u64,
    req: &CommentRequirements,
) -> CheckOutcome {
    let reference = render_pr_reference(&req.pr_reference, pr_number);

    let closest = comments
        .iter()
        .map(|c| comment_gaps(c, &reference, req))
        .min_by_key(|gaps| gaps.len());

    match closest {
        Some(gaps) if gaps.is_empty() => CheckOutcome::pass(
            CheckKind::CommentCompliant,
            format!(
                "issue #{} has a compliant comment referencing {}",
                issue_number, reference
            ),
        ),
        Some(gaps) => CheckOutcome::fail(
            CheckKind::CommentCompliant,
            format!(
                "none of {} comments on issue #{} satisfies every requirement",
                comments.len(),
                issue_number
            ),
            gaps,
        ),
        None => CheckOutcome::fail(
            CheckKind::CommentCompliant,
            format!("issue #{} has no comments", issue_number),
            vec![Missing::new(
                MissingKind::Comment,
                format!("comment referencing {}", reference),
            )],
        ),
    }
}

/// Document/entry cross-check: every expected entry must be a parsed row.
/// Rows nobody expected are reported as warnings.
pub fn check_document_entries(rows: &[String], req: &DocumentRequirements) -> CheckOutcome {
    let missing: Vec<Missing> = req
        .expected_entries
        .iter()
        .filter(|e| !rows.contains(e))
        .map(|e| Missing::new(MissingKind::Entry, e.as_str()))
        .collect();

    let warnings: Vec<String> = rows
        .iter()
        .filter(|r| !req.expected_entries.contains(r))
        .map(|r| format!("document lists unexpected entry `{}`", r))
        .collect();

    let failed_detail = format!(
        "{} of {} expected entries missing from the document",
        missing.len(),
        req.expected_entries.len()
    );
    CheckOutcome::from_missing(
        CheckKind::DocumentEntries,
        missing,
        format!(
            "all {} expected entries present in the document",
            req.expected_entries.len()
        ),
        failed_detail,
    )
    .with_warnings(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn issue_req() -> IssueRequirements {
        IssueRequirements {
            title_keywords: strings(&["Implement CI/CD workflow"]),
            body_keywords: strings(&["automate", "CI/CD pipeline"]),
            required_sections: strings(&["## Problem Statement", "## Proposed Solution"]),
            initial_labels: strings(&["enhancement", "automation", "workflow"]),
            expected_labels: strings(&["enhancement", "automation", "workflow", "ci-cd"]),
        }
    }

    fn pr_req() -> PullRequestRequirements {
        PullRequestRequirements {
            title_keywords: strings(&["Add CI/CD workflow"]),
            body_keywords: strings(&["workflow implementation"]),
            required_sections: strings(&["## Summary", "## Testing"]),
            min_labels: 2,
            issue_reference: "Closes #{issue_number}".to_string(),
        }
    }

    fn comment_req() -> CommentRequirements {
        CommentRequirements {
            keywords: strings(&["workflow implemented", "pipeline tested"]),
            pr_reference: "PR #{pr_number}".to_string(),
            content_flags: strings(&["8 steps", "success rate"]),
        }
    }

    const ISSUE_BODY: &str = "## Problem Statement\nWe need to AUTOMATE releases.\n\
        ## Proposed Solution\nA ci/cd pipeline.";

    #[test]
    fn test_check_kind_order_matches_steps() {
        for (idx, kind) in CheckKind::ALL.iter().enumerate() {
            assert_eq!(kind.step(), idx + 1);
        }
    }

    #[test]
    fn test_branch_lookup_failure_fails() {
        let outcome = check_branch(
            "feature/x",
            &Err(FetchError::NotFound {
                endpoint: "branches/feature/x".to_string(),
            }),
        );
        assert!(!outcome.passed);
        assert_eq!(outcome.missing[0].item, "feature/x");
        assert!(check_branch("feature/x", &Ok(())).passed);
    }

    #[test]
    fn test_document_row_minimum() {
        let req = DocumentRequirements {
            table_header: "| Step |".to_string(),
            min_rows: 5,
            expected_entries: Vec::new(),
        };
        let rows = strings(&["a", "b", "c", "d"]);
        let outcome = check_document(&rows, &req);
        assert!(!outcome.passed);
        assert!(outcome.detail.contains("4 rows"));

        let rows = strings(&["a", "b", "c", "d", "e"]);
        assert!(check_document(&rows, &req).passed);
    }

    #[test]
    fn test_compliant_issue_passes() {
        let issue = Issue::new(
            3,
            "Implement CI/CD workflow",
            ISSUE_BODY,
            &["enhancement", "automation", "workflow"],
        );
        let outcome = check_issue(&issue, &issue_req());
        assert!(outcome.passed, "{:?}", outcome.missing);
    }

    #[test]
    fn test_issue_missing_single_label_named() {
        let issue = Issue::new(3, "t", ISSUE_BODY, &["enhancement", "workflow"]);
        let outcome = check_issue(&issue, &issue_req());
        assert!(!outcome.passed);
        assert_eq!(
            outcome.missing,
            vec![Missing::new(MissingKind::Label, "automation")]
        );
    }

    #[test]
    fn test_section_match_is_case_sensitive() {
        let body = ISSUE_BODY.replace("## Proposed Solution", "## proposed solution");
        let issue = Issue::new(3, "t", &body, &["enhancement", "automation", "workflow"]);
        let outcome = check_issue(&issue, &issue_req());
        assert_eq!(
            outcome.missing,
            vec![Missing::new(MissingKind::Section, "## Proposed Solution")]
        );
    }

    #[test]
    fn test_label_match_is_case_sensitive() {
        let labels = ["Enhancement", "automation", "workflow"];
        let issue = Issue::new(3, "t", ISSUE_BODY, &labels);
        let outcome = check_issue(&issue, &issue_req());
        assert_eq!(
            outcome.missing,
            vec![Missing::new(MissingKind::Label, "enhancement")]
        );
    }

    #[test]
    fn test_null_body_reports_every_requirement() {
        let mut issue = Issue::new(3, "t", "", &["enhancement", "automation", "workflow"]);
        issue.body = None;
        let outcome = check_issue(&issue, &issue_req());
        assert_eq!(outcome.missing.len(), 4);
    }

    #[test]
    fn test_adding_missing_item_only_helps() {
        let req = issue_req();
        let mut body = String::from("## Problem Statement\n");
        let labels = ["enhancement", "automation", "workflow"];
        let mut last = check_issue(&Issue::new(1, "t", &body, &labels), &req)
            .missing
            .len();
        for extra in ["automate", "## Proposed Solution", "CI/CD pipeline"] {
            body.push_str(extra);
            body.push('\n');
            let now = check_issue(&Issue::new(1, "t", &body, &labels), &req)
                .missing
                .len();
            assert!(now < last);
            last = now;
        }
        assert_eq!(last, 0);
    }

    #[test]
    fn test_pull_request_reference_ignores_case() {
        let pr = PullRequest::new(
            8,
            "Add CI/CD workflow",
            "## Summary\ncloses #3\n## Testing\nWorkflow implementation done",
            &["a", "b"],
        );
        assert!(check_pull_request(&pr, 3, &pr_req()).passed);
    }

    #[test]
    fn test_pull_request_wrong_issue_number() {
        let pr = PullRequest::new(
            8,
            "Add CI/CD workflow",
            "## Summary\nCloses #4\n## Testing\nworkflow implementation",
            &["a", "b"],
        );
        let outcome = check_pull_request(&pr, 3, &pr_req());
        assert_eq!(
            outcome.missing,
            vec![Missing::new(MissingKind::Reference, "Closes #3")]
        );
    }

    #[test]
    fn test_pull_request_label_count() {
        let pr = PullRequest::new(
            8,
            "Add CI/CD workflow",
            "## Summary\nCloses #3\n## Testing\nworkflow implementation",
            &["only-one"],
        );
        let outcome = check_pull_request(&pr, 3, &pr_req());
        assert_eq!(outcome.missing.len(), 1);
        assert_eq!(outcome.missing[0].kind, MissingKind::LabelCount);
    }

    #[test]
    fn test_issue_labels_superset() {
        let req = issue_req();
        let issue = Issue::new(
            3,
            "t",
            "",
            &["enhancement", "automation", "workflow", "ci-cd", "extra"],
        );
        assert!(check_issue_labels(&issue, &req.expected_labels).passed);

        let issue = Issue::new(3, "t", "", &["enhancement", "automation", "workflow"]);
        let outcome = check_issue_labels(&issue, &req.expected_labels);
        assert_eq!(
            outcome.missing,
            vec![Missing::new(MissingKind::Label, "ci-cd")]
        );
    }

    #[test]
    fn test_single_comment_must_hold_everything() {
        let comments = vec![
            Comment::new("Done in PR #8"),
            Comment::new("Workflow implemented, pipeline tested: 8 steps, success rate 100%"),
        ];
        let outcome = check_comments(&comments, 3, 8, &comment_req());
        assert!(!outcome.passed);
        assert_eq!(
            outcome.missing,
            vec![Missing::new(MissingKind::Reference, "PR #8")]
        );
    }

    #[test]
    fn test_compliant_comment_passes() {
        let comments = vec![
            Comment::new("LGTM"),
            Comment::new(
                "pr #8 merged. Workflow implemented and pipeline tested, 8 steps, success rate 99%",
            ),
        ];
        assert!(check_comments(&comments, 3, 8, &comment_req()).passed);
    }

    #[test]
    fn test_no_comments_fails() {
        let outcome = check_comments(&[], 3, 8, &comment_req());
        assert!(!outcome.passed);
        assert_eq!(outcome.missing[0].kind, MissingKind::Comment);
    }

    #[test]
    fn test_document_entries_warn_on_unexpected() {
        let req = DocumentRequirements {
            table_header: "| Step |".to_string(),
            min_rows: 1,
            expected_entries: strings(&["Unit testing", "Deploy staging"]),
        };
        let rows = strings(&["Unit testing", "Deploy staging", "Smoke test"]);
        let outcome = check_document_entries(&rows, &req);
        assert!(outcome.passed);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("Smoke test"));
    }

    #[test]
    fn test_document_entries_exact_match() {
        let req = DocumentRequirements {
            table_header: "| Step |".to_string(),
            min_rows: 1,
            expected_entries: strings(&["Unit testing"]),
        };
        let rows = strings(&["unit testing"]);
        let outcome = check_document_entries(&rows, &req);
        assert!(!outcome.passed);
        assert_eq!(
            outcome.missing,
            vec![Missing::new(MissingKind::Entry, "Unit testing")]
        );
    }
}
