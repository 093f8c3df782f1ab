//! Compliance configuration.
//!
//! A [`ComplianceConfig`] describes what "compliant" means for one target
//! repository: which branch and document to inspect, what the tracking issue
//! and pull request must contain, and what the closing comment must say. It is
//! an immutable value handed to the pipeline; nothing here is process-wide.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{GateError, Result};

/// Placeholder substituted with the discovered issue number.
pub const ISSUE_NUMBER_PLACEHOLDER: &str = "{issue_number}";

/// Placeholder substituted with the discovered pull request number.
pub const PR_NUMBER_PLACEHOLDER: &str = "{pr_number}";

/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Environment variable holding the organization or owner.
pub const ORG_ENV: &str = "GITHUB_ORG";

const DEFAULT_API_BASE: &str = "https://api.github.com/repos";
const DEFAULT_ACCEPT: &str = "application/vnd.github.v3+json";

// ---------------------------------------------------------------------------
// Requirement sets
// ---------------------------------------------------------------------------

/// Target repository, relative to the organization from the environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepositorySettings {
    pub name: String,
}

/// Branch that must exist and the document it must carry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BranchRequirements {
    pub name: String,
    pub doc_file: String,
}

/// How the document table is located and what it must list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentRequirements {
    /// Line (matched as a substring) that opens the table.
    pub table_header: String,
    /// Fewest parsed rows that count as complete.
    pub min_rows: usize,
    /// Row names that must all appear in the table.
    #[serde(default)]
    pub expected_entries: Vec<String>,
}

/// What the tracking issue must contain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueRequirements {
    pub title_keywords: Vec<String>,
    #[serde(default)]
    pub body_keywords: Vec<String>,
    #[serde(default)]
    pub required_sections: Vec<String>,
    /// Labels applied when the issue was opened.
    #[serde(default)]
    pub initial_labels: Vec<String>,
    /// Full label set the issue must carry by the end of the workflow.
    #[serde(default)]
    pub expected_labels: Vec<String>,
}

/// What the pull request must contain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PullRequestRequirements {
    pub title_keywords: Vec<String>,
    #[serde(default)]
    pub body_keywords: Vec<String>,
    #[serde(default)]
    pub required_sections: Vec<String>,
    #[serde(default)]
    pub min_labels: usize,
    /// Issue reference template, e.g. `Closes #{issue_number}`.
    pub issue_reference: String,
}

/// What at least one issue comment must contain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommentRequirements {
    #[serde(default)]
    pub keywords: Vec<String>,
    /// PR reference template, e.g. `PR #{pr_number}`.
    pub pr_reference: String,
    #[serde(default)]
    pub content_flags: Vec<String>,
}

/// Remote API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApiSettings {
    /// Base URL; requests go to `<base_url>/{org}/{repo}/{endpoint}`.
    pub base_url: String,
    pub accept: String,
    pub user_agent: String,
    /// Listing page size.
    pub per_page: u32,
    /// Pages walked per listing before giving up.
    pub max_pages: u32,
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            accept: DEFAULT_ACCEPT.to_string(),
            user_agent: format!("repogate/{}", crate::VERSION),
            per_page: 30,
            max_pages: 1,
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// ComplianceConfig
// ---------------------------------------------------------------------------

/// Complete checklist for one repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComplianceConfig {
    pub repository: RepositorySettings,
    pub branch: BranchRequirements,
    pub document: DocumentRequirements,
    pub issue: IssueRequirements,
    pub pull_request: PullRequestRequirements,
    pub comment: CommentRequirements,
    #[serde(default)]
    pub api: ApiSettings,
}

/// Built-in checklists.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// CI/CD workflow documentation procedure.
    Workflow,
    /// Label color standardization procedure.
    Labels,
}

impl Preset {
    pub fn name(&self) -> &'static str {
        match self {
            Preset::Workflow => "workflow",
            Preset::Labels => "labels",
        }
    }

    pub fn config(&self) -> ComplianceConfig {
        match self {
            Preset::Workflow => ComplianceConfig::workflow_compliance(),
            Preset::Labels => ComplianceConfig::label_standardization(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl ComplianceConfig {
    /// Checklist for the CI/CD workflow documentation procedure.
    pub fn workflow_compliance() -> Self {
        Self {
            repository: RepositorySettings {
                name: "label-project".to_string(),
            },
            branch: BranchRequirements {
                name: "feature/ci-cd-workflow".to_string(),
                doc_file: "docs/workflow-compliance.md".to_string(),
            },
            document: DocumentRequirements {
                table_header: "| Workflow Step | Status | Owner |".to_string(),
                min_rows: 5,
                expected_entries: strings(&[
                    "Code checkout",
                    "Dependency installation",
                    "Unit testing",
                    "Integration testing",
                    "Build artifact",
                    "Deploy staging",
                    "Deploy production",
                    "Health check",
                ]),
            },
            issue: IssueRequirements {
                title_keywords: strings(&["Implement CI/CD workflow", "Workflow automation"]),
                body_keywords: strings(&["automate", "CI/CD workflow", "CI/CD pipeline"]),
                required_sections: strings(&[
                    "## Problem Statement",
                    "## Proposed Solution",
                    "## Implementation Plan",
                ]),
                initial_labels: strings(&["enhancement", "automation"]),
                expected_labels: strings(&["workflow", "automation", "ci-cd", "enhancement"]),
            },
            pull_request: PullRequestRequirements {
                title_keywords: strings(&["Add CI/CD workflow", "Workflow implementation"]),
                body_keywords: strings(&[
                    "workflow implementation",
                    "reference issue #",
                    "CI/CD pipeline",
                ]),
                required_sections: strings(&["## Summary", "## Changes", "## Testing"]),
                min_labels: 3,
                issue_reference: "Closes #{issue_number}".to_string(),
            },
            comment: CommentRequirements {
                keywords: strings(&[
                    "workflow implemented",
                    "pipeline tested",
                    "deployment verified",
                ]),
                pr_reference: "PR #{pr_number}".to_string(),
                content_flags: strings(&["8 steps", "all environments", "success rate"]),
            },
            api: ApiSettings::default(),
        }
    }

    /// Checklist for the label color standardization procedure.
    pub fn label_standardization() -> Self {
        let standard_labels = strings(&[
            "bug",
            "enhancement",
            "documentation",
            "feature",
            "bug-critical",
            "bug-major",
            "bug-minor",
            "task",
            "question",
            "help-wanted",
            "good-first-issue",
            "priority-high",
            "priority-medium",
            "priority-low",
            "status-in-progress",
            "status-review",
            "status-done",
            "status-blocked",
            "component-frontend",
            "component-backend",
            "component-db",
            "wontfix",
        ]);

        Self {
            repository: RepositorySettings {
                name: "label-project".to_string(),
            },
            branch: BranchRequirements {
                name: "main".to_string(),
                doc_file: "docs/label-color-standardization.md".to_string(),
            },
            document: DocumentRequirements {
                table_header: "| Label Name | Color Hex | Category |".to_string(),
                min_rows: 22,
                expected_entries: standard_labels.clone(),
            },
            issue: IssueRequirements {
                title_keywords: strings(&["Document label color standard", "Label organization"]),
                body_keywords: strings(&[
                    "label color documentation",
                    "standardize label colors",
                    "label category definition",
                ]),
                required_sections: strings(&[
                    "## Background",
                    "## Required Label List",
                    "## Color Standard Rules",
                ]),
                initial_labels: strings(&["documentation", "enhancement"]),
                expected_labels: standard_labels,
            },
            pull_request: PullRequestRequirements {
                title_keywords: strings(&["Add label color standard doc", "Label standardization"]),
                body_keywords: strings(&[
                    "label color doc",
                    "reference issue #",
                    "label list verification",
                ]),
                required_sections: strings(&["## Summary", "## Doc Content", "## Issue Reference"]),
                min_labels: 5,
                issue_reference: "Fixes #{issue_number}".to_string(),
            },
            comment: CommentRequirements {
                keywords: strings(&[
                    "label documentation completed",
                    "total labels verified",
                    "color standard applied",
                ]),
                pr_reference: "PR #{pr_number}".to_string(),
                content_flags: strings(&["22 labels", "color hex checked", "category mapped"]),
            },
            api: ApiSettings::default(),
        }
    }

    /// Parse a TOML document and validate it.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Override the target repository name.
    pub fn with_repository(mut self, name: &str) -> Self {
        self.repository.name = name.to_string();
        self
    }

    /// Reject configurations the pipeline cannot evaluate meaningfully.
    pub fn validate(&self) -> Result<()> {
        let require = |ok: bool, msg: &str| -> Result<()> {
            if ok {
                Ok(())
            } else {
                Err(GateError::InvalidConfig(msg.to_string()))
            }
        };

        require(!self.repository.name.trim().is_empty(), "repository.name is empty")?;
        require(!self.branch.name.trim().is_empty(), "branch.name is empty")?;
        require(!self.branch.doc_file.trim().is_empty(), "branch.doc_file is empty")?;
        require(
            !self.document.table_header.trim().is_empty(),
            "document.table_header is empty",
        )?;
        require(
            !self.issue.title_keywords.is_empty(),
            "issue.title_keywords must list at least one keyword",
        )?;
        require(
            !self.pull_request.title_keywords.is_empty(),
            "pull_request.title_keywords must list at least one keyword",
        )?;
        require(
            self.pull_request
                .issue_reference
                .contains(ISSUE_NUMBER_PLACEHOLDER),
            "pull_request.issue_reference must contain {issue_number}",
        )?;
        require(
            self.comment.pr_reference.contains(PR_NUMBER_PLACEHOLDER),
            "comment.pr_reference must contain {pr_number}",
        )?;
        require(
            (1..=100).contains(&self.api.per_page),
            "api.per_page must be between 1 and 100",
        )?;
        require(self.api.max_pages > 0, "api.max_pages must be at least 1")?;
        require(self.api.timeout_secs > 0, "api.timeout_secs must be at least 1")?;
        Ok(())
    }

    /// SHA-256 of the canonical JSON encoding, identifying the checklist.
    pub fn digest(&self) -> Result<String> {
        let canonical = serde_json::to_vec(self)?;
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Fill `{issue_number}` in an issue reference template.
pub fn render_issue_reference(template: &str, issue_number: u64) -> String {
    template.replace(ISSUE_NUMBER_PLACEHOLDER, &issue_number.to_string())
}

/// Fill `{pr_number}` in a PR reference template.
pub fn render_pr_reference(template: &str, pr_number: u64) -> String {
    template.replace(PR_NUMBER_PLACEHOLDER, &pr_number.to_string())
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// API credential and the organization that owns the target repository.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub org: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("org", &self.org)
            .finish()
    }
}

impl Credentials {
    pub fn new(token: &str, org: &str) -> Self {
        Self {
            token: token.to_string(),
            org: org.to_string(),
        }
    }

    /// Read `GITHUB_TOKEN` and `GITHUB_ORG` from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve credentials through an arbitrary variable lookup.
    ///
    /// Unset and blank values are both reported as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| GateError::MissingCredential(key.to_string()))
        };
        let token = read(TOKEN_ENV)?;
        let org = read(ORG_ENV)?;
        Ok(Self { token, org })
    }
}
