//! repogate core library
//!
//! Declarative compliance gate for the collaboration artifacts of one
//! repository: a feature branch, a Markdown document table, a tracking
//! issue, a pull request and a closing comment. A [`ComplianceConfig`]
//! describes what must exist; [`CompliancePipeline`] checks it fail-fast
//! against an [`ArtifactSource`] and returns a structured [`PipelineResult`].

pub mod checks;
pub mod config;
pub mod error;
pub mod fakes;
pub mod github;
pub mod model;
pub mod obs;
pub mod pipeline;
pub mod report;
pub mod source;
pub mod table;
pub mod telemetry;

pub use checks::{CheckKind, CheckOutcome, Missing, MissingKind};
pub use config::{
    ApiSettings, BranchRequirements, CommentRequirements, ComplianceConfig, Credentials,
    DocumentRequirements, IssueRequirements, Preset, PullRequestRequirements,
    RepositorySettings,
};
pub use error::{FetchError, FetchResult, GateError, Result};
pub use fakes::MemorySource;
pub use github::GithubClient;
pub use model::{Comment, FileContent, Issue, Label, PullRequest, RepositoryRef};
pub use pipeline::{ArtifactSummary, CompliancePipeline, PipelineResult, PipelineState, RunSummary};
pub use report::{render_json, render_text, ReportFormat};
pub use source::{ArtifactSource, Endpoint, RepoApi};
pub use table::parse_table;
pub use telemetry::init_tracing;

/// Crate version, reported by the CLI and sent in the user agent.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
