//! Read-only snapshots of the artifacts fetched during one run.
//!
//! Shapes follow the REST payloads closely enough to deserialize them
//! directly; unknown fields are ignored.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{FetchError, FetchResult};

/// Where artifacts are fetched from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepositoryRef {
    pub org: String,
    pub repo: String,
    pub branch: String,
}

impl RepositoryRef {
    pub fn new(org: &str, repo: &str, branch: &str) -> Self {
        Self {
            org: org.to_string(),
            repo: repo.to_string(),
            branch: branch.to_string(),
        }
    }

    /// `org/repo` slug.
    pub fn slug(&self) -> String {
        format!("{}/{}", self.org, self.repo)
    }
}

impl std::fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}@{}", self.org, self.repo, self.branch)
    }
}

/// Issue or pull request label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Label {
    pub name: String,
}

impl Label {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

/// Anything discovery can match by title.
pub trait Titled {
    fn title(&self) -> &str;
    fn number(&self) -> u64;
}

/// Issue snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Issue {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub state: Option<String>,
    /// Present when the listing entry is really a pull request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<serde_json::Value>,
}

impl Issue {
    pub fn new(number: u64, title: &str, body: &str, labels: &[&str]) -> Self {
        Self {
            number,
            title: title.to_string(),
            body: Some(body.to_string()),
            labels: labels.iter().map(|l| Label::new(l)).collect(),
            state: None,
            pull_request: None,
        }
    }

    /// Body text; a null body reads as empty.
    pub fn body_text(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }

    pub fn label_names(&self) -> Vec<&str> {
        self.labels.iter().map(|l| l.name.as_str()).collect()
    }

    /// Issue listings also return pull requests; those carry a
    /// `pull_request` key.
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

impl Titled for Issue {
    fn title(&self) -> &str {
        &self.title
    }

    fn number(&self) -> u64 {
        self.number
    }
}

/// Pull request snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub state: Option<String>,
}

impl PullRequest {
    pub fn new(number: u64, title: &str, body: &str, labels: &[&str]) -> Self {
        Self {
            number,
            title: title.to_string(),
            body: Some(body.to_string()),
            labels: labels.iter().map(|l| Label::new(l)).collect(),
            state: None,
        }
    }

    pub fn body_text(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }
}

impl Titled for PullRequest {
    fn title(&self) -> &str {
        &self.title
    }

    fn number(&self) -> u64 {
        self.number
    }
}

/// Issue comment snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub body: Option<String>,
}

impl Comment {
    pub fn new(body: &str) -> Self {
        Self {
            id: 0,
            body: Some(body.to_string()),
        }
    }

    pub fn body_text(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }
}

/// Repository file payload from the contents endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileContent {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
    /// Base64 body, wrapped with newlines by the API.
    #[serde(default)]
    pub content: Option<String>,
}

impl FileContent {
    /// Build a payload the way the API would return `text`.
    pub fn encode(path: &str, text: &str) -> Self {
        Self {
            path: Some(path.to_string()),
            encoding: Some("base64".to_string()),
            content: Some(STANDARD.encode(text.as_bytes())),
        }
    }

    /// Decode the body as UTF-8 text.
    ///
    /// Returns `Ok(None)` when the payload carries no content at all.
    pub fn decode(&self, endpoint: &str) -> FetchResult<Option<String>> {
        let Some(raw) = self.content.as_deref() else {
            return Ok(None);
        };
        let compact: String = raw.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        if compact.is_empty() {
            return Ok(None);
        }

        let bytes = STANDARD.decode(compact).map_err(|e| FetchError::Decode {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;
        let text = String::from_utf8(bytes).map_err(|e| FetchError::Decode {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;
        Ok(Some(text))
    }
}
