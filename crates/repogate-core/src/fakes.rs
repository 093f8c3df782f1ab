//! In-memory fake of the remote API (testing and offline runs).
//!
//! [`MemorySource`] answers [`ArtifactSource::get`] from a table of canned
//! responses and records every endpoint it was asked for, so tests can assert
//! which requests a run made.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::ApiSettings;
use crate::error::{FetchError, FetchResult};
use crate::model::{Comment, FileContent, Issue, PullRequest};
use crate::source::{endpoints, ArtifactSource, Endpoint};

/// Canned-response [`ArtifactSource`].
///
/// Unregistered listing endpoints (issues, pulls, comments) answer with an
/// empty array, like a repository that has none. Any other unregistered
/// endpoint answers [`FetchError::NotFound`].
#[derive(Debug, Default)]
pub struct MemorySource {
    responses: HashMap<String, FetchResult<Value>>,
    calls: Mutex<Vec<String>>,
    per_page: u32,
}

impl MemorySource {
    pub fn new() -> Self {
        Self {
            per_page: ApiSettings::default().per_page,
            ..Self::default()
        }
    }

    pub fn with_json(mut self, endpoint: &Endpoint, value: Value) -> Self {
        self.responses.insert(endpoint.to_string(), Ok(value));
        self
    }

    pub fn with_error(mut self, endpoint: &Endpoint, error: FetchError) -> Self {
        self.responses.insert(endpoint.to_string(), Err(error));
        self
    }

    pub fn with_branch(self, name: &str) -> Self {
        let endpoint = endpoints::branch(name);
        self.with_json(&endpoint, json!({ "name": name, "protected": false }))
    }

    pub fn with_file(self, path: &str, git_ref: &str, text: &str) -> Self {
        let endpoint = endpoints::contents(path, git_ref);
        let payload = serde_json::to_value(FileContent::encode(path, text))
            .unwrap_or(Value::Null);
        self.with_json(&endpoint, payload)
    }

    /// First page of the issue listing for `state`.
    pub fn with_issues(self, state: &str, issues: Vec<Issue>) -> Self {
        let endpoint = endpoints::issues(state, self.per_page, 1);
        let payload = serde_json::to_value(issues).unwrap_or(Value::Null);
        self.with_json(&endpoint, payload)
    }

    /// First page of the pull request listing for `state`.
    pub fn with_pulls(self, state: &str, pulls: Vec<PullRequest>) -> Self {
        let endpoint = endpoints::pulls(state, self.per_page, 1);
        let payload = serde_json::to_value(pulls).unwrap_or(Value::Null);
        self.with_json(&endpoint, payload)
    }

    /// First page of the comments on `issue_number`.
    pub fn with_comments(self, issue_number: u64, comments: Vec<Comment>) -> Self {
        let endpoint = endpoints::issue_comments(issue_number, self.per_page, 1);
        let payload = serde_json::to_value(comments).unwrap_or(Value::Null);
        self.with_json(&endpoint, payload)
    }

    /// Endpoints requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactSource for MemorySource {
    async fn get(&self, endpoint: &Endpoint) -> FetchResult<Value> {
        let key = endpoint.to_string();
        self.calls.lock().unwrap().push(key.clone());
        match self.responses.get(&key) {
            Some(response) => response.clone(),
            None if endpoint.is_listing() => Ok(json!([])),
            None => Err(FetchError::NotFound {
                endpoint: endpoint.to_string(),
            }),
        }
    }
}
