//! GitHub REST client
//!
//! Implements [`ArtifactSource`] over HTTPS with token authentication.
//! Requests are issued one at a time, are never retried, and carry an
//! explicit timeout.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{StatusCode, Url};
use serde_json::Value;
use tracing::debug;

use crate::config::{ApiSettings, Credentials};
use crate::error::{FetchError, FetchResult, GateError, Result};
use crate::obs;
use crate::source::{ArtifactSource, Endpoint};

/// REST client bound to one `org/repo`.
pub struct GithubClient {
    http_client: reqwest::Client,
    /// `{base}/{org}/{repo}`, with each segment escaped.
    repo_url: Url,
}

impl GithubClient {
    /// Build a client for `credentials.org/repo`.
    pub fn new(credentials: &Credentials, repo: &str, api: &ApiSettings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("token {}", credentials.token))
            .map_err(|_| GateError::HttpClient("token contains invalid characters".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_str(&api.accept)
                .map_err(|e| GateError::HttpClient(format!("invalid accept header: {}", e)))?,
        );

        let http_client = reqwest::Client::builder()
            .user_agent(api.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()
            .map_err(|e| GateError::HttpClient(e.to_string()))?;

        let mut repo_url = Url::parse(&api.base_url)
            .map_err(|e| GateError::HttpClient(format!("invalid api base url: {}", e)))?;
        repo_url
            .path_segments_mut()
            .map_err(|_| {
                GateError::HttpClient(format!("api base url cannot carry a path: {}", api.base_url))
            })?
            .pop_if_empty()
            .extend([credentials.org.as_str(), repo]);

        Ok(GithubClient {
            http_client,
            repo_url,
        })
    }

    /// Absolute URL for an endpoint of the bound repository.
    pub fn url_for(&self, endpoint: &Endpoint) -> FetchResult<Url> {
        let mut url = self.repo_url.clone();
        endpoint
            .append_to(&mut url)
            .map_err(|_| FetchError::Transport {
                endpoint: endpoint.to_string(),
                message: "api base url cannot carry a path".to_string(),
            })?;
        Ok(url)
    }
}

/// Map a non-success status onto a fetch error; `None` for 200.
pub fn classify_status(endpoint: &str, status: StatusCode) -> Option<FetchError> {
    match status {
        StatusCode::OK => None,
        StatusCode::NOT_FOUND => Some(FetchError::NotFound {
            endpoint: endpoint.to_string(),
        }),
        other => Some(FetchError::Status {
            endpoint: endpoint.to_string(),
            status: other.as_u16(),
        }),
    }
}

#[async_trait]
impl ArtifactSource for GithubClient {
    async fn get(&self, endpoint: &Endpoint) -> FetchResult<Value> {
        let name = endpoint.to_string();

        let result = async {
            let url = self.url_for(endpoint)?;
            debug!(url = %url, "GET");

            let response = self.http_client.get(url).send().await.map_err(|e| {
                FetchError::Transport {
                    endpoint: name.clone(),
                    message: e.to_string(),
                }
            })?;

            if let Some(err) = classify_status(&name, response.status()) {
                return Err(err);
            }

            response.json::<Value>().await.map_err(|e| FetchError::Decode {
                endpoint: name.clone(),
                message: e.to_string(),
            })
        }
        .await;

        if let Err(ref err) = result {
            obs::emit_fetch_failed(&name, err);
        }
        result
    }
}
