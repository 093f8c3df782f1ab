//! Remote artifact access.
//!
//! [`ArtifactSource`] is the raw collaborator: one GET against an endpoint of
//! the target repository, returning parsed JSON. [`RepoApi`] layers the typed
//! operations the pipeline needs on top of it (branch lookup, file content,
//! paginated listings, comment listing and title-keyword discovery).

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::ApiSettings;
use crate::error::{FetchError, FetchResult};
use crate::model::{Comment, FileContent, Issue, PullRequest, Titled};

/// Listing states scanned by discovery, in order.
pub const DISCOVERY_STATES: [&str; 2] = ["open", "closed"];

/// Fetches JSON from endpoints relative to one repository.
///
/// Implementations resolve `endpoint` against `<base>/{org}/{repo}/` and map
/// a 404 to [`FetchError::NotFound`]; any other non-200 outcome is an error.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    async fn get(&self, endpoint: &Endpoint) -> FetchResult<Value>;
}

/// Request target relative to one repository: raw path segments plus query
/// pairs. Nothing is escaped until the endpoint is appended to a URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    segments: Vec<String>,
    query: Vec<(String, String)>,
}

impl Endpoint {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
        }
    }

    pub fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Paginated listings carry a `page` parameter.
    pub fn is_listing(&self) -> bool {
        self.query.iter().any(|(key, _)| key == "page")
    }

    /// Append the segments to `url`'s path and the pairs to its query, each
    /// percent-encoded. Fails only for URLs that cannot carry a path.
    pub(crate) fn append_to(&self, url: &mut Url) -> Result<(), ()> {
        url.path_segments_mut()?
            .pop_if_empty()
            .extend(self.segments.iter());
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        Ok(())
    }
}

/// Encoded relative form, e.g. `contents/docs/a.md?ref=feature%2Fx`.
impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut url = Url::parse("http://repo.invalid/").map_err(|_| std::fmt::Error)?;
        self.append_to(&mut url).map_err(|_| std::fmt::Error)?;
        let path = url.path().trim_start_matches('/');
        match url.query() {
            Some(query) => write!(f, "{}?{}", path, query),
            None => f.write_str(path),
        }
    }
}

/// Endpoints the pipeline requests, shared by real and fake sources.
pub mod endpoints {
    use super::Endpoint;

    /// Splits on `/` so nested paths and slashed branch names keep their
    /// separators; each piece is escaped on its own.
    fn path<'a>(prefix: &'a str, rest: &'a str) -> impl Iterator<Item = &'a str> {
        std::iter::once(prefix).chain(rest.split('/').filter(|s| !s.is_empty()))
    }

    pub fn branch(name: &str) -> Endpoint {
        Endpoint::new(path("branches", name))
    }

    pub fn contents(file_path: &str, git_ref: &str) -> Endpoint {
        Endpoint::new(path("contents", file_path)).with_query("ref", git_ref)
    }

    pub fn issues(state: &str, per_page: u32, page: u32) -> Endpoint {
        Endpoint::new(["issues"])
            .with_query("state", state)
            .with_query("per_page", per_page)
            .with_query("page", page)
    }

    pub fn pulls(state: &str, per_page: u32, page: u32) -> Endpoint {
        Endpoint::new(["pulls"])
            .with_query("state", state)
            .with_query("per_page", per_page)
            .with_query("page", page)
    }

    pub fn issue_comments(issue_number: u64, per_page: u32, page: u32) -> Endpoint {
        Endpoint::new(["issues", issue_number.to_string().as_str(), "comments"])
            .with_query("per_page", per_page)
            .with_query("page", page)
    }
}

/// True when `title` contains every keyword, ignoring case.
pub fn title_matches(title: &str, keywords: &[String]) -> bool {
    let title = title.to_lowercase();
    keywords
        .iter()
        .all(|kw| title.contains(&kw.to_lowercase()))
}

/// First item in listing order whose title matches all keywords.
pub fn first_title_match<'a, T: Titled>(items: &'a [T], keywords: &[String]) -> Option<&'a T> {
    items.iter().find(|item| title_matches(item.title(), keywords))
}

fn decode<T: DeserializeOwned>(endpoint: &Endpoint, value: Value) -> FetchResult<T> {
    serde_json::from_value(value).map_err(|e| FetchError::Decode {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}

/// Typed repository operations over an [`ArtifactSource`].
pub struct RepoApi<'a> {
    source: &'a dyn ArtifactSource,
    per_page: u32,
    max_pages: u32,
}

impl<'a> RepoApi<'a> {
    pub fn new(source: &'a dyn ArtifactSource, api: &ApiSettings) -> Self {
        Self {
            source,
            per_page: api.per_page.max(1),
            max_pages: api.max_pages.max(1),
        }
    }

    /// Succeeds iff the branch lookup returns the branch.
    pub async fn branch_exists(&self, name: &str) -> FetchResult<()> {
        self.source.get(&endpoints::branch(name)).await.map(|_| ())
    }

    /// Decoded text of `path` at `git_ref`.
    ///
    /// A payload without content is reported as a decode failure.
    pub async fn file_content(&self, path: &str, git_ref: &str) -> FetchResult<String> {
        let endpoint = endpoints::contents(path, git_ref);
        let payload: FileContent = decode(&endpoint, self.source.get(&endpoint).await?)?;
        payload.decode(&endpoint.to_string())?.ok_or_else(|| FetchError::Decode {
            endpoint: endpoint.to_string(),
            message: "response carries no file content".to_string(),
        })
    }

    /// One page of a listing.
    async fn fetch_page<T: DeserializeOwned>(&self, endpoint: &Endpoint) -> FetchResult<Vec<T>> {
        debug!(endpoint = %endpoint, "fetching listing page");
        decode(endpoint, self.source.get(endpoint).await?)
    }

    /// Walk a listing page by page until `visit` returns a hit, a short page
    /// is seen or `max_pages` is exhausted.
    async fn scan<T, F, R>(&self, endpoint_for: F, mut visit: R) -> FetchResult<Option<T>>
    where
        T: DeserializeOwned,
        F: Fn(u32) -> Endpoint,
        R: FnMut(Vec<T>) -> Option<T>,
    {
        for page in 1..=self.max_pages {
            let items: Vec<T> = self.fetch_page(&endpoint_for(page)).await?;
            let short = items.len() < self.per_page as usize;
            if let Some(hit) = visit(items) {
                return Ok(Some(hit));
            }
            if short {
                break;
            }
        }
        Ok(None)
    }

    /// All entries of a listing, up to `max_pages` pages.
    async fn collect<T, F>(&self, endpoint_for: F) -> FetchResult<Vec<T>>
    where
        T: DeserializeOwned,
        F: Fn(u32) -> Endpoint,
    {
        let mut all = Vec::new();
        self.scan::<T, _, _>(endpoint_for, |items| {
            all.extend(items);
            None
        })
        .await?;
        Ok(all)
    }

    /// Every comment on an issue, oldest first.
    pub async fn issue_comments(&self, issue_number: u64) -> FetchResult<Vec<Comment>> {
        self.collect(|page| endpoints::issue_comments(issue_number, self.per_page, page))
            .await
    }

    /// First issue whose title carries every keyword, scanning all open
    /// issues before closed ones.
    pub async fn discover_issue(&self, keywords: &[String]) -> FetchResult<Option<Issue>> {
        for state in DISCOVERY_STATES {
            let hit = self
                .scan(
                    |page| endpoints::issues(state, self.per_page, page),
                    |items: Vec<Issue>| {
                        let issues: Vec<Issue> =
                            items.into_iter().filter(|i| !i.is_pull_request()).collect();
                        first_title_match(&issues, keywords).cloned()
                    },
                )
                .await?;
            if hit.is_some() {
                return Ok(hit);
            }
        }
        Ok(None)
    }

    /// First pull request whose title carries every keyword, open before
    /// closed.
    pub async fn discover_pull(&self, keywords: &[String]) -> FetchResult<Option<PullRequest>> {
        for state in DISCOVERY_STATES {
            let hit = self
                .scan(
                    |page| endpoints::pulls(state, self.per_page, page),
                    |items: Vec<PullRequest>| first_title_match(&items, keywords).cloned(),
                )
                .await?;
            if hit.is_some() {
                return Ok(hit);
            }
        }
        Ok(None)
    }
}
