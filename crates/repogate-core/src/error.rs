//! Error taxonomy for repogate.

/// Failure of a single remote fetch.
///
/// Every variant fails the checker that issued the fetch; the variants only
/// exist so messages and logs can say what went wrong.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("{endpoint}: resource not found (404)")]
    NotFound { endpoint: String },

    #[error("{endpoint}: unexpected status {status}")]
    Status { endpoint: String, status: u16 },

    #[error("{endpoint}: transport failure: {message}")]
    Transport { endpoint: String, message: String },

    #[error("{endpoint}: could not decode response: {message}")]
    Decode { endpoint: String, message: String },
}

impl FetchError {
    /// Endpoint the failed fetch targeted.
    pub fn endpoint(&self) -> &str {
        match self {
            FetchError::NotFound { endpoint }
            | FetchError::Status { endpoint, .. }
            | FetchError::Transport { endpoint, .. }
            | FetchError::Decode { endpoint, .. } => endpoint,
        }
    }

    /// Whether the remote reported the resource as absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound { .. })
    }
}

/// Result type for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Errors raised before or around a compliance run.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("missing required environment variable {0}")]
    MissingCredential(String),

    #[error("invalid compliance config: {0}")]
    InvalidConfig(String),

    #[error("failed to read config file: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    ConfigRender(#[from] toml::ser::Error),

    #[error("http client setup failed: {0}")]
    HttpClient(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for repogate operations.
pub type Result<T> = std::result::Result<T, GateError>;
