use thiserror::Error;

/// A page could not be rendered or navigated to.
///
/// Non-fatal to a run: the page keeps its empty placeholder record.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("timed out after {secs}s loading {url}")]
    Timeout { url: String, secs: u64 },

    #[error("failed to navigate to {url}: {message}")]
    Navigation { url: String, message: String },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url} is not an HTML page ({content_type})")]
    UnsupportedContent { url: String, content_type: String },
}

/// A single element, form, or page query could not be introspected.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("selector `{selector}` failed: {message}")]
    Selector { selector: String, message: String },

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("page analysis timed out for {url}")]
    Timeout { url: String },
}

/// The completion service failed or answered with something unusable.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("completion service returned an empty response")]
    EmptyResponse,

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("API key not found in environment variable {0}")]
    MissingApiKey(String),
}

impl ServiceError {
    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::RateLimited(_) | ServiceError::Request(_) => true,
            ServiceError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Run-level discovery failures surfaced to the caller.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("invalid start URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid URL pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("browser automation unavailable: {0}")]
    Browser(String),

    /// The start URL itself could not be loaded, so nothing was discovered.
    #[error("could not discover any pages at {url}; check the URL and try again")]
    Empty { url: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Results could not be written to the output directory
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
}
