// Error types for ghtally.
// Covers GitHub transport failures, cache problems, configuration and interruption.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatError {
    #[error("GitHub API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Authentication failed: invalid or expired token")]
    Unauthorized,

    #[error("Rate limit exceeded, resets at {reset_at}")]
    RateLimited { reset_at: String },

    #[error("GraphQL query {query} failed: {message}")]
    GraphQl { query: &'static str, message: String },

    #[error("Pagination for {0} reported more pages without a cursor")]
    MissingCursor(&'static str),

    #[error("Missing ACCESS_TOKEN or GITHUB_TOKEN environment variable")]
    MissingToken,

    #[error("Cache file is corrupt: {0}")]
    CacheCorrupt(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Template error: {0}")]
    Template(#[from] regex::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Interrupted by operator")]
    Interrupted,

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, StatError>;
