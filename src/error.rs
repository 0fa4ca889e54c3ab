// =============================================================================
// error.rs: WHAT CAN GO WRONG, BY LAYER
// =============================================================================
//
// `ExtractError` is per source and never stops the run. `OutputError` and
// `ConfigError` do.
// =============================================================================

use thiserror::Error;

use crate::models::Source;

/// Why a source produced no records this run.
///
/// `Ok(vec![])` from an extractor means the site listed nothing. Every
/// variant here means we could not tell.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url} kept answering 429 after {attempts} attempts")]
    RateLimited { url: String, attempts: u32 },

    #[error("bypass endpoint refused the request: {0}")]
    Bypass(String),

    #[error("response was not the JSON we expected: {0}")]
    Json(#[from] serde_json::Error),

    /// The page loaded but the structure we read from is gone.
    #[error("{site} markup changed: {detail}")]
    MarkupChanged { site: Source, detail: String },

    #[error("no {0} configured")]
    MissingCredential(&'static str),

    #[error("{0} is a static dataset and is never fetched")]
    NotLive(Source),

    #[error("could not read static dataset: {0}")]
    Csv(#[from] csv::Error),
}

impl ExtractError {
    pub fn markup(site: Source, detail: impl Into<String>) -> Self {
        ExtractError::MarkupChanged {
            site,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("README template not found at {0}")]
    MissingTemplate(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} is not a valid URL ({value}): {reason}")]
    InvalidUrl {
        key: &'static str,
        value: String,
        reason: url::ParseError,
    },

    #[error("{key} must be a number, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },
}
