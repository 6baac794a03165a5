use thiserror::Error;

/// Errors that abort a generation run.
///
/// Almost every problem met while inlining (unreachable resources, bad
/// charsets, renderer crashes) is downgraded to a warning and a fallback.
/// Only the cases below stop the run.
#[derive(Debug, Error)]
pub enum InlineError {
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("script at {url} could not be materialized as text: {source}")]
    ScriptText {
        url: String,
        source: std::string::FromUtf8Error,
    },

    #[error("failed to serialize document for {url}: {source}")]
    Serialize { url: String, source: std::io::Error },
}

/// Errors reported by a [`crate::render::DocumentRenderer`].
///
/// The engine never propagates these; it falls back to a plain fetch.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no renderer available")]
    Unavailable,

    #[error("render of {url} timed out")]
    Timeout { url: String },

    #[error("browser error: {0}")]
    Browser(String),
}

pub type Result<T> = std::result::Result<T, InlineError>;
