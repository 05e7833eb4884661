use thiserror::Error;

/// Errors raised while decoding a streamed event payload
#[derive(Error, Debug)]
pub enum CommonStreamError {
    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid event data in streaming response
    #[error("Invalid event data: {0}")]
    InvalidEventData(String),

    /// UTF-8 conversion error
    #[error("UTF-8 conversion error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),
}

impl CommonStreamError {
    /// Wrap a payload that failed to parse, keeping a short excerpt for diagnostics
    pub(crate) fn invalid_payload(payload: &str, err: &serde_json::Error) -> Self {
        /// Characters of the payload kept in the message
        const EXCERPT: usize = 120;

        let excerpt: String = payload.chars().take(EXCERPT).collect();
        let ellipsis = if payload.chars().count() > EXCERPT { "..." } else { "" };
        Self::InvalidEventData(format!("JSON parse error: {err} (payload: {excerpt}{ellipsis})"))
    }
}
