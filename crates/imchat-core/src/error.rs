use thiserror::Error;

/// A convenience `Result` alias using [`ImChatError`].
pub type ImChatResult<T> = Result<T, ImChatError>;

/// Top-level error type for imchat.
///
/// The conversation buffer itself never fails; every variant here originates
/// at a boundary (configuration, the completion endpoint, the terminal).
#[derive(Error, Debug)]
pub enum ImChatError {
    /// Invalid or missing configuration.
    #[error("Config error: {0}")]
    Config(String),

    /// A model name that is not present in the catalog.
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// The completion endpoint could not be reached or answered with a
    /// non-success status.
    #[error("Upstream unavailable: {0}")]
    Upstream(String),

    /// The completion endpoint answered, but without usable text.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The request was abandoned before a reply arrived.
    #[error("Request cancelled")]
    Cancelled,

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ImChatError {
    /// Whether the error came from the completion call rather than from local
    /// state or configuration.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            ImChatError::Upstream(_) | ImChatError::MalformedResponse(_)
        )
    }
}
