/// Ripple error types
#[derive(Debug, thiserror::Error)]
pub enum RippleError {
    /// Git-related errors
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Branch management errors
    #[error("Branch error: {0}")]
    Branch(String),

    /// Network errors (fetch, remote client)
    #[error("Network error: {0}")]
    Network(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Rebase operation errors
    #[error("Rebase error: {0}")]
    Rebase(String),

    /// Conflict resolution errors
    #[error("Conflict error: {0}")]
    Conflict(String),

    /// Remote review-platform client errors
    #[error("gh error: {0}")]
    Remote(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

impl RippleError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        RippleError::Config(msg.into())
    }

    pub fn branch<S: Into<String>>(msg: S) -> Self {
        RippleError::Branch(msg.into())
    }

    pub fn network<S: Into<String>>(msg: S) -> Self {
        RippleError::Network(msg.into())
    }

    pub fn rebase<S: Into<String>>(msg: S) -> Self {
        RippleError::Rebase(msg.into())
    }

    pub fn conflict<S: Into<String>>(msg: S) -> Self {
        RippleError::Conflict(msg.into())
    }

    pub fn remote<S: Into<String>>(msg: S) -> Self {
        RippleError::Remote(msg.into())
    }

    pub fn validation<S: Into<String>>(msg: S) -> Self {
        RippleError::Validation(msg.into())
    }

    pub fn not_initialized<S: Into<String>>(msg: S) -> Self {
        RippleError::config(msg.into())
    }

    pub fn invalid_operation<S: Into<String>>(msg: S) -> Self {
        RippleError::Validation(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, RippleError>;
