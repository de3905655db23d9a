//! Error types for feedbot.

use thiserror::Error;

/// Common error type for feedbot.
#[derive(Error, Debug)]
pub enum FeedbotError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Feed fetch or parse error.
    #[error("feed error: {0}")]
    Feed(String),

    /// HTML parsing error.
    #[error("HTML error: {0}")]
    Html(String),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Telegram Bot API error.
    #[error("telegram error: {0}")]
    Telegram(String),

    /// Validation error.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An article violated a pipeline contract (e.g. empty ID).
    #[error("invalid article: {0}")]
    InvalidArticle(String),

    /// The run was cancelled.
    #[error("operation cancelled")]
    Cancelled,
}

impl From<sqlx::Error> for FeedbotError {
    fn from(e: sqlx::Error) -> Self {
        FeedbotError::Database(e.to_string())
    }
}

impl From<reqwest::Error> for FeedbotError {
    fn from(e: reqwest::Error) -> Self {
        FeedbotError::Http(e.to_string())
    }
}

impl FeedbotError {
    /// Whether this error is a cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FeedbotError::Cancelled)
    }
}

/// Result type alias for feedbot operations.
pub type Result<T> = std::result::Result<T, FeedbotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_error_display() {
        let err = FeedbotError::Feed("failed to parse feed".to_string());
        assert_eq!(err.to_string(), "feed error: failed to parse feed");
    }

    #[test]
    fn test_invalid_article_display() {
        let err = FeedbotError::InvalidArticle("empty article ID".to_string());
        assert_eq!(err.to_string(), "invalid article: empty article ID");
    }

    #[test]
    fn test_cancelled() {
        let err = FeedbotError::Cancelled;
        assert!(err.is_cancelled());
        assert_eq!(err.to_string(), "operation cancelled");
        assert!(!FeedbotError::Http("boom".to_string()).is_cancelled());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: FeedbotError = io_err.into();
        assert!(matches!(err, FeedbotError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_serde_error_conversion() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: FeedbotError = json_err.into();
        assert!(matches!(err, FeedbotError::Serialization(_)));
    }

    #[test]
    fn test_result_alias() {
        fn sample_ok() -> Result<i32> {
            Ok(42)
        }

        fn sample_err() -> Result<i32> {
            Err(FeedbotError::Validation("test".to_string()))
        }

        assert_eq!(sample_ok().unwrap(), 42);
        assert!(sample_err().is_err());
    }
}
