use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("'{0}' not found")]
    NotFound(String),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The request was superseded or aborted. Never shown to the user.
    #[error("request cancelled")]
    Cancelled,

    #[error("invalid sort direction '{0}'")]
    InvalidSortDirection(String),

    #[error("invalid sort cycle '{0}'")]
    InvalidSortCycle(String),

    #[error("invalid fetch mode '{0}'")]
    InvalidFetchMode(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    #[error("{0}")]
    Other(String),
}

impl SyncError {
    /// True for superseded or aborted requests, which must stay invisible.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, SyncError::Cancelled)
    }

    /// One-line message for the single error slot of a table or detail view.
    ///
    /// Server errors surface their response body when one was returned.
    pub fn user_message(&self) -> String {
        match self {
            SyncError::Status { status, body } if body.trim().is_empty() => {
                format!("server returned {status}")
            }
            SyncError::Status { body, .. } => body.trim().to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_surfaces_body() {
        let err = SyncError::Status {
            status: 500,
            body: "  budget service unavailable\n".to_string(),
        };
        assert_eq!(err.user_message(), "budget service unavailable");
    }

    #[test]
    fn test_status_error_without_body_uses_code() {
        let err = SyncError::Status {
            status: 502,
            body: String::new(),
        };
        assert_eq!(err.user_message(), "server returned 502");
    }

    #[test]
    fn test_cancellation_classification() {
        assert!(SyncError::Cancelled.is_cancellation());
        assert!(!SyncError::NotFound("42".to_string()).is_cancellation());
        assert!(!SyncError::Other("boom".to_string()).is_cancellation());
    }
}
