use thiserror::Error;

use crate::constants::GENERIC_FAILURE_MESSAGE;

/// Main error type for the conversational core
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{service} unavailable: {message}")]
    UpstreamUnavailable {
        service: &'static str,
        message: String,
    },

    #[error("Malformed upstream output: {0}")]
    MalformedUpstreamOutput(String),

    #[error("Session write conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChatError {
    /// Wrap an adapter failure, keeping the full context chain for logs
    pub fn upstream(service: &'static str, err: anyhow::Error) -> Self {
        ChatError::UpstreamUnavailable {
            service,
            message: format!("{:#}", err),
        }
    }

    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            ChatError::InvalidArgument(_) => "invalid_argument",
            ChatError::UpstreamUnavailable { .. } => "upstream_unavailable",
            ChatError::MalformedUpstreamOutput(_) => "malformed_upstream_output",
            ChatError::Conflict(_) => "conflict",
            ChatError::Internal(_) => "internal",
        }
    }

    /// Text safe to hand back to a caller. Upstream detail stays in the logs.
    pub fn public_message(&self) -> String {
        match self {
            ChatError::InvalidArgument(reason) => reason.clone(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_message_hides_upstream_detail() {
        let err = ChatError::upstream(
            "completion",
            anyhow::anyhow!("401 from https://example.test?key=secret"),
        );
        assert_eq!(err.public_message(), GENERIC_FAILURE_MESSAGE);
        assert!(err.to_string().contains("secret"));
        assert_eq!(err.kind(), "upstream_unavailable");
    }

    #[test]
    fn test_invalid_argument_is_described() {
        let err = ChatError::InvalidArgument("ownerId must not be empty".into());
        assert_eq!(err.public_message(), "ownerId must not be empty");
        assert_eq!(err.kind(), "invalid_argument");
    }
}
