use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use crate::utils::ChatError;

/// HTTP face of a `ChatError`; only the public message leaves the process
#[derive(Debug)]
pub struct ApiError(pub ChatError);

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            ChatError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ChatError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(status = status.as_u16(), kind = self.0.kind(), "request failed: {}", self.0);
        let body = json!({
            "error": {
                "kind": self.0.kind(),
                "message": self.0.public_message(),
            }
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ChatError::InvalidArgument("x".into()), StatusCode::BAD_REQUEST),
            (ChatError::Conflict("x".into()), StatusCode::CONFLICT),
            (ChatError::MalformedUpstreamOutput("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (ChatError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                ChatError::upstream("completion", anyhow::anyhow!("quota exceeded")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError(err).status(), expected);
        }
    }
}
