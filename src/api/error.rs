//! Backend call failures, classified by HTTP status.

use serde::Deserialize;

/// Error body produced by the backend's exception handler:
/// `{ "status": "NOT_FOUND", "message": "...", "timestamp": "..." }`.
#[derive(Debug, Deserialize)]
struct BackendErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("Cannot reach the server at {0}")]
    Network(String),
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("Session expired, please sign in again")]
    Unauthorized,
    #[error("Not permitted: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("Unexpected response: {0}")]
    Decode(String),
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl ApiError {
    /// Classify a non-success response. `body` is the raw response text.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = backend_message(body);
        match status {
            400 | 422 => ApiError::BadRequest(message),
            401 => ApiError::Unauthorized,
            403 => ApiError::Forbidden(message),
            404 => ApiError::NotFound(message),
            409 => ApiError::Conflict(message),
            _ => ApiError::Server { status, message },
        }
    }

    /// 401/403: the user has to sign in again (or with another role).
    pub fn is_authorization(&self) -> bool {
        matches!(self, ApiError::Unauthorized | ApiError::Forbidden(_))
    }

    /// Transport-level failure: nothing reached the backend.
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_) | ApiError::Timeout(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(401),
            ApiError::Forbidden(_) => Some(403),
            ApiError::NotFound(_) => Some(404),
            ApiError::Conflict(_) => Some(409),
            ApiError::BadRequest(_) => Some(400),
            ApiError::Server { status, .. } => Some(*status),
            ApiError::Network(_)
            | ApiError::Timeout(_)
            | ApiError::Decode(_)
            | ApiError::Client(_) => None,
        }
    }
}

/// User-facing message from an error body: the backend's `message` field
/// when the body is JSON, the trimmed text otherwise.
fn backend_message(body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(parsed) = serde_json::from_str::<BackendErrorBody>(trimmed) {
        if let Some(message) = parsed.message.filter(|m| !m.trim().is_empty()) {
            return message;
        }
    }
    if trimmed.is_empty() || trimmed.starts_with('{') {
        "no details provided".to_string()
    } else {
        trimmed.to_string()
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else if err.is_builder() {
            ApiError::Client(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_maps_from_401() {
        let err = ApiError::from_response(401, "");
        assert_eq!(err, ApiError::Unauthorized);
        assert!(err.is_authorization());
    }

    #[test]
    fn forbidden_keeps_backend_message() {
        let err = ApiError::from_response(
            403,
            r#"{"status":"FORBIDDEN","message":"Access denied","timestamp":"2025-01-10T10:00:00"}"#,
        );
        assert_eq!(err, ApiError::Forbidden("Access denied".into()));
        assert!(err.is_authorization());
        assert_eq!(err.status(), Some(403));
    }

    #[test]
    fn not_found_uses_message_field() {
        let body = r#"{"status":"NOT_FOUND","message":"Randevu bulunamadı"}"#;
        let err = ApiError::from_response(404, body);
        assert_eq!(err, ApiError::NotFound("Randevu bulunamadı".into()));
    }

    #[test]
    fn plain_text_body_is_kept() {
        let err = ApiError::from_response(500, "  boom  ");
        assert_eq!(err, ApiError::Server { status: 500, message: "boom".into() });
        assert!(!err.is_authorization());
    }

    #[test]
    fn json_without_message_gets_placeholder() {
        let err = ApiError::from_response(400, r#"{"status":"BAD_REQUEST"}"#);
        assert_eq!(err, ApiError::BadRequest("no details provided".into()));
    }

    #[test]
    fn conflict_from_409() {
        assert!(matches!(
            ApiError::from_response(409, "taken"),
            ApiError::Conflict(m) if m == "taken"
        ));
    }

    #[test]
    fn network_errors_have_no_status() {
        assert_eq!(ApiError::Timeout(30).status(), None);
        assert!(ApiError::Network("http://x".into()).is_network());
    }
}
