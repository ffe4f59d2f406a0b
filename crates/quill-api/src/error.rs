//! API error types.

use thiserror::Error;

/// Error type for API requests.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The server responded with a non-success status.
    #[error("HTTP {status}")]
    Status { status: u16, body: String },

    /// The request was sent but no response came back.
    #[error("No response from server: {0}")]
    Transport(String),

    /// The request could not be constructed or sent at all.
    #[error("Request could not be built: {0}")]
    Build(String),
}

impl ApiError {
    /// HTTP status code, when a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// A `message` field from a structured JSON error body, verbatim.
    pub fn structured_message(&self) -> Option<String> {
        let ApiError::Status { body, .. } = self else {
            return None;
        };
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        value
            .as_object()?
            .get("message")?
            .as_str()
            .map(String::from)
    }

    /// Whether the response body looks like an HTML document rather
    /// than structured data (misconfigured proxy or server error page).
    pub fn is_html_body(&self) -> bool {
        let ApiError::Status { body, .. } = self else {
            return false;
        };
        let head = body.trim_start().to_ascii_lowercase();
        head.starts_with("<!doctype html") || head.starts_with("<html")
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            ApiError::Build(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

/// Result type alias using ApiError.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(status: u16, body: &str) -> ApiError {
        ApiError::Status {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_structured_message_extracted() {
        let err = status_error(409, r#"{"message":"username taken"}"#);
        assert_eq!(err.structured_message(), Some("username taken".to_string()));
    }

    #[test]
    fn test_structured_message_requires_json_object() {
        assert_eq!(status_error(500, "plain text").structured_message(), None);
        assert_eq!(status_error(500, r#"["message"]"#).structured_message(), None);
        assert_eq!(status_error(500, r#"{"error":"x"}"#).structured_message(), None);
    }

    #[test]
    fn test_structured_message_absent_for_transport() {
        assert_eq!(
            ApiError::Transport("connection refused".into()).structured_message(),
            None
        );
    }

    #[test]
    fn test_html_body_detection() {
        assert!(status_error(502, "<!DOCTYPE html><html>...").is_html_body());
        assert!(status_error(502, "\n  <html lang=\"en\">").is_html_body());
        assert!(!status_error(502, r#"{"message":"x"}"#).is_html_body());
        assert!(!ApiError::Transport("x".into()).is_html_body());
    }

    #[test]
    fn test_status_accessor() {
        assert_eq!(status_error(401, "").status(), Some(401));
        assert_eq!(ApiError::Transport("x".into()).status(), None);
        assert_eq!(ApiError::Build("x".into()).status(), None);
    }
}
