//! Failure classification for login and register.
//!
//! An ordered list of predicate rules maps an [`ApiError`] onto the
//! user-facing message. The first matching rule wins, which makes the
//! precedence explicit and testable rather than implicit in branch
//! nesting:
//!
//! 1. structured JSON error body with a `message` field (verbatim)
//! 2. HTTP 401 on login
//! 3. HTTP 409 / 400 on register
//! 4. HTML error page where JSON was expected
//! 5. no response received
//! 6. request never sent
//! 7. any other HTTP status

use quill_api::ApiError;

/// Fixed user-facing messages.
pub mod messages {
    /// Rejected credentials on login (HTTP 401).
    pub const INVALID_CREDENTIALS: &str = "invalid username or password";
    /// Duplicate registration (HTTP 409).
    pub const DUPLICATE_IDENTITY: &str = "username or email already in use";
    /// Rejected registration parameters (HTTP 400).
    pub const INVALID_PARAMETERS: &str = "invalid request parameters";
    /// HTML document received where JSON was expected.
    pub const ERROR_PAGE: &str = "the server returned an error page";
    /// Network failure, no response at all.
    pub const UNREACHABLE: &str = "cannot reach the server";
    /// The request could not be constructed client-side.
    pub const REQUEST_CONFIG: &str = "request configuration error";
    /// A 2xx body that did not parse as the expected shape.
    pub const MALFORMED_RESPONSE: &str = "the server returned a malformed response";
    /// A well-formed login response without a token.
    pub const MISSING_TOKEN: &str = "the server did not return a token";
}

/// Which operation the failure came from; rules 2 and 3 are mutually
/// exclusive by operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    Login,
    Register,
}

type Rule = fn(Operation, &ApiError) -> Option<String>;

const RULES: [Rule; 7] = [
    structured_message,
    credential_rejection,
    registration_rejection,
    error_page,
    unreachable,
    misconfigured_request,
    generic_http,
];

/// Classify an API failure into its user-facing message.
pub(crate) fn classify(operation: Operation, error: &ApiError) -> String {
    RULES
        .iter()
        .find_map(|rule| rule(operation, error))
        .unwrap_or_else(|| error.to_string())
}

fn structured_message(_op: Operation, error: &ApiError) -> Option<String> {
    error.structured_message()
}

fn credential_rejection(op: Operation, error: &ApiError) -> Option<String> {
    if op == Operation::Login && error.status() == Some(401) {
        return Some(messages::INVALID_CREDENTIALS.to_string());
    }
    None
}

fn registration_rejection(op: Operation, error: &ApiError) -> Option<String> {
    if op != Operation::Register {
        return None;
    }
    match error.status() {
        Some(409) => Some(messages::DUPLICATE_IDENTITY.to_string()),
        Some(400) => Some(messages::INVALID_PARAMETERS.to_string()),
        _ => None,
    }
}

fn error_page(_op: Operation, error: &ApiError) -> Option<String> {
    error.is_html_body().then(|| messages::ERROR_PAGE.to_string())
}

fn unreachable(_op: Operation, error: &ApiError) -> Option<String> {
    matches!(error, ApiError::Transport(_)).then(|| messages::UNREACHABLE.to_string())
}

fn misconfigured_request(_op: Operation, error: &ApiError) -> Option<String> {
    matches!(error, ApiError::Build(_)).then(|| messages::REQUEST_CONFIG.to_string())
}

fn generic_http(_op: Operation, error: &ApiError) -> Option<String> {
    error
        .status()
        .map(|status| format!("request failed with HTTP {status}"))
}
