use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Rate limit exceeded. Retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Invalid request: {message}")]
    BadRequest { message: String },

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Unable to read {path}: {source}")]
    LocalFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ApiError {
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            ApiError::AuthenticationFailed { .. } => {
                Some("Check JIRA_USERNAME and JIRA_API_TOKEN, or run: jira-ops config setup")
            }
            ApiError::RateLimitExceeded { .. } => Some("Wait a moment before sending more requests"),
            ApiError::NotFound { .. } => Some("Check that the key or id exists and is visible to you"),
            ApiError::BadRequest { .. } => Some("Review the fields sent for this operation"),
            ApiError::RequestFailed(_) => Some("Check JIRA_BASE_URL and your network connection"),
            _ => None,
        }
    }
}

/// Jira's error envelope: `{"errorMessages": [...], "errors": {"field": "msg"}}`.
#[derive(Deserialize, Default)]
struct ErrorCollection {
    #[serde(rename = "errorMessages", default)]
    error_messages: Vec<String>,
    #[serde(default)]
    errors: std::collections::BTreeMap<String, String>,
}

/// Flattens a Jira error body into one line, falling back to the raw text.
pub fn error_message(body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(collection) = serde_json::from_str::<ErrorCollection>(trimmed) {
        let mut parts = collection.error_messages;
        parts.extend(
            collection
                .errors
                .into_iter()
                .map(|(field, message)| format!("{field}: {message}")),
        );
        if !parts.is_empty() {
            return parts.join("; ");
        }
    }
    trimmed.to_string()
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_collects_messages_and_field_errors() {
        let body = r#"{"errorMessages":["Issue does not exist"],"errors":{"summary":"required"}}"#;
        assert_eq!(error_message(body), "Issue does not exist; summary: required");
    }

    #[test]
    fn test_error_message_plain_text() {
        assert_eq!(error_message("  Bad gateway \n"), "Bad gateway");
    }

    #[test]
    fn test_error_message_empty_envelope_falls_back() {
        assert_eq!(error_message(r#"{"errorMessages":[]}"#), r#"{"errorMessages":[]}"#);
    }

    #[test]
    fn test_suggestion_for_auth_failure() {
        let err = ApiError::AuthenticationFailed {
            message: "nope".into(),
        };
        assert!(err.suggestion().unwrap().contains("JIRA_API_TOKEN"));
        assert!(ApiError::InvalidResponse("x".into()).suggestion().is_none());
    }
}
