use serde_json::json;

/// Error type used across the request and streaming paths.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Invalid request: {error}: {details}")]
    InvalidRequest { error: String, details: String },
    #[error("Upstream error: status={status}")]
    Upstream { status: u16, body: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Broad category label used for logs and usage events.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            RelayError::Config(_) => "config",
            RelayError::InvalidRequest { .. } => "invalid_request",
            RelayError::Upstream { .. } => "upstream",
            RelayError::Transport(_) => "transport",
            RelayError::Internal(_) => "internal",
        }
    }
}

// ---------------------------------------------------------------------------
// User-facing phrasing for upstream failures
// ---------------------------------------------------------------------------

const RATE_LIMIT_USER_MESSAGE: &str =
    "The AI service is currently rate limited. Please wait a moment and try again.";
const MODEL_UNAVAILABLE_USER_MESSAGE: &str =
    "The AI model is currently unavailable. Please try again later.";
const DAILY_QUOTA_USER_MESSAGE: &str =
    "Daily free usage limit reached. Please try again tomorrow.";
const GENERIC_UPSTREAM_USER_MESSAGE: &str =
    "The AI service is temporarily unavailable. Please try again.";

/// Pick the user-facing message for an upstream failure.
///
/// The body check runs first: OpenRouter reports the exhausted daily free
/// quota as a 429 whose body contains "Rate limit exceeded", which would
/// otherwise be indistinguishable from a transient rate limit.
#[must_use]
pub fn user_message_for_upstream(status: u16, body: &str) -> &'static str {
    if body.contains("Rate limit exceeded") {
        return DAILY_QUOTA_USER_MESSAGE;
    }
    match status {
        429 => RATE_LIMIT_USER_MESSAGE,
        404 => MODEL_UNAVAILABLE_USER_MESSAGE,
        _ => GENERIC_UPSTREAM_USER_MESSAGE,
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// Format an error into the (`status_code`, JSON body) pair the client expects.
#[must_use]
pub fn format_error(err: &RelayError) -> (http::StatusCode, serde_json::Value) {
    match err {
        RelayError::Config(details) => (
            http::StatusCode::INTERNAL_SERVER_ERROR,
            json!({
                "error": "API key not configured",
                "details": details,
            }),
        ),
        RelayError::InvalidRequest { error, details } => (
            http::StatusCode::BAD_REQUEST,
            json!({
                "error": error,
                "details": details,
            }),
        ),
        RelayError::Upstream { status, body } => {
            let status_code = http::StatusCode::from_u16(*status)
                .unwrap_or(http::StatusCode::BAD_GATEWAY);
            (
                status_code,
                json!({
                    "error": format!("OpenRouter API error: {status}"),
                    "details": body,
                    "status": status,
                    "userMessage": user_message_for_upstream(*status, body),
                }),
            )
        }
        RelayError::Transport(details) | RelayError::Internal(details) => (
            http::StatusCode::INTERNAL_SERVER_ERROR,
            json!({
                "error": "Internal server error",
                "details": details,
            }),
        ),
    }
}

// ---------------------------------------------------------------------------
// Axum integration
// ---------------------------------------------------------------------------

impl axum::response::IntoResponse for RelayError {
    fn into_response(self) -> axum::response::Response {
        use axum::response::IntoResponse;
        let (status, body) = format_error(&self);
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::{format_error, user_message_for_upstream, RelayError};

    #[test]
    fn missing_key_formats_as_500() {
        let err = RelayError::Config("OPENROUTER_API_KEY environment variable is missing".into());
        let (status, body) = format_error(&err);
        assert_eq!(status, http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "API key not configured");
        assert_eq!(
            body["details"],
            "OPENROUTER_API_KEY environment variable is missing"
        );
    }

    #[test]
    fn invalid_request_formats_as_400() {
        let err = RelayError::InvalidRequest {
            error: "Invalid messages".into(),
            details: "Messages must be a non-empty array".into(),
        };
        let (status, body) = format_error(&err);
        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid messages");
        assert_eq!(body["details"], "Messages must be a non-empty array");
    }

    #[test]
    fn upstream_error_carries_status_and_user_message() {
        let err = RelayError::Upstream {
            status: 429,
            body: "slow down".into(),
        };
        let (status, body) = format_error(&err);
        assert_eq!(status, http::StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"], "OpenRouter API error: 429");
        assert_eq!(body["details"], "slow down");
        assert_eq!(body["status"], 429);
        assert_eq!(
            body["userMessage"],
            "The AI service is currently rate limited. Please wait a moment and try again."
        );
    }

    #[test]
    fn quota_body_overrides_status_phrasing() {
        let message = user_message_for_upstream(429, "Rate limit exceeded: free-models-per-day");
        assert_eq!(
            message,
            "Daily free usage limit reached. Please try again tomorrow."
        );
    }

    #[test]
    fn missing_model_maps_to_unavailable_phrasing() {
        let message = user_message_for_upstream(404, "No endpoints found");
        assert_eq!(
            message,
            "The AI model is currently unavailable. Please try again later."
        );
    }

    #[test]
    fn unexpected_status_maps_to_generic_phrasing() {
        let message = user_message_for_upstream(503, "upstream fell over");
        assert_eq!(
            message,
            "The AI service is temporarily unavailable. Please try again."
        );
    }

    #[test]
    fn transport_error_formats_as_internal() {
        let err = RelayError::Transport("connection reset".into());
        let (status, body) = format_error(&err);
        assert_eq!(status, http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
        assert_eq!(body["details"], "connection reset");
    }
}
