use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn};

use crate::error::RelayError;
use crate::observability::UsageEvent;
use crate::protocol::{
    attached_image, build_upstream_payload, ChatRequestBody, ConversationMessage,
    DEFAULT_SYSTEM_PROMPT,
};
use crate::state::AppState;
use crate::stream::transcoded_body;
use crate::transport::send_stream;

const ALLOWED_ROLES: [&str; 3] = ["system", "user", "assistant"];

pub async fn handler(State(state): State<Arc<AppState>>, body: bytes::Bytes) -> Response {
    match handle_chat(&state, &body).await {
        Ok(response) => response,
        Err(err) => {
            warn!(category = err.category(), error = %err, "chat request failed");
            state.usage_sink.record(UsageEvent::RequestFailed {
                category: err.category(),
            });
            err.into_response()
        }
    }
}

async fn handle_chat(state: &Arc<AppState>, body: &[u8]) -> Result<Response, RelayError> {
    // The key check comes first so a misconfigured deployment reports itself
    // even when the client sends garbage.
    if state.config.upstream.api_key.is_none() {
        return Err(RelayError::Config(
            "OPENROUTER_API_KEY environment variable is missing".to_string(),
        ));
    }

    let request = parse_chat_request(body)?;
    validate_messages(&request.messages)?;

    let image = attached_image(&request);
    state.usage_sink.record(UsageEvent::RequestReceived {
        message_count: request.messages.len(),
        has_image: image.is_some(),
    });

    let upstream_config = &state.config.upstream;
    let system_prompt = state
        .config
        .relay
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);
    let payload = build_upstream_payload(
        system_prompt,
        &request.messages,
        image,
        &upstream_config.model,
        upstream_config.temperature,
        upstream_config.max_tokens,
    );
    let payload_bytes = serde_json::to_vec(&payload)
        .map_err(|err| RelayError::Internal(format!("Failed to encode upstream payload: {err}")))?;

    debug!(
        model = %upstream_config.model,
        messages = payload.messages.len(),
        has_image = image.is_some(),
        "forwarding chat request upstream"
    );

    let response = send_stream(&state.client, &state.upstream, payload_bytes).await?;
    let status = response.status();
    if !status.is_success() {
        let error_body = response.bytes().await.map_err(|err| {
            RelayError::Transport(format!("Failed to read upstream error body: {err}"))
        })?;
        return Err(RelayError::Upstream {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&error_body).into_owned(),
        });
    }

    Ok(streaming_response(transcoded_body(
        response.bytes_stream(),
        Arc::clone(&state.usage_sink),
    )))
}

fn parse_chat_request(body: &[u8]) -> Result<ChatRequestBody, RelayError> {
    serde_json::from_slice(body).map_err(|err| {
        debug!(error = %err, "chat request body rejected");
        RelayError::InvalidRequest {
            error: "Invalid request body".to_string(),
            details: "Failed to parse JSON".to_string(),
        }
    })
}

fn validate_messages(messages: &[ConversationMessage]) -> Result<(), RelayError> {
    if messages.is_empty() {
        return Err(RelayError::InvalidRequest {
            error: "Invalid messages".to_string(),
            details: "Messages must be a non-empty array".to_string(),
        });
    }
    for message in messages {
        if !ALLOWED_ROLES.contains(&message.role.as_str()) {
            return Err(RelayError::InvalidRequest {
                error: "Invalid messages".to_string(),
                details: format!("Unrecognized role '{}'", message.role),
            });
        }
    }
    Ok(())
}

fn streaming_response(body: axum::body::Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = http::StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(
        http::header::CACHE_CONTROL,
        http::HeaderValue::from_static("no-cache"),
    );
    headers.insert(
        http::header::CONNECTION,
        http::HeaderValue::from_static("keep-alive"),
    );
    response
}
