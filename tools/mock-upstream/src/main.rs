use std::convert::Infallible;
use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use http::{header, HeaderValue, Method, Request, Response, StatusCode};
use http_body_util::BodyExt;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as AutoBuilder;
use tokio::net::TcpListener;

const DEFAULT_UPSTREAM_PORT: u16 = 19_001;

#[derive(Copy, Clone)]
enum MockScenario {
    Text,
    Long,
    Malformed,
    NoSentinel,
    Error,
    RateLimited,
    DailyQuota,
}

struct MockState {
    scenario: MockScenario,
    hits: AtomicU64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let port = env_u16("UPSTREAM_PORT", DEFAULT_UPSTREAM_PORT);
    let scenario = parse_scenario();
    let state = Arc::new(MockState {
        scenario,
        hits: AtomicU64::new(0),
    });

    let listener = TcpListener::bind(("127.0.0.1", port))
        .await
        .unwrap_or_else(|err| panic!("failed to bind mock upstream on 127.0.0.1:{port}: {err}"));

    let conn_builder = AutoBuilder::new(TokioExecutor::new());

    loop {
        let (stream, remote_addr) = match listener.accept().await {
            Ok((stream, remote_addr)) => (stream, remote_addr),
            Err(err) => {
                eprintln!("accept error: {err}");
                continue;
            }
        };
        let io = TokioIo::new(stream);
        let conn_builder = conn_builder.clone();
        let service_state = Arc::clone(&state);
        let service = service_fn(move |request: Request<Incoming>| {
            let state_ref = Arc::clone(&service_state);
            async move { Ok::<_, Infallible>(handle_request(request, &state_ref).await) }
        });

        tokio::spawn(async move {
            if let Err(err) = conn_builder.serve_connection(io, service).await {
                eprintln!("mock upstream connection error from {remote_addr}: {err}");
            }
        });
    }
}

fn env_u16(name: &str, default: u16) -> u16 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(default)
}

fn parse_scenario() -> MockScenario {
    match env::var("MOCK_SCENARIO").as_deref() {
        Ok("long") => MockScenario::Long,
        Ok("malformed") => MockScenario::Malformed,
        Ok("nosentinel") => MockScenario::NoSentinel,
        Ok("error") => MockScenario::Error,
        Ok("ratelimited") => MockScenario::RateLimited,
        Ok("dailyquota") => MockScenario::DailyQuota,
        Ok("text") | Err(_) => MockScenario::Text,
        Ok(other) => {
            eprintln!("unknown MOCK_SCENARIO '{other}', fallback to text");
            MockScenario::Text
        }
    }
}

async fn handle_request(
    request: Request<Incoming>,
    state: &Arc<MockState>,
) -> Response<Full<Bytes>> {
    let (parts, body) = request.into_parts();
    state.hits.fetch_add(1, Ordering::Relaxed);
    drain_request_body(body).await;

    let method = parts.method;
    let path = parts.uri.path();

    if method == Method::GET && path == "/_mock/stats" {
        let hits = state.hits.load(Ordering::Relaxed);
        let body = format!("{{\"hits\":{hits}}}");
        return simple_response(
            StatusCode::OK,
            "application/json",
            Bytes::from(body.into_bytes()),
        );
    }
    if method == Method::POST && path == "/_mock/reset" {
        state.hits.store(0, Ordering::Relaxed);
        return simple_response_static(StatusCode::OK, "application/json", br#"{"ok":true}"#);
    }
    if method != Method::POST {
        return simple_response_static(
            StatusCode::METHOD_NOT_ALLOWED,
            "application/json",
            br#"{"error":"method_not_allowed"}"#,
        );
    }
    if path != "/chat/completions" && path != "/v1/chat/completions" {
        return simple_response_static(
            StatusCode::NOT_FOUND,
            "application/json",
            br#"{"error":"not_found"}"#,
        );
    }

    match state.scenario {
        MockScenario::Text => streaming_response(STREAM_TEXT),
        MockScenario::Long => streaming_response(STREAM_LONG),
        MockScenario::Malformed => streaming_response(STREAM_MALFORMED),
        MockScenario::NoSentinel => streaming_response(STREAM_NO_SENTINEL),
        MockScenario::Error => simple_response_static(
            StatusCode::SERVICE_UNAVAILABLE,
            "application/json",
            ERROR_BODY,
        ),
        MockScenario::RateLimited => {
            simple_response_static(StatusCode::TOO_MANY_REQUESTS, "application/json", RATE_BODY)
        }
        MockScenario::DailyQuota => simple_response_static(
            StatusCode::TOO_MANY_REQUESTS,
            "application/json",
            QUOTA_BODY,
        ),
    }
}

async fn drain_request_body(mut body: Incoming) {
    while let Some(frame_result) = body.frame().await {
        if frame_result.is_err() {
            break;
        }
    }
}

fn streaming_response(body: &'static [u8]) -> Response<Full<Bytes>> {
    let mut response = simple_response_static(StatusCode::OK, "text/event-stream", body);
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

fn simple_response(
    status: StatusCode,
    content_type: &'static str,
    body: Bytes,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

fn simple_response_static(
    status: StatusCode,
    content_type: &'static str,
    body: &'static [u8],
) -> Response<Full<Bytes>> {
    simple_response(status, content_type, Bytes::from_static(body))
}

const STREAM_TEXT: &[u8] = b"data: {\"id\":\"gen-mock\",\"object\":\"chat.completion.chunk\",\"created\":1,\"model\":\"m1\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"Hi\"},\"finish_reason\":null}]}\n\ndata: {\"id\":\"gen-mock\",\"object\":\"chat.completion.chunk\",\"created\":1,\"model\":\"m1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\" there\"},\"finish_reason\":null}]}\n\ndata: {\"id\":\"gen-mock\",\"object\":\"chat.completion.chunk\",\"created\":1,\"model\":\"m1\",\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\ndata: [DONE]\n\n";
const STREAM_LONG: &[u8] = b"data: {\"id\":\"gen-mock\",\"object\":\"chat.completion.chunk\",\"created\":1,\"model\":\"m1\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"## Study plan\\n\"},\"finish_reason\":null}]}\n\ndata: {\"id\":\"gen-mock\",\"object\":\"chat.completion.chunk\",\"created\":1,\"model\":\"m1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"- Review notes \\ud83c\\udf93\\n\"},\"finish_reason\":null}]}\n\ndata: {\"id\":\"gen-mock\",\"object\":\"chat.completion.chunk\",\"created\":1,\"model\":\"m1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"- Practice problems\\n\"},\"finish_reason\":null}]}\n\ndata: {\"id\":\"gen-mock\",\"object\":\"chat.completion.chunk\",\"created\":1,\"model\":\"m1\",\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\ndata: [DONE]\n\n";
const STREAM_MALFORMED: &[u8] = b"data: {\"id\":\"gen-mock\",\"object\":\"chat.completion.chunk\",\"created\":1,\"model\":\"m1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"before\"},\"finish_reason\":null}]}\n\ndata: {\"broken\n\ndata: {\"id\":\"gen-mock\",\"object\":\"chat.completion.chunk\",\"created\":1,\"model\":\"m1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"after\"},\"finish_reason\":null}]}\n\ndata: [DONE]\n\n";
const STREAM_NO_SENTINEL: &[u8] = b"data: {\"id\":\"gen-mock\",\"object\":\"chat.completion.chunk\",\"created\":1,\"model\":\"m1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"cut\"},\"finish_reason\":null}]}\n\n";
const ERROR_BODY: &[u8] = br#"{"error":{"message":"mock_injected_error","code":503}}"#;
const RATE_BODY: &[u8] = br#"{"error":{"message":"Too many requests","code":429}}"#;
const QUOTA_BODY: &[u8] = br#"{"error":{"message":"Rate limit exceeded: free-models-per-day","code":429}}"#;
