mod upstream;

pub use upstream::PreparedUpstream;

use std::time::Duration;

use crate::config::ServerConfig;
use crate::error::RelayError;

/// Build the shared reqwest client from server settings.
///
/// # Errors
///
/// Returns [`RelayError::Transport`] when the client cannot be constructed.
pub fn build_http_client(config: &ServerConfig) -> Result<reqwest::Client, RelayError> {
    let pool_idle_timeout = if config.http_pool_idle_timeout_secs == 0 {
        None
    } else {
        Some(Duration::from_secs(config.http_pool_idle_timeout_secs))
    };

    reqwest::Client::builder()
        .pool_max_idle_per_host(config.http_pool_max_idle_per_host)
        .pool_idle_timeout(pool_idle_timeout)
        .tcp_nodelay(true)
        .connect_timeout(Duration::from_secs(5))
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(config.timeout))
        .no_proxy()
        .build()
        .map_err(|err| RelayError::Transport(format!("Failed to build HTTP client: {err}")))
}

/// Issue the streaming chat completion POST. The response is returned as-is;
/// status handling and body streaming are the caller's concern.
///
/// # Errors
///
/// Returns [`RelayError::Transport`] when the request cannot be sent.
pub async fn send_stream(
    client: &reqwest::Client,
    upstream: &PreparedUpstream,
    body: Vec<u8>,
) -> Result<reqwest::Response, RelayError> {
    let request = match upstream.chat_url_parsed() {
        Some(url) => client.post(url.clone()),
        None => client.post(upstream.chat_url()),
    };
    request
        .headers(upstream.static_headers().clone())
        .body(body)
        .send()
        .await
        .map_err(|err| RelayError::Transport(format!("Upstream request failed: {err}")))
}
