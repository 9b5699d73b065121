use std::sync::Arc;

use crate::config::AppConfig;
use crate::observability::UsageSink;
use crate::transport::PreparedUpstream;

/// Shared application state accessible to all handlers.
pub struct AppState {
    pub config: AppConfig,
    pub client: reqwest::Client,
    pub upstream: PreparedUpstream,
    pub usage_sink: Arc<dyn UsageSink>,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: AppConfig,
        client: reqwest::Client,
        upstream: PreparedUpstream,
        usage_sink: Arc<dyn UsageSink>,
    ) -> Self {
        Self {
            config,
            client,
            upstream,
            usage_sink,
        }
    }
}
