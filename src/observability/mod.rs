use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::config::UsageSinkKind;

/// Initialize the tracing subscriber with the configured log level.
///
/// Maps config log levels to tracing levels:
/// - "DISABLED" -> no subscriber installed
/// - "WARNING" -> WARN
/// - "CRITICAL" -> ERROR
/// - Others map directly (DEBUG, INFO, ERROR)
pub fn init_tracing(log_level: &str) {
    let level = log_level.to_uppercase();

    if level == "DISABLED" {
        return;
    }

    let tracing_level = match level.as_str() {
        "WARNING" => "WARN",
        "CRITICAL" => "ERROR",
        other => other,
    };

    let filter = EnvFilter::try_new(tracing_level).unwrap_or_else(|_| EnvFilter::new("INFO"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// Coarse request lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageEvent {
    /// A chat request passed validation and is about to be forwarded.
    RequestReceived {
        message_count: usize,
        has_image: bool,
    },
    /// The transcoded stream ran to a clean close.
    StreamCompleted { fragment_count: u64 },
    /// The request or its stream failed; `category` matches
    /// [`crate::error::RelayError::category`].
    RequestFailed { category: &'static str },
}

/// Fire-and-forget observer for [`UsageEvent`]s.
///
/// The relay never awaits or retries a sink call: implementations must be
/// cheap and must not block the request path.
pub trait UsageSink: Send + Sync {
    fn record(&self, event: UsageEvent);
}

/// Sink that discards every event.
pub struct NoopUsageSink;

impl UsageSink for NoopUsageSink {
    fn record(&self, _event: UsageEvent) {}
}

/// Sink that reports usage events through tracing.
pub struct LogUsageSink;

impl UsageSink for LogUsageSink {
    fn record(&self, event: UsageEvent) {
        match event {
            UsageEvent::RequestReceived {
                message_count,
                has_image,
            } => {
                tracing::info!(message_count, has_image, "chat request accepted");
            }
            UsageEvent::StreamCompleted { fragment_count } => {
                tracing::info!(fragment_count, "chat stream completed");
            }
            UsageEvent::RequestFailed { category } => {
                tracing::warn!(category, "chat request failed");
            }
        }
    }
}

/// Build the configured usage sink.
#[must_use]
pub fn build_usage_sink(kind: UsageSinkKind) -> Arc<dyn UsageSink> {
    match kind {
        UsageSinkKind::Log => Arc::new(LogUsageSink),
        UsageSinkKind::None => Arc::new(NoopUsageSink),
    }
}
