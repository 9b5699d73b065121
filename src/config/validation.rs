use super::{AppConfig, ConfigError};

/// Validate the full application config, returning an error if any rule is violated.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when any configuration invariant is violated.
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    validate_server_config(config)?;
    validate_upstream(config)?;
    validate_relay(config)?;
    validate_log_level(config)?;
    Ok(())
}

fn validation_err(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

fn validate_server_config(config: &AppConfig) -> Result<(), ConfigError> {
    let server = &config.server;
    if server.http_pool_max_idle_per_host == 0 {
        return Err(validation_err(
            "server.http_pool_max_idle_per_host must be greater than 0",
        ));
    }
    if let Some(worker_threads) = server.runtime_worker_threads {
        if worker_threads == 0 {
            return Err(validation_err(
                "server.runtime_worker_threads must be greater than 0 when set",
            ));
        }
    }
    if let Some(max_blocking_threads) = server.runtime_max_blocking_threads {
        if max_blocking_threads == 0 {
            return Err(validation_err(
                "server.runtime_max_blocking_threads must be greater than 0 when set",
            ));
        }
    }
    Ok(())
}

fn validate_upstream(config: &AppConfig) -> Result<(), ConfigError> {
    let upstream = &config.upstream;
    if !upstream.base_url.starts_with("http://") && !upstream.base_url.starts_with("https://") {
        return Err(validation_err(
            "upstream.base_url must start with http:// or https://",
        ));
    }
    url::Url::parse(&upstream.base_url)
        .map_err(|err| validation_err(format!("upstream.base_url is not a valid URL: {err}")))?;

    if let Some(key) = upstream.api_key.as_deref() {
        if key.trim().is_empty() {
            return Err(validation_err(
                "upstream.api_key cannot be blank when set",
            ));
        }
        if http::HeaderValue::from_str(&format!("Bearer {key}")).is_err() {
            return Err(validation_err(
                "upstream.api_key contains characters not allowed in an HTTP header",
            ));
        }
    }

    if upstream.model.trim().is_empty() {
        return Err(validation_err("upstream.model cannot be empty"));
    }
    if !(0.0..=2.0).contains(&upstream.temperature) {
        return Err(validation_err(
            "upstream.temperature must be between 0.0 and 2.0",
        ));
    }
    if upstream.max_tokens == 0 {
        return Err(validation_err("upstream.max_tokens must be greater than 0"));
    }
    if http::HeaderValue::from_str(&upstream.referer).is_err() {
        return Err(validation_err(
            "upstream.referer is not a valid HTTP header value",
        ));
    }
    if http::HeaderValue::from_str(&upstream.title).is_err() {
        return Err(validation_err(
            "upstream.title is not a valid HTTP header value",
        ));
    }
    Ok(())
}

fn validate_relay(config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(ref prompt) = config.relay.system_prompt {
        if prompt.trim().is_empty() {
            return Err(validation_err(
                "relay.system_prompt cannot be blank when set",
            ));
        }
    }
    Ok(())
}

fn validate_log_level(config: &AppConfig) -> Result<(), ConfigError> {
    let valid_levels = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL", "DISABLED"];
    if !valid_levels.contains(&config.features.log_level.to_uppercase().as_str()) {
        return Err(validation_err(format!(
            "log_level must be one of {valid_levels:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::*;

    fn make_valid_config() -> AppConfig {
        AppConfig {
            server: ServerConfig::default(),
            upstream: UpstreamConfig {
                api_key: Some("sk-or-test".to_string()),
                ..UpstreamConfig::default()
            },
            relay: RelayConfig::default(),
            features: FeaturesConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        let config = make_valid_config();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_missing_api_key_is_allowed() {
        // The relay starts without a key; chat requests answer with a 500
        // until one is provided.
        let mut config = make_valid_config();
        config.upstream.api_key = None;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_blank_api_key_rejected() {
        let mut config = make_valid_config();
        config.upstream.api_key = Some("  ".to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_api_key_with_newline_rejected() {
        let mut config = make_valid_config();
        config.upstream.api_key = Some("sk-or\nbad".to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_invalid_base_url_scheme() {
        let mut config = make_valid_config();
        config.upstream.base_url = "ftp://bad.url".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_unparseable_base_url() {
        let mut config = make_valid_config();
        config.upstream.base_url = "https://".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_empty_model() {
        let mut config = make_valid_config();
        config.upstream.model = "  ".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_temperature_out_of_range() {
        let mut config = make_valid_config();
        config.upstream.temperature = 2.5;
        assert!(validate_config(&config).is_err());
        config.upstream.temperature = -0.1;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_max_tokens() {
        let mut config = make_valid_config();
        config.upstream.max_tokens = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_invalid_referer_header_value() {
        let mut config = make_valid_config();
        config.upstream.referer = "https://example.com\nX-Evil: yes".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_invalid_title_header_value() {
        let mut config = make_valid_config();
        config.upstream.title = "Title\rwith\rreturns".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_blank_system_prompt_rejected() {
        let mut config = make_valid_config();
        config.relay.system_prompt = Some("   ".to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_system_prompt_override_valid() {
        let mut config = make_valid_config();
        config.relay.system_prompt = Some("You are a terse study assistant.".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = make_valid_config();
        config.features.log_level = "VERBOSE".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_lowercase_log_level_accepted() {
        let mut config = make_valid_config();
        config.features.log_level = "debug".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_invalid_pool_max_idle_per_host() {
        let mut config = make_valid_config();
        config.server.http_pool_max_idle_per_host = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_invalid_runtime_worker_threads() {
        let mut config = make_valid_config();
        config.server.runtime_worker_threads = Some(0);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_invalid_runtime_max_blocking_threads() {
        let mut config = make_valid_config();
        config.server.runtime_max_blocking_threads = Some(0);
        assert!(validate_config(&config).is_err());
    }
}
