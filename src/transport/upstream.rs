use crate::config::UpstreamConfig;

/// Precomputed upstream target: the full chat completion URL plus the static
/// header set sent on every call.
#[derive(Debug, Clone)]
pub struct PreparedUpstream {
    chat_url: String,
    chat_url_parsed: Option<url::Url>,
    static_headers: http::HeaderMap,
}

impl PreparedUpstream {
    /// Build a prepared upstream from configuration.
    #[must_use]
    pub fn new(upstream: &UpstreamConfig) -> Self {
        let base = upstream.base_url.trim_end_matches('/');
        let chat_url = format!("{base}/chat/completions");
        let chat_url_parsed = url::Url::parse(&chat_url).ok();
        let static_headers = Self::build_static_headers(upstream);

        Self {
            chat_url,
            chat_url_parsed,
            static_headers,
        }
    }

    #[must_use]
    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    #[must_use]
    pub fn chat_url_parsed(&self) -> Option<&url::Url> {
        self.chat_url_parsed.as_ref()
    }

    #[must_use]
    pub fn static_headers(&self) -> &http::HeaderMap {
        &self.static_headers
    }

    fn build_static_headers(upstream: &UpstreamConfig) -> http::HeaderMap {
        let mut headers = http::HeaderMap::new();
        headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        if let Some(key) = upstream.api_key.as_deref() {
            if let Ok(val) = http::HeaderValue::from_str(&format!("Bearer {key}")) {
                headers.insert(http::header::AUTHORIZATION, val);
            }
        }
        // OpenRouter attribution headers.
        if let Ok(val) = http::HeaderValue::from_str(&upstream.referer) {
            headers.insert("http-referer", val);
        }
        if let Ok(val) = http::HeaderValue::from_str(&upstream.title) {
            headers.insert("x-title", val);
        }
        headers
    }
}
