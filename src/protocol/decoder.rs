use std::borrow::Cow;

use serde::Deserialize;

/// Borrowed view over one upstream stream record, shaped to pull
/// `choices[0].delta.content` and nothing else. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct EventChunk<'a> {
    #[serde(default, borrow)]
    choices: Vec<ChunkChoice<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice<'a> {
    #[serde(default, borrow)]
    delta: Option<ChunkDelta<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta<'a> {
    #[serde(default, borrow)]
    content: Option<Cow<'a, str>>,
}

/// Outcome of extracting a text fragment from one `data:` payload.
#[derive(Debug)]
pub enum DeltaExtract<'a> {
    /// Non-empty incremental text.
    Fragment(Cow<'a, str>),
    /// Valid JSON without a usable `choices[0].delta.content`.
    NoContent,
    /// Payload is not valid JSON.
    Malformed,
}

/// Extract the incremental text fragment from one upstream record payload.
#[must_use]
pub fn extract_delta(payload: &str) -> DeltaExtract<'_> {
    let Ok(chunk) = serde_json::from_str::<EventChunk<'_>>(payload) else {
        return DeltaExtract::Malformed;
    };
    let content = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content);
    match content {
        Some(text) if !text.is_empty() => DeltaExtract::Fragment(text),
        _ => DeltaExtract::NoContent,
    }
}

#[cfg(test)]
mod tests {
    use super::{extract_delta, DeltaExtract};

    fn expect_fragment(payload: &str) -> String {
        match extract_delta(payload) {
            DeltaExtract::Fragment(text) => text.into_owned(),
            other => panic!("expected fragment, got {other:?}"),
        }
    }

    #[test]
    fn test_extracts_first_choice_content() {
        let payload = r#"{"id":"gen-1","choices":[{"delta":{"role":"assistant","content":"Hi"},"finish_reason":null}]}"#;
        assert_eq!(expect_fragment(payload), "Hi");
    }

    #[test]
    fn test_second_choice_is_ignored() {
        let payload =
            r#"{"choices":[{"delta":{"content":"first"}},{"delta":{"content":"second"}}]}"#;
        assert_eq!(expect_fragment(payload), "first");
    }

    #[test]
    fn test_escaped_content_is_unescaped() {
        let payload = r#"{"choices":[{"delta":{"content":"line\nbreak \"q\""}}]}"#;
        assert_eq!(expect_fragment(payload), "line\nbreak \"q\"");
    }

    #[test]
    fn test_role_only_delta_has_no_content() {
        let payload = r#"{"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert!(matches!(extract_delta(payload), DeltaExtract::NoContent));
    }

    #[test]
    fn test_finish_chunk_has_no_content() {
        let payload = r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        assert!(matches!(extract_delta(payload), DeltaExtract::NoContent));
    }

    #[test]
    fn test_empty_content_is_skipped() {
        let payload = r#"{"choices":[{"delta":{"content":""}}]}"#;
        assert!(matches!(extract_delta(payload), DeltaExtract::NoContent));
    }

    #[test]
    fn test_null_content_is_skipped() {
        let payload = r#"{"choices":[{"delta":{"content":null}}]}"#;
        assert!(matches!(extract_delta(payload), DeltaExtract::NoContent));
    }

    #[test]
    fn test_empty_choices_array() {
        let payload = r#"{"choices":[]}"#;
        assert!(matches!(extract_delta(payload), DeltaExtract::NoContent));
    }

    #[test]
    fn test_truncated_json_is_malformed() {
        let payload = r#"{"choices":[{"delta":{"content":"Hi"#;
        assert!(matches!(extract_delta(payload), DeltaExtract::Malformed));
    }

    #[test]
    fn test_non_json_payload_is_malformed() {
        assert!(matches!(extract_delta("not json"), DeltaExtract::Malformed));
    }
}
