use bytes::Bytes;

use crate::util::push_json_string_escaped;

const DELTA_FRAME_PREFIX: &str = "data: {\"choices\":[{\"delta\":{\"content\":";
const DELTA_FRAME_SUFFIX: &str = "}}]}\n\n";

/// Synthetic closing record emitted when the upstream signals `[DONE]`.
pub const STOP_FRAME: &str = "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n";

/// Encode one extracted text fragment into an output frame.
///
/// The frame is built directly rather than through `serde_json` so the
/// envelope stays byte-stable; only the fragment itself is escaped.
#[must_use]
pub fn delta_frame(fragment: &str) -> Bytes {
    let mut out = String::with_capacity(
        DELTA_FRAME_PREFIX.len() + fragment.len() + 16 + DELTA_FRAME_SUFFIX.len(),
    );
    out.push_str(DELTA_FRAME_PREFIX);
    push_json_string_escaped(&mut out, fragment);
    out.push_str(DELTA_FRAME_SUFFIX);
    Bytes::from(out)
}

#[must_use]
pub fn stop_frame() -> Bytes {
    Bytes::from_static(STOP_FRAME.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::{delta_frame, stop_frame};

    #[test]
    fn test_delta_frame_exact_bytes() {
        assert_eq!(
            delta_frame("Hi"),
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n".as_bytes()
        );
        assert_eq!(
            delta_frame(" there"),
            "data: {\"choices\":[{\"delta\":{\"content\":\" there\"}}]}\n\n".as_bytes()
        );
    }

    #[test]
    fn test_delta_frame_payload_is_valid_json() {
        let frame = delta_frame("mix \"quotes\"\nand\tnewlines");
        let text = std::str::from_utf8(&frame).expect("utf8 frame");
        let payload = text
            .strip_prefix("data: ")
            .and_then(|rest| rest.strip_suffix("\n\n"))
            .expect("framed payload");
        let value: serde_json::Value = serde_json::from_str(payload).expect("parse frame");
        assert_eq!(
            value["choices"][0]["delta"]["content"],
            "mix \"quotes\"\nand\tnewlines"
        );
    }

    #[test]
    fn test_delta_frame_matches_serde_escaping() {
        for fragment in ["plain", "with \\ slash", "emoji 🎓✨", "ctrl \u{01} char"] {
            let frame = delta_frame(fragment);
            let expected = format!(
                "data: {{\"choices\":[{{\"delta\":{{\"content\":{}}}}}]}}\n\n",
                serde_json::to_string(fragment).expect("serialize fragment")
            );
            assert_eq!(frame, expected.as_bytes());
        }
    }

    #[test]
    fn test_stop_frame_exact_bytes() {
        assert_eq!(
            stop_frame(),
            "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n".as_bytes()
        );
    }
}
