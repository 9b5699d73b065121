pub mod decoder;
pub mod encoder;

use serde::{Deserialize, Serialize};

/// Instruction prepended as the first `system` message of every forwarded
/// conversation, unless overridden by `relay.system_prompt`.
pub const DEFAULT_SYSTEM_PROMPT: &str = r"You are TalkGPT, a friendly and enthusiastic AI study assistant designed for Gen Z students. Your personality is:

- Energetic and encouraging, using emojis appropriately
- Clear and concise in explanations
- Patient and supportive
- Able to break down complex topics into digestible parts
- Great at creating study materials like summaries, flashcards, and quizzes
- Skilled at explaining math formulas and solving problems step-by-step
- Helpful with homework and assignments across all subjects

When responding:
- Use markdown formatting for better readability
- Be encouraging and positive
- Provide practical study tips when relevant
- Ask follow-up questions to ensure understanding

Remember: You're here to help students learn and succeed! 🎓✨";

/// Placeholder text used when an image arrives with an empty user message.
pub const IMAGE_FALLBACK_PROMPT: &str = "Please analyze this image and help me understand it.";

/// Chat request wire type as the web client submits it.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequestBody {
    #[serde(default)]
    pub messages: Vec<ConversationMessage>,
    #[serde(default)]
    pub data: Option<AttachmentData>,
}

/// One turn of the conversation.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// Request-level attachment block.
#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentData {
    #[serde(default)]
    pub image: Option<String>,
}

/// Image attached to the conversation, if any. The request-level attachment
/// wins over an image carried inline on the latest user turn.
#[must_use]
pub fn attached_image(request: &ChatRequestBody) -> Option<&str> {
    if let Some(image) = request.data.as_ref().and_then(|data| data.image.as_deref()) {
        return Some(image);
    }
    request
        .messages
        .iter()
        .rev()
        .find(|message| message.role == "user")
        .and_then(|message| message.image.as_deref())
}

/// Chat completion payload sent upstream.
#[derive(Debug, Serialize)]
pub struct UpstreamPayload<'a> {
    pub model: &'a str,
    pub messages: Vec<OutboundMessage<'a>>,
    pub stream: bool,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// One outbound message, either plain text or two-part text plus image.
#[derive(Debug, Serialize)]
pub struct OutboundMessage<'a> {
    pub role: &'a str,
    pub content: OutboundContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum OutboundContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Debug, Serialize)]
pub struct ImageUrl<'a> {
    pub url: &'a str,
}

/// Build the upstream payload: system instruction first, then the client's
/// messages in order. When `image` is set, the latest user turn becomes
/// two-part content; an empty text beside the image is replaced with
/// [`IMAGE_FALLBACK_PROMPT`].
#[must_use]
pub fn build_upstream_payload<'a>(
    system_prompt: &'a str,
    messages: &'a [ConversationMessage],
    image: Option<&'a str>,
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
) -> UpstreamPayload<'a> {
    let image_target = match image {
        Some(_) => messages.iter().rposition(|message| message.role == "user"),
        None => None,
    };

    let mut outbound = Vec::with_capacity(messages.len() + 1);
    outbound.push(OutboundMessage {
        role: "system",
        content: OutboundContent::Text(system_prompt),
    });

    for (index, message) in messages.iter().enumerate() {
        let attach = match (image, image_target) {
            (Some(url), Some(target)) if index == target => Some(url),
            _ => None,
        };
        let content = match attach {
            Some(url) => {
                let text = if message.content.is_empty() {
                    IMAGE_FALLBACK_PROMPT
                } else {
                    message.content.as_str()
                };
                OutboundContent::Parts(vec![
                    ContentPart::Text { text },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url },
                    },
                ])
            }
            None => OutboundContent::Text(&message.content),
        };
        outbound.push(OutboundMessage {
            role: &message.role,
            content,
        });
    }

    UpstreamPayload {
        model,
        messages: outbound,
        stream: true,
        temperature,
        max_tokens,
    }
}
