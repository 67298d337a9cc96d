//! OpenAI <-> Claude translation.
//!
//! This module implements the core format conversions:
//! - OpenAI `chat/completions` request -> Claude `/v1/messages` request
//! - Claude `/v1/messages` response -> OpenAI `chat.completion`

use crate::error::ProxyError;
use crate::types::{
    AssistantMessage, ChatCompletionRequest, ChatCompletionResponse, ChatContent, Choice,
    CompletionUsage, Content, ContentBlock, ContentPart, ImageSource, Message, MessagesRequest,
    MessagesResponse, RequestMetadata, ResponseBlock, Role,
};

/// Used when the client sends neither `max_tokens` nor `max_completion_tokens`.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Convert an OpenAI chat completion request into a Claude Messages request.
///
/// `req.model` is copied as-is; callers resolve it against the allowlist first.
pub fn to_claude_request(
    req: &ChatCompletionRequest,
    default_max_tokens: u32,
) -> Result<MessagesRequest, ProxyError> {
    let mut system_parts: Vec<String> = Vec::new();
    let mut messages: Vec<Message> = Vec::with_capacity(req.messages.len());

    for msg in &req.messages {
        let role = match msg.role.as_str() {
            "system" | "developer" => {
                let text = msg.content.to_plaintext();
                if !text.is_empty() {
                    system_parts.push(text);
                }
                continue;
            }
            "user" => Role::User,
            "assistant" => Role::Assistant,
            other => {
                return Err(ProxyError::InvalidRequest(format!(
                    "unsupported message role: {other}"
                )))
            }
        };

        messages.push(Message {
            role,
            content: convert_content(&msg.content),
        });
    }

    let system = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n\n"))
    };

    Ok(MessagesRequest {
        model: req.model.clone(),
        max_tokens: req
            .max_completion_tokens
            .or(req.max_tokens)
            .unwrap_or(default_max_tokens),
        messages,
        system,
        stream: req.stream,
        temperature: req.temperature,
        top_k: None,
        top_p: req.top_p,
        stop_sequences: req.stop.clone().map(|s| s.into_vec()),
        metadata: req.user.clone().map(|user_id| RequestMetadata { user_id }),
    })
}

fn convert_content(content: &ChatContent) -> Content {
    match content {
        ChatContent::Text(s) => Content::String(s.clone()),
        ChatContent::Parts(parts) => Content::Blocks(
            parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text { text } => ContentBlock::Text { text: text.clone() },
                    ContentPart::ImageUrl { image_url } => ContentBlock::Image {
                        source: image_source(&image_url.url),
                    },
                })
                .collect(),
        ),
    }
}

/// `data:<media>;base64,<data>` URLs are inlined; anything else is passed by URL.
fn image_source(url: &str) -> ImageSource {
    url.strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
        .map(|(media_type, data)| ImageSource::Base64 {
            media_type: media_type.to_string(),
            data: data.to_string(),
        })
        .unwrap_or_else(|| ImageSource::Url {
            url: url.to_string(),
        })
}

/// Convert a Claude Messages response into an OpenAI chat completion.
pub fn from_claude_response(resp: MessagesResponse, created: i64) -> ChatCompletionResponse {
    let content: String = resp
        .content
        .iter()
        .filter_map(|block| match block {
            ResponseBlock::Text { text } => Some(text.as_str()),
            ResponseBlock::Other => None,
        })
        .collect();

    let usage = CompletionUsage {
        prompt_tokens: resp.usage.input_tokens,
        completion_tokens: resp.usage.output_tokens,
        total_tokens: resp.usage.input_tokens.saturating_add(resp.usage.output_tokens),
    };

    ChatCompletionResponse {
        id: resp.id,
        object: "chat.completion".to_string(),
        created,
        model: resp.model,
        choices: vec![Choice {
            index: 0,
            message: AssistantMessage {
                role: "assistant".to_string(),
                content,
            },
            logprobs: None,
            finish_reason: map_stop_reason(resp.stop_reason.as_deref()).to_string(),
        }],
        usage,
    }
}

/// Map a Claude `stop_reason` onto an OpenAI `finish_reason`.
pub fn map_stop_reason(reason: Option<&str>) -> &'static str {
    match reason {
        Some("max_tokens") => "length",
        Some("tool_use") => "tool_calls",
        _ => "stop",
    }
}
