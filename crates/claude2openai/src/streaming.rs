//! Streaming conversion (SSE).
//!
//! Claude streams responses as Server-Sent Events (`event: <type>` plus a
//! `data: {json}` line per frame). OpenAI clients expect
//! `chat.completion.chunk` objects in `data:` frames, terminated by
//! `data: [DONE]`. This module reads the upstream SSE and emits OpenAI SSE
//! frames as raw strings.

use crate::translation::map_stop_reason;
use crate::types::{ChatCompletionChunk, ChunkChoice, ChunkDelta, StreamDelta, StreamEvent};
use anyhow::{Context, Result};
use async_stream::try_stream;
use futures::{Stream, StreamExt};
use serde_json::json;
use tracing::debug;

/// Per-stream state for turning Claude events into OpenAI chunks.
#[derive(Debug)]
pub struct ChunkTranslator {
    id: String,
    created: i64,
    model: String,
    stop_reason: Option<String>,
    finished: bool,
}

impl ChunkTranslator {
    pub fn new(model: impl Into<String>, created: i64) -> Self {
        Self {
            id: format!("chatcmpl-{}", uuid::Uuid::new_v4()),
            created,
            model: model.into(),
            stop_reason: None,
            finished: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether a terminal event (`message_stop` or `error`) has been seen.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Translate one upstream event into zero or more output frames.
    pub fn translate(&mut self, event: StreamEvent) -> Vec<String> {
        if self.finished {
            return Vec::new();
        }

        match event {
            StreamEvent::MessageStart { message } => {
                debug!(upstream_id = %message.id, model = %message.model, "stream started");
                vec![self.chunk_frame(
                    ChunkDelta {
                        role: Some("assistant".to_string()),
                        content: None,
                    },
                    None,
                )]
            }
            StreamEvent::ContentBlockDelta {
                delta: StreamDelta::TextDelta { text },
                ..
            } => vec![self.chunk_frame(
                ChunkDelta {
                    role: None,
                    content: Some(text),
                },
                None,
            )],
            StreamEvent::MessageDelta { delta, .. } => {
                if delta.stop_reason.is_some() {
                    self.stop_reason = delta.stop_reason;
                }
                Vec::new()
            }
            StreamEvent::MessageStop => self.finish(),
            StreamEvent::Error { error } => {
                self.finished = true;
                vec![data_frame(&json!({ "error": error }).to_string())]
            }
            StreamEvent::ContentBlockStart { .. }
            | StreamEvent::ContentBlockDelta { .. }
            | StreamEvent::ContentBlockStop { .. }
            | StreamEvent::Ping
            | StreamEvent::Unknown => Vec::new(),
        }
    }

    /// Final chunk plus `[DONE]`. Also used when the upstream closes without
    /// sending `message_stop`.
    pub fn finish(&mut self) -> Vec<String> {
        if self.finished {
            return Vec::new();
        }
        self.finished = true;
        let reason = map_stop_reason(self.stop_reason.as_deref()).to_string();
        vec![
            self.chunk_frame(ChunkDelta::default(), Some(reason)),
            data_frame("[DONE]"),
        ]
    }

    fn chunk_frame(&self, delta: ChunkDelta, finish_reason: Option<String>) -> String {
        let chunk = ChatCompletionChunk {
            id: self.id.clone(),
            object: "chat.completion.chunk".to_string(),
            created: self.created,
            model: self.model.clone(),
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                finish_reason,
            }],
        };
        // Serializing plain structs with string keys cannot fail.
        data_frame(&serde_json::to_string(&chunk).unwrap_or_default())
    }
}

/// Convert an upstream Claude SSE response into OpenAI SSE frames.
///
/// The returned stream yields fully formatted SSE frames:
///
/// ```text
/// data: {...}
///
/// ```
pub fn handle_streaming(
    response: reqwest::Response,
    mut translator: ChunkTranslator,
) -> impl Stream<Item = Result<String>> + Send {
    try_stream! {
        // Raw bytes until a frame is complete; a multi-byte character may be
        // split across network chunks.
        let mut buffer: Vec<u8> = Vec::new();
        let mut stream = response.bytes_stream();

        'read: while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("failed to read upstream stream chunk")?;
            buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

            while let Some(frame) = split_sse_frame(&mut buffer) {
                let Some(event) = parse_event(&frame) else {
                    continue;
                };

                for out in translator.translate(event) {
                    yield out;
                }
                if translator.is_finished() {
                    break 'read;
                }
            }
        }

        if let Some(event) = parse_event(&String::from_utf8_lossy(&buffer)) {
            for out in translator.translate(event) {
                yield out;
            }
        }
        for out in translator.finish() {
            yield out;
        }
    }
}

fn data_frame(data: &str) -> String {
    format!("data: {}\n\n", data)
}

fn parse_event(frame: &str) -> Option<StreamEvent> {
    let data = extract_data_line(frame)?;
    match serde_json::from_str(data) {
        Ok(event) => Some(event),
        Err(e) => {
            debug!(error = %e, data, "skipping undecodable upstream SSE frame");
            None
        }
    }
}

/// Remove the first complete SSE frame from `buffer` and decode it.
///
/// SSE frames are separated by a blank line (`\n\n`).
fn split_sse_frame(buffer: &mut Vec<u8>) -> Option<String> {
    let idx = buffer.windows(2).position(|w| w == b"\n\n")?;
    let frame: Vec<u8> = buffer.drain(..idx + 2).collect();
    Some(String::from_utf8_lossy(&frame).into_owned())
}

fn extract_data_line(frame: &str) -> Option<&str> {
    for line in frame.lines() {
        if let Some(rest) = line.strip_prefix("data:") {
            return Some(rest.trim_start());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn event(s: &str) -> StreamEvent {
        serde_json::from_str(s).unwrap()
    }

    fn payload(frame: &str) -> Value {
        let data = frame
            .strip_prefix("data: ")
            .and_then(|s| s.strip_suffix("\n\n"))
            .unwrap();
        serde_json::from_str(data).unwrap()
    }

    #[test]
    fn message_start_emits_role_chunk() {
        let mut t = ChunkTranslator::new("claude-3-haiku-20240307", 42);
        let out = t.translate(event(
            r#"{"type":"message_start","message":{"id":"msg_1","type":"message","role":"assistant","model":"claude-3-haiku-20240307","content":[],"usage":{"input_tokens":5,"output_tokens":1}}}"#,
        ));
        assert_eq!(out.len(), 1);
        let v = payload(&out[0]);
        assert_eq!(v["object"], "chat.completion.chunk");
        assert_eq!(v["created"], 42);
        assert_eq!(v["model"], "claude-3-haiku-20240307");
        assert_eq!(v["choices"][0]["delta"]["role"], "assistant");
        assert!(v["choices"][0]["finish_reason"].is_null());
        assert!(v["id"].as_str().unwrap().starts_with("chatcmpl-"));
    }

    #[test]
    fn text_deltas_emit_content_chunks_with_stable_id() {
        let mut t = ChunkTranslator::new("m", 0);
        let a = t.translate(event(
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"He said \"hi\"\n"}}"#,
        ));
        let b = t.translate(event(
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"!"}}"#,
        ));
        let (a, b) = (payload(&a[0]), payload(&b[0]));
        assert_eq!(a["choices"][0]["delta"]["content"], "He said \"hi\"\n");
        assert_eq!(b["choices"][0]["delta"]["content"], "!");
        assert_eq!(a["id"], b["id"]);
        assert_eq!(a["id"], t.id());
    }

    #[test]
    fn message_stop_emits_finish_and_done() {
        let mut t = ChunkTranslator::new("m", 0);
        assert!(t
            .translate(event(
                r#"{"type":"message_delta","delta":{"stop_reason":"max_tokens","stop_sequence":null},"usage":{"output_tokens":9}}"#,
            ))
            .is_empty());
        let out = t.translate(event(r#"{"type":"message_stop"}"#));
        assert_eq!(out.len(), 2);
        let v = payload(&out[0]);
        assert_eq!(v["choices"][0]["finish_reason"], "length");
        assert_eq!(v["choices"][0]["delta"], serde_json::json!({}));
        assert_eq!(out[1], "data: [DONE]\n\n");
        assert!(t.is_finished());
        assert!(t.finish().is_empty());
    }

    #[test]
    fn ignored_events_produce_nothing() {
        let mut t = ChunkTranslator::new("m", 0);
        for raw in [
            r#"{"type":"ping"}"#,
            r#"{"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#,
            r#"{"type":"content_block_stop","index":0}"#,
            r#"{"type":"content_block_delta","index":1,"delta":{"type":"input_json_delta","partial_json":"{"}}"#,
        ] {
            assert!(t.translate(event(raw)).is_empty(), "{raw}");
        }
        assert!(!t.is_finished());
    }

    #[test]
    fn error_event_ends_stream() {
        let mut t = ChunkTranslator::new("m", 0);
        let out = t.translate(event(
            r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#,
        ));
        assert_eq!(out.len(), 1);
        let v = payload(&out[0]);
        assert_eq!(v["error"]["type"], "overloaded_error");
        assert_eq!(v["error"]["message"], "Overloaded");
        assert!(t.is_finished());
        assert!(t.finish().is_empty());
    }

    #[test]
    fn finish_without_message_stop_defaults_to_stop() {
        let mut t = ChunkTranslator::new("m", 0);
        let out = t.finish();
        assert_eq!(payload(&out[0])["choices"][0]["finish_reason"], "stop");
        assert_eq!(out[1], "data: [DONE]\n\n");
    }

    #[test]
    fn sse_frames_split_on_blank_line() {
        let mut buf = b"event: ping\ndata: {\"type\":\"ping\"}\n\nevent: message_stop\ndata: {".to_vec();
        let frame = split_sse_frame(&mut buf).unwrap();
        assert_eq!(frame, "event: ping\ndata: {\"type\":\"ping\"}\n\n");
        assert_eq!(buf, b"event: message_stop\ndata: {");
        assert!(split_sse_frame(&mut buf).is_none());
        assert_eq!(extract_data_line(&frame), Some("{\"type\":\"ping\"}"));
        assert!(parse_event(&String::from_utf8_lossy(&buf)).is_none());
    }

    #[test]
    fn multibyte_text_split_across_reads_survives() {
        let raw = "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"h\u{e9}llo\"}}\n\n"
            .as_bytes();
        // Cut between the two bytes of `é` (0xC3 0xA9).
        let cut = raw.iter().position(|b| *b == 0xC3).unwrap() + 1;

        let mut buf = raw[..cut].to_vec();
        assert!(split_sse_frame(&mut buf).is_none());
        buf.extend_from_slice(&raw[cut..]);
        let frame = split_sse_frame(&mut buf).unwrap();

        let mut t = ChunkTranslator::new("m", 0);
        let out = t.translate(parse_event(&frame).unwrap());
        assert_eq!(payload(&out[0])["choices"][0]["delta"]["content"], "h\u{e9}llo");
        assert!(buf.is_empty());
    }
}
