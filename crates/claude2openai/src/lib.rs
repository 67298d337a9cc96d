//! claude2openai - serve the OpenAI chat completions API on top of Claude.
//!
//! OpenAI clients speak `/v1/chat/completions`. This crate exposes that HTTP
//! surface, translates each request into an Anthropic `/v1/messages` call
//! using the caller's bearer token as the Claude API key, and translates the
//! response back (including SSE streaming).
//!
//! Design goals:
//! - Accept stock OpenAI SDK traffic (`chat.completion` / `chat.completion.chunk`).
//! - Map unknown model names onto a configurable Claude allowlist.
//! - Surface Claude API errors with their original status and error type.

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod server;
pub mod streaming;
pub mod translation;
pub mod types;

pub use config::ProxyConfig;
pub use error::ProxyError;
pub use server::serve;
