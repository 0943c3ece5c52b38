//! Transport-only client primitives for OpenAI-compatible chat completion
//! servers (Ollama, LocalAI, vLLM, hosted gateways).
//!
//! This crate owns request building, retry, cancellation and response parsing
//! for the `/v1/chat/completions` endpoint only. It knows nothing about agent
//! loops or tool execution; tool calls are surfaced exactly as the server
//! returned them.

pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod payload;
pub mod response;
pub mod retry;
pub mod url;

pub use client::{CancellationSignal, OpenAiCompatClient};
pub use config::OpenAiCompatConfig;
pub use error::OpenAiCompatError;
pub use headers::mask_api_key;
pub use payload::{ChatCompletionRequest, ChatMessage, ChatTool, FunctionDefinition};
pub use response::{ChatChoice, ChatCompletionResponse, ResponseMessage, ResponseToolCall};
pub use url::normalize_chat_completions_url;
