//! Minimal provider-agnostic contract for one model turn.
//!
//! This crate defines the value types exchanged between the agent loop and an
//! LLM provider, plus the [`LlmProvider`] trait itself. It excludes transport
//! details, vendor payloads, and any loop or session orchestration.

use std::fmt;
use std::sync::{atomic::AtomicBool, Arc};

use serde_json::Value;

/// Shared cancellation flag for an in-flight provider call.
pub type CancelSignal = Arc<AtomicBool>;

/// Iteration budget used for providers that reliably reach a terminal answer.
pub const STABLE_ITERATION_BUDGET: usize = 15;
/// Iteration budget used for providers known to stall or emit empty turns.
pub const UNSTABLE_ITERATION_BUDGET: usize = 20;

/// Error returned while constructing/configuring a provider before any call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInitError {
    message: String,
}

impl ProviderInitError {
    /// Creates a new provider initialization error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the underlying error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ProviderInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProviderInitError {}

impl From<String> for ProviderInitError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ProviderInitError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Failure of a single provider call.
///
/// Any vendor-specific failure (unreachable endpoint, non-2xx status,
/// undecodable payload) is flattened into [`TransportError::Failed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    Cancelled,
    Failed { message: String },
}

impl TransportError {
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("request was cancelled"),
            Self::Failed { message } => f.write_str(message),
        }
    }
}

impl std::error::Error for TransportError {}

/// JSON-schema-described tool published to providers.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// One structured tool invocation requested by the model.
///
/// `id` is opaque and only used for correlation; providers may repeat calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments_json: String,
}

impl ToolCall {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments_json: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments_json: arguments_json.into(),
        }
    }
}

/// Provider-neutral result of one model turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LlmResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    /// Advisory stop signal derived from vendor-specific stop reasons.
    pub finished: bool,
}

impl LlmResponse {
    /// A terminal text answer with no tool calls.
    #[must_use]
    pub fn finished(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
            finished: true,
        }
    }

    /// A non-terminal turn requesting the given tool calls.
    #[must_use]
    pub fn with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: content.into(),
            tool_calls,
            finished: false,
        }
    }

    /// A non-terminal text turn with no tool calls.
    #[must_use]
    pub fn pending(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
            finished: false,
        }
    }
}

/// How reliably a provider reaches a terminal answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProviderStability {
    #[default]
    Stable,
    Unstable,
}

impl ProviderStability {
    /// Maximum provider calls allowed for one task execution.
    #[must_use]
    pub fn iteration_budget(self) -> usize {
        match self {
            Self::Stable => STABLE_ITERATION_BUDGET,
            Self::Unstable => UNSTABLE_ITERATION_BUDGET,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Unstable => "unstable",
        }
    }
}

/// Immutable metadata describing a provider, set at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub provider_id: String,
    pub model_id: String,
    pub stability: ProviderStability,
}

/// Provider interface for generating one model turn.
pub trait LlmProvider: Send + Sync + 'static {
    /// Returns provider/model identity metadata.
    fn profile(&self) -> ProviderProfile;

    /// Human-readable provider name used in logs and progress output.
    fn name(&self) -> String {
        let profile = self.profile();
        format!("{} ({})", profile.provider_id, profile.model_id)
    }

    /// Generates one response for the flattened conversation text.
    ///
    /// Implementations must return [`TransportError::Cancelled`] promptly once
    /// `cancel` is set, bounded by their own transport timeout.
    fn generate_response(
        &self,
        cancel: &CancelSignal,
        prompt: &str,
        tools: &[ToolSchema],
    ) -> Result<LlmResponse, TransportError>;
}
