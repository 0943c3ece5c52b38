//! Deterministic mock implementation of the shared `agent_provider` contract.
//!
//! This crate contains no transport/protocol logic and is intended for local
//! development and contract-level integration testing. Responses are served
//! from a script in order; every prompt the provider receives is recorded.

use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::{Mutex, MutexGuard};

use agent_provider::{
    CancelSignal, LlmProvider, LlmResponse, ProviderProfile, ProviderStability, ToolCall,
    ToolSchema, TransportError,
};

/// Stable provider identifier used for explicit startup selection.
pub const MOCK_PROVIDER_ID: &str = "mock";

/// One scripted provider turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockTurn {
    Respond(LlmResponse),
    Fail(TransportError),
}

impl From<LlmResponse> for MockTurn {
    fn from(response: LlmResponse) -> Self {
        Self::Respond(response)
    }
}

#[derive(Debug, Default)]
struct ScriptState {
    turns: VecDeque<MockTurn>,
    prompts: Vec<String>,
    tool_names: Vec<Vec<String>>,
}

/// Deterministic mock provider used by `doc_agent` tests and local runs.
#[derive(Debug)]
pub struct MockProvider {
    model_id: String,
    stability: ProviderStability,
    state: Mutex<ScriptState>,
}

impl MockProvider {
    /// Creates a mock provider serving `turns` in order.
    ///
    /// Once the script is exhausted, every further call returns an empty
    /// non-terminal response.
    #[must_use]
    pub fn new(turns: Vec<MockTurn>) -> Self {
        Self {
            model_id: "mock".to_string(),
            stability: ProviderStability::Stable,
            state: Mutex::new(ScriptState {
                turns: turns.into(),
                ..ScriptState::default()
            }),
        }
    }

    /// Convenience constructor for scripts that never fail.
    #[must_use]
    pub fn from_responses(responses: Vec<LlmResponse>) -> Self {
        Self::new(responses.into_iter().map(MockTurn::Respond).collect())
    }

    #[must_use]
    pub fn with_stability(mut self, stability: ProviderStability) -> Self {
        self.stability = stability;
        self
    }

    #[must_use]
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        let model_id = model_id.into();
        if !model_id.trim().is_empty() {
            self.model_id = model_id.trim().to_string();
        }
        self
    }

    /// Prompts received so far, in call order.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        lock_unpoisoned(&self.state).prompts.clone()
    }

    /// Tool names published on each call, in call order.
    #[must_use]
    pub fn tool_names(&self) -> Vec<Vec<String>> {
        lock_unpoisoned(&self.state).tool_names.clone()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        lock_unpoisoned(&self.state).prompts.len()
    }

    #[must_use]
    pub fn remaining_turns(&self) -> usize {
        lock_unpoisoned(&self.state).turns.len()
    }
}

impl Default for MockProvider {
    /// A short script that inspects the package, writes a README, and finishes.
    fn default() -> Self {
        Self::from_responses(vec![
            LlmResponse::with_tool_calls(
                "Let me look at the package layout first.",
                vec![ToolCall::new(
                    "mock-call-1",
                    "list_directory",
                    r#"{"path":""}"#,
                )],
            ),
            LlmResponse::with_tool_calls(
                "Reading the manifest.",
                vec![ToolCall::new(
                    "mock-call-2",
                    "read_file",
                    r#"{"path":"manifest.yml"}"#,
                )],
            ),
            LlmResponse::with_tool_calls(
                "Writing the documentation.",
                vec![ToolCall::new(
                    "mock-call-3",
                    "write_file",
                    serde_json::json!({
                        "path": "_dev/build/docs/README.md",
                        "content": "# Package documentation\n\nGenerated by the mock provider.\n",
                    })
                    .to_string(),
                )],
            ),
            LlmResponse::finished("The README.md has been written. I am finished."),
        ])
    }
}

impl LlmProvider for MockProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: MOCK_PROVIDER_ID.to_string(),
            model_id: self.model_id.clone(),
            stability: self.stability,
        }
    }

    fn generate_response(
        &self,
        cancel: &CancelSignal,
        prompt: &str,
        tools: &[ToolSchema],
    ) -> Result<LlmResponse, TransportError> {
        if cancel.load(Ordering::SeqCst) {
            return Err(TransportError::Cancelled);
        }

        let mut state = lock_unpoisoned(&self.state);
        state.prompts.push(prompt.to_string());
        state
            .tool_names
            .push(tools.iter().map(|tool| tool.name.clone()).collect());

        match state.turns.pop_front() {
            Some(MockTurn::Respond(response)) => Ok(response),
            Some(MockTurn::Fail(error)) => Err(error),
            None => Ok(LlmResponse::pending("")),
        }
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
