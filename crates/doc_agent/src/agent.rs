use std::sync::atomic::Ordering;
use std::sync::Arc;

use agent_provider::{CancelSignal, LlmProvider, TransportError};
use thiserror::Error;
use tracing::{debug, info, instrument, trace, warn};

use crate::tools::{ToolRegistry, ToolResult};
use crate::transcript::TranscriptRecorder;

/// User entry appended when the model neither called a tool nor finished.
pub const NUDGE_PROMPT: &str = "Please complete the task or use the available tools to gather the information you need. If the task is complete, please indicate that you are finished.";
/// Final content of a task that ran out of iterations.
pub const EXHAUSTED_MESSAGE: &str = "Task did not complete within maximum iterations";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    #[error("failed to get LLM response: {0}")]
    Provider(#[source] TransportError),
    #[error("agent task was cancelled")]
    Cancelled,
}

impl From<TransportError> for AgentError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Cancelled => Self::Cancelled,
            other => Self::Provider(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    User,
    Assistant,
    ToolResult,
}

/// One item of the rendered conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationEntry {
    pub kind: EntryKind,
    pub text: String,
}

impl ConversationEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::Assistant,
            text: text.into(),
        }
    }

    pub fn tool_result(text: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::ToolResult,
            text: text.into(),
        }
    }
}

/// Outcome of one task execution.
///
/// `success == false` means the iteration budget ran out; it is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    pub success: bool,
    pub final_content: String,
    pub conversation: Vec<ConversationEntry>,
}

/// Renders the conversation as `Human:` / `Assistant:` / `Tool Result:` blocks.
pub fn render_prompt(conversation: &[ConversationEntry]) -> String {
    let mut out = String::new();
    for entry in conversation {
        let label = match entry.kind {
            EntryKind::User => "Human: ",
            EntryKind::Assistant => "Assistant: ",
            EntryKind::ToolResult => "Tool Result: ",
        };
        out.push_str(label);
        out.push_str(&entry.text);
        out.push_str("\n\n");
    }
    out
}

/// Bounded provider/tool loop for a single prompt.
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: ToolRegistry,
    max_iterations: usize,
    transcripts: Option<TranscriptRecorder>,
}

impl Agent {
    /// The iteration budget is taken from the provider's declared stability.
    pub fn new(provider: Arc<dyn LlmProvider>, tools: ToolRegistry) -> Self {
        let max_iterations = provider.profile().stability.iteration_budget();
        Self {
            provider,
            tools,
            max_iterations,
            transcripts: None,
        }
    }

    #[must_use]
    pub fn with_transcripts(mut self, recorder: TranscriptRecorder) -> Self {
        self.transcripts = Some(recorder);
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn transcripts(&self) -> Option<&TranscriptRecorder> {
        self.transcripts.as_ref()
    }

    #[instrument(
        name = "execute_task",
        skip_all,
        fields(provider = %self.provider.name(), max_iterations = self.max_iterations)
    )]
    pub fn execute_task(
        &mut self,
        prompt: &str,
        cancel: &CancelSignal,
    ) -> Result<TaskResult, AgentError> {
        let mut conversation = vec![ConversationEntry::user(prompt)];
        let mut transcript = self
            .transcripts
            .as_mut()
            .and_then(TranscriptRecorder::start_task);
        if let Some(transcript) = transcript.as_mut() {
            transcript.user(prompt);
        }

        let schemas = self.tools.schemas();

        for iteration in 0..self.max_iterations {
            ensure_not_cancelled(cancel)?;

            let rendered = render_prompt(&conversation);
            debug!(iteration, prompt_len = rendered.len(), "requesting provider turn");
            let response = self
                .provider
                .generate_response(cancel, &rendered, &schemas)?;
            trace!(content = %response.content, "provider turn content");

            conversation.push(ConversationEntry::assistant(response.content.clone()));
            if let Some(transcript) = transcript.as_mut() {
                transcript.assistant(&response.content);
            }

            if !response.tool_calls.is_empty() {
                for call in &response.tool_calls {
                    ensure_not_cancelled(cancel)?;

                    let (text, is_error) = match self.tools.dispatch(call) {
                        Err(error) => (format!("Tool {} failed: {error}", call.name), true),
                        Ok(ToolResult {
                            error: Some(message),
                            ..
                        }) => (format!("Tool {} error: {message}", call.name), true),
                        Ok(result) => (
                            format!("Tool {} result: {}", call.name, result.content),
                            false,
                        ),
                    };
                    info!(call_id = %call.id, tool = %call.name, ok = !is_error, "dispatched tool call");

                    if let Some(transcript) = transcript.as_mut() {
                        transcript.tool_call(call);
                        transcript.tool_result(call, &text, is_error);
                    }
                    conversation.push(ConversationEntry::tool_result(text));
                }
            } else if response.finished {
                info!(iteration, "provider finished task");
                let result = TaskResult {
                    success: true,
                    final_content: response.content,
                    conversation,
                };
                if let Some(transcript) = transcript.as_mut() {
                    transcript.finished(&result);
                }
                return Ok(result);
            } else {
                debug!(iteration, "provider turn had no tool calls and did not finish");
                conversation.push(ConversationEntry::user(NUDGE_PROMPT));
                if let Some(transcript) = transcript.as_mut() {
                    transcript.user(NUDGE_PROMPT);
                }
            }
        }

        warn!(max_iterations = self.max_iterations, "iteration budget exhausted");
        let result = TaskResult {
            success: false,
            final_content: EXHAUSTED_MESSAGE.to_string(),
            conversation,
        };
        if let Some(transcript) = transcript.as_mut() {
            transcript.finished(&result);
        }
        Ok(result)
    }
}

fn ensure_not_cancelled(cancel: &CancelSignal) -> Result<(), AgentError> {
    if cancel.load(Ordering::SeqCst) {
        Err(AgentError::Cancelled)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_prompt_labels_each_entry_and_separates_with_blank_lines() {
        let conversation = vec![
            ConversationEntry::user("document it"),
            ConversationEntry::assistant(""),
            ConversationEntry::tool_result("Tool read_file result: hi"),
        ];

        assert_eq!(
            render_prompt(&conversation),
            "Human: document it\n\nAssistant: \n\nTool Result: Tool read_file result: hi\n\n"
        );
    }

    #[test]
    fn transport_cancel_maps_to_agent_cancel() {
        assert_eq!(
            AgentError::from(TransportError::Cancelled),
            AgentError::Cancelled
        );
        assert_eq!(
            AgentError::from(TransportError::failed("HTTP 500")).to_string(),
            "failed to get LLM response: HTTP 500"
        );
    }
}
