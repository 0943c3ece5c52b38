use serde::{Deserialize, Serialize};

pub const TRANSCRIPT_VERSION: u32 = 1;

/// First line of every transcript file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TranscriptHeader {
    pub version: u32,
    pub task_id: String,
    pub started_at: String,
    /// Absolute package root the agent was sandboxed to.
    pub package_root: String,
    /// Display name of the provider that produced the run.
    pub provider: String,
}

/// One journal line after the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub seq: u64,
    pub ts: String,
    #[serde(flatten)]
    pub item: TranscriptItem,
}

/// One conversation item of an agent task execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TranscriptItem {
    UserText {
        text: String,
    },
    AssistantText {
        text: String,
    },
    ToolCall {
        call_id: String,
        tool_name: String,
        /// Raw JSON argument text exactly as the model produced it.
        arguments: String,
    },
    ToolResult {
        call_id: String,
        tool_name: String,
        text: String,
        is_error: bool,
    },
    TaskFinished {
        success: bool,
        final_content: String,
    },
}
