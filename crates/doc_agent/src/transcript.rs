//! Optional per-task JSONL journal, backed by `session_store`.
//!
//! Journal failures are logged and never abort a task.

use std::path::{Path, PathBuf};

use agent_provider::ToolCall;
use session_store::{TranscriptItem, TranscriptWriter};
use tracing::{debug, warn};

use crate::agent::TaskResult;

/// Creates one transcript file per task execution in a fixed directory.
#[derive(Debug, Clone)]
pub struct TranscriptRecorder {
    dir: PathBuf,
    package_root: PathBuf,
    provider: String,
    written: Vec<PathBuf>,
}

impl TranscriptRecorder {
    pub fn new(
        dir: impl Into<PathBuf>,
        package_root: impl Into<PathBuf>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            dir: dir.into(),
            package_root: package_root.into(),
            provider: provider.into(),
            written: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Transcript files created so far, oldest first.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn start_task(&mut self) -> Option<TaskTranscript> {
        match TranscriptWriter::create(&self.dir, &self.package_root, &self.provider) {
            Ok(writer) => {
                debug!(path = %writer.path().display(), "opened task transcript");
                self.written.push(writer.path().to_path_buf());
                Some(TaskTranscript { writer })
            }
            Err(error) => {
                warn!(%error, "failed to create task transcript; continuing without one");
                None
            }
        }
    }
}

/// Journal handle for a single task execution.
pub struct TaskTranscript {
    writer: TranscriptWriter,
}

impl TaskTranscript {
    pub fn path(&self) -> &Path {
        self.writer.path()
    }

    pub fn user(&mut self, text: &str) {
        self.record(TranscriptItem::UserText {
            text: text.to_string(),
        });
    }

    pub fn assistant(&mut self, text: &str) {
        self.record(TranscriptItem::AssistantText {
            text: text.to_string(),
        });
    }

    pub fn tool_call(&mut self, call: &ToolCall) {
        self.record(TranscriptItem::ToolCall {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            arguments: call.arguments_json.clone(),
        });
    }

    pub fn tool_result(&mut self, call: &ToolCall, text: &str, is_error: bool) {
        self.record(TranscriptItem::ToolResult {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            text: text.to_string(),
            is_error,
        });
    }

    pub fn finished(&mut self, result: &TaskResult) {
        self.record(TranscriptItem::TaskFinished {
            success: result.success,
            final_content: result.final_content.clone(),
        });
    }

    fn record(&mut self, item: TranscriptItem) {
        if let Err(error) = self.writer.record(item) {
            warn!(path = %self.writer.path().display(), %error, "failed to append transcript entry");
        }
    }
}
