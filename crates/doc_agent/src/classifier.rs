//! Sorts free-form agent text into token-limit, error, or completed.
//!
//! All matching is case-insensitive substring matching against a
//! [`PhraseTable`]. The table is plain data so it can be versioned, loaded
//! from YAML, and swapped in tests.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::agent::{ConversationEntry, EntryKind};

pub const PHRASE_TABLE_VERSION: u32 = 1;
const DEFAULT_RECENT_WINDOW: usize = 5;

#[derive(Debug, Error)]
pub enum PhraseTableError {
    #[error("failed to read phrase table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse phrase table {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("phrase table {path} has unsupported version {found}; expected {PHRASE_TABLE_VERSION}")]
    UnsupportedVersion { path: String, found: u32 },
}

/// Classifier vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhraseTable {
    pub version: u32,
    pub token_limit: Vec<String>,
    pub error: Vec<String>,
    pub success_markers: Vec<String>,
    pub failure_markers: Vec<String>,
    #[serde(default = "default_recent_window")]
    pub recent_window: usize,
}

fn default_recent_window() -> usize {
    DEFAULT_RECENT_WINDOW
}

fn owned(phrases: &[&str]) -> Vec<String> {
    phrases.iter().map(|phrase| (*phrase).to_string()).collect()
}

impl Default for PhraseTable {
    fn default() -> Self {
        Self {
            version: PHRASE_TABLE_VERSION,
            token_limit: owned(&[
                "I reached the maximum response length",
                "maximum response length",
                "reached the token limit",
                "response is too long",
                "breaking this into smaller tasks",
                "due to length constraints",
                "response length limit",
                "token limit reached",
                "output limit exceeded",
                "maximum length exceeded",
            ]),
            error: owned(&[
                "I encountered an error",
                "I'm experiencing an error",
                "I cannot complete",
                "I'm unable to complete",
                "Something went wrong",
                "There was an error",
                "I'm having trouble",
                "I failed to",
                "Error occurred",
                "Task did not complete within maximum iterations",
            ]),
            success_markers: owned(&["✅ success", "successfully wrote", "completed successfully"]),
            failure_markers: owned(&["❌ error", "failed:", "access denied"]),
            recent_window: DEFAULT_RECENT_WINDOW,
        }
    }
}

impl PhraseTable {
    /// Loads a YAML table, rejecting unknown fields and other versions.
    pub fn from_yaml_file(path: &Path) -> Result<Self, PhraseTableError> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| PhraseTableError::Io {
            path: display.clone(),
            source,
        })?;
        Self::from_yaml_str(&raw, &display)
    }

    pub fn from_yaml_str(raw: &str, origin: &str) -> Result<Self, PhraseTableError> {
        let table: Self = serde_yaml::from_str(raw).map_err(|source| PhraseTableError::Parse {
            path: origin.to_string(),
            source,
        })?;
        if table.version != PHRASE_TABLE_VERSION {
            return Err(PhraseTableError::UnsupportedVersion {
                path: origin.to_string(),
                found: table.version,
            });
        }
        Ok(table)
    }
}

/// Result of classifying a finished task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskClass {
    TokenLimit,
    Error,
    Completed,
}

impl TaskClass {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TokenLimit => "token_limit",
            Self::Error => "error",
            Self::Completed => "completed",
        }
    }
}

/// Classifies agent text against a phrase table.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    phrases: PhraseTable,
}

impl Classifier {
    pub fn new(phrases: PhraseTable) -> Self {
        Self { phrases }
    }

    pub fn phrases(&self) -> &PhraseTable {
        &self.phrases
    }

    pub fn is_token_limit(&self, content: &str) -> bool {
        contains_any(content, &self.phrases.token_limit)
    }

    /// Error phrases, unless a token-limit phrase matched or a newer tool
    /// success marker suppresses the match. Empty content is never an error.
    pub fn is_error(&self, content: &str, conversation: &[ConversationEntry]) -> bool {
        if content.trim().is_empty() || self.is_token_limit(content) {
            return false;
        }

        if !contains_any(content, &self.phrases.error) {
            return false;
        }

        !self.has_recent_success(conversation)
    }

    /// Scans the newest `recent_window` entries, newest first, stopping at the
    /// first tool result carrying either marker.
    pub fn has_recent_success(&self, conversation: &[ConversationEntry]) -> bool {
        for entry in conversation.iter().rev().take(self.phrases.recent_window) {
            if entry.kind != EntryKind::ToolResult {
                continue;
            }
            if contains_any(&entry.text, &self.phrases.success_markers) {
                return true;
            }
            if contains_any(&entry.text, &self.phrases.failure_markers) {
                return false;
            }
        }
        false
    }

    pub fn classify(&self, content: &str, conversation: &[ConversationEntry]) -> TaskClass {
        if self.is_token_limit(content) {
            TaskClass::TokenLimit
        } else if self.is_error(content, conversation) {
            TaskClass::Error
        } else {
            TaskClass::Completed
        }
    }
}

fn contains_any(content: &str, phrases: &[String]) -> bool {
    let lowered = content.to_lowercase();
    phrases
        .iter()
        .any(|phrase| lowered.contains(&phrase.to_lowercase()))
}
