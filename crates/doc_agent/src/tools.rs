use std::fs;
use std::path::Path;

use agent_provider::{ToolCall, ToolSchema};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::sandbox::{Sandbox, SandboxError};

pub const LIST_DIRECTORY: &str = "list_directory";
pub const READ_FILE: &str = "read_file";
pub const WRITE_FILE: &str = "write_file";

/// Domain failure of a tool; always folded into the transcript.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    AccessDenied(#[from] SandboxError),
    #[error("failed to {operation}: no such file or directory: {path}")]
    NotFound { operation: &'static str, path: String },
    #[error("failed to {operation}: {source}")]
    Io {
        operation: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse arguments: {0}")]
    InvalidArguments(#[source] serde_json::Error),
}

impl ToolError {
    fn io(operation: &'static str, path: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound {
                operation,
                path: path.to_string(),
            }
        } else {
            Self::Io {
                operation,
                path: path.to_string(),
                source,
            }
        }
    }
}

/// Outcome of one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub content: String,
    pub error: Option<String>,
}

impl ToolResult {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            error: Some(error.into()),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl From<Result<String, ToolError>> for ToolResult {
    fn from(result: Result<String, ToolError>) -> Self {
        match result {
            Ok(content) => Self::ok(content),
            Err(error) => Self::fail(error.to_string()),
        }
    }
}

/// Raised only when the requested tool does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolDispatchError {
    #[error("tool not found: {0}")]
    UnknownTool(String),
}

#[derive(Debug, Deserialize)]
struct ListDirectoryArgs {
    path: String,
}

#[derive(Debug, Deserialize)]
struct ReadFileArgs {
    path: String,
}

#[derive(Debug, Deserialize)]
struct WriteFileArgs {
    path: String,
    content: String,
}

/// The fixed set of package tools, bound to one sandbox.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    sandbox: Sandbox,
}

impl ToolRegistry {
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }

    /// Schemas published to the provider on every turn.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        vec![
            ToolSchema {
                name: LIST_DIRECTORY.to_string(),
                description: "List files and directories in a given path within the package"
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "Directory path relative to package root (empty string for package root)",
                        },
                    },
                    "required": ["path"],
                }),
            },
            ToolSchema {
                name: READ_FILE.to_string(),
                description: "Read the contents of a file within the package.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "File path relative to package root",
                        },
                    },
                    "required": ["path"],
                }),
            },
            ToolSchema {
                name: WRITE_FILE.to_string(),
                description: "Write content to a file within the package. This tool can only write in _dev/build/docs/."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "File path relative to package root",
                        },
                        "content": {
                            "type": "string",
                            "description": "Content to write to the file",
                        },
                    },
                    "required": ["path", "content"],
                }),
            },
        ]
    }

    /// Executes one call. Domain failures land in [`ToolResult::error`].
    pub fn dispatch(&self, call: &ToolCall) -> Result<ToolResult, ToolDispatchError> {
        let result = match call.name.as_str() {
            LIST_DIRECTORY => decode::<ListDirectoryArgs>(&call.arguments_json)
                .and_then(|args| self.list_directory(&args.path)),
            READ_FILE => decode::<ReadFileArgs>(&call.arguments_json)
                .and_then(|args| self.read_file(&args.path)),
            WRITE_FILE => decode::<WriteFileArgs>(&call.arguments_json)
                .and_then(|args| self.write_file(&args.path, &args.content)),
            unknown => return Err(ToolDispatchError::UnknownTool(unknown.to_string())),
        };

        if let Err(error) = &result {
            debug!(call_id = %call.id, tool = %call.name, %error, "tool returned an error");
        }

        Ok(ToolResult::from(result))
    }

    fn list_directory(&self, path: &str) -> Result<String, ToolError> {
        let resolved = self.sandbox.resolve_enumerate(path)?;
        let read_dir =
            fs::read_dir(&resolved).map_err(|error| ToolError::io("read directory", path, error))?;

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|error| ToolError::io("read directory", path, error))?;
            let entry_path = entry.path();
            if self.sandbox.is_excluded(&entry_path) {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            let line = match entry.metadata() {
                Ok(metadata) if metadata.is_dir() => format!("  {name}/ (directory)"),
                Ok(metadata) => format!("  {name} (file, {} bytes)", metadata.len()),
                Err(_) => format!("  {name} (file)"),
            };
            entries.push((name, line));
        }
        entries.sort_by(|left, right| left.0.cmp(&right.0));

        let mut listing = format!("Contents of {path}:\n");
        for (_, line) in entries {
            listing.push_str(&line);
            listing.push('\n');
        }
        Ok(listing)
    }

    fn read_file(&self, path: &str) -> Result<String, ToolError> {
        let resolved = self.sandbox.resolve_read(path)?;
        fs::read_to_string(&resolved).map_err(|error| ToolError::io("read file", path, error))
    }

    fn write_file(&self, path: &str, content: &str) -> Result<String, ToolError> {
        let resolved = self.sandbox.resolve_write(path)?;
        if let Some(parent) = resolved.parent() {
            create_parent_dirs(parent, path)?;
        }

        fs::write(&resolved, content).map_err(|error| ToolError::io("write file", path, error))?;
        Ok(format!(
            "Successfully wrote {} bytes to {path}",
            content.len()
        ))
    }
}

fn decode<T: DeserializeOwned>(arguments_json: &str) -> Result<T, ToolError> {
    serde_json::from_str(arguments_json).map_err(ToolError::InvalidArguments)
}

fn create_parent_dirs(parent: &Path, requested: &str) -> Result<(), ToolError> {
    fs::create_dir_all(parent).map_err(|source| ToolError::Io {
        operation: "create directory",
        path: requested.to_string(),
        source,
    })
}
