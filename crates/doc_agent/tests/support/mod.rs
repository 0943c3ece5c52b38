#![allow(dead_code)]

use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use agent_provider::{CancelSignal, LlmProvider, LlmResponse, ToolCall};
use agent_provider_mock::MockProvider;
use doc_agent::agent::Agent;
use doc_agent::driver::UserInteraction;
use doc_agent::sandbox::{Sandbox, TARGET_DOCUMENT};
use doc_agent::session::ActionKind;
use doc_agent::tools::ToolRegistry;
use serde_json::json;
use tempfile::TempDir;

pub const MANIFEST: &str = "format_version: 3.0.0\nname: nginx\ntitle: Nginx\nversion: 1.2.3\ndescription: Collect logs and metrics from Nginx.\ntype: integration\n";

/// A package with a manifest, one data stream, and an excluded `docs/` tree.
pub fn package_fixture() -> TempDir {
    let package = tempfile::tempdir().expect("temp package");
    fs::write(package.path().join("manifest.yml"), MANIFEST).expect("manifest");

    let stream = package.path().join("data_stream").join("access");
    fs::create_dir_all(&stream).expect("data stream dir");
    fs::write(stream.join("fields.yml"), "- name: message\n").expect("fields");

    let docs = package.path().join("docs");
    fs::create_dir_all(&docs).expect("docs dir");
    fs::write(docs.join("README.md"), "published docs").expect("published docs");
    package
}

pub fn seed_target(package: &Path, content: &str) {
    let target = package.join(TARGET_DOCUMENT);
    fs::create_dir_all(target.parent().expect("target has parent")).expect("docs build dir");
    fs::write(target, content).expect("seed target");
}

pub fn read_target(package: &Path) -> Option<String> {
    fs::read_to_string(package.join(TARGET_DOCUMENT)).ok()
}

pub fn registry(package: &Path) -> ToolRegistry {
    ToolRegistry::new(Sandbox::for_package(package).expect("sandbox"))
}

pub fn agent(package: &Path, provider: &Arc<MockProvider>) -> Agent {
    let provider: Arc<dyn LlmProvider> = Arc::clone(provider) as Arc<dyn LlmProvider>;
    Agent::new(provider, registry(package))
}

pub fn cancel_signal() -> CancelSignal {
    Arc::new(AtomicBool::new(false))
}

pub fn call(id: &str, name: &str, arguments: serde_json::Value) -> ToolCall {
    ToolCall::new(id, name, arguments.to_string())
}

/// A turn that writes `content` to the target document.
pub fn write_turn(id: &str, content: &str) -> LlmResponse {
    LlmResponse::with_tool_calls(
        "Writing the README.",
        vec![call(
            id,
            "write_file",
            json!({ "path": TARGET_DOCUMENT, "content": content }),
        )],
    )
}

/// Plays back a fixed list of choices and feedback strings.
#[derive(Debug, Default)]
pub struct ScriptedInteraction {
    pub choices: VecDeque<ActionKind>,
    pub feedback: VecDeque<String>,
    pub offered: Vec<Vec<ActionKind>>,
}

impl ScriptedInteraction {
    pub fn new(choices: impl IntoIterator<Item = ActionKind>) -> Self {
        Self {
            choices: choices.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_feedback(mut self, feedback: impl IntoIterator<Item = &'static str>) -> Self {
        self.feedback = feedback.into_iter().map(str::to_string).collect();
        self
    }
}

impl UserInteraction for ScriptedInteraction {
    fn confirm(&mut self, _question: &str) -> io::Result<bool> {
        Ok(true)
    }

    fn choose(&mut self, _title: &str, actions: &[ActionKind]) -> io::Result<ActionKind> {
        self.offered.push(actions.to_vec());
        self.choices
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted"))
    }

    fn feedback(&mut self, _question: &str) -> io::Result<Option<String>> {
        Ok(self.feedback.pop_front())
    }
}
