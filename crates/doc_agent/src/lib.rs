//! LLM-driven documentation agent for a single package directory.
//!
//! ## Provider bootstrap
//!
//! `doc_agent` requires explicit provider selection:
//!
//! - `DOC_AGENT_PROVIDER=mock` for deterministic local runs
//! - `DOC_AGENT_PROVIDER=openai-compat` for any `/v1/chat/completions` server
//!
//! With no provider selected the binary prints manual-update instructions
//! and exits successfully.
//!
//! When `DOC_AGENT_PROVIDER=openai-compat`, `DOC_AGENT_OPENAI_CONFIG_PATH` may
//! point to a UTF-8 JSON file with this shape:
//!
//! ```json
//! {
//!   "endpoint": "http://localhost:11434",
//!   "model": "llama2",
//!   "api_key": "<optional bearer token>",
//!   "timeout_sec": 120,
//!   "stability": "stable"
//! }
//! ```
//!
//! Contract notes:
//! - Every field is optional; `DOC_AGENT_ENDPOINT`, `DOC_AGENT_MODEL` and
//!   `DOC_AGENT_API_KEY` override the file.
//! - `timeout_sec` must be > 0 when provided.
//! - `stability` selects the iteration budget (`stable` 15, `unstable` 20).
//! - Unknown JSON fields are rejected.
//!
//! ## Capabilities
//!
//! The model sees three tools scoped by [`sandbox::Sandbox`]: it may list and
//! read anything under the package root except `docs/`, and may write only
//! under `_dev/build/docs/`.
//!
//! ## Session contract
//!
//! [`session::SessionController`] backs up `_dev/build/docs/README.md` before
//! the first model call and restores it byte-for-byte on every cancel, abort
//! or failure path. Decisions are returned as data; [`driver`] renders them.

pub mod agent;
pub mod classifier;
pub mod config;
pub mod driver;
pub mod interrupt;
pub mod package;
pub mod preserve;
pub mod prompts;
pub mod providers;
pub mod sandbox;
pub mod session;
pub mod tools;
pub mod transcript;
