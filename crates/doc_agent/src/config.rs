//! Environment-driven runtime configuration.
//!
//! Every resolver takes a lookup closure so tests can supply variables
//! without touching the process environment; the `*_from_env` wrappers
//! read the real one.

use std::path::{Path, PathBuf};
use std::time::Duration;

use agent_provider::ProviderStability;
use agent_provider_openai_compat::OpenAiCompatProviderConfig;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::classifier::{PhraseTable, PhraseTableError};

pub const PROVIDER_ENV_VAR: &str = "DOC_AGENT_PROVIDER";
pub const OPENAI_CONFIG_PATH_ENV_VAR: &str = "DOC_AGENT_OPENAI_CONFIG_PATH";
pub const ENDPOINT_ENV_VAR: &str = "DOC_AGENT_ENDPOINT";
pub const MODEL_ENV_VAR: &str = "DOC_AGENT_MODEL";
pub const API_KEY_ENV_VAR: &str = "DOC_AGENT_API_KEY";
pub const PHRASES_PATH_ENV_VAR: &str = "DOC_AGENT_PHRASES_PATH";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {env_var} file {path}: {source}")]
    Read {
        env_var: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {env_var} file {path}: {source}")]
    Parse {
        env_var: &'static str,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path}: timeout_sec must be greater than 0")]
    ZeroTimeout { path: PathBuf },
    #[error(transparent)]
    Phrases(#[from] PhraseTableError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum StabilitySetting {
    Stable,
    Unstable,
}

impl From<StabilitySetting> for ProviderStability {
    fn from(setting: StabilitySetting) -> Self {
        match setting {
            StabilitySetting::Stable => Self::Stable,
            StabilitySetting::Unstable => Self::Unstable,
        }
    }
}

/// Shape of the `DOC_AGENT_OPENAI_CONFIG_PATH` JSON file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct OpenAiCompatFile {
    endpoint: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    timeout_sec: Option<u64>,
    stability: Option<StabilitySetting>,
}

/// Trimmed, non-empty variable value.
pub fn non_empty_var(lookup: &dyn Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Builds the provider config from the optional JSON file, then lets the
/// individual variables override it.
pub fn openai_compat_config(
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<OpenAiCompatProviderConfig, ConfigError> {
    let file = match non_empty_var(lookup, OPENAI_CONFIG_PATH_ENV_VAR) {
        Some(path) => read_openai_compat_file(Path::new(&path))?,
        None => OpenAiCompatFile::default(),
    };

    let model = non_empty_var(lookup, MODEL_ENV_VAR)
        .or(file.model)
        .unwrap_or_default();
    let mut config = OpenAiCompatProviderConfig::new(model);

    if let Some(endpoint) = non_empty_var(lookup, ENDPOINT_ENV_VAR).or(file.endpoint) {
        config = config.with_endpoint(endpoint);
    }
    if let Some(api_key) = non_empty_var(lookup, API_KEY_ENV_VAR).or(file.api_key) {
        config = config.with_api_key(api_key);
    }
    if let Some(timeout_sec) = file.timeout_sec {
        config = config.with_timeout(Duration::from_secs(timeout_sec));
    }
    if let Some(stability) = file.stability {
        config = config.with_stability(stability.into());
    }

    debug!(
        model = %config.model_id,
        endpoint = config.endpoint.as_deref().unwrap_or("<default>"),
        "resolved openai-compat configuration"
    );
    Ok(config)
}

fn read_openai_compat_file(path: &Path) -> Result<OpenAiCompatFile, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        env_var: OPENAI_CONFIG_PATH_ENV_VAR,
        path: path.to_path_buf(),
        source,
    })?;
    let file: OpenAiCompatFile =
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            env_var: OPENAI_CONFIG_PATH_ENV_VAR,
            path: path.to_path_buf(),
            source,
        })?;

    if file.timeout_sec == Some(0) {
        return Err(ConfigError::ZeroTimeout {
            path: path.to_path_buf(),
        });
    }
    Ok(file)
}

pub fn phrase_table_from_env() -> Result<PhraseTable, ConfigError> {
    phrase_table(&process_env)
}

/// Built-in phrases unless `DOC_AGENT_PHRASES_PATH` names a YAML table.
pub fn phrase_table(lookup: &dyn Fn(&str) -> Option<String>) -> Result<PhraseTable, ConfigError> {
    match non_empty_var(lookup, PHRASES_PATH_ENV_VAR) {
        Some(path) => Ok(PhraseTable::from_yaml_file(Path::new(&path))?),
        None => Ok(PhraseTable::default()),
    }
}
