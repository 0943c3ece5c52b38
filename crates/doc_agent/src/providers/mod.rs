use std::sync::Arc;

use agent_provider::{LlmProvider, ProviderInitError};
use agent_provider_mock::{MockProvider, MOCK_PROVIDER_ID};
use agent_provider_openai_compat::{OpenAiCompatProvider, OPENAI_COMPAT_PROVIDER_ID};
use thiserror::Error;
use tracing::info;

use crate::config::{self, ConfigError, PROVIDER_ENV_VAR};

#[derive(Debug, Error)]
pub enum ProviderSelectionError {
    #[error("Unsupported provider '{0}'. Available providers: {MOCK_PROVIDER_ID}, {OPENAI_COMPAT_PROVIDER_ID}")]
    Unsupported(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Init(#[from] ProviderInitError),
}

/// Resolves `DOC_AGENT_PROVIDER`. `Ok(None)` means no provider was selected
/// and the caller should fall back to manual instructions.
pub fn provider_from_env() -> Result<Option<Arc<dyn LlmProvider>>, ProviderSelectionError> {
    provider_from_lookup(&|key| std::env::var(key).ok())
}

pub fn provider_from_lookup(
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<Option<Arc<dyn LlmProvider>>, ProviderSelectionError> {
    match config::non_empty_var(lookup, PROVIDER_ENV_VAR) {
        Some(provider_id) => provider_for_id(&provider_id, lookup).map(Some),
        None => Ok(None),
    }
}

pub fn provider_for_id(
    provider_id: &str,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<Arc<dyn LlmProvider>, ProviderSelectionError> {
    let provider: Arc<dyn LlmProvider> = match provider_id {
        MOCK_PROVIDER_ID => Arc::new(MockProvider::default()),
        OPENAI_COMPAT_PROVIDER_ID => {
            let config = config::openai_compat_config(lookup)?;
            Arc::new(OpenAiCompatProvider::new(config)?)
        }
        unknown => return Err(ProviderSelectionError::Unsupported(unknown.to_string())),
    };

    info!(provider = %provider.name(), stability = provider.profile().stability.as_str(), "selected provider");
    Ok(provider)
}
