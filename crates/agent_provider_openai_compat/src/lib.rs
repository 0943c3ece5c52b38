//! OpenAI-compatible implementation of the shared `agent_provider` contract.
//!
//! This adapter translates `openai_compat_api` chat completion responses into
//! provider-neutral `LlmResponse` values expected by `doc_agent`. It blocks the
//! calling thread on a single-threaded tokio runtime per call.

use std::sync::Arc;
use std::time::Duration;

use agent_provider::{
    CancelSignal, LlmProvider, LlmResponse, ProviderInitError, ProviderProfile,
    ProviderStability, ToolCall, ToolSchema, TransportError,
};
use openai_compat_api::{
    ChatCompletionRequest, ChatCompletionResponse, ChatTool, OpenAiCompatClient,
    OpenAiCompatConfig, OpenAiCompatError,
};
use tracing::debug;

/// Stable provider identifier used by `doc_agent` startup selection.
pub const OPENAI_COMPAT_PROVIDER_ID: &str = "openai-compat";

const DEFAULT_MODEL_ID: &str = "llama2";

/// Runtime configuration for the OpenAI-compatible provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAiCompatProviderConfig {
    pub model_id: String,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Option<Duration>,
    pub stability: ProviderStability,
}

impl OpenAiCompatProviderConfig {
    #[must_use]
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            endpoint: None,
            api_key: None,
            timeout: None,
            stability: ProviderStability::Stable,
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_stability(mut self, stability: ProviderStability) -> Self {
        self.stability = stability;
        self
    }

    fn into_openai_compat_config(self, model_id: String) -> OpenAiCompatConfig {
        let mut config = OpenAiCompatConfig::new(model_id);

        if let Some(endpoint) = self.endpoint {
            config = config.with_endpoint(endpoint);
        }

        if let Some(api_key) = self.api_key {
            config = config.with_api_key(api_key);
        }

        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }

        config
    }
}

trait CompletionClient: Send + Sync {
    fn complete(
        &self,
        request: &ChatCompletionRequest,
        cancel: &CancelSignal,
    ) -> Result<ChatCompletionResponse, OpenAiCompatError>;
}

#[derive(Debug)]
struct DefaultCompletionClient {
    client: OpenAiCompatClient,
}

impl CompletionClient for DefaultCompletionClient {
    fn complete(
        &self,
        request: &ChatCompletionRequest,
        cancel: &CancelSignal,
    ) -> Result<ChatCompletionResponse, OpenAiCompatError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| {
                OpenAiCompatError::Unknown(format!("failed to initialize tokio runtime: {error}"))
            })?;

        runtime.block_on(self.client.complete(request, Some(cancel)))
    }
}

/// `LlmProvider` adapter backed by `openai_compat_api` transport primitives.
pub struct OpenAiCompatProvider {
    model_id: String,
    stability: ProviderStability,
    client: Arc<dyn CompletionClient>,
}

impl OpenAiCompatProvider {
    /// Creates a provider using real HTTP transport.
    pub fn new(config: OpenAiCompatProviderConfig) -> Result<Self, ProviderInitError> {
        let model_id = sanitize_model_id(&config.model_id);
        let stability = config.stability;
        let client = Arc::new(DefaultCompletionClient {
            client: OpenAiCompatClient::new(config.into_openai_compat_config(model_id.clone()))
                .map_err(map_init_error)?,
        });

        Ok(Self {
            model_id,
            stability,
            client,
        })
    }

    fn build_request(&self, prompt: &str, tools: &[ToolSchema]) -> ChatCompletionRequest {
        let tools = tools
            .iter()
            .map(|tool| {
                ChatTool::function(
                    tool.name.clone(),
                    tool.description.clone(),
                    tool.parameters.clone(),
                )
            })
            .collect();

        ChatCompletionRequest::new(self.model_id.clone(), prompt).with_tools(tools)
    }

    #[cfg(test)]
    fn with_client_for_tests(model_id: &str, client: Arc<dyn CompletionClient>) -> Self {
        Self {
            model_id: sanitize_model_id(model_id),
            stability: ProviderStability::Stable,
            client,
        }
    }
}

impl LlmProvider for OpenAiCompatProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: OPENAI_COMPAT_PROVIDER_ID.to_string(),
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
        let request = self.build_request(prompt, tools);
        match self.client.complete(&request, cancel) {
            Ok(response) => Ok(map_completion(response)),
            Err(OpenAiCompatError::Cancelled) => Err(TransportError::Cancelled),
            Err(error) => Err(TransportError::failed(format!(
                "OpenAI-compatible request failed: {error}"
            ))),
        }
    }
}

fn map_completion(response: ChatCompletionResponse) -> LlmResponse {
    let Some(choice) = response.choices.into_iter().next() else {
        debug!("chat completion returned no choices");
        return LlmResponse::default();
    };

    let finished = choice.is_stop();
    debug!(
        finish_reason = choice.finish_reason.as_deref().unwrap_or(""),
        tool_calls = choice.message.tool_calls.len(),
        "mapped chat completion choice"
    );

    let tool_calls = choice
        .message
        .tool_calls
        .into_iter()
        .map(|call| ToolCall::new(call.id, call.function.name, call.function.arguments))
        .collect();

    LlmResponse {
        content: choice.message.content.unwrap_or_default(),
        tool_calls,
        finished,
    }
}

fn sanitize_model_id(model_id: &str) -> String {
    let trimmed = model_id.trim();
    if trimmed.is_empty() {
        DEFAULT_MODEL_ID.to_string()
    } else {
        trimmed.to_string()
    }
}

fn map_init_error(error: OpenAiCompatError) -> ProviderInitError {
    ProviderInitError::new(format!(
        "Failed to initialize openai-compat provider: {error}"
    ))
}
