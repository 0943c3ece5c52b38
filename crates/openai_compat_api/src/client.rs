use std::future::Future;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, warn};

use crate::config::OpenAiCompatConfig;
use crate::error::{parse_error_message, OpenAiCompatError};
use crate::headers::{build_headers, mask_api_key};
use crate::payload::ChatCompletionRequest;
use crate::response::ChatCompletionResponse;
use crate::retry::{is_retryable_http_error, retry_delay, server_retry_hint};
use crate::url::normalize_chat_completions_url;

/// Optional cancellation signal shared across request and retry loops.
pub type CancellationSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug)]
pub struct OpenAiCompatClient {
    http: Client,
    config: OpenAiCompatConfig,
}

impl OpenAiCompatClient {
    pub fn new(config: OpenAiCompatConfig) -> Result<Self, OpenAiCompatError> {
        if config.model.trim().is_empty() {
            return Err(OpenAiCompatError::MissingModel);
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(OpenAiCompatError::from)?;

        debug!(
            endpoint = %normalize_chat_completions_url(&config.endpoint),
            model = %config.model,
            api_key = %config
                .api_key
                .as_deref()
                .map(mask_api_key)
                .unwrap_or_else(|| "<none>".to_owned()),
            "created OpenAI-compatible client"
        );

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &OpenAiCompatConfig {
        &self.config
    }

    pub fn normalized_endpoint(&self) -> String {
        normalize_chat_completions_url(&self.config.endpoint)
    }

    pub fn build_headers(&self) -> Result<HeaderMap, OpenAiCompatError> {
        let mut out = HeaderMap::new();
        for (key, value) in build_headers(&self.config) {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| OpenAiCompatError::InvalidHeader(format!("invalid key: {key}")))?,
                HeaderValue::from_str(&value).map_err(|_| {
                    OpenAiCompatError::InvalidHeader(format!("invalid value for {key}"))
                })?,
            );
        }
        Ok(out)
    }

    pub fn build_request(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<reqwest::RequestBuilder, OpenAiCompatError> {
        let headers = self.build_headers()?;
        let payload = self.request_with_transport_defaults(request);
        Ok(self
            .http
            .post(self.normalized_endpoint())
            .headers(headers)
            .json(&payload))
    }

    fn request_with_transport_defaults(
        &self,
        request: &ChatCompletionRequest,
    ) -> ChatCompletionRequest {
        let mut payload = request.clone();
        payload.stream = false;
        if payload.model.trim().is_empty() {
            payload.model = self.config.model.clone();
        }
        if payload.max_tokens.is_none() {
            payload.max_tokens = Some(self.config.max_tokens);
        }
        if payload.temperature.is_none() {
            payload.temperature = Some(self.config.temperature);
        }
        if payload.tools.is_empty() {
            payload.tool_choice = None;
        } else if payload.tool_choice.is_none() {
            payload.tool_choice = Some("auto".to_owned());
        }
        payload
    }

    pub async fn send_with_retry(
        &self,
        request: &ChatCompletionRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Response, OpenAiCompatError> {
        let max_retries = self.config.max_retries;
        let mut last_status: Option<StatusCode> = None;
        let mut last_error = None;

        for attempt in 0..=max_retries {
            if is_cancelled(cancellation) {
                return Err(OpenAiCompatError::Cancelled);
            }

            let response = self.build_request(request)?.send();
            let response = await_or_cancel(response, cancellation)
                .await?
                .map_err(OpenAiCompatError::from);

            match response {
                Ok(response) => {
                    if response.status().is_success() {
                        return Ok(response);
                    }

                    let status = response.status();
                    last_status = Some(status);
                    let retry_after = response
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|value| value.to_str().ok())
                        .map(str::to_owned);
                    let body = await_or_cancel(response.text(), cancellation)
                        .await?
                        .unwrap_or_else(|_| {
                            status
                                .canonical_reason()
                                .unwrap_or("request failed")
                                .to_string()
                        });
                    let message = parse_error_message(status, &body);
                    last_error = Some(message.clone());

                    if attempt < max_retries && is_retryable_http_error(status.as_u16(), &body) {
                        let hint = server_retry_hint(retry_after.as_deref(), &body);
                        let delay = retry_delay(attempt, hint);
                        warn!(%status, attempt, delay_ms = delay.as_millis() as u64, %message, "retrying chat completion request");
                        await_or_cancel(tokio::time::sleep(delay), cancellation).await?;
                        continue;
                    }

                    return Err(OpenAiCompatError::Status(status, message));
                }
                Err(error) => {
                    let message = error.to_string();
                    last_error = Some(message.clone());
                    if attempt < max_retries {
                        warn!(attempt, %message, "retrying chat completion request after transport error");
                        await_or_cancel(tokio::time::sleep(retry_delay(attempt, None)), cancellation)
                            .await?;
                        continue;
                    }
                    return Err(OpenAiCompatError::RetryExhausted {
                        status: last_status,
                        last_error,
                    });
                }
            }
        }

        Err(OpenAiCompatError::RetryExhausted {
            status: last_status,
            last_error,
        })
    }

    /// Sends one non-streaming completion request and decodes the body.
    pub async fn complete(
        &self,
        request: &ChatCompletionRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<ChatCompletionResponse, OpenAiCompatError> {
        let response = self.send_with_retry(request, cancellation).await?;
        let body = await_or_cancel(response.text(), cancellation)
            .await?
            .map_err(OpenAiCompatError::from)?;

        parse_completion_body(&body)
    }
}

pub(crate) fn parse_completion_body(body: &str) -> Result<ChatCompletionResponse, OpenAiCompatError> {
    serde_json::from_str::<ChatCompletionResponse>(body)
        .map_err(|error| OpenAiCompatError::InvalidResponse(error.to_string()))
}

fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, OpenAiCompatError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(OpenAiCompatError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(OpenAiCompatError::Cancelled);
            }
            return Ok(output);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::parse_completion_body;
    use crate::error::OpenAiCompatError;

    #[test]
    fn parses_text_choice_with_stop_reason() {
        let body = r#"{
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "done"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4}
        }"#;

        let response = parse_completion_body(body).expect("body should parse");
        let choice = response.first_choice().expect("one choice");

        assert!(choice.is_stop());
        assert_eq!(choice.message.content.as_deref(), Some("done"));
        assert_eq!(response.usage.map(|usage| usage.total_tokens), Some(4));
    }

    #[test]
    fn parses_tool_calls_with_null_content() {
        let body = r#"{
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "read_file", "arguments": "{\"path\":\"manifest.yml\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }"#;

        let response = parse_completion_body(body).expect("body should parse");
        let choice = response.first_choice().expect("one choice");

        assert!(!choice.is_stop());
        assert_eq!(choice.message.content, None);
        assert_eq!(choice.message.tool_calls[0].id, "call_1");
        assert_eq!(choice.message.tool_calls[0].function.name, "read_file");
        assert_eq!(
            choice.message.tool_calls[0].function.arguments,
            r#"{"path":"manifest.yml"}"#
        );
    }

    #[test]
    fn missing_choices_parse_as_empty_response() {
        let response = parse_completion_body("{}").expect("empty object should parse");
        assert!(response.first_choice().is_none());
    }

    #[test]
    fn undecodable_body_is_invalid_response() {
        let error = parse_completion_body("<html>").expect_err("html should not parse");
        assert!(matches!(error, OpenAiCompatError::InvalidResponse(_)));
    }
}
