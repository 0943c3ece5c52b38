/// Default endpoint of a local Ollama server.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Normalize an endpoint to its chat completions URL.
///
/// Normalization rules:
/// 1) keep `/v1/chat/completions` unchanged
/// 2) append `/chat/completions` when path ends in `/v1`
/// 3) append `/v1/chat/completions` otherwise
pub fn normalize_chat_completions_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_ENDPOINT
    } else {
        input.trim()
    };

    let trimmed = base.trim_end_matches('/');
    if trimmed.ends_with(CHAT_COMPLETIONS_PATH) {
        return trimmed.to_string();
    }
    if trimmed.ends_with("/v1") {
        return format!("{trimmed}/chat/completions");
    }
    format!("{trimmed}{CHAT_COMPLETIONS_PATH}")
}
