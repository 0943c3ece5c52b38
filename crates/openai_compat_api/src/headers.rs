use std::collections::BTreeMap;

use crate::config::OpenAiCompatConfig;

pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_CONTENT_TYPE: &str = "content-type";
pub const HEADER_AUTHORIZATION: &str = "authorization";
pub const HEADER_USER_AGENT: &str = "user-agent";

/// Build a deterministic header map for chat completion requests.
///
/// The authorization header is only present when a non-blank key is set.
pub fn build_headers(config: &OpenAiCompatConfig) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();

    headers.insert(HEADER_ACCEPT.to_owned(), "application/json".to_owned());
    headers.insert(
        HEADER_CONTENT_TYPE.to_owned(),
        "application/json".to_owned(),
    );

    if let Some(api_key) = config.api_key.as_deref().and_then(sanitize_nonempty) {
        headers.insert(HEADER_AUTHORIZATION.to_owned(), format!("Bearer {api_key}"));
    }

    let user_agent = config
        .user_agent
        .as_deref()
        .and_then(sanitize_nonempty)
        .unwrap_or_else(default_user_agent);
    headers.insert(HEADER_USER_AGENT.to_owned(), user_agent);

    for (key, value) in &config.extra_headers {
        headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_owned());
    }

    headers
}

/// Masks an API key for logging: first 8 and last 4 characters of long keys.
pub fn mask_api_key(api_key: &str) -> String {
    let chars: Vec<char> = api_key.chars().collect();
    let len = chars.len();
    if len <= 4 {
        return "****".to_owned();
    }
    let (head, tail) = if len <= 12 { (2, 2) } else { (8, 4) };
    let prefix: String = chars[..head].iter().collect();
    let suffix: String = chars[len - tail..].iter().collect();
    format!("{prefix}****{suffix}")
}

fn sanitize_nonempty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

fn default_user_agent() -> String {
    format!(
        "doc_agent/{} ({} {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_is_omitted_without_key() {
        let headers = build_headers(&OpenAiCompatConfig::default());
        assert!(!headers.contains_key(HEADER_AUTHORIZATION));
        assert_eq!(headers[HEADER_CONTENT_TYPE], "application/json");
    }

    #[test]
    fn blank_key_is_treated_as_missing() {
        let headers = build_headers(&OpenAiCompatConfig::default().with_api_key("   "));
        assert!(!headers.contains_key(HEADER_AUTHORIZATION));
    }

    #[test]
    fn bearer_key_and_extra_headers_are_normalized() {
        let config = OpenAiCompatConfig::default()
            .with_api_key(" sk-local ")
            .insert_header(" X-Trace ", " abc ");
        let headers = build_headers(&config);

        assert_eq!(headers[HEADER_AUTHORIZATION], "Bearer sk-local");
        assert_eq!(headers["x-trace"], "abc");
    }

    #[test]
    fn explicit_user_agent_wins_over_default() {
        let headers = build_headers(&OpenAiCompatConfig::default().with_user_agent("custom/1"));
        assert_eq!(headers[HEADER_USER_AGENT], "custom/1");

        let default_headers = build_headers(&OpenAiCompatConfig::default());
        assert!(default_headers[HEADER_USER_AGENT].starts_with("doc_agent/"));
    }

    #[test]
    fn api_key_masking_keeps_only_edges() {
        assert_eq!(mask_api_key("abc"), "****");
        assert_eq!(mask_api_key("abcdefgh"), "ab****gh");
        assert_eq!(mask_api_key("sk-1234567890abcdef"), "sk-12345****cdef");
    }
}
