//! Backoff policy for chat completion requests.
//!
//! Local OpenAI-compatible servers answer "model is loading" while weights are
//! paged in, and hosted gateways send `Retry-After` or a "try again in 1.5s"
//! hint with 429s. A server hint wins over the exponential schedule; both are
//! capped at [`MAX_DELAY`].

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

/// Retries after the first attempt.
pub const MAX_RETRIES: u32 = 3;
pub const BASE_DELAY: Duration = Duration::from_millis(1000);
pub const MAX_DELAY: Duration = Duration::from_secs(30);

fn transient_body_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(
            r"(?i)rate.?limit|overloaded|service.?unavailable|model.?is.?loading|upstream.?connect|connection.?refused",
        )
        .expect("transient body regex must compile")
    })
}

fn try_again_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r"(?i)try again in\s+(\d+(?:\.\d+)?)\s*(ms|s|seconds?)\b")
            .expect("try-again regex must compile")
    })
}

/// Whether a non-2xx response is worth another attempt.
pub fn is_retryable_http_error(status: u16, body: &str) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504) || transient_body_regex().is_match(body)
}

/// Delay the server asked for, from `Retry-After` (whole or fractional
/// seconds) or from a "try again in N[ms|s]" phrase in the body.
pub fn server_retry_hint(retry_after: Option<&str>, body: &str) -> Option<Duration> {
    if let Some(seconds) = retry_after
        .map(str::trim)
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
    {
        return Some(capped_secs(seconds));
    }

    let captures = try_again_regex().captures(body)?;
    let amount: f64 = captures.get(1)?.as_str().parse().ok()?;
    let unit = captures.get(2)?.as_str().to_ascii_lowercase();
    if unit == "ms" {
        Some(capped_secs(amount / 1000.0))
    } else {
        Some(capped_secs(amount))
    }
}

fn capped_secs(seconds: f64) -> Duration {
    Duration::from_secs_f64(seconds.min(MAX_DELAY.as_secs_f64()))
}

/// Delay before retry number `attempt` (zero-based).
pub fn retry_delay(attempt: u32, hint: Option<Duration>) -> Duration {
    let delay = hint.unwrap_or_else(|| BASE_DELAY.saturating_mul(2u32.saturating_pow(attempt.min(16))));
    delay.min(MAX_DELAY)
}
