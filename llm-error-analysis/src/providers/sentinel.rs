//! Sentinel text written in place of a failed provider response

use regex::Regex;
use std::fmt::Display;
use std::sync::OnceLock;

pub const SENTINEL_PREFIX: &str = "Error: ";

/// Render a failure as sentinel text
pub fn sentinel(error: impl Display) -> String {
    format!("{}{}", SENTINEL_PREFIX, error)
}

/// Whether a stored response is a failure placeholder
pub fn is_sentinel(text: &str) -> bool {
    text.starts_with(SENTINEL_PREFIX)
}

fn rate_limit_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\b429\b|rate[ _-]?limit").expect("static regex"))
}

/// Whether sentinel text reports an HTTP 429 or a rate-limit phrase.
///
/// Only sentinel text is inspected; a real answer that happens to discuss
/// rate limits (the catalog has a 429 entry) is not a signal.
pub fn is_rate_limit_signal(text: &str) -> bool {
    is_sentinel(text) && rate_limit_pattern().is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderError;

    #[test]
    fn test_sentinel_prefix() {
        let text = sentinel("connection refused");
        assert_eq!(text, "Error: connection refused");
        assert!(is_sentinel(&text));
        assert!(!is_sentinel("Hatanın nedeni..."));
    }

    #[test]
    fn test_rate_limit_detection() {
        assert!(is_rate_limit_signal("Error: Request failed with status code 429"));
        assert!(is_rate_limit_signal("Error: Rate limit exceeded for free tier"));
        assert!(is_rate_limit_signal("Error: rate_limit_error"));
        assert!(!is_rate_limit_signal("Error: Request failed with status code 500"));
        assert!(!is_rate_limit_signal("Error: port 14290 unreachable"));
        assert!(!is_rate_limit_signal("429 Too Many Requests means the rate limit was hit"));
    }

    #[test]
    fn test_rate_limited_error_renders_as_signal() {
        let text = sentinel(ProviderError::RateLimited { retry_after_ms: 60_000 });
        assert!(is_rate_limit_signal(&text));

        let text = sentinel(ProviderError::Api { status: 503, message: "overloaded".into() });
        assert!(!is_rate_limit_signal(&text));
    }
}
