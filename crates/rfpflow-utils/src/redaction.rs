//! Secret redaction for anything that may reach logs or API responses.
//!
//! Provider API keys travel in request headers and occasionally come back in
//! provider error bodies. Every error string that crosses a logging or HTTP
//! boundary goes through [`redact_secrets`] first.

use once_cell::sync::Lazy;
use regex::Regex;

const REDACTED: &str = "***";

static SECRET_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // OpenAI / OpenRouter / Anthropic style keys
        r"sk-[A-Za-z0-9_\-]{16,}",
        // Bearer tokens in echoed headers
        r"(?i)bearer\s+[A-Za-z0-9_\-\.=]{8,}",
        // x-api-key header echoes
        r"(?i)x-api-key:\s*[A-Za-z0-9_\-\.]{8,}",
        // key=value pairs in URLs and messages
        r"(?i)(api[_-]?key|token|secret)=[^&\s]+",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Replace every recognised secret in `content` with `***`.
#[must_use]
pub fn redact_secrets(content: &str) -> String {
    let mut out = content.to_string();
    for pattern in SECRET_PATTERNS.iter() {
        out = pattern.replace_all(&out, REDACTED).into_owned();
    }
    out
}

/// Mask an API key for display, keeping its first three and last four
/// characters. Keys too short to hide anything are masked completely.
///
/// ```rust
/// use rfpflow_utils::redaction::mask_key;
///
/// assert_eq!(mask_key("sk-1234567890abcd"), "sk-…abcd");
/// assert_eq!(mask_key("abc"), "***");
/// ```
#[must_use]
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 10 {
        return REDACTED.to_string();
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}
