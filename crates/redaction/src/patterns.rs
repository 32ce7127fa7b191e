//! Regex patterns for detecting sensitive option names.

use regex::Regex;
use std::sync::LazyLock;

/// Pattern for option names that carry credentials.
pub static SECRET_KEY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(passw(or)?ds?|passwd|pwd|secret|token|api[_-]?key|apikey|access[_-]?key|private[_-]?key|credentials?|cookie)").unwrap()
});

/// Pattern for proxy URLs with embedded credentials.
pub static PROXY_CREDENTIALS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^([a-z0-9]+://)[^:@/]+:[^@/]+@").unwrap());

/// Check if an option name looks like it contains a secret.
pub fn is_sensitive_key(key: &str) -> bool {
    SECRET_KEY_PATTERN.is_match(key)
}
