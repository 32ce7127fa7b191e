//! Sanitizing and redaction for scan configurations.
//!
//! Inbound free-text values are HTML-escaped before they reach a job; the
//! configuration echoed back to a client has secrets and oversized blobs
//! replaced before it leaves the gateway.

pub mod escape;
pub mod patterns;
pub mod redactor;

pub use escape::escape_html;
pub use redactor::{RedactionStats, Redactor, RedactorConfig};

/// Default placeholder for redacted values.
pub const REDACTED_PLACEHOLDER: &str = "[REDACTED]";

/// Hash-only placeholder (shows hash of original value).
pub const HASH_PLACEHOLDER_PREFIX: &str = "[HASH:";
pub const HASH_PLACEHOLDER_SUFFIX: &str = "]";

/// Create a hash placeholder for a value.
pub fn hash_placeholder(value: &str) -> String {
    let hash = scangate_common::hash::sha256_str(value);
    format!("{}{}{}", HASH_PLACEHOLDER_PREFIX, &hash[..12], HASH_PLACEHOLDER_SUFFIX)
}

/// Acknowledgement object that stands in for blobs too large to echo.
pub fn acknowledgement() -> serde_json::Value {
    serde_json::json!({ "as_user_set": "set_successfully" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_placeholder() {
        let placeholder = hash_placeholder("my-secret-value");
        assert!(placeholder.starts_with(HASH_PLACEHOLDER_PREFIX));
        assert!(placeholder.ends_with(HASH_PLACEHOLDER_SUFFIX));
        assert_eq!(placeholder.len(), 19); // [HASH: + 12 chars + ]
    }
}
