//! Redaction of configurations echoed back to API clients.

use crate::patterns::{is_sensitive_key, PROXY_CREDENTIALS_PATTERN};
use crate::{acknowledgement, hash_placeholder, REDACTED_PLACEHOLDER};
use serde_json::{Map, Value};
use tracing::debug;

/// Configuration for the redactor.
#[derive(Debug, Clone)]
pub struct RedactorConfig {
    /// Use hash placeholders instead of generic [REDACTED].
    pub use_hash_placeholders: bool,
    /// Options that are always replaced by the acknowledgement marker.
    pub blob_keys: Vec<String>,
    /// Serialized size above which any value is replaced by the acknowledgement marker.
    pub max_value_bytes: usize,
}

impl Default for RedactorConfig {
    fn default() -> Self {
        Self {
            use_hash_placeholders: false,
            blob_keys: vec!["methods_args".to_string()],
            max_value_bytes: 4096,
        }
    }
}

/// Statistics about redactions performed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedactionStats {
    pub secret_redactions: usize,
    pub blob_redactions: usize,
    pub proxy_redactions: usize,
}

impl RedactionStats {
    pub fn total(&self) -> usize {
        self.secret_redactions + self.blob_redactions + self.proxy_redactions
    }
}

/// Produces the client-facing copy of a resolved configuration.
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    config: RedactorConfig,
}

impl Redactor {
    /// Create a new redactor with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new redactor with custom configuration.
    pub fn with_config(config: RedactorConfig) -> Self {
        Self { config }
    }

    /// Redact a configuration map.
    pub fn redact(&self, options: &Map<String, Value>) -> (Map<String, Value>, RedactionStats) {
        let mut stats = RedactionStats::default();
        let mut out = Map::with_capacity(options.len());

        for (key, value) in options {
            let redacted = if self.config.blob_keys.iter().any(|k| k == key) {
                stats.blob_redactions += 1;
                acknowledgement()
            } else if is_sensitive_key(key) && !is_empty(value) {
                stats.secret_redactions += 1;
                Value::String(self.placeholder(value))
            } else if serialized_len(value) > self.config.max_value_bytes {
                stats.blob_redactions += 1;
                debug!(option = %key, "Replacing oversized value");
                acknowledgement()
            } else if let Some(url) = value.as_str().filter(|s| PROXY_CREDENTIALS_PATTERN.is_match(s)) {
                stats.proxy_redactions += 1;
                Value::String(
                    PROXY_CREDENTIALS_PATTERN
                        .replace(url, format!("${{1}}{}@", REDACTED_PLACEHOLDER))
                        .into_owned(),
                )
            } else {
                value.clone()
            };
            out.insert(key.clone(), redacted);
        }

        (out, stats)
    }

    fn placeholder(&self, value: &Value) -> String {
        if self.config.use_hash_placeholders {
            let raw = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            hash_placeholder(&raw)
        } else {
            REDACTED_PLACEHOLDER.to_string()
        }
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn serialized_len(value: &Value) -> usize {
    match value {
        Value::String(s) => s.len(),
        other => other.to_string().len(),
    }
}
