//! Assembly of a scan configuration from client-supplied parameters.

use crate::defaults::ScanDefaults;
use crate::error::ValidationError;
use crate::rules;
use scangate_common::{naming, MessageKey, TargetType, Timestamp};
use scangate_redaction::escape_html;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Client-facing name of the port list, stored internally as `backup_ports`.
pub const PORTS_PARAM: &str = "ports";
pub const PORTS_OPTION: &str = "backup_ports";

/// Raw request parameters. The first occurrence of a name wins.
#[derive(Debug, Clone, Default)]
pub struct RawParams {
    values: BTreeMap<String, String>,
}

impl RawParams {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut values = BTreeMap::new();
        for (key, value) in pairs {
            values.entry(key.into()).or_insert_with(|| value.into());
        }
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A fully resolved, validated scan configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanRequestConfig(Map<String, Value>);

impl ScanRequestConfig {
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn targets(&self) -> &str {
        self.0.get("targets").and_then(Value::as_str).unwrap_or_default()
    }
}

/// Turns request parameters into a [`ScanRequestConfig`].
#[derive(Debug, Clone)]
pub struct ConfigAssembler {
    defaults: Arc<ScanDefaults>,
}

impl ConfigAssembler {
    pub fn new(defaults: Arc<ScanDefaults>) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &ScanDefaults {
        &self.defaults
    }

    /// Assemble and validate a configuration.
    ///
    /// Only options present in the defaults are read from `raw`; everything
    /// else the client sends is ignored. The result needs no further
    /// defaulting.
    pub fn assemble(&self, raw: &RawParams) -> Result<ScanRequestConfig, ValidationError> {
        let targets = raw.get("targets").unwrap_or_default();
        if TargetType::classify_list(targets).is_unknown() {
            return Err(ValidationError::new(MessageKey::InvalidTarget).with_field("targets"));
        }

        let mut working = Map::new();
        for (key, default) in self.defaults.options() {
            if let Some(value) = raw.get(key) {
                working.insert(key.clone(), coerce(key, default, value)?);
            }
        }

        if let Some(ports) = raw.get(PORTS_PARAM) {
            working.insert(PORTS_OPTION.to_string(), Value::String(escape_html(ports.trim())));
        }

        let user_set_output = working
            .get("log_in_file")
            .and_then(Value::as_str)
            .is_some_and(|s| !s.is_empty());

        let mut merged = self.defaults.options().clone();
        for (key, value) in working {
            merged.insert(key, value);
        }
        if !user_set_output {
            merged.insert(
                "log_in_file".to_string(),
                Value::String(naming::results_filename(&Timestamp::now())),
            );
        }

        merged.retain(|key, _| self.defaults.is_api_key(key));

        rules::apply(&mut merged, self.defaults.catalog())?;

        debug!(
            targets = %targets,
            options = merged.len(),
            "Assembled scan configuration"
        );
        Ok(ScanRequestConfig(merged))
    }
}

/// Convert a raw parameter to the type of its default, escaping text.
fn coerce(key: &str, default: &Value, raw: &str) -> Result<Value, ValidationError> {
    let invalid = || ValidationError::new(MessageKey::InvalidValue).with_field(key);
    let trimmed = raw.trim();

    match default {
        Value::Bool(_) => parse_bool(trimmed).map(Value::Bool).ok_or_else(invalid),
        Value::Number(n) if n.is_f64() => trimmed
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(invalid),
        Value::Number(_) => trimmed.parse::<i64>().map(Value::from).map_err(|_| invalid()),
        Value::Array(_) => Ok(Value::Array(
            trimmed
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Value::String(escape_html(s)))
                .collect(),
        )),
        Value::Object(_) => parse_method_args(trimmed).ok_or_else(invalid),
        _ => Ok(Value::String(escape_html(raw))),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Method arguments arrive either as a JSON object or as `name=value&name=value`.
fn parse_method_args(raw: &str) -> Option<Value> {
    if raw.is_empty() {
        return Some(Value::Object(Map::new()));
    }

    let mut args = Map::new();
    if raw.starts_with('{') {
        let parsed: Map<String, Value> = serde_json::from_str(raw).ok()?;
        for (name, value) in parsed {
            let value = match value {
                Value::String(s) => Value::String(escape_html(&s)),
                other => other,
            };
            args.insert(escape_html(&name), value);
        }
    } else {
        for pair in raw.split('&').filter(|p| !p.is_empty()) {
            let (name, value) = pair.split_once('=')?;
            args.insert(
                escape_html(name.trim()),
                Value::String(escape_html(value.trim())),
            );
        }
    }
    Some(Value::Object(args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::NON_API_KEYS;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn assembler() -> ConfigAssembler {
        ConfigAssembler::new(Arc::new(ScanDefaults::default()))
    }

    fn params(pairs: &[(&str, &str)]) -> RawParams {
        RawParams::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn test_unknown_target_rejected_first() {
        let err = assembler()
            .assemble(&params(&[("targets", "not a target"), ("thread_number", "x")]))
            .unwrap_err();
        assert_eq!(err.key, MessageKey::InvalidTarget);

        let err = assembler().assemble(&params(&[("scan_method", "port_scan")])).unwrap_err();
        assert_eq!(err.key, MessageKey::InvalidTarget);
    }

    #[test]
    fn test_defaults_retained_and_overrides_applied() {
        let config = assembler()
            .assemble(&params(&[
                ("targets", "owasp.org"),
                ("scan_method", "port_scan,dir_scan"),
                ("thread_number", "20"),
                ("ping_flag", "true"),
            ]))
            .unwrap();

        assert_eq!(config.targets(), "owasp.org");
        assert_eq!(config.get("thread_number"), Some(&json!(20)));
        assert_eq!(config.get("ping_flag"), Some(&json!(true)));
        assert_eq!(config.get("retries"), Some(&json!(3)));
        assert_eq!(config.get("scan_method"), Some(&json!(["dir_scan", "port_scan"])));
    }

    #[test]
    fn test_ports_mapped_to_backup_ports() {
        let config = assembler()
            .assemble(&params(&[
                ("targets", "10.0.0.1"),
                ("scan_method", "port_scan"),
                ("ports", "22,80-81"),
            ]))
            .unwrap();
        assert_eq!(config.get("backup_ports"), Some(&json!("22,80-81")));
        assert!(config.get("ports").is_none());
    }

    #[test]
    fn test_non_api_keys_stripped_and_unknown_ignored() {
        let config = assembler()
            .assemble(&params(&[
                ("targets", "10.0.0.1"),
                ("scan_method", "port_scan"),
                ("home_path", "/etc"),
                ("unexpected", "1"),
            ]))
            .unwrap();
        for key in NON_API_KEYS {
            assert!(config.get(key).is_none(), "{} leaked", key);
        }
        assert!(config.get("unexpected").is_none());
    }

    #[test]
    fn test_free_text_escaped() {
        let config = assembler()
            .assemble(&params(&[
                ("targets", "owasp.org"),
                ("scan_method", "ssh_brute"),
                ("usernames", "<b>admin</b>"),
                ("methods_args", "ssh_brute_users=a<b&ssh_brute_ports=22"),
            ]))
            .unwrap();
        assert_eq!(config.get("usernames"), Some(&json!("&lt;b&gt;admin&lt;/b&gt;")));
        assert_eq!(
            config.get("methods_args"),
            Some(&json!({"ssh_brute_users": "a&lt;b", "ssh_brute_ports": "22"}))
        );
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let err = assembler()
            .assemble(&params(&[
                ("targets", "owasp.org"),
                ("scan_method", "port_scan"),
                ("retries", "many"),
            ]))
            .unwrap_err();
        assert_eq!(err.key, MessageKey::InvalidValue);
        assert_eq!(err.field.as_deref(), Some("retries"));
    }

    #[test]
    fn test_output_file_generated_when_absent() {
        let config = assembler()
            .assemble(&params(&[("targets", "owasp.org"), ("scan_method", "port_scan")]))
            .unwrap();
        let output = config.get("log_in_file").and_then(Value::as_str).unwrap();
        assert!(output.starts_with("results/results_"));
        assert!(output.ends_with(".html"));
    }

    #[test]
    fn test_rule_violation_surfaces() {
        let err = assembler()
            .assemble(&params(&[("targets", "owasp.org"), ("scan_method", "teleport")]))
            .unwrap_err();
        assert_eq!(err.key, MessageKey::ScanMethodUnknown);
    }

    #[test]
    fn test_first_param_wins() {
        let raw = RawParams::from_pairs([("targets", "a.org"), ("targets", "b.org")]);
        assert_eq!(raw.get("targets"), Some("a.org"));
        assert_eq!(raw.len(), 1);
    }
}
