//! Domain validation applied to a merged scan configuration.

use crate::defaults::ScanCatalog;
use crate::error::ValidationError;
use regex::Regex;
use scangate_common::{Language, MessageKey};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::LazyLock;

static SOCKS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^socks[45]://([^:@/\s]+:[^@/\s]+@)?[^:/\s]+:\d{1,5}$").unwrap()
});

const OUTPUT_EXTENSIONS: &[&str] = &["html", "json", "csv", "txt"];

/// Validate and normalise `options` in place.
///
/// Scan methods are resolved against the catalogue: `profile` and `all`
/// expand, `exclude_method` is subtracted, and the result is written back
/// as a sorted list.
pub fn apply(options: &mut Map<String, Value>, catalog: &ScanCatalog) -> Result<(), ValidationError> {
    if let Some(language) = str_opt(options, "language") {
        Language::from_str(language)
            .map_err(|_| ValidationError::new(MessageKey::LanguageUnknown).with_field("language"))?;
    }

    check_int_range(options, "verbose_level", 0, 5, MessageKey::VerboseRange)?;
    check_int_range(options, "thread_number", 1, 1000, MessageKey::ThreadNumberRange)?;
    check_int_range(options, "thread_number_host", 1, 100, MessageKey::ThreadNumberRange)?;
    check_int_range(options, "retries", 0, 10, MessageKey::RetriesRange)?;

    if let Some(timeout) = options.get("timeout_sec").and_then(Value::as_f64) {
        if !(timeout > 0.0 && timeout <= 3600.0) {
            return Err(ValidationError::new(MessageKey::TimeoutRange).with_field("timeout_sec"));
        }
    }

    if let Some(ports) = str_opt(options, "backup_ports") {
        count_ports(ports)
            .ok_or_else(|| ValidationError::new(MessageKey::PortsInvalid).with_field("backup_ports"))?;
    }

    let socks = str_opt(options, "socks_proxy").unwrap_or_default();
    if !socks.is_empty() && !SOCKS_PATTERN.is_match(socks) {
        return Err(ValidationError::new(MessageKey::SocksInvalid).with_field("socks_proxy"));
    }
    let ping = options.get("ping_flag").and_then(Value::as_bool).unwrap_or(false);
    if ping && !socks.is_empty() {
        return Err(ValidationError::new(MessageKey::PingWithSocks));
    }

    let methods = resolve_methods(options, catalog)?;
    options.insert(
        "scan_method".to_string(),
        Value::Array(methods.into_iter().map(Value::String).collect()),
    );

    check_output(options, catalog)?;

    Ok(())
}

fn resolve_methods(
    options: &Map<String, Value>,
    catalog: &ScanCatalog,
) -> Result<BTreeSet<String>, ValidationError> {
    let mut selected = BTreeSet::new();

    for profile in list_opt(options, "profile") {
        let methods = catalog
            .profiles
            .get(&profile)
            .ok_or_else(|| ValidationError::new(MessageKey::ProfileUnknown).with_field(profile.clone()))?;
        selected.extend(methods.iter().cloned());
    }

    for method in list_opt(options, "scan_method") {
        if method == "all" {
            selected.extend(catalog.methods.iter().cloned());
        } else if catalog.has_method(&method) {
            selected.insert(method);
        } else {
            return Err(ValidationError::new(MessageKey::ScanMethodUnknown).with_field(method));
        }
    }

    for method in list_opt(options, "exclude_method") {
        if method == "all" {
            return Err(ValidationError::new(MessageKey::ExcludeAll));
        }
        if !catalog.has_method(&method) {
            return Err(ValidationError::new(MessageKey::ScanMethodUnknown).with_field(method));
        }
        selected.remove(&method);
    }

    if selected.is_empty() {
        return Err(ValidationError::new(MessageKey::ScanMethodSelect));
    }
    Ok(selected)
}

fn check_output(options: &mut Map<String, Value>, catalog: &ScanCatalog) -> Result<(), ValidationError> {
    let Some(output) = str_opt(options, "log_in_file") else {
        return Ok(());
    };
    let extension = output
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if !OUTPUT_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ValidationError::new(MessageKey::LogFileExtension).with_field("log_in_file"));
    }

    if extension == "html" {
        if let Some(graph) = str_opt(options, "graph_flag") {
            if !graph.is_empty() && !catalog.has_graph(graph) {
                return Err(ValidationError::new(MessageKey::GraphUnknown).with_field("graph_flag"));
            }
        }
    } else if options.contains_key("graph_flag") {
        options.insert("graph_flag".to_string(), Value::String(String::new()));
    }
    Ok(())
}

/// Check a port list such as `80,443,8000-8100` and count the ports it names.
///
/// Ranges are counted, never expanded. `None` if any entry is invalid.
pub fn count_ports(raw: &str) -> Option<u64> {
    let mut count = 0u64;
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        count += match entry.split_once('-') {
            Some((start, end)) => {
                let start = parse_port(start)?;
                let end = parse_port(end)?;
                if start > end {
                    return None;
                }
                u64::from(end - start) + 1
            }
            None => {
                parse_port(entry)?;
                1
            }
        };
    }
    Some(count)
}

fn parse_port(raw: &str) -> Option<u16> {
    raw.trim().parse::<u16>().ok().filter(|p| *p >= 1)
}

fn check_int_range(
    options: &Map<String, Value>,
    key: &str,
    min: i64,
    max: i64,
    message: MessageKey,
) -> Result<(), ValidationError> {
    match options.get(key).and_then(Value::as_i64) {
        Some(value) if value < min || value > max => {
            Err(ValidationError::new(message).with_field(key))
        }
        _ => Ok(()),
    }
}

fn str_opt<'a>(options: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    options.get(key).and_then(Value::as_str)
}

/// A list option, accepting both arrays and comma-separated strings.
fn list_opt(options: &Map<String, Value>, key: &str) -> Vec<String> {
    match options.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}
