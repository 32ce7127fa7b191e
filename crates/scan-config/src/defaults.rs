//! Default scan configuration and the catalogue of scan methods.

use scangate_common::{Error, Result};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Options that exist in the default configuration but may not be set or
/// echoed through the API.
pub const NON_API_KEYS: &[&str] = &[
    "home_path",
    "tmp_path",
    "results_path",
    "database_type",
    "database_name",
    "startup_check_for_update",
    "wizard_mode",
    "help_menu_flag",
    "show_version",
];

/// Scan methods, profiles and graphs offered by the scan engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCatalog {
    pub methods: Vec<String>,
    pub profiles: BTreeMap<String, Vec<String>>,
    pub graphs: Vec<String>,
}

impl Default for ScanCatalog {
    fn default() -> Self {
        let owned = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let brute = owned(&["ftp_brute", "ssh_brute", "smtp_brute", "telnet_brute"]);
        let info = owned(&[
            "port_scan",
            "icmp_scan",
            "http_status_scan",
            "ssl_certificate_scan",
        ]);
        let cms = owned(&[
            "wordpress_version_scan",
            "joomla_version_scan",
            "drupal_version_scan",
        ]);
        let web = owned(&["dir_scan", "admin_scan", "subdomain_scan"]);

        let mut methods = Vec::new();
        methods.extend(info.iter().cloned());
        methods.extend(web.iter().cloned());
        methods.extend(cms.iter().cloned());
        methods.extend(brute.iter().cloned());

        let profiles = BTreeMap::from([
            ("brute".to_string(), brute),
            ("cms".to_string(), cms),
            ("info".to_string(), info),
            ("web".to_string(), web),
        ]);

        Self {
            methods,
            profiles,
            graphs: owned(&["d3_tree_v1_graph", "d3_tree_v2_graph", "jit_circle_v1_graph"]),
        }
    }
}

impl ScanCatalog {
    pub fn has_method(&self, name: &str) -> bool {
        self.methods.iter().any(|m| m == name)
    }

    pub fn has_graph(&self, name: &str) -> bool {
        self.graphs.iter().any(|g| g == name)
    }
}

/// The full default configuration plus the catalogue it is validated against.
///
/// Built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct ScanDefaults {
    options: Map<String, Value>,
    catalog: ScanCatalog,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DefaultsFile {
    #[serde(default)]
    options: Map<String, Value>,
    #[serde(default)]
    methods: Option<Vec<String>>,
    #[serde(default)]
    profiles: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default)]
    graphs: Option<Vec<String>>,
}

impl Default for ScanDefaults {
    fn default() -> Self {
        let options = json!({
            "targets": "",
            "scan_method": [],
            "exclude_method": [],
            "profile": "",
            "usernames": "",
            "passwds": "",
            "backup_ports": "",
            "timeout_sec": 3.0,
            "thread_number": 100,
            "thread_number_host": 5,
            "retries": 3,
            "ping_flag": false,
            "socks_proxy": "",
            "methods_args": {},
            "log_in_file": "",
            "graph_flag": "d3_tree_v2_graph",
            "verbose_level": 0,
            "language": "en",
            "home_path": ".scangate",
            "tmp_path": ".scangate/tmp",
            "results_path": ".scangate/results",
            "database_type": "sqlite",
            "database_name": ".scangate/scangate.db",
            "startup_check_for_update": false,
            "wizard_mode": false,
            "help_menu_flag": false,
            "show_version": false
        });

        Self {
            options: options.as_object().cloned().unwrap_or_default(),
            catalog: ScanCatalog::default(),
        }
    }
}

impl ScanDefaults {
    pub fn new(options: Map<String, Value>, catalog: ScanCatalog) -> Self {
        Self { options, catalog }
    }

    /// Built-in defaults overlaid with a YAML file.
    ///
    /// The file may override option values and replace the catalogue, but
    /// may not introduce options the built-in defaults do not know.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let file: DefaultsFile = serde_yaml::from_str(&content)?;

        let mut defaults = Self::default();
        for (key, value) in file.options {
            match defaults.options.get(&key) {
                Some(existing) if same_kind(existing, &value) => {
                    defaults.options.insert(key, value);
                }
                Some(_) => {
                    return Err(Error::Config(format!(
                        "option '{}' in {} has the wrong type",
                        key,
                        path.display()
                    )))
                }
                None => {
                    return Err(Error::Config(format!(
                        "unknown option '{}' in {}",
                        key,
                        path.display()
                    )))
                }
            }
        }
        if let Some(methods) = file.methods {
            defaults.catalog.methods = methods;
        }
        if let Some(profiles) = file.profiles {
            defaults.catalog.profiles = profiles;
        }
        if let Some(graphs) = file.graphs {
            defaults.catalog.graphs = graphs;
        }

        info!(
            "Loaded scan defaults from {:?} ({} methods)",
            path,
            defaults.catalog.methods.len()
        );
        Ok(defaults)
    }

    pub fn options(&self) -> &Map<String, Value> {
        &self.options
    }

    pub fn catalog(&self) -> &ScanCatalog {
        &self.catalog
    }

    /// Whether an option may be set and echoed through the API.
    pub fn is_api_key(&self, key: &str) -> bool {
        self.options.contains_key(key) && !NON_API_KEYS.contains(&key)
    }
}

fn same_kind(a: &Value, b: &Value) -> bool {
    matches!(
        (a, b),
        (Value::Null, _)
            | (Value::Bool(_), Value::Bool(_))
            | (Value::Number(_), Value::Number(_))
            | (Value::String(_), Value::String(_))
            | (Value::Array(_), Value::Array(_))
            | (Value::Object(_), Value::Object(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_catalog_profiles_reference_methods() {
        let catalog = ScanCatalog::default();
        for methods in catalog.profiles.values() {
            for method in methods {
                assert!(catalog.has_method(method), "{} missing", method);
            }
        }
    }

    #[test]
    fn test_non_api_keys_are_defaults() {
        let defaults = ScanDefaults::default();
        for key in NON_API_KEYS {
            assert!(defaults.options().contains_key(*key));
            assert!(!defaults.is_api_key(key));
        }
        assert!(defaults.is_api_key("targets"));
        assert!(!defaults.is_api_key("ports"));
    }

    #[test]
    fn test_yaml_overlay() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "options:\n  thread_number: 20\n  ping_flag: true\nmethods:\n  - port_scan\n  - custom_scan\nprofiles:\n  quick: [port_scan]"
        )
        .unwrap();

        let defaults = ScanDefaults::from_yaml_file(file.path()).unwrap();
        assert_eq!(defaults.options()["thread_number"], 20);
        assert_eq!(defaults.options()["ping_flag"], true);
        assert!(defaults.catalog().has_method("custom_scan"));
        assert!(!defaults.catalog().has_method("ssh_brute"));
        assert_eq!(defaults.catalog().profiles["quick"], vec!["port_scan"]);
    }

    #[test]
    fn test_yaml_overlay_rejects_unknown_option() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "options:\n  shell_command: rm").unwrap();
        let err = ScanDefaults::from_yaml_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("shell_command"));
    }

    #[test]
    fn test_yaml_overlay_rejects_wrong_type() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "options:\n  thread_number: lots").unwrap();
        assert!(ScanDefaults::from_yaml_file(file.path()).is_err());
    }
}
