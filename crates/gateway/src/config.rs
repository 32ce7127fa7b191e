use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use scangate_common::Language;

pub const DEFAULT_ACCESS_LOG_FILE: &str = "scangate_access.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupError {
    pub code: &'static str,
    pub message: String,
}

impl StartupError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for StartupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for StartupError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Who may talk to the gateway. Fixed for the process lifetime.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    api_key: String,
    ip_allow_list_enabled: bool,
    allowed_ips: HashSet<IpAddr>,
    tls: Option<TlsPaths>,
}

impl AccessPolicy {
    pub fn new(
        api_key: impl Into<String>,
        ip_allow_list_enabled: bool,
        allowed_ips: &[String],
        tls_cert: Option<PathBuf>,
        tls_key: Option<PathBuf>,
    ) -> Result<Self, StartupError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(StartupError::new(
                "ERR_INVALID_CONFIG",
                "API key must not be empty",
            ));
        }
        if let Some(bad) = api_key.chars().find(|c| !is_cookie_char(*c)) {
            return Err(StartupError::new(
                "ERR_INVALID_CONFIG",
                format!("API key contains {:?}, which cannot be sent in a cookie", bad),
            ));
        }

        let tls = match (tls_cert, tls_key) {
            (Some(cert), Some(key)) => Some(TlsPaths { cert, key }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(StartupError::new(
                    "ERR_TLS_PAIR",
                    "TLS certificate given without a private key",
                ))
            }
            (None, Some(_)) => {
                return Err(StartupError::new(
                    "ERR_TLS_PAIR",
                    "TLS private key given without a certificate",
                ))
            }
        };

        let mut parsed = HashSet::new();
        for raw in allowed_ips {
            let ip = raw.trim().parse::<IpAddr>().map_err(|_| {
                StartupError::new("ERR_INVALID_CONFIG", format!("invalid allowed IP {:?}", raw))
            })?;
            parsed.insert(ip.to_canonical());
        }

        Ok(Self {
            api_key,
            ip_allow_list_enabled,
            allowed_ips: parsed,
            tls,
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn ip_allow_list_enabled(&self) -> bool {
        self.ip_allow_list_enabled
    }

    pub fn is_ip_allowed(&self, ip: IpAddr) -> bool {
        self.allowed_ips.contains(&ip.to_canonical())
    }

    pub fn tls(&self) -> Option<&TlsPaths> {
        self.tls.as_ref()
    }
}

/// Cookie value characters: printable ASCII other than `"`, `,`, `;` and backslash.
fn is_cookie_char(c: char) -> bool {
    c.is_ascii_graphic() && !matches!(c, '"' | ',' | ';' | '\\')
}

/// Raw startup parameters as collected from the command line.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub api_key: String,
    pub allow_list_enabled: bool,
    pub allowed_ips: Vec<String>,
    pub access_log_enabled: bool,
    pub access_log_file: PathBuf,
    pub tls_cert: Option<PathBuf>,
    pub tls_key: Option<PathBuf>,
    pub language: Language,
    pub web_root: Option<PathBuf>,
    pub results_root: PathBuf,
}

impl GatewaySettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            debug: false,
            api_key: api_key.into(),
            allow_list_enabled: false,
            allowed_ips: Vec::new(),
            access_log_enabled: false,
            access_log_file: PathBuf::from(DEFAULT_ACCESS_LOG_FILE),
            tls_cert: None,
            tls_key: None,
            language: Language::default(),
            web_root: None,
            results_root: PathBuf::from("."),
        }
    }
}

/// Validated gateway configuration, shared read-only by every component.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: SocketAddr,
    pub debug: bool,
    pub policy: AccessPolicy,
    pub access_log: Option<PathBuf>,
    pub language: Language,
    pub web_root: Option<PathBuf>,
    pub results_root: PathBuf,
}

impl GatewayConfig {
    pub fn from_settings(settings: GatewaySettings) -> Result<Self, StartupError> {
        let policy = AccessPolicy::new(
            settings.api_key,
            settings.allow_list_enabled,
            &settings.allowed_ips,
            settings.tls_cert,
            settings.tls_key,
        )?;

        let ip = match settings.host.trim() {
            "localhost" => IpAddr::V4(Ipv4Addr::LOCALHOST),
            other => other.parse::<IpAddr>().map_err(|_| {
                StartupError::new(
                    "ERR_INVALID_CONFIG",
                    format!("invalid bind host {:?}", settings.host),
                )
            })?,
        };

        Ok(Self {
            bind_addr: SocketAddr::new(ip, settings.port),
            debug: settings.debug,
            policy,
            access_log: settings
                .access_log_enabled
                .then_some(settings.access_log_file),
            language: settings.language,
            web_root: settings.web_root,
            results_root: settings.results_root,
        })
    }

    pub fn scheme(&self) -> &'static str {
        if self.policy.tls().is_some() {
            "https"
        } else {
            "http"
        }
    }
}
