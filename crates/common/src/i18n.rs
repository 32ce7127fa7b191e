//! Localized user-facing messages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Language of messages returned to API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    De,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::En, Language::De];

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::De => "de",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(Language::En),
            "de" => Ok(Language::De),
            _ => Err(crate::Error::UnsupportedLanguage(s.to_string())),
        }
    }
}

/// Catalogue of message keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    NotFound,
    UnauthorizedIp,
    ApiInvalid,
    BrowserSessionValid,
    BrowserSessionKilled,
    InvalidTarget,
    InvalidId,
    InvalidValue,
    ScanMethodSelect,
    ScanMethodUnknown,
    ExcludeAll,
    ProfileUnknown,
    PingWithSocks,
    SocksInvalid,
    ThreadNumberRange,
    TimeoutRange,
    RetriesRange,
    VerboseRange,
    PortsInvalid,
    LogFileExtension,
    GraphUnknown,
    LanguageUnknown,
    ShuttingDown,
    Internal,
}

impl MessageKey {
    /// Stable key name, used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKey::NotFound => "not_found",
            MessageKey::UnauthorizedIp => "unauthorized_IP",
            MessageKey::ApiInvalid => "API_invalid",
            MessageKey::BrowserSessionValid => "browser_session_valid",
            MessageKey::BrowserSessionKilled => "browser_session_killed",
            MessageKey::InvalidTarget => "error_target",
            MessageKey::InvalidId => "invalid_scan_id",
            MessageKey::InvalidValue => "invalid_value",
            MessageKey::ScanMethodSelect => "scan_method_select",
            MessageKey::ScanMethodUnknown => "scan_module_not_found",
            MessageKey::ExcludeAll => "error_exclude_all",
            MessageKey::ProfileUnknown => "profile_404",
            MessageKey::PingWithSocks => "ping_before_scan_socks",
            MessageKey::SocksInvalid => "wrong_socks_proxy",
            MessageKey::ThreadNumberRange => "thread_number_range",
            MessageKey::TimeoutRange => "timeout_range",
            MessageKey::RetriesRange => "retries_range",
            MessageKey::VerboseRange => "verbose_range",
            MessageKey::PortsInvalid => "ports_int",
            MessageKey::LogFileExtension => "file_write_error_extension",
            MessageKey::GraphUnknown => "graph_module_404",
            MessageKey::LanguageUnknown => "language_404",
            MessageKey::ShuttingDown => "shutting_down",
            MessageKey::Internal => "internal_error",
        }
    }

    /// Message text in the requested language.
    pub fn text(&self, language: Language) -> &'static str {
        match language {
            Language::En => self.text_en(),
            Language::De => self.text_de(),
        }
    }

    fn text_en(&self) -> &'static str {
        match self {
            MessageKey::NotFound => "file/path not found!",
            MessageKey::UnauthorizedIp => "your IP is not authorized",
            MessageKey::ApiInvalid => "invalid API key",
            MessageKey::BrowserSessionValid => "your browser session is valid",
            MessageKey::BrowserSessionKilled => "your browser session killed",
            MessageKey::InvalidTarget => "please input a correct target",
            MessageKey::InvalidId => "your scan id is not valid!",
            MessageKey::InvalidValue => "invalid value for option",
            MessageKey::ScanMethodSelect => "please choose your scan method!",
            MessageKey::ScanMethodUnknown => "scan method not found",
            MessageKey::ExcludeAll => "you cannot exclude all scan methods",
            MessageKey::ProfileUnknown => "profile not found",
            MessageKey::PingWithSocks => {
                "ping before scan cannot be combined with a socks proxy"
            }
            MessageKey::SocksInvalid => "socks proxy must look like socks5://host:port",
            MessageKey::ThreadNumberRange => "thread number is out of range",
            MessageKey::TimeoutRange => "timeout is out of range",
            MessageKey::RetriesRange => "retries is out of range",
            MessageKey::VerboseRange => "verbose level must be between 0 and 5",
            MessageKey::PortsInvalid => "ports must be numbers or ranges between 1 and 65535",
            MessageKey::LogFileExtension => {
                "output file extension must be .html, .json, .csv or .txt"
            }
            MessageKey::GraphUnknown => "graph module not found",
            MessageKey::LanguageUnknown => "language not supported",
            MessageKey::ShuttingDown => "the server is shutting down",
            MessageKey::Internal => "internal error",
        }
    }

    fn text_de(&self) -> &'static str {
        match self {
            MessageKey::NotFound => "Datei/Pfad nicht gefunden!",
            MessageKey::UnauthorizedIp => "Ihre IP ist nicht autorisiert",
            MessageKey::ApiInvalid => "ungültiger API-Schlüssel",
            MessageKey::BrowserSessionValid => "Ihre Browsersitzung ist gültig",
            MessageKey::BrowserSessionKilled => "Ihre Browsersitzung wurde beendet",
            MessageKey::InvalidTarget => "bitte geben Sie ein gültiges Ziel ein",
            MessageKey::InvalidId => "Ihre Scan-ID ist ungültig!",
            MessageKey::InvalidValue => "ungültiger Wert für Option",
            MessageKey::ScanMethodSelect => "bitte wählen Sie Ihre Scanmethode!",
            MessageKey::ScanMethodUnknown => "Scanmethode nicht gefunden",
            MessageKey::ExcludeAll => "Sie können nicht alle Scanmethoden ausschließen",
            MessageKey::ProfileUnknown => "Profil nicht gefunden",
            MessageKey::PingWithSocks => {
                "Ping vor dem Scan ist mit einem Socks-Proxy nicht möglich"
            }
            MessageKey::SocksInvalid => "Socks-Proxy muss wie socks5://host:port aussehen",
            MessageKey::ThreadNumberRange => "Thread-Anzahl außerhalb des gültigen Bereichs",
            MessageKey::TimeoutRange => "Timeout außerhalb des gültigen Bereichs",
            MessageKey::RetriesRange => "Wiederholungen außerhalb des gültigen Bereichs",
            MessageKey::VerboseRange => "Ausführlichkeit muss zwischen 0 und 5 liegen",
            MessageKey::PortsInvalid => {
                "Ports müssen Zahlen oder Bereiche zwischen 1 und 65535 sein"
            }
            MessageKey::LogFileExtension => {
                "Ausgabedatei muss auf .html, .json, .csv oder .txt enden"
            }
            MessageKey::GraphUnknown => "Graphmodul nicht gefunden",
            MessageKey::LanguageUnknown => "Sprache nicht unterstützt",
            MessageKey::ShuttingDown => "der Server wird heruntergefahren",
            MessageKey::Internal => "interner Fehler",
        }
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
