//! Timestamp utilities.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Date layout used by the log store and the access log.
pub const STORE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Date layout embedded in generated filenames.
pub const FILENAME_STAMP_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";

/// A wrapper around DateTime<Utc> with consistent serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a new timestamp from the current time.
    pub fn now() -> Self {
        Timestamp(Utc::now())
    }

    /// Parse a `YYYY-MM-DD HH:MM:SS` date as written by the log store.
    pub fn parse_store_date(raw: &str) -> Option<Self> {
        NaiveDateTime::parse_from_str(raw.trim(), STORE_DATE_FORMAT)
            .ok()
            .map(|naive| Timestamp(naive.and_utc()))
    }

    /// Format as ISO 8601 string.
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
    }

    /// Format as `YYYY-MM-DD HH:MM:SS`.
    pub fn to_store_format(&self) -> String {
        self.0.format(STORE_DATE_FORMAT).to_string()
    }

    /// Format as `YYYY_MM_DD_HH_MM_SS` for filenames.
    pub fn to_filename_stamp(&self) -> String {
        self.0.format(FILENAME_STAMP_FORMAT).to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_iso8601())
    }
}
