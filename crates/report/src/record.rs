//! Records produced by the log store.

use scangate_common::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One log event, field order preserved as stored.
pub type ReportRecord = Map<String, Value>;

pub const HOST_FIELD: &str = "host";
pub const SCAN_ID_FIELD: &str = "scan_id";
pub const DATE_FIELD: &str = "date";
pub const PORT_FIELD: &str = "port";
pub const METHOD_FIELD: &str = "type";
pub const DESCRIPTION_FIELD: &str = "description";

/// A completed scan run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    pub date: String,
    pub scan_id: String,
    #[serde(default)]
    pub report_filename: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Report {
    pub fn timestamp(&self) -> Option<Timestamp> {
        Timestamp::parse_store_date(&self.date)
    }

    pub fn to_record(&self) -> ReportRecord {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

pub(crate) fn field_str<'a>(record: &'a ReportRecord, field: &str) -> &'a str {
    record.get(field).and_then(Value::as_str).unwrap_or_default()
}

/// Render a scalar for text formats. Null becomes empty.
pub(crate) fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_report_keeps_extra_fields() {
        let report: Report = serde_json::from_value(json!({
            "id": 7,
            "date": "2024-03-01 10:20:30",
            "scan_id": "abc",
            "report_filename": "results/r.html",
            "events_num": 12
        }))
        .unwrap();

        assert_eq!(report.extra["events_num"], json!(12));
        assert_eq!(
            report.timestamp().unwrap().to_filename_stamp(),
            "2024_03_01_10_20_30"
        );
        assert_eq!(report.to_record()["events_num"], json!(12));
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(None), "");
        assert_eq!(display_value(Some(&Value::Null)), "");
        assert_eq!(display_value(Some(&json!("x"))), "x");
        assert_eq!(display_value(Some(&json!(443))), "443");
    }
}
