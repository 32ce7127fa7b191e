//! Minimal CSV writer with every field quoted.
//!
//! Simple implementation to avoid adding another dependency.

use crate::record::{display_value, ReportRecord};

const LINE_END: &str = "\r\n";

/// Encode records with the first record's fields as the header.
///
/// Later records are projected onto that header: extra fields are dropped
/// and missing ones are written empty.
pub fn encode_records(records: &[ReportRecord]) -> String {
    let Some(first) = records.first() else {
        return String::new();
    };
    let header: Vec<&str> = first.keys().map(String::as_str).collect();

    let mut out = String::new();
    write_row(&mut out, header.iter().copied());
    for record in records {
        let row: Vec<String> = header
            .iter()
            .map(|key| display_value(record.get(*key)))
            .collect();
        write_row(&mut out, row.iter().map(String::as_str));
    }
    out
}

fn write_row<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    }
    out.push_str(LINE_END);
}
