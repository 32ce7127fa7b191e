//! Encoding of record sets into downloadable artifacts.

use crate::csv;
use crate::record::{display_value, Report, ReportRecord};
use crate::store::LogQuery;
use handlebars::Handlebars;
use scangate_common::{naming, Timestamp};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

const HTML_TEMPLATE_NAME: &str = "report";

const HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{{title}}</title>
    <style>
        body { font-family: sans-serif; margin: 20px; }
        table { border-collapse: collapse; width: 100%; }
        th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }
        th { background-color: #4CAF50; color: white; }
        tr:nth-child(even) { background-color: #f2f2f2; }
    </style>
</head>
<body>
    <h1>{{title}}</h1>
    <p>Generated {{generated}} | Events: {{count}}</p>
    {{#if columns}}
    <table>
        <tr>{{#each columns}}<th>{{this}}</th>{{/each}}</tr>
        {{#each rows}}
        <tr>{{#each this}}<td>{{this}}</td>{{/each}}</tr>
        {{/each}}
    </table>
    {{else}}
    <p>No events recorded.</p>
    {{/if}}
</body>
</html>
"#;

/// Errors from report export.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("report {0} not found")]
    NotFound(i64),

    #[error("Store error: {0}")]
    Store(#[from] scangate_common::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Unknown export format: {0}")]
    UnknownFormat(String),
}

/// Supported export encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Html,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Html => "html",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv",
            ExportFormat::Html => "text/html",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "html" => Ok(ExportFormat::Html),
            _ => Err(ExportError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// An encoded export ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub mime_type: &'static str,
    pub filename: String,
    pub payload: Vec<u8>,
}

impl ExportArtifact {
    fn new(format: ExportFormat, stamp: &Timestamp, payload: Vec<u8>) -> Self {
        Self {
            mime_type: format.mime_type(),
            filename: naming::report_filename(stamp, format.extension()),
            payload,
        }
    }

    pub fn content_disposition(&self) -> String {
        format!("attachment;filename={}", self.filename)
    }
}

#[derive(Serialize)]
struct HtmlContext<'a> {
    title: &'a str,
    generated: String,
    count: usize,
    columns: Vec<&'a str>,
    rows: Vec<Vec<String>>,
}

/// Encodes record sets as JSON, CSV or HTML.
pub struct ReportExporter {
    templates: Handlebars<'static>,
}

impl ReportExporter {
    pub fn new() -> Result<Self, ExportError> {
        let mut templates = Handlebars::new();
        templates
            .register_template_string(HTML_TEMPLATE_NAME, HTML_TEMPLATE)
            .map_err(|e| ExportError::Template(e.to_string()))?;
        Ok(Self { templates })
    }

    /// Serialized array of records.
    pub fn export_json(
        &self,
        records: &[ReportRecord],
        stamp: &Timestamp,
    ) -> Result<ExportArtifact, ExportError> {
        let payload = serde_json::to_vec(records)?;
        Ok(ExportArtifact::new(ExportFormat::Json, stamp, payload))
    }

    /// All-quoted CSV whose columns are the first record's fields.
    pub fn export_csv(&self, records: &[ReportRecord], stamp: &Timestamp) -> ExportArtifact {
        let payload = csv::encode_records(records).into_bytes();
        ExportArtifact::new(ExportFormat::Csv, stamp, payload)
    }

    /// HTML table titled `title`. Values are escaped by the template engine.
    pub fn export_html(
        &self,
        title: &str,
        records: &[ReportRecord],
        stamp: &Timestamp,
    ) -> Result<ExportArtifact, ExportError> {
        let columns: Vec<&str> = records
            .first()
            .map(|first| first.keys().map(String::as_str).collect())
            .unwrap_or_default();
        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|key| display_value(record.get(*key)))
                    .collect()
            })
            .collect();

        let context = HtmlContext {
            title,
            generated: stamp.to_store_format(),
            count: records.len(),
            columns,
            rows,
        };
        let html = self
            .templates
            .render(HTML_TEMPLATE_NAME, &context)
            .map_err(|e| ExportError::Template(e.to_string()))?;
        Ok(ExportArtifact::new(ExportFormat::Html, stamp, html.into_bytes()))
    }

    pub fn export(
        &self,
        format: ExportFormat,
        title: &str,
        records: &[ReportRecord],
        stamp: &Timestamp,
    ) -> Result<ExportArtifact, ExportError> {
        debug!(format = %format, records = records.len(), "Exporting records");
        match format {
            ExportFormat::Json => self.export_json(records, stamp),
            ExportFormat::Csv => Ok(self.export_csv(records, stamp)),
            ExportFormat::Html => self.export_html(title, records, stamp),
        }
    }
}

/// A report together with every log event of its scan run.
#[derive(Debug, Clone)]
pub struct ResolvedReport {
    pub report: Report,
    pub records: Vec<ReportRecord>,
}

impl ResolvedReport {
    /// Stamp for export filenames: the report date, or now if unparsable.
    pub fn stamp(&self) -> Timestamp {
        self.report.timestamp().unwrap_or_else(Timestamp::now)
    }
}

/// Look up a report by surrogate id and collect the events of its scan run.
pub async fn resolve_report_by_numeric_id(
    query: &LogQuery,
    id: i64,
) -> Result<ResolvedReport, ExportError> {
    let report = query
        .report_by_id(id)
        .await?
        .ok_or(ExportError::NotFound(id))?;
    let records = query.by_scan_id(&report.scan_id).await?;
    Ok(ResolvedReport { report, records })
}
