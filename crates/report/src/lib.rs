//! Log store access and report export.
//!
//! [`LogQuery`] is the single entry point toward a [`LogStore`]; the
//! [`ReportExporter`] only shapes and encodes the records it is handed.

pub mod csv;
pub mod export;
pub mod page;
pub mod record;
pub mod store;

pub use export::{
    resolve_report_by_numeric_id, ExportArtifact, ExportError, ExportFormat, ReportExporter,
    ResolvedReport,
};
pub use page::{Page, PAGE_SIZE};
pub use record::{Report, ReportRecord};
pub use store::{JsonFileLogStore, LogQuery, LogStore, MemoryLogStore, Snapshot};
