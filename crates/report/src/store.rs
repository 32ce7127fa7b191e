//! Log store contract and its implementations.

use crate::page::Page;
use crate::record::{
    display_value, field_str, Report, ReportRecord, DATE_FIELD, DESCRIPTION_FIELD, HOST_FIELD,
    METHOD_FIELD, PORT_FIELD, SCAN_ID_FIELD,
};
use async_trait::async_trait;
use scangate_common::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Full contents of a store at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub reports: Vec<Report>,
    #[serde(default)]
    pub logs: Vec<ReportRecord>,
}

impl Snapshot {
    fn results(&self) -> Vec<ReportRecord> {
        let mut reports: Vec<&Report> = self.reports.iter().collect();
        reports.sort_by(|a, b| b.id.cmp(&a.id));
        reports.into_iter().map(Report::to_record).collect()
    }

    fn report(&self, id: i64) -> Option<Report> {
        self.reports.iter().find(|r| r.id == id).cloned()
    }

    fn logs_where(&self, field: &str, value: &str) -> Vec<ReportRecord> {
        if value.is_empty() {
            return Vec::new();
        }
        self.logs
            .iter()
            .filter(|log| field_str(log, field) == value)
            .cloned()
            .collect()
    }

    fn matching(&self, query: &str) -> Vec<&ReportRecord> {
        let needle = query.trim().to_lowercase();
        self.logs
            .iter()
            .filter(|log| {
                needle.is_empty()
                    || log
                        .values()
                        .any(|v| display_value(Some(v)).to_lowercase().contains(&needle))
            })
            .collect()
    }
}

/// Group log events per host, most recently active host first.
fn host_summaries<'a>(logs: impl IntoIterator<Item = &'a ReportRecord>) -> Vec<ReportRecord> {
    struct Summary {
        last_seen: String,
        methods: Vec<String>,
        ports: Vec<String>,
        descriptions: Vec<String>,
    }

    fn push_unique(list: &mut Vec<String>, value: String) {
        if !value.is_empty() && !list.contains(&value) {
            list.push(value);
        }
    }

    let mut by_host: HashMap<String, Summary> = HashMap::new();
    for log in logs {
        let host = field_str(log, HOST_FIELD);
        if host.is_empty() {
            continue;
        }
        let date = field_str(log, DATE_FIELD).to_string();
        let summary = by_host.entry(host.to_string()).or_insert_with(|| Summary {
            last_seen: date.clone(),
            methods: Vec::new(),
            ports: Vec::new(),
            descriptions: Vec::new(),
        });
        if date > summary.last_seen {
            summary.last_seen = date;
        }
        push_unique(&mut summary.methods, display_value(log.get(METHOD_FIELD)));
        push_unique(&mut summary.ports, display_value(log.get(PORT_FIELD)));
        push_unique(&mut summary.descriptions, display_value(log.get(DESCRIPTION_FIELD)));
    }

    let mut hosts: Vec<(String, Summary)> = by_host.into_iter().collect();
    hosts.sort_by(|(ha, a), (hb, b)| b.last_seen.cmp(&a.last_seen).then_with(|| ha.cmp(hb)));

    hosts
        .into_iter()
        .filter_map(|(host, s)| {
            let value = json!({
                "host": host,
                "last_seen": s.last_seen,
                "info": {
                    "scan_methods": s.methods,
                    "open_ports": s.ports,
                    "descriptions": s.descriptions,
                }
            });
            match value {
                Value::Object(map) => Some(map),
                _ => None,
            }
        })
        .collect()
}

/// Backing store for reports and log events.
///
/// Every query opens the store afresh; nothing is cached between requests.
#[async_trait]
pub trait LogStore: Send + Sync {
    async fn open(&self) -> Result<Arc<Snapshot>>;

    fn describe(&self) -> String;
}

/// Store held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogStore {
    snapshot: Arc<Snapshot>,
}

impl MemoryLogStore {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
        }
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn open(&self) -> Result<Arc<Snapshot>> {
        Ok(self.snapshot.clone())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Store backed by a JSON file of the form `{"reports": [...], "logs": [...]}`.
///
/// A missing file reads as an empty store.
#[derive(Debug, Clone)]
pub struct JsonFileLogStore {
    path: PathBuf,
}

impl JsonFileLogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LogStore for JsonFileLogStore {
    async fn open(&self) -> Result<Arc<Snapshot>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Log store file missing, using empty store");
                return Ok(Arc::new(Snapshot::default()));
            }
            Err(err) => return Err(Error::Io(err)),
        };

        let snapshot: Snapshot = serde_json::from_slice(&bytes).map_err(|e| {
            Error::Store(format!("invalid log store {}: {}", self.path.display(), e))
        })?;
        Ok(Arc::new(snapshot))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Pagination and search on top of a [`LogStore`].
#[derive(Clone)]
pub struct LogQuery {
    store: Arc<dyn LogStore>,
}

impl LogQuery {
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }

    pub fn describe(&self) -> String {
        self.store.describe()
    }

    /// Reports, newest id first.
    pub async fn list_results(&self, page: Page) -> Result<Vec<ReportRecord>> {
        Ok(page.apply(self.store.open().await?.results()))
    }

    pub async fn report_by_id(&self, id: i64) -> Result<Option<Report>> {
        Ok(self.store.open().await?.report(id))
    }

    /// Per-host summaries, most recently active first.
    pub async fn list_recent(&self, page: Page) -> Result<Vec<ReportRecord>> {
        let snapshot = self.store.open().await?;
        Ok(page.apply(host_summaries(&snapshot.logs)))
    }

    /// Per-host summaries of events containing `query` in any field,
    /// case-insensitively. An empty query matches everything.
    pub async fn search(&self, page: Page, query: &str) -> Result<Vec<ReportRecord>> {
        let snapshot = self.store.open().await?;
        Ok(page.apply(host_summaries(snapshot.matching(query))))
    }

    pub async fn by_scan_id(&self, scan_id: &str) -> Result<Vec<ReportRecord>> {
        Ok(self.store.open().await?.logs_where(SCAN_ID_FIELD, scan_id))
    }

    pub async fn by_host(&self, host: &str) -> Result<Vec<ReportRecord>> {
        Ok(self.store.open().await?.logs_where(HOST_FIELD, host))
    }
}
