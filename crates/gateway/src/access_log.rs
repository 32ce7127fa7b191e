//! Per-request access log file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use scangate_common::Timestamp;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use crate::http::AppState;

/// Appends one CRLF-terminated line per request.
#[derive(Debug, Clone)]
pub struct AccessLog {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

pub struct AccessEntry<'a> {
    pub remote: &'a str,
    pub timestamp: Timestamp,
    pub host: &'a str,
    pub method: &'a str,
    pub path: &'a str,
    pub user_agent: &'a str,
    pub status: u16,
}

impl AccessEntry<'_> {
    /// `<remote> [<ts>] <host> "<method> <path>" <ua> <status>`
    pub fn format(&self) -> String {
        format!(
            "{} [{}] {} \"{} {}\" {} {}\r\n",
            self.remote,
            self.timestamp.to_store_format(),
            self.host,
            self.method,
            self.path,
            self.user_agent,
            self.status
        )
    }
}

impl AccessLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, entry: &AccessEntry<'_>) -> std::io::Result<()> {
        let line = entry.format();
        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}

pub async fn access_log_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(log) = state.access_log.clone() else {
        return next.run(request).await;
    };

    let remote = request
        .extensions()
        .get::<ConnectInfo<std::net::SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "-".to_string());
    let (host, user_agent) = {
        let header_str = |name: header::HeaderName| {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-")
                .to_string()
        };
        (header_str(header::HOST), header_str(header::USER_AGENT))
    };
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let entry = AccessEntry {
        remote: &remote,
        timestamp: Timestamp::now(),
        host: &host,
        method: &method,
        path: &path,
        user_agent: &user_agent,
        status: response.status().as_u16(),
    };
    if let Err(err) = log.append(&entry).await {
        warn!(path = %log.path().display(), error = %err, "Failed to write access log");
    }
    response
}
