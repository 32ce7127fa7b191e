use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::Json;
use scangate_common::Timestamp;
use scangate_report::{ExportFormat, Page, ReportRecord};

use super::{attachment, AppState};
use crate::error::ApiError;
use crate::params::Params;

pub(super) async fn list(
    State(state): State<AppState>,
    params: Params,
) -> Result<Json<Vec<ReportRecord>>, ApiError> {
    state.authorize(&params)?;
    let page = Page::parse(params.get("page"));
    state
        .logs
        .list_recent(page)
        .await
        .map(Json)
        .map_err(|err| state.internal("log listing", err))
}

pub(super) async fn search(
    State(state): State<AppState>,
    params: Params,
) -> Result<Json<Vec<ReportRecord>>, ApiError> {
    state.authorize(&params)?;
    let page = Page::parse(params.get("page"));
    let query = params.get("q").unwrap_or_default();
    state
        .logs
        .search(page, query)
        .await
        .map(Json)
        .map_err(|err| state.internal("log search", err))
}

pub(super) async fn export_html(
    State(state): State<AppState>,
    params: Params,
) -> Result<Response, ApiError> {
    let artifact = export_host(&state, &params, ExportFormat::Html).await?;
    Ok(([(CONTENT_TYPE, artifact.mime_type)], artifact.payload).into_response())
}

pub(super) async fn export_json(
    State(state): State<AppState>,
    params: Params,
) -> Result<Response, ApiError> {
    export_host(&state, &params, ExportFormat::Json)
        .await
        .map(attachment)
}

pub(super) async fn export_csv(
    State(state): State<AppState>,
    params: Params,
) -> Result<Response, ApiError> {
    export_host(&state, &params, ExportFormat::Csv)
        .await
        .map(attachment)
}

/// Every event of one host. A missing host selects nothing.
async fn export_host(
    state: &AppState,
    params: &Params,
    format: ExportFormat,
) -> Result<scangate_report::ExportArtifact, ApiError> {
    state.authorize(params)?;
    let host = params.get("host").unwrap_or_default();

    let records = state
        .logs
        .by_host(host)
        .await
        .map_err(|err| state.internal("host lookup", err))?;
    state
        .exporter
        .export(format, host, &records, &Timestamp::now())
        .map_err(|err| state.internal("host export", err))
}
