use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::Json;
use scangate_common::Timestamp;
use scangate_report::{
    resolve_report_by_numeric_id, ExportError, ExportFormat, Page, ReportRecord,
};
use tracing::debug;

use super::{attachment, parse_id, AppState};
use crate::error::ApiError;
use crate::params::Params;
use crate::web::{mime_for, resolve_under};

pub(super) async fn list(
    State(state): State<AppState>,
    params: Params,
) -> Result<Json<Vec<ReportRecord>>, ApiError> {
    state.authorize(&params)?;
    let page = Page::parse(params.get("page"));
    state
        .logs
        .list_results(page)
        .await
        .map(Json)
        .map_err(|err| state.internal("results listing", err))
}

/// Stored output file of one report.
pub(super) async fn content(
    State(state): State<AppState>,
    params: Params,
) -> Result<Response, ApiError> {
    state.authorize(&params)?;
    let id = parse_id(&params, state.language())?;

    let report = state
        .logs
        .report_by_id(id)
        .await
        .map_err(|err| state.internal("report lookup", err))?
        .ok_or_else(|| state.not_found())?;

    let path = resolve_under(&state.config.results_root, &report.report_filename)
        .ok_or_else(|| state.not_found())?;
    let bytes = tokio::fs::read(&path).await.map_err(|err| {
        debug!(path = %path.display(), error = %err, "Report file unavailable");
        state.not_found()
    })?;

    Ok(([(CONTENT_TYPE, mime_for(&path))], bytes).into_response())
}

pub(super) async fn export_json(
    State(state): State<AppState>,
    params: Params,
) -> Result<Response, ApiError> {
    export_by_id(&state, &params, ExportFormat::Json).await
}

pub(super) async fn export_csv(
    State(state): State<AppState>,
    params: Params,
) -> Result<Response, ApiError> {
    export_by_id(&state, &params, ExportFormat::Csv).await
}

/// A numeric id without a report exports an empty set.
async fn export_by_id(
    state: &AppState,
    params: &Params,
    format: ExportFormat,
) -> Result<Response, ApiError> {
    state.authorize(params)?;
    let id = parse_id(params, state.language())?;

    let (records, stamp) = match resolve_report_by_numeric_id(&state.logs, id).await {
        Ok(resolved) => {
            let stamp = resolved.stamp();
            (resolved.records, stamp)
        }
        Err(ExportError::NotFound(_)) => {
            debug!(report_id = id, "Report not found, exporting empty set");
            (Vec::new(), Timestamp::now())
        }
        Err(err) => return Err(state.internal("report lookup", err)),
    };

    let artifact = state
        .exporter
        .export(format, &format!("report {}", id), &records, &stamp)
        .map_err(|err| state.internal("report export", err))?;
    Ok(attachment(artifact))
}
