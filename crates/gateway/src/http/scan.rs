use axum::extract::State;
use axum::http::{HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use scangate_common::MessageKey;
use scangate_supervisor::SupervisorError;
use serde_json::Value;
use tracing::{debug, info};

use super::{AppState, JOB_ID_HEADER};
use crate::error::ApiError;
use crate::params::Params;

/// Validate, launch and echo the resolved configuration without waiting
/// for the job.
pub(super) async fn new_scan(
    State(state): State<AppState>,
    params: Params,
) -> Result<Response, ApiError> {
    state.authorize(&params)?;
    let language = state.language();

    let config = state
        .assembler
        .assemble(&params.to_raw_params())
        .map_err(|err| {
            debug!(error = %err, "Rejected scan request");
            ApiError::validation(&err, language)
        })?;

    let (echo, stats) = state.redactor.redact(config.as_map());

    let handle = state.supervisor.submit(config).map_err(|err| match err {
        SupervisorError::ShuttingDown => ApiError::localized(
            StatusCode::SERVICE_UNAVAILABLE,
            MessageKey::ShuttingDown,
            language,
        ),
    })?;
    info!(job_id = %handle.id, redacted = stats.total(), "Scan request accepted");

    Ok((
        [(HeaderName::from_static(JOB_ID_HEADER), handle.id.to_string())],
        Json(Value::Object(echo)),
    )
        .into_response())
}
