use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::response::IntoResponse;
use scangate_common::MessageKey;

use super::AppState;
use crate::error::{ok_message, ApiError};
use crate::params::Params;

pub(super) async fn check(
    State(state): State<AppState>,
    params: Params,
) -> Result<impl IntoResponse, ApiError> {
    state.authorize(&params)?;
    Ok(ok_message(MessageKey::BrowserSessionValid, state.language()))
}

pub(super) async fn set(
    State(state): State<AppState>,
    params: Params,
) -> Result<impl IntoResponse, ApiError> {
    state.authorize(&params)?;
    Ok((
        [(SET_COOKIE, state.gate.issue_session())],
        ok_message(MessageKey::BrowserSessionValid, state.language()),
    ))
}

pub(super) async fn kill(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(SET_COOKIE, state.gate.kill_session())],
        ok_message(MessageKey::BrowserSessionKilled, state.language()),
    )
}
