use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Uri};
use axum::response::{Html, IntoResponse, Response};
use tracing::debug;

use super::AppState;
use crate::error::ApiError;
use crate::web::mime_for;

pub(super) async fn index(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    state
        .web
        .render_index(state.assembler.defaults(), state.language())
        .map(Html)
        .map_err(|err| state.internal("index rendering", err))
}

/// Files below the web root; everything else is 404.
pub(super) async fn static_asset(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return state.not_found().into_response();
    }
    let Some(path) = state.web.static_path(uri.path()) else {
        return state.not_found().into_response();
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => ([(CONTENT_TYPE, mime_for(&path))], bytes).into_response(),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "Static file unavailable");
            state.not_found().into_response()
        }
    }
}
