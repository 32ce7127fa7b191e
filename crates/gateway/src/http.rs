use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, FromRef, Request, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::middleware::{from_fn_with_state, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use scangate_common::{Language, MessageKey};
use scangate_redaction::Redactor;
use scangate_report::{ExportArtifact, LogQuery, ReportExporter};
use scangate_scan_config::ConfigAssembler;
use scangate_supervisor::JobSupervisor;
use tracing::warn;

use crate::access::AccessGate;
use crate::access_log::{access_log_middleware, AccessLog};
use crate::config::{GatewayConfig, StartupError};
use crate::error::ApiError;
use crate::params::Params;
use crate::web::WebUi;

mod logs;
mod results;
mod scan;
mod session;
mod ui;

#[cfg(test)]
mod tests;

/// Response header carrying the id of a submitted job.
pub const JOB_ID_HEADER: &str = "x-scangate-job-id";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub gate: AccessGate,
    pub assembler: Arc<ConfigAssembler>,
    pub supervisor: JobSupervisor,
    pub logs: LogQuery,
    pub exporter: Arc<ReportExporter>,
    pub redactor: Arc<Redactor>,
    pub access_log: Option<AccessLog>,
    pub web: Arc<WebUi>,
}

impl AppState {
    pub fn new(
        config: GatewayConfig,
        assembler: ConfigAssembler,
        supervisor: JobSupervisor,
        logs: LogQuery,
    ) -> Result<Self, StartupError> {
        let exporter = ReportExporter::new()
            .map_err(|e| StartupError::new("ERR_TEMPLATE", e.to_string()))?;
        let web = WebUi::new(config.web_root.clone())?;
        let access_log = config.access_log.clone().map(AccessLog::new);

        Ok(Self {
            gate: AccessGate::new(Arc::new(config.policy.clone())),
            config: Arc::new(config),
            assembler: Arc::new(assembler),
            supervisor,
            logs,
            exporter: Arc::new(exporter),
            redactor: Arc::new(Redactor::new()),
            access_log,
            web: Arc::new(web),
        })
    }

    pub fn language(&self) -> Language {
        self.config.language
    }

    pub(crate) fn authorize(&self, params: &Params) -> Result<(), ApiError> {
        self.gate
            .check_api_key(params.api_key())
            .map_err(|err| err.to_api_error(self.language()))
    }

    pub(crate) fn internal(&self, what: &str, err: impl Display) -> ApiError {
        warn!(error = %err, "{} failed", what);
        ApiError::internal(self.language())
    }

    pub(crate) fn not_found(&self) -> ApiError {
        ApiError::not_found(self.language())
    }
}

impl FromRef<AppState> for Language {
    fn from_ref(state: &AppState) -> Self {
        state.language()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(ui::index).post(ui::index))
        .route("/new/scan", get(scan::new_scan).post(scan::new_scan))
        .route("/session/check", get(session::check))
        .route("/session/set", get(session::set))
        .route("/session/kill", get(session::kill))
        .route("/results/get_list", get(results::list))
        .route("/results/get", get(results::content))
        .route("/results/get_json", get(results::export_json))
        .route("/results/get_csv", get(results::export_csv))
        .route("/logs/get_list", get(logs::list))
        .route("/logs/get_html", get(logs::export_html))
        .route("/logs/get_json", get(logs::export_json))
        .route("/logs/get_csv", get(logs::export_csv))
        .route("/logs/search", get(logs::search))
        .fallback(ui::static_asset)
        .layer(from_fn_with_state(state.clone(), ip_gate))
        .layer(from_fn_with_state(state.clone(), access_log_middleware))
        .with_state(state)
}

/// Rejects peers outside the allow-list before any route runs.
async fn ip_gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    if let Err(err) = state.gate.check_ip(remote) {
        warn!(
            remote = ?remote,
            path = %request.uri().path(),
            "Rejected request from address outside allow-list"
        );
        return err.to_api_error(state.language()).into_response();
    }
    next.run(request).await
}

fn attachment(artifact: ExportArtifact) -> Response {
    (
        [
            (CONTENT_TYPE, artifact.mime_type.to_string()),
            (CONTENT_DISPOSITION, artifact.content_disposition()),
        ],
        artifact.payload,
    )
        .into_response()
}

fn parse_id(params: &Params, language: Language) -> Result<i64, ApiError> {
    params
        .get("id")
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .ok_or_else(|| ApiError::bad_request(MessageKey::InvalidId, language))
}
