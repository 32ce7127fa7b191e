//! HTTP gateway: access control, job submission and report retrieval.

pub mod access;
pub mod access_log;
pub mod config;
pub mod error;
pub mod http;
pub mod params;
pub mod server;
pub mod tls;
pub mod web;

pub use access::{AccessError, AccessGate};
pub use config::{AccessPolicy, GatewayConfig, GatewaySettings, StartupError, TlsPaths};
pub use error::ApiError;
pub use http::{router, AppState};
pub use server::{bind, run_foreground, serve, shutdown_signal};
