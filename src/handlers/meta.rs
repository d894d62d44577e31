use axum::{Json, extract::State};
use serde::Serialize;
use tracing::warn;

use crate::router::DemoState;

#[derive(Serialize)]
pub struct RootResponse {
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    /// `None` when the database server cannot be reached.
    pub db_version: Option<String>,
}

pub async fn root_handler() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Demo API server",
    })
}

/// Workload version reported to deployment tooling, plus the server version
/// when the database is reachable.
pub async fn version_handler(State(state): State<DemoState>) -> Json<VersionResponse> {
    let db_version = state
        .db
        .server_version()
        .await
        .inspect_err(|e| warn!(error = %e, "database version unavailable"))
        .ok();
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        db_version,
    })
}
