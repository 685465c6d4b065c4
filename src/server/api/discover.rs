use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use uuid::Uuid;

use crate::server::AppState;
use crate::server::dto::{DiscoverRequest, DiscoverResponse};
use crate::server::response::{ApiError, ApiResponse};
use crate::types::Server;

pub async fn discover(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DiscoverRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let server = Server {
        id: Uuid::new_v4().to_string(),
        hostname: req.hostname,
        os: req.os,
        arch: req.arch,
        num_cpu: req.num_cpu,
        kernel: req.kernel,
        uptime: req.uptime,
        total_memory_mb: req.total_memory_mb,
        total_disk_size_gb: req.total_disk_size_gb,
        mounted_count: req.mounted_count,
        timestamp_utc: req.timestamp_utc,
        created_at: now,
        updated_at: now,
    };

    state.store.create_server(&server)?;
    tracing::info!(server_id = %server.id, hostname = %server.hostname, "registered server");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(DiscoverResponse { id: server.id })),
    ))
}
