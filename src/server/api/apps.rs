use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::server::AppState;
use crate::server::dto::{
    CreateAppRequest, MembershipRequest, ModifyMembershipRequest, PaginationParams, StatusCount,
};
use crate::server::response::{ApiError, ApiResponse};
use crate::store::slugify;
use crate::types::{AppSelector, MembershipOp, NewApp};

pub async fn create_app(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateAppRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let app = state.store.create_app(NewApp {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        identifier: req.identifier,
        description: req.description,
    })?;

    tracing::info!(app_id = %app.id, identifier = %app.identifier, "created app");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(app))))
}

pub async fn list_apps(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let cursor = params.cursor();
    let page = state.store.list_apps(&cursor.after_id, cursor.limit)?;

    Ok(Json(ApiResponse::success(page)))
}

pub async fn get_app(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let app = state.store.find_app(&AppSelector::Id(id))?;

    Ok(Json(ApiResponse::success(app)))
}

pub async fn get_app_by_identifier(
    State(state): State<Arc<AppState>>,
    Path(identifier): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let selector = AppSelector::from_parts(None, Some(&slugify(&identifier)))?;
    let app = state.store.find_app(&selector)?;

    Ok(Json(ApiResponse::success(app)))
}

pub async fn delete_app(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.delete_app(&AppSelector::Id(id.clone()))?;
    tracing::info!(app_id = %id, "deleted app");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_app_servers(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .store
        .list_app_servers(&AppSelector::Id(id), &params.cursor())?;

    Ok(Json(ApiResponse::success(page)))
}

pub async fn add_app_servers(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<MembershipRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.metadata_ids.is_empty() {
        return Err(ApiError::bad_request("metadata_ids required"));
    }

    apply_membership(&state, id, &req.metadata_ids, MembershipOp::Add)
}

pub async fn replace_app_servers(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<MembershipRequest>,
) -> Result<impl IntoResponse, ApiError> {
    apply_membership(&state, id, &req.metadata_ids, MembershipOp::Replace)
}

pub async fn modify_app_servers(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ModifyMembershipRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let op: MembershipOp = req.op.parse()?;

    apply_membership(&state, id, &req.metadata_ids, op)
}

pub async fn remove_app_server(
    State(state): State<Arc<AppState>>,
    Path((id, server_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.modify_app_servers(
        &AppSelector::Id(id),
        std::slice::from_ref(&server_id),
        MembershipOp::Remove,
    )?;

    Ok(StatusCode::NO_CONTENT)
}

fn apply_membership(
    state: &AppState,
    id: String,
    server_ids: &[String],
    op: MembershipOp,
) -> Result<Json<ApiResponse<StatusCount>>, ApiError> {
    state
        .store
        .modify_app_servers(&AppSelector::Id(id), server_ids, op)?;

    Ok(Json(ApiResponse::success(StatusCount {
        status: "ok",
        count: server_ids.len(),
    })))
}
