use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};

use crate::server::AppState;
use crate::server::dto::ListServersParams;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt};
use crate::store::slugify;
use crate::types::AppSelector;

/// Lists all servers, or with `?app=<identifier>` only the servers of that
/// app.
pub async fn list_servers(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListServersParams>,
) -> Result<Response, ApiError> {
    let store = state.store.as_ref();
    let cursor = params.pagination().cursor();

    let Some(app) = params.app.as_deref() else {
        let page = store.list_servers(&cursor)?;
        return Ok(Json(ApiResponse::success(page)).into_response());
    };

    let identifier = slugify(app);
    if identifier.is_empty() {
        return Err(ApiError::bad_request("app is required"));
    }

    let page = store.list_app_servers(&AppSelector::Identifier(identifier), &cursor)?;
    Ok(Json(ApiResponse::success(page)).into_response())
}

pub async fn get_server(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let server = state
        .store
        .get_server(&id)?
        .or_not_found("Server not found")?;

    Ok(Json(ApiResponse::success(server)))
}
