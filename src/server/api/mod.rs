mod apps;
pub(super) mod discover;
mod servers;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::server::AppState;

pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Discovery ingestion
        .route("/discover", post(discover::discover))
        // Servers
        .route("/servers", get(servers::list_servers))
        .route("/servers/{id}", get(servers::get_server))
        // Apps
        .route("/apps", get(apps::list_apps).post(apps::create_app))
        .route(
            "/apps/by-identifier/{identifier}",
            get(apps::get_app_by_identifier),
        )
        .route("/apps/{id}", get(apps::get_app).delete(apps::delete_app))
        // App servers (many-to-many)
        .route(
            "/apps/{id}/servers",
            get(apps::list_app_servers)
                .post(apps::add_app_servers)
                .put(apps::replace_app_servers)
                .patch(apps::modify_app_servers),
        )
        .route(
            "/apps/{id}/servers/{server_id}",
            delete(apps::remove_app_server),
        )
}
