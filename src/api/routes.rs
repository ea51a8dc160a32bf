use axum::{routing::get, Router};

use crate::api::handlers::{self, AppState};

/// Mounts the OData service under `/<root>`.
pub fn create_router(state: AppState) -> Router {
    let root = state.service.root.trim_matches('/').to_string();
    let (service_path, resource_path) = if root.is_empty() {
        ("/".to_string(), "/*path".to_string())
    } else {
        (format!("/{}", root), format!("/{}/*path", root))
    };

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Service document
        .route(&service_path, get(handlers::get_service_document))
        // Resource paths
        .route(
            &resource_path,
            get(handlers::read_resource)
                .post(handlers::create_entity)
                .patch(handlers::patch_entity)
                .put(handlers::replace_entity)
                .delete(handlers::delete_entity),
        )
        .with_state(state)
}
