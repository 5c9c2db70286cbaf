pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::cv::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Active document
        .route(
            "/api/cv",
            get(handlers::handle_get_active).post(handlers::handle_create),
        )
        .route("/api/cv/list", get(handlers::handle_list))
        .route(
            "/api/cv/source",
            get(handlers::handle_get_active_source).put(handlers::handle_put_active_source),
        )
        .route("/api/cv/source/:id", get(handlers::handle_get_source))
        // Compilation and artifacts
        .route("/api/cv/compile", post(handlers::handle_compile))
        .route("/api/cv/pdf/:filename", get(handlers::handle_get_pdf))
        .route("/api/cv/download", get(handlers::handle_download))
        // Template catalog
        .route("/api/cv/templates", get(handlers::handle_list_templates))
        .route("/api/cv/templates/:id", get(handlers::handle_get_template))
        // Document CRUD
        .route(
            "/api/cv/:id",
            put(handlers::handle_update).delete(handlers::handle_delete),
        )
        .route("/api/cv/:id/activate", post(handlers::handle_activate))
        .route(
            "/api/cv/:id/compile",
            post(handlers::handle_compile_document),
        )
        .with_state(state)
}
