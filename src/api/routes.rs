use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

/// Multipart framing on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = (state.config.max_upload_size as usize).saturating_add(MULTIPART_OVERHEAD);

    let mut router = Router::new()
        // Records
        .route(
            "/records",
            get(handlers::list_records).post(handlers::create_record),
        )
        .route(
            "/records/:id",
            get(handlers::get_record)
                .put(handlers::update_record)
                .delete(handlers::delete_record),
        )
        // Record media
        .route(
            "/records/:id/media",
            get(handlers::list_media)
                .post(handlers::stage_upload)
                .layer(DefaultBodyLimit::max(upload_limit))
                .delete(handlers::stage_delete),
        )
        .route("/records/:id/media/rename", post(handlers::rename_media))
        .route("/records/:id/commit", post(handlers::commit_media))
        .route("/records/:id/discard", post(handlers::discard_media))
        // Media content
        .route("/media/*path", get(handlers::serve_media))
        // Internal
        .route("/_internal/health", get(handlers::health));

    // Test-only routes
    if state.config.test_mode {
        tracing::warn!("Test mode enabled, purge route is available.");
        router = router.route("/admin/purge", delete(handlers::admin_purge));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

