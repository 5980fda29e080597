use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::api::response::{ApiError, JSend};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub records_deleted: u64,
    pub queues_discarded: usize,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health() -> Json<JSend<HealthResponse>> {
    JSend::success(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Drop every record and staged change. Media files on disk are left alone.
pub async fn admin_purge(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<PurgeResponse>>, ApiError> {
    let stats = state.db.purge_all()?;

    let queues_discarded = {
        let mut staged = state.staged.lock();
        let count = staged.len();
        for (_, mut queue) in staged.drain() {
            queue.discard();
        }
        count
    };
    state.media.index.invalidate_all();

    tracing::warn!(
        records = stats.records,
        queues = queues_discarded,
        "Purged all data"
    );

    Ok(JSend::success(PurgeResponse {
        records_deleted: stats.records,
        queues_discarded,
    }))
}
