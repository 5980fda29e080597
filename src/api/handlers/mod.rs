mod admin;
mod media;
mod records;
mod static_files;

use crate::api::response::ApiError;

pub use admin::{admin_purge, health};
pub use media::{commit_media, discard_media, list_media, rename_media, stage_delete, stage_upload};
pub use records::{create_record, delete_record, get_record, list_records, update_record};
pub use static_files::serve_media;

/// Run blocking filesystem or database work off the async runtime
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::internal(format!("Background task failed: {e}")))?
}
