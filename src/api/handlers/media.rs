use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::blocking;
use crate::api::response::{ApiError, AppJson, AppQuery, JSend};
use crate::asset::MediaAsset;
use crate::error::MediaError;
use crate::media::{Media, MediaFolder};
use crate::upload::{AppliedChange, PendingSummary, QueueState, TempUpload};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct MediaResponse {
    pub assets: Vec<MediaAsset>,
    pub folder: MediaFolder,
    pub pending: Vec<PendingSummary>,
    pub record_id: String,
    pub state: QueueState,
}

#[derive(Debug, Serialize)]
pub struct StagedResponse {
    pub field: String,
    pub file: String,
    pub pending: usize,
}

#[derive(Debug, Deserialize)]
pub struct StageDeleteParams {
    pub field: String,
    pub filename: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Serialize)]
pub struct RenamedFile {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Serialize)]
pub struct RenameResponse {
    pub renamed: Vec<RenamedFile>,
}

#[derive(Debug, Serialize)]
pub struct CommitResponse {
    pub applied: Vec<AppliedChange>,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn list_media(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<MediaResponse>>, ApiError> {
    let response = with_media(&state, id.clone(), move |media| {
        let assets = media.get_media()?.assets.clone();
        Ok(MediaResponse {
            assets,
            folder: media.folder().clone(),
            pending: media.queue().entries().iter().map(|e| e.summary()).collect(),
            record_id: id,
            state: media.queue().state(),
        })
    })
    .await?;

    Ok(JSend::success(response))
}

pub async fn stage_upload(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<JSend<StagedResponse>>, ApiError> {
    let mut file_data: Option<Bytes> = None;
    let mut client_filename: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut field_name: Option<String> = None;
    let mut filename: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {e}")))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                client_filename = field.file_name().map(|s| s.to_string());
                content_type = field.content_type().map(|s| s.to_string());

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;

                if data.len() as u64 > state.config.max_upload_size {
                    return Err(ApiError::payload_too_large(format!(
                        "File exceeds maximum upload size of {} bytes",
                        state.config.max_upload_size
                    )));
                }
                file_data = Some(data);
            }
            "field" => {
                field_name = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Invalid field: {e}")))?,
                );
            }
            "filename" => {
                filename = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Invalid filename: {e}")))?,
                );
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let file_data = file_data.ok_or_else(|| ApiError::bad_request("file field is required"))?;
    let field_name = field_name.ok_or_else(|| ApiError::bad_request("field is required"))?;
    let client_filename = filename
        .clone()
        .or(client_filename)
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("a file name is required"))?;

    let upload_dir = state.upload_dir.clone();
    let response = with_media(&state, id, move |media| {
        let upload = TempUpload::from_bytes(
            &upload_dir,
            &client_filename,
            content_type.as_deref(),
            &file_data,
        )
        .map_err(|e| MediaError::Write {
            path: upload_dir.clone(),
            message: e.to_string(),
        })?;

        let key = media.upload(&field_name, Box::new(upload), filename.as_deref())?;
        Ok(StagedResponse {
            field: key.field,
            file: key.file,
            pending: media.queue().len(),
        })
    })
    .await?;

    Ok(JSend::success(response))
}

pub async fn stage_delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppQuery(params): AppQuery<StageDeleteParams>,
) -> Result<Json<JSend<StagedResponse>>, ApiError> {
    let response = with_media(&state, id, move |media| {
        let key = media.delete(&params.field, &params.filename)?;
        Ok(StagedResponse {
            field: key.field,
            file: key.file,
            pending: media.queue().len(),
        })
    })
    .await?;

    Ok(JSend::success(response))
}

pub async fn rename_media(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(req): AppJson<RenameRequest>,
) -> Result<Json<JSend<RenameResponse>>, ApiError> {
    let response = with_media(&state, id, move |media| {
        let outcome = media.rename(&req.from, &req.to)?;
        Ok(RenameResponse {
            renamed: outcome
                .renamed
                .into_iter()
                .map(|(from, to)| RenamedFile { from, to })
                .collect(),
        })
    })
    .await?;

    Ok(JSend::success(response))
}

pub async fn commit_media(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<CommitResponse>>, ApiError> {
    let response = with_media(&state, id.clone(), move |media| {
        let applied = media.commit()?;
        Ok(CommitResponse { applied })
    })
    .await?;

    tracing::debug!(record_id = %id, applied = response.applied.len(), "Committed media");
    Ok(JSend::success(response))
}

pub async fn discard_media(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    with_media(&state, id, |media| {
        media.discard();
        Ok(())
    })
    .await?;

    Ok(JSend::success(()))
}

// ============================================================================
// Helpers
// ============================================================================

/// Run `f` against the record's media with its staged queue attached.
///
/// The staged-queue table stays locked for the duration, so changes to one
/// record's queue are applied in request order.
async fn with_media<T, F>(state: &Arc<AppState>, id: String, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&mut Media) -> Result<T, MediaError> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    blocking(move || {
        let record = state
            .db
            .get_record(&id)?
            .ok_or_else(|| ApiError::not_found("Record not found"))?;

        let translator = Arc::clone(&state.translator);
        let mut staged = state.staged.lock();

        let media_path = record.media_path.clone();
        let mut media = Media::new(Arc::clone(&state.media), &media_path, Arc::new(record))
            .map_err(|e| ApiError::media(e, translator.as_ref()))?;
        if let Some(queue) = staged.remove(&id) {
            media = media.with_queue(queue);
        }

        let result = f(&mut media);

        let queue = media.into_queue();
        if !queue.is_empty() {
            staged.insert(id, queue);
        }

        result.map_err(|e| ApiError::media(e, translator.as_ref()))
    })
    .await
}
