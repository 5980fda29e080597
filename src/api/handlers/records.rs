use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use super::blocking;
use crate::api::response::{ApiError, AppJson, AppQuery, JSend, JSendPaginated, Pagination};
use crate::media::MediaFolder;
use crate::storage::models::ContentRecord;
use crate::upload::FieldSettings;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct RecordResponse {
    pub created_at: String,
    pub fields: BTreeMap<String, FieldSettings>,
    pub folder: MediaFolder,
    pub id: String,
    pub media_path: String,
    pub title: Option<String>,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateRecordRequest {
    #[serde(default)]
    pub fields: BTreeMap<String, FieldSettings>,
    #[serde(default)]
    pub id: Option<String>,
    pub media_path: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRecordRequest {
    #[serde(default)]
    pub fields: Option<BTreeMap<String, FieldSettings>>,
    #[serde(default, deserialize_with = "nullable")]
    pub title: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ListRecordsParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub media_path: Option<String>,
}

fn default_limit() -> u32 {
    20
}

/// Distinguishes between a missing field (`None`) and an explicit `null` (`Some(None)`).
fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: DeserializeOwned,
    D: Deserializer<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn create_record(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<CreateRecordRequest>,
) -> Result<Json<JSend<RecordResponse>>, ApiError> {
    let id = req
        .id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    // The media path must resolve before the record is accepted
    MediaFolder::resolve(&state.media.resolver, &req.media_path)
        .map_err(|e| ApiError::media(e, state.translator.as_ref()))?;

    let now = Utc::now();
    let record = ContentRecord {
        id: id.clone(),
        media_path: req.media_path,
        created_at: now,
        updated_at: now,
        fields: req.fields,
        title: req.title,
    };

    let response = blocking({
        let state = Arc::clone(&state);
        move || {
            if state.db.record_exists(&record.id)? {
                return Err(ApiError::conflict(format!(
                    "record '{}' already exists",
                    record.id
                )));
            }
            state.db.put_record(&record)?;
            Ok(record_to_response(&state, &record))
        }
    })
    .await?;

    tracing::debug!(record_id = %id, "Created record");
    Ok(JSend::success(response))
}

pub async fn get_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<RecordResponse>>, ApiError> {
    let record = state
        .db
        .get_record(&id)?
        .ok_or_else(|| ApiError::not_found("Record not found"))?;

    Ok(JSend::success(record_to_response(&state, &record)))
}

pub async fn update_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateRecordRequest>,
) -> Result<Json<JSend<RecordResponse>>, ApiError> {
    if req.fields.is_none() && req.title.is_none() {
        return Err(ApiError::bad_request(
            "at least one field (fields, title) must be provided",
        ));
    }

    // Some(None) clears the title, None leaves it alone
    let title = req.title.as_ref().map(|t| t.as_deref());
    if !state.db.update_record(&id, title, req.fields.as_ref())? {
        return Err(ApiError::not_found("Record not found"));
    }

    let record = state
        .db
        .get_record(&id)?
        .ok_or_else(|| ApiError::internal("Record not found after update"))?;

    tracing::debug!(record_id = %id, "Updated record");
    Ok(JSend::success(record_to_response(&state, &record)))
}

pub async fn delete_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    if !state.db.delete_record(&id)? {
        return Err(ApiError::not_found("Record not found"));
    }

    // Staged changes die with the record; the files on disk stay
    if let Some(mut queue) = state.staged.lock().remove(&id) {
        queue.discard();
    }

    tracing::debug!(record_id = %id, "Deleted record");
    Ok(JSend::success(()))
}

pub async fn list_records(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<ListRecordsParams>,
) -> Result<Json<JSendPaginated<RecordResponse>>, ApiError> {
    if params.limit == 0 {
        return Err(ApiError::bad_request("limit must be greater than 0"));
    }

    let records = state.db.list_records(params.media_path.as_deref())?;

    let total = records.len() as u64;
    let items: Vec<RecordResponse> = records
        .iter()
        .skip(params.offset as usize)
        .take(params.limit as usize)
        .map(|r| record_to_response(&state, r))
        .collect();

    Ok(JSendPaginated::success(
        items,
        Pagination {
            limit: params.limit,
            offset: params.offset,
            total,
        },
    ))
}

// ============================================================================
// Helpers
// ============================================================================

fn record_to_response(state: &AppState, record: &ContentRecord) -> RecordResponse {
    RecordResponse {
        created_at: record.created_at.to_rfc3339(),
        fields: record.fields.clone(),
        folder: MediaFolder::resolve(&state.media.resolver, &record.media_path).unwrap_or_default(),
        id: record.id.clone(),
        media_path: record.media_path.clone(),
        title: record.title.clone(),
        updated_at: record.updated_at.to_rfc3339(),
    }
}
