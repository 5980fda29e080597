use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use super::blocking;
use crate::api::response::ApiError;
use crate::asset::mime_type;
use crate::error::MediaError;
use crate::AppState;

/// Serve a media file by its webroot-relative path.
/// Route: GET /media/*path
pub async fn serve_media(
    State(state): State<Arc<AppState>>,
    axum::extract::Path(path): axum::extract::Path<String>,
) -> Result<Response, ApiError> {
    let path = path.trim_start_matches('/').to_string();
    let (folder, filename) = match path.rsplit_once('/') {
        Some((folder, filename)) => (folder.to_string(), filename.to_string()),
        None => (String::new(), path.clone()),
    };

    // Nothing under a dot segment is served
    let hidden = path.split('/').any(|segment| segment.starts_with('.'));
    if filename.is_empty() || hidden || folder.contains("://") {
        return Err(ApiError::not_found("File not found"));
    }

    let file = blocking({
        let state = Arc::clone(&state);
        let filename = filename.clone();
        move || {
            state
                .media
                .ops
                .read_stream(&filename, &folder)
                .map_err(|e| match e {
                    MediaError::BadDestination { .. } => ApiError::bad_request("Invalid media path"),
                    _ => ApiError::not_found("File not found"),
                })
        }
    })
    .await?;

    let size = file.metadata().ok().map(|m| m.len());
    let stream = ReaderStream::new(tokio::fs::File::from_std(file));
    let mut response = (StatusCode::OK, Body::from_stream(stream)).into_response();
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        mime_type(&filename)
            .parse()
            .unwrap_or(header::HeaderValue::from_static("application/octet-stream")),
    );

    if let Some(size) = size {
        headers.insert(header::CONTENT_LENGTH, header::HeaderValue::from(size));
    }

    if let Ok(value) = format!("inline; filename=\"{filename}\"").parse() {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    // Files can be replaced by a commit, so keep the cache short
    headers.insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("public, max-age=60"),
    );

    Ok(response)
}
