//! Media upload handler

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};

use super::multipart_error;
use crate::AppState;
use newsroom_common::{
    auth::Actor,
    errors::{AppError, Result},
    uploads::{StoredUpload, UploadPolicy},
};

/// Store the first file part of a `multipart/form-data` body
pub async fn upload_media(
    State(state): State<AppState>,
    actor: Actor,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<StoredUpload>)> {
    actor.require_author()?;
    let limit = state.uploads.limit_for(UploadPolicy::Media);

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        // Reject by type before buffering the body
        UploadPolicy::Media.check_type(&filename, &content_type)?;
        let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;

        let stored = state
            .uploads
            .store(UploadPolicy::Media, &filename, &content_type, &bytes)
            .await?;

        tracing::info!(actor_id = actor.id, url = %stored.url, "Media uploaded");
        return Ok((StatusCode::CREATED, Json(stored)));
    }

    Err(AppError::validation("file", "No file provided"))
}
