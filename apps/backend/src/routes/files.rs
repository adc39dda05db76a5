//! File upload endpoints

use axum::{
    extract::{Multipart, Path, State},
    Extension, Json,
};

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::routes::auth::AuthenticatedLearner;
use crate::services::storage::StorageService;
use crate::AppState;

/// POST /api/files/:bucket
/// Multipart upload; the `file` field is stored in the named bucket
pub async fn upload(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedLearner>,
    Path(bucket): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let bucket = BucketKind::parse(&bucket)?;
    if bucket == BucketKind::Certificates {
        return Err(ApiError::Forbidden("Certificates are generated by the server".to_string()));
    }

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;

        if bytes.is_empty() {
            return Err(ApiError::Validation("Uploaded file is empty".to_string()));
        }

        let key = StorageService::make_upload_key(auth.learner_id, &file_name);
        state
            .storage
            .upload_file(bucket, &key, &bytes, content_type.as_deref())
            .await?;

        return Ok(Json(UploadResponse {
            bucket,
            key,
            size: bytes.len(),
        }));
    }

    Err(ApiError::BadRequest("Missing multipart field 'file'".to_string()))
}

/// DELETE /api/files/:bucket/*key
/// Removes one of the caller's own uploads
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedLearner>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<axum::http::StatusCode> {
    let bucket = BucketKind::parse(&bucket)?;
    if bucket == BucketKind::Certificates {
        return Err(ApiError::Forbidden("Certificates are managed by the server".to_string()));
    }

    // Upload keys are `{owner_id}/...`
    let owner_prefix = format!("{}/", auth.learner_id);
    if !key.starts_with(&owner_prefix) {
        return Err(ApiError::Forbidden("Not your file".to_string()));
    }

    if !state.storage.file_exists(bucket, &key).await? {
        return Err(ApiError::NotFound(format!("File {}", key)));
    }

    state.storage.delete_file(bucket, &key).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}
