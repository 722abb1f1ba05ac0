use axum::{Json, extract::State};

use super::Payload;
use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, FieldErrors},
    models::{ImageUploadRequest, ImageUploadResponse},
    storage::image_object_key,
    validation::REQUIRED,
};

/// request_image_upload
///
/// [Authenticated Route] Issues a short-lived presigned PUT URL for a post image. The
/// client uploads straight to the bucket, then sends `resource_key` as the post's `image`.
/// Only `image/*` content types are signed.
#[utoipa::path(
    post,
    path = "/uploads/images/presigned",
    tag = "uploads",
    request_body = ImageUploadRequest,
    responses(
        (status = 200, description = "URL", body = ImageUploadResponse),
        (status = 400, description = "Not an image content type"),
        (status = 500, description = "Storage unavailable")
    )
)]
pub async fn request_image_upload(
    auth: AuthUser,
    State(state): State<AppState>,
    Payload(payload): Payload<ImageUploadRequest>,
) -> Result<Json<ImageUploadResponse>, ApiError> {
    let mut errors = FieldErrors::new();
    if payload.filename.trim().is_empty() {
        errors.add("filename", REQUIRED);
    }
    let file_type = payload.file_type.trim().to_ascii_lowercase();
    match file_type.strip_prefix("image/") {
        Some(sub) if !sub.is_empty() => {}
        _ => errors.add("file_type", "Only image uploads are accepted."),
    }
    errors.into_result(())?;

    let key = image_object_key(&payload.filename, &file_type);
    let upload_url = state
        .storage
        .get_presigned_upload_url(&key, &file_type)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::info!(user_id = auth.id, key = %key, "image upload url issued");
    Ok(Json(ImageUploadResponse {
        upload_url,
        resource_key: key,
    }))
}
