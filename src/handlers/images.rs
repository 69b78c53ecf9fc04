use axum::{
    Json,
    extract::{Multipart, Path, State, multipart::MultipartRejection},
    http::header,
    response::{IntoResponse, Response},
};

use super::parse_id;
use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    models::{ImageRecord, MessageResponse, UploadImageForm, UploadResponse},
    upload,
};

/// upload_image
///
/// [Authenticated Route] Accepts one image in the `avatar` multipart field.
/// The bytes are checked by decoding them, stored under a server-generated key,
/// and recorded together with their dimensions and uploader.
#[utoipa::path(
    post,
    path = "/api/upload",
    request_body(content = UploadImageForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Stored", body = UploadResponse),
        (status = 400, description = "No file, or not a valid image", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = MessageResponse),
        (status = 413, description = "File over the size limit", body = MessageResponse),
        (status = 500, description = "Storage or database failure", body = MessageResponse)
    )
)]
pub async fn upload_image(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart
        .map_err(|rejection| ApiError::validation(rejection.body_text()))?;

    let file = upload::read_upload(&mut multipart, state.config.max_upload_bytes).await?;
    let record = upload::store_image(&state, file, id).await?;

    Ok(Json(UploadResponse {
        message: "Image uploaded successfully".to_string(),
        image_url: record.image_url,
        image_id: record.id,
    }))
}

/// get_image
///
/// [Public Route] Streams the stored bytes with their recorded content type.
#[utoipa::path(
    get,
    path = "/api/images/{id}",
    params(("id" = String, Path, description = "Image id")),
    responses(
        (status = 200, description = "Image bytes", content_type = "image/*"),
        (status = 404, description = "Unknown image", body = MessageResponse)
    )
)]
pub async fn get_image(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&raw_id)?;
    let record = state
        .repo
        .get_image(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Image not found"))?;

    let Some(bytes) = state.storage.get(&record.storage_key).await? else {
        tracing::error!(image_id = %id, key = %record.storage_key, "record points at missing blob");
        return Err(ApiError::not_found("Image not found"));
    };

    Ok((
        [
            (header::CONTENT_TYPE, record.content_type),
            (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
        ],
        bytes,
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/api/images/{id}/meta",
    params(("id" = String, Path, description = "Image id")),
    responses(
        (status = 200, description = "Image record", body = ImageRecord),
        (status = 404, description = "Unknown image", body = MessageResponse)
    )
)]
pub async fn get_image_meta(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<ImageRecord>, ApiError> {
    let id = parse_id(&raw_id)?;
    state
        .repo
        .get_image(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Image not found"))
}

/// delete_image
///
/// [Authenticated Route] Removes an image's bytes and record. Allowed for the
/// uploader and for admins.
#[utoipa::path(
    delete,
    path = "/api/upload/{id}",
    params(("id" = String, Path, description = "Image id")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 400, description = "Malformed id", body = MessageResponse),
        (status = 403, description = "Neither uploader nor admin", body = MessageResponse),
        (status = 404, description = "Unknown image", body = MessageResponse),
        (status = 500, description = "Storage or database failure", body = MessageResponse)
    )
)]
pub async fn delete_image(
    user: AuthUser,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&raw_id)?;
    let record = state
        .repo
        .get_image(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Image not found"))?;

    if record.uploaded_by != Some(user.id) && !user.role.is_admin() {
        return Err(ApiError::Forbidden);
    }

    upload::remove_image(&state, &record).await?;
    tracing::info!(image_id = %id, caller = %user.id, "image deleted");
    Ok(Json(MessageResponse::new("Image deleted successfully")))
}
