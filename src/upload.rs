use axum::{
    body::Bytes,
    extract::multipart::{Multipart, MultipartError},
    http::StatusCode,
};
use image::{ImageFormat, ImageReader, Limits};
use std::{io::Cursor, path::Path};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiError,
    models::{ImageRecord, NewImage},
};

/// Multipart field carrying the image.
pub const UPLOAD_FIELD: &str = "avatar";
/// Headroom over the file limit for multipart boundaries and part headers.
pub const MULTIPART_OVERHEAD: usize = 64 * 1024;
/// Largest width or height the decoder will accept.
const MAX_DIMENSION: u32 = 10_000;
/// Ceiling on the decoded raster, whatever the compressed size was.
const MAX_DECODE_BYTES: u64 = 64 * 1024 * 1024;
const MAX_ORIGINAL_NAME: usize = 255;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("could not sniff image format: {0}")]
    Sniff(#[from] std::io::Error),
    #[error("unrecognised image format")]
    UnknownFormat,
    #[error("image format {0:?} is not accepted")]
    Unsupported(ImageFormat),
    #[error("image failed to decode: {0}")]
    Decode(#[from] image::ImageError),
}

/// What decoding told us about a genuine image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InspectedImage {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl InspectedImage {
    pub fn content_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    pub fn extension(&self) -> &'static str {
        match self.format {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::WebP => "webp",
            other => other.extensions_str().first().copied().unwrap_or("bin"),
        }
    }
}

/// inspect_image
///
/// Identifies the format from the leading bytes and fully decodes the payload.
/// Neither the client's filename nor its declared content type is consulted, so
/// a renamed text file or a truncated PNG is rejected here.
pub fn inspect_image(bytes: &[u8]) -> Result<InspectedImage, ImageError> {
    inspect_with_limits(bytes, decode_limits())
}

fn decode_limits() -> Limits {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_DIMENSION);
    limits.max_image_height = Some(MAX_DIMENSION);
    limits.max_alloc = Some(MAX_DECODE_BYTES);
    limits
}

fn inspect_with_limits(bytes: &[u8], limits: Limits) -> Result<InspectedImage, ImageError> {
    let mut reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    let format = reader.format().ok_or(ImageError::UnknownFormat)?;
    if !matches!(
        format,
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif | ImageFormat::WebP
    ) {
        return Err(ImageError::Unsupported(format));
    }

    reader.limits(limits);

    let decoded = reader.decode()?;
    Ok(InspectedImage {
        format,
        width: decoded.width(),
        height: decoded.height(),
    })
}

/// Storage key of the form `images/<uuid>.<ext>`. Never derived from client input.
pub fn storage_key_for(image: &InspectedImage) -> String {
    format!("images/{}.{}", Uuid::new_v4(), image.extension())
}

/// Keeps only the final path component of a client-supplied filename.
fn clean_original_name(name: &str) -> Option<String> {
    let base = Path::new(name.trim()).file_name()?.to_string_lossy();
    let clipped: String = base.chars().take(MAX_ORIGINAL_NAME).collect();
    (!clipped.is_empty()).then_some(clipped)
}

/// A file part read out of the request body.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: Option<String>,
    pub bytes: Bytes,
}

fn multipart_error(limit: usize) -> impl FnOnce(MultipartError) -> ApiError {
    move |err| {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(limit)
        } else {
            ApiError::validation(format!("Malformed multipart body: {}", err.body_text()))
        }
    }
}

/// read_upload
///
/// Reads the `avatar` part chunk by chunk, stopping with `PayloadTooLarge` as
/// soon as it grows past `limit`. Other parts are drained and ignored.
pub async fn read_upload(multipart: &mut Multipart, limit: usize) -> Result<UploadedFile, ApiError> {
    let mut upload: Option<UploadedFile> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error(limit))? {
        if field.name() != Some(UPLOAD_FIELD) {
            while field.chunk().await.map_err(multipart_error(limit))?.is_some() {}
            continue;
        }
        if upload.is_some() {
            return Err(ApiError::validation("Only one file may be uploaded per request"));
        }

        let original_name = field.file_name().and_then(clean_original_name);
        let mut buffer: Vec<u8> = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(multipart_error(limit))? {
            if buffer.len() + chunk.len() > limit {
                return Err(ApiError::PayloadTooLarge(limit));
            }
            buffer.extend_from_slice(&chunk);
        }

        upload = Some(UploadedFile {
            original_name,
            bytes: Bytes::from(buffer),
        });
    }

    match upload {
        Some(file) if !file.bytes.is_empty() => Ok(file),
        _ => Err(ApiError::validation("No file uploaded")),
    }
}

/// store_image
///
/// The write half of the upload pipeline:
/// 1. Validate the bytes as a real image on the blocking pool.
/// 2. Write them to the blob store under a fresh key.
/// 3. Insert the pointer record; if that fails, remove the blob again.
///
/// On any error nothing new is left in either store.
pub async fn store_image(
    state: &AppState,
    file: UploadedFile,
    uploaded_by: Uuid,
) -> Result<ImageRecord, ApiError> {
    let payload = file.bytes.clone();
    let inspected = tokio::task::spawn_blocking(move || inspect_image(&payload))
        .await
        .map_err(|e| ApiError::Internal(format!("image validation task failed: {e}")))?
        .map_err(|e| {
            tracing::info!(error = %e, "upload rejected");
            ApiError::validation("Uploaded file is not a valid image")
        })?;

    let key = storage_key_for(&inspected);
    let size_bytes = file.bytes.len() as i64;
    state
        .storage
        .put(&key, file.bytes, inspected.content_type())
        .await?;

    let record = NewImage {
        storage_key: key.clone(),
        image_url: state.storage.public_url(&key),
        content_type: inspected.content_type().to_string(),
        size_bytes,
        width: inspected.width as i32,
        height: inspected.height as i32,
        original_name: file.original_name,
        uploaded_by: Some(uploaded_by),
    };

    match state.repo.insert_image(record).await {
        Ok(saved) => {
            tracing::info!(image_id = %saved.id, key = %saved.storage_key, "image stored");
            Ok(saved)
        }
        Err(err) => {
            if let Err(cleanup) = state.storage.delete(&key).await {
                tracing::error!(key = %key, error = %cleanup, "orphaned blob after failed insert");
            }
            Err(err.into())
        }
    }
}

/// remove_image
///
/// Deletes the blob and the pointer record. Both deletions are attempted even
/// when the first fails; the caller only learns whether the pair succeeded.
pub async fn remove_image(state: &AppState, record: &ImageRecord) -> Result<(), ApiError> {
    let blob = state.storage.delete(&record.storage_key).await;
    let row = state.repo.delete_image(record.id).await;

    match (blob, row) {
        (Ok(()), Ok(true)) => Ok(()),
        // Lost a race with a concurrent delete of the same image.
        (Ok(()), Ok(false)) => Err(ApiError::not_found("Image not found")),
        (Err(err), row) => {
            if let Err(row_err) = row {
                tracing::error!(image_id = %record.id, error = %row_err, "record delete also failed");
            }
            Err(err.into())
        }
        (Ok(()), Err(err)) => {
            tracing::error!(image_id = %record.id, key = %record.storage_key, "blob removed but record remains");
            Err(err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, RgbImage};

    fn encoded(format: ImageFormat) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(6, 4))
            .write_to(&mut Cursor::new(&mut buf), format)
            .unwrap();
        buf
    }

    #[test]
    fn genuine_png_and_jpeg_are_accepted() {
        let png = inspect_image(&encoded(ImageFormat::Png)).unwrap();
        assert_eq!((png.width, png.height), (6, 4));
        assert_eq!(png.content_type(), "image/png");
        assert_eq!(png.extension(), "png");

        let jpeg = inspect_image(&encoded(ImageFormat::Jpeg)).unwrap();
        assert_eq!(jpeg.extension(), "jpg");
        assert_eq!(jpeg.content_type(), "image/jpeg");
    }

    #[test]
    fn text_is_not_an_image() {
        let err = inspect_image(b"definitely not an image, just text").unwrap_err();
        assert!(matches!(err, ImageError::UnknownFormat));
    }

    #[test]
    fn truncated_png_fails_to_decode() {
        let png = encoded(ImageFormat::Png);
        let err = inspect_image(&png[..png.len() / 2]).unwrap_err();
        assert!(matches!(err, ImageError::Decode(_)));
    }

    #[test]
    fn oversized_dimensions_are_refused() {
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(GrayImage::new(MAX_DIMENSION + 1, 1))
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        let err = inspect_image(&buf).unwrap_err();
        assert!(matches!(err, ImageError::Decode(image::ImageError::Limits(_))));
    }

    #[test]
    fn decoded_size_is_budgeted() {
        assert_eq!(decode_limits().max_alloc, Some(MAX_DECODE_BYTES));

        // A tiny PNG whose raster exceeds the budget it is decoded under.
        let png = encoded(ImageFormat::Png);
        let mut tight = decode_limits();
        tight.max_alloc = Some(16);
        let err = inspect_with_limits(&png, tight).unwrap_err();
        assert!(matches!(err, ImageError::Decode(image::ImageError::Limits(_))));

        assert!(inspect_with_limits(&png, decode_limits()).is_ok());
    }

    #[test]
    fn storage_keys_are_unique_and_typed() {
        let inspected = inspect_image(&encoded(ImageFormat::Png)).unwrap();
        let a = storage_key_for(&inspected);
        let b = storage_key_for(&inspected);
        assert_ne!(a, b);
        assert!(a.starts_with("images/") && a.ends_with(".png"));
    }

    #[test]
    fn original_names_lose_their_directories() {
        assert_eq!(
            clean_original_name("../../etc/photo.png").as_deref(),
            Some("photo.png")
        );
        assert_eq!(clean_original_name("   "), None);
    }
}
