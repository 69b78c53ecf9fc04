use async_trait::async_trait;
use aws_sdk_s3 as s3;
use aws_sdk_s3::operation::create_bucket::CreateBucketError;
use axum::body::Bytes;
use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};
use thiserror::Error;
use uuid::Uuid;

/// StorageError
///
/// Failures from a blob backend. Never shown to clients verbatim.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("i/o error for `{key}`: {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
    #[error("object store error: {0}")]
    Backend(String),
    #[error("invalid storage key `{0}`")]
    InvalidKey(String),
}

// 1. StorageService Contract
/// StorageService
///
/// Defines the abstract contract for the blob store holding uploaded image bytes.
/// Handlers only see this trait, so the disk store, the S3 client and the test mock
/// are interchangeable.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Prepares the backend at startup (creates the upload directory or bucket).
    async fn ensure_ready(&self) -> Result<(), StorageError>;

    /// Writes `bytes` under `key`. Either the whole object becomes visible or nothing does.
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError>;

    /// Reads the object stored under `key`, `None` if it does not exist.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError>;

    /// Removes the object. Deleting a missing object is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// The URL clients use to fetch the object directly.
    fn public_url(&self, key: &str) -> String;
}

/// sanitize_key
///
/// Removes directory navigation components (`..`, `.`, empty segments) from a key
/// so it can never address anything outside the store's root.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

// 2. Local Disk Implementation
/// DiskStorage
///
/// Keeps objects as files under `root`. The router serves `root` at `url_prefix`,
/// so `public_url` points straight at the static file.
#[derive(Clone)]
pub struct DiskStorage {
    root: PathBuf,
    url_prefix: String,
}

impl DiskStorage {
    pub fn new(root: impl Into<PathBuf>, url_prefix: &str) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let clean = sanitize_key(key);
        if clean.is_empty() {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(clean))
    }
}

fn io_error(key: &str) -> impl FnOnce(io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        key: key.to_string(),
        source,
    }
}

#[async_trait]
impl StorageService for DiskStorage {
    async fn ensure_ready(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(io_error(""))
    }

    /// put
    ///
    /// Writes to a hidden temporary file in the target directory, then renames it
    /// into place. A crash mid-write leaves only the temporary file behind.
    async fn put(&self, key: &str, bytes: Bytes, _content_type: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let parent = path.parent().unwrap_or(self.root.as_path()).to_path_buf();
        tokio::fs::create_dir_all(&parent)
            .await
            .map_err(io_error(key))?;

        let staging = parent.join(format!(".{}.part", Uuid::new_v4()));
        tokio::fs::write(&staging, &bytes)
            .await
            .map_err(io_error(key))?;

        if let Err(source) = tokio::fs::rename(&staging, &path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(io_error(key)(source));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(Bytes::from(bytes))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(key)(e)),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(key)(e)),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.url_prefix, sanitize_key(key))
    }
}

// 3. The S3 Implementation (MinIO locally, any S3-compatible API in production)
/// S3StorageClient
///
/// The concrete implementation using the AWS SDK for S3.
///
/// The `force_path_style(true)` is critical for MinIO compatibility.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
    endpoint: String,
}

impl S3StorageClient {
    /// new
    ///
    /// Constructs the S3 client using credentials and configuration from AppConfig.
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            // Path-style addressing (http://endpoint/bucket/key) is required by MinIO.
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    /// ensure_ready
    ///
    /// Creates the bucket. A bucket that already exists is fine; anything else
    /// (bad credentials, unreachable endpoint) is returned.
    async fn ensure_ready(&self) -> Result<(), StorageError> {
        match self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(err) => {
                let service_err = err.into_service_error();
                if bucket_already_present(&service_err) {
                    tracing::debug!(bucket = %self.bucket_name, "bucket already exists");
                    return Ok(());
                }
                tracing::error!(bucket = %self.bucket_name, error = ?service_err, "could not create bucket");
                Err(StorageError::Backend(service_err.to_string()))
            }
        }
    }

    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError> {
        // A single PutObject is atomic: readers see the whole object or none of it.
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(sanitize_key(key))
            .content_type(content_type)
            .body(s3::primitives::ByteStream::from(bytes.to_vec()))
            .send()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(sanitize_key(key))
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    return Ok(None);
                }
                return Err(StorageError::Backend(service_err.to_string()));
            }
        };

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(Some(data.into_bytes()))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        // DeleteObject succeeds for missing keys.
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(sanitize_key(key))
            .send()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket_name, sanitize_key(key))
    }
}

// 4. The Mock Implementation (For Tests)
/// MockStorageService
///
/// An in-memory `StorageService` for unit and integration tests. Failure can be
/// toggled at any point to exercise the error paths of the upload pipeline.
#[derive(Default)]
pub struct MockStorageService {
    objects: Mutex<HashMap<String, (Bytes, String)>>,
    /// When true, all operations return a simulated failure.
    should_fail: AtomicBool,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        let mock = Self::default();
        mock.set_should_fail(true);
        mock
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(&sanitize_key(key))
    }

    /// Content type recorded for `key` by the last `put`.
    pub fn content_type_of(&self, key: &str) -> Option<String> {
        self.lock()
            .get(&sanitize_key(key))
            .map(|(_, content_type)| content_type.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, (Bytes, String)>> {
        // A panic while holding the lock only happens in a failing test.
        self.objects.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(StorageError::Backend(
                "Mock Storage Error: Simulation requested".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_ready(&self) -> Result<(), StorageError> {
        self.check()
    }

    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError> {
        self.check()?;
        self.lock()
            .insert(sanitize_key(key), (bytes, content_type.to_string()));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError> {
        self.check()?;
        Ok(self.lock().get(&sanitize_key(key)).map(|(b, _)| b.clone()))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.check()?;
        self.lock().remove(&sanitize_key(key));
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("/uploads/{}", sanitize_key(key))
    }
}

fn bucket_already_present(err: &CreateBucketError) -> bool {
    err.is_bucket_already_owned_by_you() || err.is_bucket_already_exists()
}

/// StorageState
///
/// The concrete type used to share the storage service across the application state.
pub type StorageState = Arc<dyn StorageService>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_key_strips_traversal_segments() {
        assert_eq!(sanitize_key("../../etc/passwd"), "etc/passwd");
        assert_eq!(sanitize_key("images//./a.png"), "images/a.png");
        assert_eq!(sanitize_key(".."), "");
    }

    #[test]
    fn only_existing_buckets_count_as_ready() {
        use s3::{
            error::ErrorMetadata,
            types::error::{BucketAlreadyExists, BucketAlreadyOwnedByYou},
        };

        assert!(bucket_already_present(
            &CreateBucketError::BucketAlreadyOwnedByYou(BucketAlreadyOwnedByYou::builder().build())
        ));
        assert!(bucket_already_present(&CreateBucketError::BucketAlreadyExists(
            BucketAlreadyExists::builder().build()
        )));

        let denied =
            CreateBucketError::generic(ErrorMetadata::builder().code("AccessDenied").build());
        assert!(!bucket_already_present(&denied));
    }

    #[tokio::test]
    async fn disk_storage_round_trip_and_idempotent_delete() {
        let root = std::env::temp_dir().join(format!("cavite-disk-{}", Uuid::new_v4()));
        let store = DiskStorage::new(&root, "/uploads");
        store.ensure_ready().await.unwrap();

        store
            .put("images/a.png", Bytes::from_static(b"abc"), "image/png")
            .await
            .unwrap();
        assert_eq!(
            store.get("images/a.png").await.unwrap().as_deref(),
            Some(&b"abc"[..])
        );
        assert_eq!(store.public_url("images/a.png"), "/uploads/images/a.png");

        // No staging files survive a successful write.
        let leftovers: Vec<_> = std::fs::read_dir(root.join("images"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
            .collect();
        assert!(leftovers.is_empty());

        store.delete("images/a.png").await.unwrap();
        store.delete("images/a.png").await.unwrap();
        assert!(store.get("images/a.png").await.unwrap().is_none());

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn disk_storage_rejects_empty_keys() {
        let store = DiskStorage::new(std::env::temp_dir(), "/uploads");
        let err = store
            .put("../..", Bytes::from_static(b"x"), "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }
}
