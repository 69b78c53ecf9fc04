#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use cavite_venture::{
    AppConfig, AppState,
    auth::TokenKeys,
    create_router,
    mailer::MockMailer,
    models::{Account, NewAccount, Role},
    password,
    repository::{InMemoryRepository, Repository},
    storage::MockStorageService,
};
use chrono::NaiveDate;
use image::{DynamicImage, ImageFormat, RgbImage};
use std::{io::Cursor, sync::Arc};
use tower::util::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "correct-horse-battery";
const BOUNDARY: &str = "cavite-test-boundary";

/// Everything a test needs: the in-memory services (kept concrete for
/// inspection) and the state built from them.
pub struct TestApp {
    pub repo: Arc<InMemoryRepository>,
    pub storage: Arc<MockStorageService>,
    pub mailer: Arc<MockMailer>,
    pub config: AppConfig,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_parts(MockStorageService::new(), MockMailer::new(), AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self::with_parts(MockStorageService::new(), MockMailer::new(), config)
    }

    pub fn with_parts(storage: MockStorageService, mailer: MockMailer, config: AppConfig) -> Self {
        Self {
            repo: Arc::new(InMemoryRepository::new()),
            storage: Arc::new(storage),
            mailer: Arc::new(mailer),
            config,
        }
    }

    pub fn state(&self) -> AppState {
        AppState {
            repo: self.repo.clone(),
            storage: self.storage.clone(),
            mailer: self.mailer.clone(),
            config: self.config.clone(),
        }
    }

    pub fn router(&self) -> Router {
        create_router(self.state())
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router().oneshot(request).await.unwrap()
    }

    /// Creates a verified account with `role` and returns it with a fresh token.
    pub async fn account(&self, role: Role) -> (Account, String) {
        let email = format!("{}-{}@example.com", role, Uuid::new_v4().simple());
        let account = self
            .repo
            .create_account(NewAccount {
                first_name: "Test".into(),
                last_name: role.to_string(),
                email,
                password_hash: password::hash_password(PASSWORD).unwrap(),
                birthday: NaiveDate::from_ymd_opt(1994, 7, 2).unwrap(),
                location: "Cavite City".into(),
                gender: "female".into(),
                role,
                is_verified: true,
                verification_code: None,
                verification_code_expires: None,
            })
            .await
            .unwrap();
        let token = self.token_for(&account);
        (account, token)
    }

    pub fn token_for(&self, account: &Account) -> String {
        TokenKeys::from_config(&self.config).issue(account).unwrap()
    }
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, bearer(token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn delete(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("DELETE").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, bearer(token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json(method: &str, uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, bearer(token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// A multipart POST to /api/upload carrying one file part.
pub fn upload(token: Option<&str>, field: &str, filename: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, bearer(token));
    }
    builder.body(Body::from(body)).unwrap()
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
