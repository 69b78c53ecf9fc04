use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Roles ---

/// Role
///
/// The fixed set of roles an account can hold. Stored as lowercase text and
/// serialized the same way on the wire.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    User,
    Admin,
    Superadmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Superadmin => "superadmin",
        }
    }

    /// True for the roles allowed into the management routes.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::Superadmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            "superadmin" => Ok(Role::Superadmin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// --- Accounts ---

/// Account
///
/// The canonical identity row. Holds the password hash and the pending
/// verification code, so it never leaves the server as-is; handlers convert it
/// into a `UserProfile` before responding.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub birthday: NaiveDate,
    pub location: String,
    pub gender: String,
    pub is_verified: bool,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub verification_code: Option<String>,
    pub verification_code_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// A code is only usable while it is set and its expiry lies in the future.
    pub fn verification_code_valid_at(&self, now: DateTime<Utc>) -> bool {
        match (&self.verification_code, self.verification_code_expires) {
            (Some(_), Some(expires)) => now <= expires,
            _ => false,
        }
    }
}

/// Insert payload for a new account. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub birthday: NaiveDate,
    pub location: String,
    pub gender: String,
    pub role: Role,
    pub is_verified: bool,
    pub verification_code: Option<String>,
    pub verification_code_expires: Option<DateTime<Utc>>,
}

/// Partial profile update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub location: Option<String>,
    pub gender: Option<String>,
}

/// UserProfile
///
/// The public view of an account (GET /profile, admin user listings).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub birthday: NaiveDate,
    pub location: String,
    pub gender: String,
    pub role: Role,
    pub is_verified: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for UserProfile {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            email: account.email.clone(),
            birthday: account.birthday,
            location: account.location.clone(),
            gender: account.gender.clone(),
            role: account.role,
            is_verified: account.is_verified,
            created_at: account.created_at,
        }
    }
}

// --- Request Payloads (Input Schemas) ---

/// SignUpRequest
///
/// Input for POST /auth/signup. Missing fields deserialize as empty strings so
/// the handler can answer with a field-specific 400 instead of a parse error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct SignUpRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    /// `YYYY-MM-DD`, or an RFC 3339 timestamp whose date part is kept.
    #[schema(example = "1998-04-12")]
    pub birthday: String,
    pub location: String,
    pub gender: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(default)]
#[ts(export)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(default)]
#[ts(export)]
pub struct VerifyEmailRequest {
    #[schema(example = "482913")]
    pub otp: String,
}

/// UpdateProfileRequest
///
/// Partial update for PUT /profile; omitted fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateRoleRequest {
    pub user_id: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct CreateAdminRequest {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

// --- Response Payloads ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RoleResponse {
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateAdminResponse {
    pub message: String,
    pub user_id: Uuid,
}

/// Counts per age bracket. Ages under 18 are not reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AgeGroups {
    #[serde(rename = "18-25")]
    pub age_18_25: u64,
    #[serde(rename = "26-35")]
    pub age_26_35: u64,
    #[serde(rename = "36-45")]
    pub age_36_45: u64,
    #[serde(rename = "46-60")]
    pub age_46_60: u64,
    #[serde(rename = "60+")]
    pub age_over_60: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AgeStatsResponse {
    pub age_groups: AgeGroups,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct GenderStatsResponse {
    pub male: u64,
    pub female: u64,
}

// --- Uploaded Images ---

/// ImageRecord
///
/// Pointer record for an uploaded image: where the bytes live plus the
/// metadata read while validating them. The bytes and this row are created and
/// removed together.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ImageRecord {
    pub id: Uuid,
    pub storage_key: String,
    pub image_url: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub width: i32,
    pub height: i32,
    pub original_name: Option<String>,
    pub uploaded_by: Option<Uuid>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewImage {
    pub storage_key: String,
    pub image_url: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub width: i32,
    pub height: i32,
    pub original_name: Option<String>,
    pub uploaded_by: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UploadResponse {
    pub message: String,
    pub image_url: String,
    pub image_id: Uuid,
}

/// Multipart body of POST /upload, for the OpenAPI document only.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadImageForm {
    /// The image file. PNG, JPEG, GIF or WebP, at most 5 MiB.
    #[schema(value_type = String, format = Binary)]
    pub avatar: Vec<u8>,
}

// --- Events ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub location: String,
    #[ts(type = "string")]
    pub date: DateTime<Utc>,
    pub image_url: String,
    pub description: String,
    pub is_popular: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub location: String,
    pub date: DateTime<Utc>,
    pub image_url: String,
    pub description: String,
    pub is_popular: bool,
}

#[derive(Debug, Clone, Default)]
pub struct EventUpdate {
    pub title: Option<String>,
    pub location: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub is_popular: Option<bool>,
}

/// CreateEventRequest
///
/// Input for POST /admin/events. `date` accepts `YYYY-MM-DD` or RFC 3339.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct CreateEventRequest {
    pub title: String,
    pub location: String,
    #[schema(example = "2025-06-12")]
    pub date: String,
    pub image_url: String,
    pub description: String,
    pub is_popular: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateEventRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_popular: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
pub struct EventQuery {
    /// Only return events flagged as popular.
    pub popular: Option<bool>,
}

// --- FAQ Categories ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS, ToSchema)]
#[ts(export)]
pub struct Category {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(default)]
#[ts(export)]
pub struct CategoryInput {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CategoriesPayload {
    pub categories: Vec<CategoryInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CategoriesResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub categories: Vec<Category>,
}

// --- About Content ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(default)]
#[ts(export)]
pub struct AboutImage {
    pub url: String,
    pub alt: String,
}

/// AboutContent
///
/// The single "about" document shown on the landing pages. Also the payload of
/// PUT /admin/about, which replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(default)]
#[ts(export)]
pub struct AboutContent {
    pub title: String,
    pub description: String,
    pub images: Vec<AboutImage>,
}
