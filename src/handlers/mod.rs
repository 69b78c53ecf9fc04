//! HTTP handlers, grouped by the audience of the routes they serve.

use uuid::Uuid;

use crate::error::ApiError;

/// Sign-up, sign-in, email verification, logout.
pub mod accounts;
/// User management, staff greetings and demographic statistics.
pub mod admin;
/// Events, FAQ categories and the about document.
pub mod content;
/// Image upload, retrieval and deletion.
pub mod images;
/// The caller's own profile.
pub mod profile;

/// Path ids arrive as strings so a malformed id gets a JSON 400 like every other
/// validation failure.
pub(crate) fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::validation("Invalid ID parameter"))
}
