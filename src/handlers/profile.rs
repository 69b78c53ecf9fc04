use axum::{Json, extract::State};

use crate::{
    AppState,
    accounts::{is_valid_email, normalize_email, parse_date, require_text},
    auth::AuthUser,
    error::{ApiError, ApiJson},
    models::{MessageResponse, ProfileUpdate, RoleResponse, UpdateProfileRequest, UserProfile},
    repository::RepoError,
};

/// get_profile
///
/// [Authenticated Route] Returns the caller's own profile.
#[utoipa::path(
    get,
    path = "/api/profile",
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 401, description = "Not authenticated", body = MessageResponse)
    )
)]
pub async fn get_profile(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, ApiError> {
    let account = state
        .repo
        .get_account(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(UserProfile::from(&account)))
}

/// update_profile
///
/// [Authenticated Route] Partially updates the caller's profile. Fields that are
/// present must be non-blank; a changed email must be valid and unused.
#[utoipa::path(
    put,
    path = "/api/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = UserProfile),
        (status = 400, description = "Invalid field or email in use", body = MessageResponse)
    )
)]
pub async fn update_profile(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<UpdateProfileRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    let email = match payload.email.as_deref() {
        Some(raw) => {
            let email = normalize_email(raw);
            if !is_valid_email(&email) {
                return Err(ApiError::validation("A valid email is required"));
            }
            Some(email)
        }
        None => None,
    };

    let birthday = match payload.birthday.as_deref() {
        Some(raw) => Some(
            parse_date(raw)
                .ok_or_else(|| ApiError::validation("birthday must be a date (YYYY-MM-DD)"))?,
        ),
        None => None,
    };

    let update = ProfileUpdate {
        first_name: optional_text("firstName", payload.first_name.as_deref())?,
        last_name: optional_text("lastName", payload.last_name.as_deref())?,
        email,
        birthday,
        location: optional_text("location", payload.location.as_deref())?,
        gender: optional_text("gender", payload.gender.as_deref())?,
    };

    let account = state
        .repo
        .update_profile(id, update)
        .await
        .map_err(|e| match e {
            RepoError::Conflict(_) => ApiError::validation("Email is already in use"),
            other => other.into(),
        })?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    tracing::info!(account_id = %id, "profile updated");
    Ok(Json(UserProfile::from(&account)))
}

fn optional_text(field: &str, value: Option<&str>) -> Result<Option<String>, ApiError> {
    value.map(|v| require_text(field, v)).transpose()
}

/// get_user_role
///
/// [Authenticated Route] The caller's current role, as stored.
#[utoipa::path(
    get,
    path = "/api/user-role",
    responses((status = 200, description = "Role", body = RoleResponse))
)]
pub async fn get_user_role(AuthUser { role, .. }: AuthUser) -> Json<RoleResponse> {
    Json(RoleResponse { role })
}

#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses((status = 200, description = "Greeting", body = MessageResponse))
)]
pub async fn dashboard(AuthUser { email, .. }: AuthUser) -> Json<MessageResponse> {
    Json(MessageResponse::new(format!(
        "Welcome to your dashboard, {email}!"
    )))
}
