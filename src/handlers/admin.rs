use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{Datelike, NaiveDate, Utc};

use super::parse_id;
use crate::{
    AppState,
    accounts::{check_password, is_valid_email, normalize_email, placeholder_birthday},
    auth::AuthUser,
    error::{ApiError, ApiJson},
    models::{
        Account, AgeGroups, AgeStatsResponse, CreateAdminRequest, CreateAdminResponse,
        GenderStatsResponse, MessageResponse, NewAccount, Role, UpdateRoleRequest, UserProfile,
    },
    password,
    repository::RepoError,
};

/// admin_home
///
/// [Admin Route] Greeting for the admin dashboard, addressed by email.
#[utoipa::path(
    get,
    path = "/api/admin",
    responses(
        (status = 200, description = "Greeting", body = MessageResponse),
        (status = 403, description = "Not an admin", body = MessageResponse)
    )
)]
pub async fn admin_home(AuthUser { email, .. }: AuthUser) -> Json<MessageResponse> {
    Json(MessageResponse::new(format!("Welcome Admin, {email}")))
}

/// superadmin_home
///
/// [Superadmin Route] Greeting for the superadmin dashboard. Admins are turned
/// away with 403 by the role gate before reaching it.
#[utoipa::path(
    get,
    path = "/api/superadmin",
    responses(
        (status = 200, description = "Greeting", body = MessageResponse),
        (status = 403, description = "Not a superadmin", body = MessageResponse)
    )
)]
pub async fn superadmin_home() -> Json<MessageResponse> {
    Json(MessageResponse::new("Welcome, superadmin!"))
}

/// list_users
///
/// [Admin Route] Every account, newest first, as public profiles.
#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses((status = 200, description = "All accounts", body = [UserProfile]))
)]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserProfile>>, ApiError> {
    let accounts = state.repo.list_accounts().await?;
    Ok(Json(accounts.iter().map(UserProfile::from).collect()))
}

/// update_user_role
///
/// [Admin Route] Changes an account's role. Granting or revoking `superadmin`
/// is reserved to superadmins. The change applies from the target's next request.
#[utoipa::path(
    put,
    path = "/api/admin/users/role",
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Updated account", body = UserProfile),
        (status = 403, description = "Superadmin role change by a non-superadmin", body = MessageResponse),
        (status = 404, description = "Unknown account", body = MessageResponse)
    )
)]
pub async fn update_user_role(
    caller: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<UpdateRoleRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    let target_id = parse_id(&payload.user_id)?;
    let target = state
        .repo
        .get_account(target_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let touches_superadmin = target.role == Role::Superadmin || payload.role == Role::Superadmin;
    if touches_superadmin && caller.role != Role::Superadmin {
        return Err(ApiError::Forbidden);
    }

    let updated = state
        .repo
        .set_role(target_id, payload.role)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    tracing::info!(
        caller = %caller.id,
        target = %target_id,
        from = %target.role,
        to = %payload.role,
        "role changed"
    );
    Ok(Json(UserProfile::from(&updated)))
}

/// delete_user
///
/// [Admin Route] Removes an account. Nobody can delete themselves, and only a
/// superadmin can delete another superadmin.
#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    params(("id" = String, Path, description = "Account id")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 400, description = "Malformed id or self-deletion", body = MessageResponse),
        (status = 404, description = "Unknown account", body = MessageResponse)
    )
)]
pub async fn delete_user(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let target_id = parse_id(&raw_id)?;
    if target_id == caller.id {
        return Err(ApiError::validation("You cannot delete your own account"));
    }

    let target = state
        .repo
        .get_account(target_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    if target.role == Role::Superadmin && caller.role != Role::Superadmin {
        return Err(ApiError::Forbidden);
    }

    if !state.repo.delete_account(target_id).await? {
        return Err(ApiError::not_found("User not found"));
    }

    tracing::info!(caller = %caller.id, target = %target_id, "account deleted");
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

/// create_admin
///
/// [Admin Route] Creates a verified `admin` account. Profile fields the staff
/// form does not collect get placeholder values.
#[utoipa::path(
    post,
    path = "/api/admin/admins",
    request_body = CreateAdminRequest,
    responses(
        (status = 201, description = "Admin created", body = CreateAdminResponse),
        (status = 400, description = "Invalid input or email in use", body = MessageResponse)
    )
)]
pub async fn create_admin(
    caller: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateAdminRequest>,
) -> Result<(StatusCode, Json<CreateAdminResponse>), ApiError> {
    let email = normalize_email(&payload.email);
    if !is_valid_email(&email) {
        return Err(ApiError::validation("A valid email is required"));
    }
    check_password(&payload.password)?;

    if state.repo.find_account_by_email(&email).await?.is_some() {
        return Err(ApiError::validation("Admin with this email already exists"));
    }

    let password_hash = password::hash(payload.password).await?;
    let account = state
        .repo
        .create_account(NewAccount {
            first_name: non_blank_or(payload.first_name, "Admin"),
            last_name: non_blank_or(payload.last_name, "User"),
            email,
            password_hash,
            birthday: placeholder_birthday(),
            location: "unknown".to_string(),
            gender: "not specified".to_string(),
            role: Role::Admin,
            is_verified: true,
            verification_code: None,
            verification_code_expires: None,
        })
        .await
        .map_err(|e| match e {
            RepoError::Conflict(_) => ApiError::validation("Admin with this email already exists"),
            other => other.into(),
        })?;

    tracing::info!(caller = %caller.id, admin_id = %account.id, "admin account created");
    Ok((
        StatusCode::CREATED,
        Json(CreateAdminResponse {
            message: "Admin created successfully".to_string(),
            user_id: account.id,
        }),
    ))
}

fn non_blank_or(value: Option<String>, fallback: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// age_groups
///
/// Buckets accounts by `today.year - birthday.year`. Ages under 18 are skipped.
pub fn age_groups(accounts: &[Account], today: NaiveDate) -> AgeGroups {
    let mut groups = AgeGroups::default();
    for account in accounts {
        let age = today.year() - account.birthday.year();
        match age {
            18..=25 => groups.age_18_25 += 1,
            26..=35 => groups.age_26_35 += 1,
            36..=45 => groups.age_36_45 += 1,
            46..=60 => groups.age_46_60 += 1,
            61.. => groups.age_over_60 += 1,
            _ => {}
        }
    }
    groups
}

/// Counts accounts whose gender is male or female, case-insensitively.
pub fn gender_counts(accounts: &[Account]) -> GenderStatsResponse {
    let mut stats = GenderStatsResponse::default();
    for account in accounts {
        match account.gender.trim().to_lowercase().as_str() {
            "male" => stats.male += 1,
            "female" => stats.female += 1,
            _ => {}
        }
    }
    stats
}

#[utoipa::path(
    get,
    path = "/api/admin/stats/age",
    responses((status = 200, description = "Accounts per age bracket", body = AgeStatsResponse))
)]
pub async fn age_stats(State(state): State<AppState>) -> Result<Json<AgeStatsResponse>, ApiError> {
    let accounts = state.repo.list_accounts().await?;
    Ok(Json(AgeStatsResponse {
        age_groups: age_groups(&accounts, Utc::now().date_naive()),
    }))
}

#[utoipa::path(
    get,
    path = "/api/admin/stats/gender",
    responses((status = 200, description = "Accounts per gender", body = GenderStatsResponse))
)]
pub async fn gender_stats(
    State(state): State<AppState>,
) -> Result<Json<GenderStatsResponse>, ApiError> {
    let accounts = state.repo.list_accounts().await?;
    Ok(Json(gender_counts(&accounts)))
}
