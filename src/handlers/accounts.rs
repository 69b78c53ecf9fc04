use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;

use crate::{
    AppState,
    accounts::{self, check_password, is_valid_email, normalize_email, parse_date, require_text},
    auth::TokenKeys,
    error::{ApiError, ApiJson, AuthFailure},
    mailer,
    models::{
        MessageResponse, NewAccount, Role, SignInRequest, SignUpRequest, TokenResponse,
        VerifyEmailRequest,
    },
    password,
    repository::RepoError,
};

/// sign_up
///
/// [Public Route] Registers an unverified `user` account and emails it a
/// six-digit verification code. If the email cannot be sent the account is
/// removed again, so the address stays free for another attempt.
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Registered, verification code sent", body = MessageResponse),
        (status = 400, description = "Invalid input or email already registered", body = MessageResponse),
        (status = 500, description = "Verification email could not be sent", body = MessageResponse)
    )
)]
pub async fn sign_up(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SignUpRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let first_name = require_text("firstName", &payload.first_name)?;
    let last_name = require_text("lastName", &payload.last_name)?;
    let location = require_text("location", &payload.location)?;
    let gender = require_text("gender", &payload.gender)?;

    let email = normalize_email(&payload.email);
    if !is_valid_email(&email) {
        return Err(ApiError::validation("A valid email is required"));
    }
    check_password(&payload.password)?;
    let birthday = parse_date(&payload.birthday)
        .ok_or_else(|| ApiError::validation("birthday must be a date (YYYY-MM-DD)"))?;

    if state.repo.find_account_by_email(&email).await?.is_some() {
        return Err(ApiError::validation("User already exists"));
    }

    let password_hash = password::hash(payload.password).await?;
    let (code, expires) =
        accounts::issue_verification_code(state.repo.as_ref(), state.config.otp_ttl()).await?;

    let account = state
        .repo
        .create_account(NewAccount {
            first_name,
            last_name,
            email,
            password_hash,
            birthday,
            location,
            gender,
            role: Role::User,
            is_verified: false,
            verification_code: Some(code.clone()),
            verification_code_expires: Some(expires),
        })
        .await
        .map_err(|e| match e {
            // Lost a race with a concurrent signup for the same address.
            RepoError::Conflict(_) => ApiError::validation("User already exists"),
            other => other.into(),
        })?;

    let message =
        mailer::verification_email(&account.email, &code, state.config.otp_ttl_secs / 60);
    if let Err(err) = state.mailer.send(message).await {
        tracing::error!(account_id = %account.id, error = %err, "verification email failed, rolling back signup");
        if let Err(cleanup) = state.repo.delete_account(account.id).await {
            tracing::error!(account_id = %account.id, error = %cleanup, "could not remove unverifiable account");
        }
        return Err(err.into());
    }

    tracing::info!(account_id = %account.id, "account registered, awaiting verification");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(
            "User registered. Check your email for the OTP to verify your account.",
        )),
    ))
}

/// sign_in
///
/// [Public Route] Exchanges email and password for a session token. Unknown
/// emails and wrong passwords get the same answer.
#[utoipa::path(
    post,
    path = "/api/auth/signin",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = TokenResponse),
        (status = 400, description = "Missing email or password", body = MessageResponse),
        (status = 401, description = "Invalid credentials", body = MessageResponse)
    )
)]
pub async fn sign_in(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SignInRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let email = normalize_email(&payload.email);
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation(
            "Please provide both email and password",
        ));
    }

    let account = state
        .repo
        .find_account_by_email(&email)
        .await?
        .ok_or(AuthFailure::InvalidCredentials)?;

    if !password::verify(payload.password, account.password_hash.clone()).await? {
        tracing::info!(account_id = %account.id, "sign-in rejected: wrong password");
        return Err(AuthFailure::InvalidCredentials.into());
    }

    let token = TokenKeys::from_config(&state.config)
        .issue(&account)
        .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))?;

    tracing::info!(account_id = %account.id, "signed in");
    Ok(Json(TokenResponse { token }))
}

/// verify_email
///
/// [Public Route] Marks the account holding `otp` as verified. A code works
/// once and only before it expires.
#[utoipa::path(
    post,
    path = "/api/auth/verify-email",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Email verified", body = MessageResponse),
        (status = 400, description = "Missing OTP", body = MessageResponse),
        (status = 401, description = "Expired OTP", body = MessageResponse),
        (status = 404, description = "No account holds this OTP", body = MessageResponse)
    )
)]
pub async fn verify_email(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<VerifyEmailRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let otp = payload.otp.trim();
    if otp.is_empty() {
        return Err(ApiError::validation("Missing OTP"));
    }

    let account = state
        .repo
        .find_account_by_verification_code(otp)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if !account.verification_code_valid_at(Utc::now()) {
        return Err(AuthFailure::InvalidCode.into());
    }

    if !state.repo.mark_verified(account.id).await? {
        return Err(ApiError::not_found("User not found"));
    }

    tracing::info!(account_id = %account.id, "email verified");
    Ok(Json(MessageResponse::new("Email successfully verified")))
}

/// logout
///
/// [Public Route] Tokens are stateless; the client discards its copy.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, description = "Logged out", body = MessageResponse))
)]
pub async fn logout() -> Json<MessageResponse> {
    Json(MessageResponse::new("Logged out successfully"))
}
