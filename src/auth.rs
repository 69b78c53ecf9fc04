use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    AppState,
    config::AppConfig,
    error::{ApiError, AuthFailure},
    models::{Account, Role},
    repository::{Repository, RepositoryState},
};

/// Roles let through `require_admin`.
pub const ADMIN_ROLES: &[Role] = &[Role::Admin, Role::Superadmin];
/// Roles let through `require_superadmin`.
pub const SUPERADMIN_ROLES: &[Role] = &[Role::Superadmin];

/// Claims
///
/// The payload signed into every session token. Only `sub` is trusted for
/// authorization: the account's role is re-read from the store on each request,
/// so `role` here is informational and may be stale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the account id.
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    /// Issued At (iat), seconds since the epoch.
    pub iat: usize,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token invalid")]
    Invalid,
}

/// TokenKeys
///
/// HMAC-SHA256 signing and verification keys derived from the configured secret,
/// plus the lifetime given to newly issued tokens.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.jwt_secret, config.jwt_ttl())
    }

    /// Signs a token for `account` valid for the configured lifetime.
    pub fn issue(&self, account: &Account) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: account.id,
            email: account.email.clone(),
            role: account.role,
            iat: now,
            exp: now + self.ttl.as_secs() as usize,
        };
        encode(&Header::default(), &claims, &self.encoding)
    }

    /// verify
    ///
    /// Checks signature and expiry. Expiry is reported separately so clients can
    /// prompt for a fresh sign-in instead of treating the token as forged.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

/// AuthUser
///
/// The resolved identity of an authenticated request. `role` and `email` come
/// from the account record, never from the token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    /// An empty `allowed` list admits any authenticated account.
    pub fn authorize(&self, allowed: &[Role]) -> Result<(), ApiError> {
        if allowed.is_empty() || allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

/// Pulls the token out of `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthFailure> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthFailure::MissingToken)?;

    let rest = value
        .strip_prefix("Bearer")
        .ok_or(AuthFailure::MissingToken)?;
    // "BearerXYZ" is a different scheme, not a bearer token.
    if !rest.is_empty() && !rest.starts_with(' ') {
        return Err(AuthFailure::MissingToken);
    }

    let token = rest.trim();
    if token.is_empty() {
        return Err(AuthFailure::MalformedToken);
    }
    Ok(token)
}

/// authenticate
///
/// Resolves the caller from the request headers:
/// 1. Token extraction from the `Authorization` header.
/// 2. Signature and expiry verification.
/// 3. Account lookup, so deleted accounts lose access immediately and role
///    changes apply to the next request.
pub async fn authenticate(
    headers: &HeaderMap,
    keys: &TokenKeys,
    repo: &dyn Repository,
) -> Result<AuthUser, ApiError> {
    let token = bearer_token(headers)?;

    let claims = keys.verify(token).map_err(|e| match e {
        TokenError::Expired => AuthFailure::Expired,
        TokenError::Invalid => AuthFailure::InvalidToken,
    })?;

    let account = repo
        .get_account(claims.sub)
        .await?
        .ok_or(AuthFailure::AccountNotFound)?;

    Ok(AuthUser {
        id: account.id,
        email: account.email,
        role: account.role,
    })
}

/// AuthUser Extractor Implementation
///
/// Reuses the identity stored by the gate middleware when the route has one;
/// otherwise authenticates the request itself.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let repo = RepositoryState::from_ref(state);
        let keys = TokenKeys::from_config(&AppConfig::from_ref(state));
        authenticate(&parts.headers, &keys, repo.as_ref()).await
    }
}

async fn gate(
    state: &AppState,
    allowed: &[Role],
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = request.into_parts();
    let user = AuthUser::from_request_parts(&mut parts, state).await?;

    if let Err(err) = user.authorize(allowed) {
        tracing::warn!(user_id = %user.id, role = %user.role, uri = %parts.uri, "role check failed");
        return Err(err);
    }

    parts.extensions.insert(user);
    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// Route guard admitting any authenticated account.
pub async fn require_account(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    gate(&state, &[], request, next).await
}

/// Route guard admitting admins and superadmins.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    gate(&state, ADMIN_ROLES, request, next).await
}

pub async fn require_superadmin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    gate(&state, SUPERADMIN_ROLES, request, next).await
}
