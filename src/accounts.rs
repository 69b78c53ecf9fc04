use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

use crate::{
    config::SuperadminSeed,
    error::ApiError,
    models::{NewAccount, Role},
    password,
    repository::Repository,
};

pub const MIN_PASSWORD_LEN: usize = 8;
/// Regenerations attempted before giving up on finding an unused code.
const MAX_CODE_ATTEMPTS: usize = 5;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap_or_else(|e| panic!("email regex: {e}"))
});

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (date part kept).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// Accepts RFC 3339, or `YYYY-MM-DD` read as midnight UTC.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })
}

/// Rejects blank strings, naming the field in the message.
pub fn require_text(field: &str, value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

pub fn check_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// A uniformly random six-digit code, zero-padded.
pub fn generate_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32))
}

/// issue_verification_code
///
/// Generates a code no other account currently holds unexpired, and returns it
/// with its expiry time.
pub async fn issue_verification_code(
    repo: &dyn Repository,
    ttl: Duration,
) -> Result<(String, DateTime<Utc>), ApiError> {
    let now = Utc::now();
    let ttl = chrono::Duration::from_std(ttl)
        .map_err(|e| ApiError::Internal(format!("verification code ttl out of range: {e}")))?;

    for _ in 0..MAX_CODE_ATTEMPTS {
        let code = generate_code();
        let holder = repo.find_account_by_verification_code(&code).await?;
        if holder.is_none_or(|account| !account.verification_code_valid_at(now)) {
            return Ok((code, now + ttl));
        }
    }
    Err(ApiError::Internal(
        "could not allocate an unused verification code".to_string(),
    ))
}

/// bootstrap_superadmin
///
/// Creates the configured superadmin on first boot. Returns `false` when an
/// account with that email already exists, whatever its role.
pub async fn bootstrap_superadmin(
    repo: &dyn Repository,
    seed: &SuperadminSeed,
) -> Result<bool, ApiError> {
    let email = normalize_email(&seed.email);
    if !is_valid_email(&email) {
        return Err(ApiError::validation("SUPERADMIN_EMAIL is not a valid email"));
    }
    check_password(&seed.password)?;

    if repo.find_account_by_email(&email).await?.is_some() {
        return Ok(false);
    }

    let password_hash = password::hash(seed.password.clone()).await?;
    repo.create_account(NewAccount {
        first_name: "Super".to_string(),
        last_name: "Admin".to_string(),
        email,
        password_hash,
        birthday: placeholder_birthday(),
        location: "unknown".to_string(),
        gender: "not specified".to_string(),
        role: Role::Superadmin,
        is_verified: true,
        verification_code: None,
        verification_code_expires: None,
    })
    .await?;
    Ok(true)
}

/// Birthday recorded for staff accounts created without one.
pub fn placeholder_birthday() -> NaiveDate {
    NaiveDate::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepository;

    #[test]
    fn emails_are_normalized_and_checked() {
        assert_eq!(normalize_email("  Ana@Example.COM "), "ana@example.com");
        assert!(is_valid_email("ana@example.com"));
        assert!(!is_valid_email("ana@example"));
        assert!(!is_valid_email("ana example.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn dates_accept_plain_and_rfc3339_forms() {
        let expected = NaiveDate::from_ymd_opt(1998, 4, 12).unwrap();
        assert_eq!(parse_date("1998-04-12"), Some(expected));
        assert_eq!(parse_date("1998-04-12T08:30:00Z"), Some(expected));
        assert_eq!(parse_date("12/04/1998"), None);

        let midnight = parse_datetime("2025-06-12").unwrap();
        assert_eq!(midnight.to_rfc3339(), "2025-06-12T00:00:00+00:00");
    }

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..200 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn placeholder_birthday_is_the_epoch() {
        assert_eq!(placeholder_birthday(), NaiveDate::from_ymd_opt(1970, 1, 1).unwrap());
    }

    #[tokio::test]
    async fn bootstrap_creates_the_superadmin_once() {
        let repo = InMemoryRepository::new();
        let seed = SuperadminSeed {
            email: "Root@Example.com".into(),
            password: "bootstrap-pass".into(),
        };

        assert!(bootstrap_superadmin(&repo, &seed).await.unwrap());
        assert!(!bootstrap_superadmin(&repo, &seed).await.unwrap());

        let account = repo
            .find_account_by_email("root@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.role, Role::Superadmin);
        assert!(account.is_verified);
    }
}
