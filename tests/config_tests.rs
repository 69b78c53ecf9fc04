use cavite_venture::config::{AppConfig, Env, StorageBackend};
use serial_test::serial;
use std::{env, panic, path::PathBuf};

const ALL_VARS: &[&str] = &[
    "APP_ENV",
    "BIND_ADDR",
    "DATABASE_URL",
    "JWT_SECRET",
    "JWT_TTL_SECS",
    "OTP_TTL_SECS",
    "MAX_UPLOAD_BYTES",
    "STORAGE_BACKEND",
    "UPLOAD_DIR",
    "S3_ENDPOINT",
    "S3_REGION",
    "S3_ACCESS_KEY",
    "S3_SECRET_KEY",
    "S3_BUCKET_NAME",
    "MAIL_API_URL",
    "MAIL_API_KEY",
    "MAIL_FROM",
    "SUPERADMIN_EMAIL",
    "SUPERADMIN_PASSWORD",
];

/// Runs `test` with exactly `vars` set (everything else in `ALL_VARS` cleared),
/// then restores the previous environment even if the test panicked.
fn run_with_env<T, R>(vars: &[(&str, &str)], test: T) -> R
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    let originals: Vec<(&str, Option<String>)> =
        ALL_VARS.iter().map(|&key| (key, env::var(key).ok())).collect();

    unsafe {
        for key in ALL_VARS {
            env::remove_var(key);
        }
        for (key, value) in vars {
            env::set_var(key, value);
        }
    }

    let result = panic::catch_unwind(test);

    unsafe {
        for (key, original) in originals {
            match original {
                Some(value) => env::set_var(key, value),
                None => env::remove_var(key),
            }
        }
    }

    match result {
        Ok(value) => value,
        Err(payload) => panic::resume_unwind(payload),
    }
}

fn load_panics(vars: &[(&str, &str)]) -> bool {
    run_with_env(vars, || panic::catch_unwind(AppConfig::load).is_err())
}

#[test]
#[serial]
fn local_defaults_need_no_environment() {
    let config = run_with_env(&[], AppConfig::load);

    assert_eq!(config.env, Env::Local);
    assert_eq!(config.bind_addr, "0.0.0.0:3000");
    assert!(config.db_url.is_none());
    assert!(!config.jwt_secret.is_empty());
    assert_eq!(config.jwt_ttl_secs, 3600);
    assert_eq!(config.otp_ttl_secs, 600);
    assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);
    assert_eq!(
        config.storage,
        StorageBackend::Disk {
            root: PathBuf::from("./public/uploads")
        }
    );
    assert!(config.mail.is_none());
    assert!(config.superadmin.is_none());
}

#[test]
#[serial]
fn local_overrides_are_honoured() {
    let config = run_with_env(
        &[
            ("JWT_SECRET", "from-env"),
            ("MAX_UPLOAD_BYTES", "2048"),
            ("OTP_TTL_SECS", " 120 "),
            ("UPLOAD_DIR", "/tmp/cavite"),
            ("SUPERADMIN_EMAIL", "root@example.com"),
            ("SUPERADMIN_PASSWORD", "change-me-now"),
        ],
        AppConfig::load,
    );

    assert_eq!(config.jwt_secret, "from-env");
    assert_eq!(config.max_upload_bytes, 2048);
    assert_eq!(config.otp_ttl().as_secs(), 120);
    assert_eq!(
        config.storage,
        StorageBackend::Disk {
            root: PathBuf::from("/tmp/cavite")
        }
    );
    let seed = config.superadmin.expect("seed configured");
    assert_eq!(seed.email, "root@example.com");
}

#[test]
#[serial]
fn local_s3_falls_back_to_minio() {
    let config = run_with_env(&[("STORAGE_BACKEND", "s3")], AppConfig::load);

    let StorageBackend::S3(s3) = config.storage else {
        panic!("expected the S3 backend");
    };
    assert_eq!(s3.endpoint, "http://localhost:9000");
    assert_eq!(s3.region, "us-east-1");
    assert_eq!(s3.bucket, "cavite-uploads");
}

#[test]
#[serial]
fn production_loads_with_every_secret() {
    let config = run_with_env(
        &[
            ("APP_ENV", "production"),
            ("JWT_SECRET", "prod-secret"),
            ("DATABASE_URL", "postgres://u:p@db/cavite"),
            ("MAIL_API_URL", "https://mail.example.com/send"),
            ("MAIL_API_KEY", "key"),
        ],
        AppConfig::load,
    );

    assert_eq!(config.env, Env::Production);
    assert_eq!(config.db_url.as_deref(), Some("postgres://u:p@db/cavite"));
    let mail = config.mail.expect("mail configured");
    assert_eq!(mail.api_url, "https://mail.example.com/send");
    assert_eq!(mail.api_key, "key");
}

#[test]
#[serial]
fn production_fails_fast_on_missing_secrets() {
    let complete = [
        ("APP_ENV", "production"),
        ("JWT_SECRET", "prod-secret"),
        ("DATABASE_URL", "postgres://u:p@db/cavite"),
        ("MAIL_API_URL", "https://mail.example.com/send"),
        ("MAIL_API_KEY", "key"),
    ];

    for skipped in ["JWT_SECRET", "DATABASE_URL", "MAIL_API_URL", "MAIL_API_KEY"] {
        let vars: Vec<_> = complete
            .iter()
            .copied()
            .filter(|(key, _)| *key != skipped)
            .collect();
        assert!(load_panics(&vars), "missing {skipped} should abort startup");
    }

    let mut with_s3 = complete.to_vec();
    with_s3.push(("STORAGE_BACKEND", "s3"));
    assert!(load_panics(&with_s3), "production S3 needs explicit credentials");
}

#[test]
#[serial]
fn invalid_values_abort_startup() {
    assert!(load_panics(&[("MAX_UPLOAD_BYTES", "five megabytes")]));
    assert!(load_panics(&[("JWT_TTL_SECS", "-1")]));
    assert!(load_panics(&[("STORAGE_BACKEND", "floppy")]));
}
