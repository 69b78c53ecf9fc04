use std::{env, path::PathBuf, str::FromStr, time::Duration};

/// Fallback signing secret for local runs. Production refuses to start without `JWT_SECRET`.
const LOCAL_JWT_SECRET: &str = "cavite-venture-local-development-secret";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_UPLOAD_DIR: &str = "./public/uploads";
const DEFAULT_JWT_TTL_SECS: u64 = 60 * 60;
const DEFAULT_OTP_TTL_SECS: u64 = 10 * 60;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup and
/// pulled into handlers and extractors through `FromRef`, so every component sees
/// the same values.
#[derive(Clone)]
pub struct AppConfig {
    // Runtime environment marker. Controls fail-fast checks and log format.
    pub env: Env,
    pub bind_addr: String,
    // Postgres connection string. `None` selects the in-memory repository (local only).
    pub db_url: Option<String>,
    // HMAC secret used to sign and verify session tokens.
    pub jwt_secret: String,
    pub jwt_ttl_secs: u64,
    pub otp_ttl_secs: u64,
    pub max_upload_bytes: usize,
    pub storage: StorageBackend,
    // Outbound mail relay. `None` logs messages instead of sending them.
    pub mail: Option<MailConfig>,
    pub superadmin: Option<SuperadminSeed>,
}

/// Env
///
/// Defines the runtime context: local development with permissive defaults, or
/// production where every secret must be provided explicitly.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// Where uploaded image bytes are kept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    /// A directory on the local filesystem, served back under `/uploads`.
    Disk { root: PathBuf },
    /// An S3-compatible bucket (MinIO locally, any S3 API in production).
    S3(S3Config),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct S3Config {
    pub endpoint: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

/// Credentials for the superadmin account created on first boot.
#[derive(Clone, PartialEq, Eq)]
pub struct SuperadminSeed {
    pub email: String,
    pub password: String,
}

impl Default for AppConfig {
    /// Safe, non-panicking values for test state scaffolding.
    fn default() -> Self {
        Self {
            env: Env::Local,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            db_url: None,
            jwt_secret: "super-secure-test-secret-value-local".to_string(),
            jwt_ttl_secs: DEFAULT_JWT_TTL_SECS,
            otp_ttl_secs: DEFAULT_OTP_TTL_SECS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            storage: StorageBackend::Disk {
                root: PathBuf::from(DEFAULT_UPLOAD_DIR),
            },
            mail: None,
            superadmin: None,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads every setting from the environment. Follows the **fail-fast** principle:
    ///
    /// # Panics
    /// Panics when a value required in production is missing, or when a numeric
    /// setting cannot be parsed, so the server never starts half-configured.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let jwt_secret = match env {
            Env::Production => required("JWT_SECRET"),
            Env::Local => {
                env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string())
            }
        };

        let db_url = match env {
            Env::Production => Some(required("DATABASE_URL")),
            Env::Local => env::var("DATABASE_URL").ok(),
        };

        let storage = match env::var("STORAGE_BACKEND").as_deref() {
            Ok("s3") => StorageBackend::S3(S3Config::load(env)),
            Ok("disk") | Err(_) => StorageBackend::Disk {
                root: PathBuf::from(
                    env::var("UPLOAD_DIR").unwrap_or_else(|_| DEFAULT_UPLOAD_DIR.to_string()),
                ),
            },
            Ok(other) => panic!("FATAL: STORAGE_BACKEND must be `disk` or `s3`, got `{other}`."),
        };

        let mail = match (env, env::var("MAIL_API_URL").ok()) {
            (Env::Production, _) => Some(MailConfig::from_env(required("MAIL_API_URL"))),
            (Env::Local, Some(api_url)) => Some(MailConfig::from_env(api_url)),
            (Env::Local, None) => None,
        };

        let superadmin = match (env::var("SUPERADMIN_EMAIL"), env::var("SUPERADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) => Some(SuperadminSeed { email, password }),
            _ => None,
        };

        Self {
            env,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            db_url,
            jwt_secret,
            jwt_ttl_secs: parsed("JWT_TTL_SECS", DEFAULT_JWT_TTL_SECS),
            otp_ttl_secs: parsed("OTP_TTL_SECS", DEFAULT_OTP_TTL_SECS),
            max_upload_bytes: parsed("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            storage,
            mail,
            superadmin,
        }
    }

    pub fn jwt_ttl(&self) -> Duration {
        Duration::from_secs(self.jwt_ttl_secs)
    }

    pub fn otp_ttl(&self) -> Duration {
        Duration::from_secs(self.otp_ttl_secs)
    }
}

impl S3Config {
    fn load(env: Env) -> Self {
        match env {
            Env::Production => Self {
                endpoint: required("S3_ENDPOINT"),
                region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                access_key: required("S3_ACCESS_KEY"),
                secret_key: required("S3_SECRET_KEY"),
                bucket: required("S3_BUCKET_NAME"),
            },
            // Local MinIO defaults.
            Env::Local => Self {
                endpoint: env::var("S3_ENDPOINT")
                    .unwrap_or_else(|_| "http://localhost:9000".to_string()),
                region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                access_key: env::var("S3_ACCESS_KEY").unwrap_or_else(|_| "admin".to_string()),
                secret_key: env::var("S3_SECRET_KEY")
                    .unwrap_or_else(|_| "password".to_string()),
                bucket: env::var("S3_BUCKET_NAME")
                    .unwrap_or_else(|_| "cavite-uploads".to_string()),
            },
        }
    }
}

impl MailConfig {
    fn from_env(api_url: String) -> Self {
        Self {
            api_url,
            api_key: required("MAIL_API_KEY"),
            from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "Cavite Venture <no-reply@cavite-venture.local>".to_string()),
        }
    }
}

fn required(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("FATAL: {key} must be set."))
}

fn parsed<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|_| panic!("FATAL: {key} has an invalid value `{raw}`.")),
        Err(_) => default,
    }
}
