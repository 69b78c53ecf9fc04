use cavite_venture::{
    AppState, UPLOADS_PATH, accounts,
    config::{AppConfig, Env, StorageBackend},
    create_router,
    mailer::{HttpMailer, LogMailer, MailerState},
    repository::{InMemoryRepository, PostgresRepository, RepositoryState},
    storage::{DiskStorage, S3StorageClient, StorageState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: loads configuration, sets up logging, connects the repository,
/// blob store and mailer, seeds the superadmin, then serves HTTP.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise sensible defaults for local development.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cavite_venture=debug,tower_http=info,axum=info".into());

    // 3. Log format by environment: pretty locally, JSON for aggregators in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Repository: Postgres when configured, in-memory otherwise (local only).
    let repo: RepositoryState = match &config.db_url {
        Some(db_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await
                .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");
            let postgres = PostgresRepository::new(pool);
            postgres
                .migrate()
                .await
                .expect("FATAL: Database migrations failed.");
            Arc::new(postgres)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory repository; data is lost on exit");
            Arc::new(InMemoryRepository::new())
        }
    };

    // 5. Blob Store
    let storage: StorageState = match &config.storage {
        StorageBackend::Disk { root } => {
            tracing::info!(root = %root.display(), "storing uploads on disk");
            Arc::new(DiskStorage::new(root, UPLOADS_PATH))
        }
        StorageBackend::S3(s3) => {
            tracing::info!(endpoint = %s3.endpoint, bucket = %s3.bucket, "storing uploads in S3");
            Arc::new(
                S3StorageClient::new(
                    &s3.endpoint,
                    &s3.region,
                    &s3.access_key,
                    &s3.secret_key,
                    &s3.bucket,
                )
                .await,
            )
        }
    };
    storage
        .ensure_ready()
        .await
        .expect("FATAL: Upload storage could not be prepared.");

    // 6. Mailer
    let mailer: MailerState = match &config.mail {
        Some(mail) => Arc::new(HttpMailer::new(mail)),
        None => {
            tracing::warn!("MAIL_API_URL not set, verification emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    // 7. Superadmin Bootstrap
    if let Some(seed) = &config.superadmin {
        match accounts::bootstrap_superadmin(repo.as_ref(), seed).await {
            Ok(true) => tracing::info!(email = %seed.email, "superadmin account created"),
            Ok(false) => tracing::debug!("superadmin account already present"),
            Err(err) => panic!("FATAL: superadmin bootstrap failed: {err}"),
        }
    }

    // 8. Unified State Assembly
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState {
        repo,
        storage,
        mailer,
        config,
    };

    // 9. Router and Server Startup
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("FATAL: cannot bind {bind_addr}: {e}"));

    tracing::info!("Listening on {bind_addr}");
    tracing::info!("API Documentation (Swagger UI) available at: http://{bind_addr}/swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
