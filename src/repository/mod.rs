use crate::models::{
    AboutContent, Account, Category, CategoryInput, Event, EventUpdate, ImageRecord, NewAccount,
    NewEvent, NewImage, ProfileUpdate, Role,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// RepoError
///
/// Failures surfaced by the persistence layer. Handlers translate `Conflict`
/// into a client-facing 400; everything else becomes a generic 500.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("a record with this {0} already exists")]
    Conflict(&'static str),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations, so handlers
/// work the same against Postgres and the in-memory store.
///
/// **Send + Sync + async_trait** are required to make the trait object (`Arc<dyn Repository>`)
/// shareable across Axum's asynchronous task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Accounts ---
    async fn get_account(&self, id: Uuid) -> Result<Option<Account>, RepoError>;
    // Email is compared after normalization (trimmed, lowercase).
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, RepoError>;
    // Codes are only unique among active holders, so an account whose code is
    // still valid wins over one holding the same code expired.
    async fn find_account_by_verification_code(
        &self,
        code: &str,
    ) -> Result<Option<Account>, RepoError>;
    // Fails with `Conflict("email")` when the address is taken.
    async fn create_account(&self, account: NewAccount) -> Result<Account, RepoError>;
    async fn list_accounts(&self) -> Result<Vec<Account>, RepoError>;
    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<Account>, RepoError>;
    async fn set_role(&self, id: Uuid, role: Role) -> Result<Option<Account>, RepoError>;
    /// Marks the account verified and clears its verification code.
    async fn mark_verified(&self, id: Uuid) -> Result<bool, RepoError>;
    async fn delete_account(&self, id: Uuid) -> Result<bool, RepoError>;

    // --- Uploaded Images ---
    async fn insert_image(&self, image: NewImage) -> Result<ImageRecord, RepoError>;
    async fn get_image(&self, id: Uuid) -> Result<Option<ImageRecord>, RepoError>;
    async fn delete_image(&self, id: Uuid) -> Result<bool, RepoError>;

    // --- Events ---
    // Ordered by event date, latest first.
    async fn list_events(&self, popular_only: bool) -> Result<Vec<Event>, RepoError>;
    async fn create_event(&self, event: NewEvent) -> Result<Event, RepoError>;
    async fn update_event(&self, id: Uuid, update: EventUpdate)
    -> Result<Option<Event>, RepoError>;
    async fn delete_event(&self, id: Uuid) -> Result<bool, RepoError>;

    // --- FAQ Categories ---
    async fn list_categories(&self) -> Result<Vec<Category>, RepoError>;
    /// Replaces the whole collection in one step; readers never see a partial list.
    async fn replace_categories(
        &self,
        categories: Vec<CategoryInput>,
    ) -> Result<Vec<Category>, RepoError>;

    // --- About Content ---
    async fn get_about(&self) -> Result<Option<AboutContent>, RepoError>;
    async fn upsert_about(&self, about: AboutContent) -> Result<AboutContent, RepoError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
