use super::{RepoError, Repository};
use crate::models::{
    AboutContent, Account, Category, CategoryInput, Event, EventUpdate, ImageRecord, NewAccount,
    NewEvent, NewImage, ProfileUpdate, Role,
};
use async_trait::async_trait;
use chrono::Utc;
use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    accounts: HashMap<Uuid, Account>,
    images: HashMap<Uuid, ImageRecord>,
    events: HashMap<Uuid, Event>,
    categories: Vec<Category>,
    about: Option<AboutContent>,
}

/// InMemoryRepository
///
/// A process-local `Repository` used when no `DATABASE_URL` is configured in local
/// runs, and by the integration tests. Enforces the same uniqueness rules as the
/// Postgres schema. Writes can be switched to fail for exercising error paths.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
    fail_writes: AtomicBool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// While enabled, every mutating call returns `RepoError::Unavailable`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn image_count(&self) -> usize {
        self.tables.read().await.images.len()
    }

    fn check_writable(&self) -> Result<(), RepoError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepoError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_account(&self, id: Uuid) -> Result<Option<Account>, RepoError> {
        Ok(self.tables.read().await.accounts.get(&id).cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.accounts.values().find(|a| a.email == email).cloned())
    }

    async fn find_account_by_verification_code(
        &self,
        code: &str,
    ) -> Result<Option<Account>, RepoError> {
        let now = Utc::now();
        let tables = self.tables.read().await;
        Ok(tables
            .accounts
            .values()
            .filter(|a| a.verification_code.as_deref() == Some(code))
            .max_by_key(|a| a.verification_code_valid_at(now))
            .cloned())
    }

    async fn create_account(&self, account: NewAccount) -> Result<Account, RepoError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        if tables.accounts.values().any(|a| a.email == account.email) {
            return Err(RepoError::Conflict("email"));
        }

        let now = Utc::now();
        let created = Account {
            id: Uuid::new_v4(),
            first_name: account.first_name,
            last_name: account.last_name,
            email: account.email,
            password_hash: account.password_hash,
            birthday: account.birthday,
            location: account.location,
            gender: account.gender,
            is_verified: account.is_verified,
            role: account.role,
            verification_code: account.verification_code,
            verification_code_expires: account.verification_code_expires,
            created_at: now,
            updated_at: now,
        };
        tables.accounts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, RepoError> {
        let mut accounts: Vec<Account> =
            self.tables.read().await.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(accounts)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<Account>, RepoError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        if let Some(email) = &update.email {
            if tables
                .accounts
                .values()
                .any(|a| a.id != id && &a.email == email)
            {
                return Err(RepoError::Conflict("email"));
            }
        }

        let Some(account) = tables.accounts.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = update.first_name {
            account.first_name = v;
        }
        if let Some(v) = update.last_name {
            account.last_name = v;
        }
        if let Some(v) = update.email {
            account.email = v;
        }
        if let Some(v) = update.birthday {
            account.birthday = v;
        }
        if let Some(v) = update.location {
            account.location = v;
        }
        if let Some(v) = update.gender {
            account.gender = v;
        }
        account.updated_at = Utc::now();
        Ok(Some(account.clone()))
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<Option<Account>, RepoError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        Ok(tables.accounts.get_mut(&id).map(|account| {
            account.role = role;
            account.updated_at = Utc::now();
            account.clone()
        }))
    }

    async fn mark_verified(&self, id: Uuid) -> Result<bool, RepoError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        match tables.accounts.get_mut(&id) {
            Some(account) => {
                account.is_verified = true;
                account.verification_code = None;
                account.verification_code_expires = None;
                account.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_account(&self, id: Uuid) -> Result<bool, RepoError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let removed = tables.accounts.remove(&id).is_some();
        if removed {
            // Mirrors `ON DELETE SET NULL` on images.uploaded_by.
            for image in tables.images.values_mut() {
                if image.uploaded_by == Some(id) {
                    image.uploaded_by = None;
                }
            }
        }
        Ok(removed)
    }

    async fn insert_image(&self, image: NewImage) -> Result<ImageRecord, RepoError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        if tables
            .images
            .values()
            .any(|i| i.storage_key == image.storage_key)
        {
            return Err(RepoError::Conflict("storage key"));
        }

        let record = ImageRecord {
            id: Uuid::new_v4(),
            storage_key: image.storage_key,
            image_url: image.image_url,
            content_type: image.content_type,
            size_bytes: image.size_bytes,
            width: image.width,
            height: image.height,
            original_name: image.original_name,
            uploaded_by: image.uploaded_by,
            created_at: Utc::now(),
        };
        tables.images.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_image(&self, id: Uuid) -> Result<Option<ImageRecord>, RepoError> {
        Ok(self.tables.read().await.images.get(&id).cloned())
    }

    async fn delete_image(&self, id: Uuid) -> Result<bool, RepoError> {
        self.check_writable()?;
        Ok(self.tables.write().await.images.remove(&id).is_some())
    }

    async fn list_events(&self, popular_only: bool) -> Result<Vec<Event>, RepoError> {
        let mut events: Vec<Event> = self
            .tables
            .read()
            .await
            .events
            .values()
            .filter(|e| !popular_only || e.is_popular)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(events)
    }

    async fn create_event(&self, event: NewEvent) -> Result<Event, RepoError> {
        self.check_writable()?;
        let created = Event {
            id: Uuid::new_v4(),
            title: event.title,
            location: event.location,
            date: event.date,
            image_url: event.image_url,
            description: event.description,
            is_popular: event.is_popular,
            created_at: Utc::now(),
        };
        self.tables
            .write()
            .await
            .events
            .insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_event(
        &self,
        id: Uuid,
        update: EventUpdate,
    ) -> Result<Option<Event>, RepoError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let Some(event) = tables.events.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = update.title {
            event.title = v;
        }
        if let Some(v) = update.location {
            event.location = v;
        }
        if let Some(v) = update.date {
            event.date = v;
        }
        if let Some(v) = update.image_url {
            event.image_url = v;
        }
        if let Some(v) = update.description {
            event.description = v;
        }
        if let Some(v) = update.is_popular {
            event.is_popular = v;
        }
        Ok(Some(event.clone()))
    }

    async fn delete_event(&self, id: Uuid) -> Result<bool, RepoError> {
        self.check_writable()?;
        Ok(self.tables.write().await.events.remove(&id).is_some())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepoError> {
        Ok(self.tables.read().await.categories.clone())
    }

    async fn replace_categories(
        &self,
        categories: Vec<CategoryInput>,
    ) -> Result<Vec<Category>, RepoError> {
        self.check_writable()?;
        let saved: Vec<Category> = categories
            .into_iter()
            .map(|input| Category {
                id: Uuid::new_v4(),
                question: input.question,
                answer: input.answer,
            })
            .collect();
        self.tables.write().await.categories = saved.clone();
        Ok(saved)
    }

    async fn get_about(&self) -> Result<Option<AboutContent>, RepoError> {
        Ok(self.tables.read().await.about.clone())
    }

    async fn upsert_about(&self, about: AboutContent) -> Result<AboutContent, RepoError> {
        self.check_writable()?;
        self.tables.write().await.about = Some(about.clone());
        Ok(about)
    }
}
