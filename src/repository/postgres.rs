use super::{RepoError, Repository};
use crate::models::{
    AboutContent, AboutImage, Account, Category, CategoryInput, Event, EventUpdate, ImageRecord,
    NewAccount, NewEvent, NewImage, ProfileUpdate, Role,
};
use async_trait::async_trait;
use sqlx::{FromRow, PgPool, types::Json};
use uuid::Uuid;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
/// Schema lives in `migrations/` and is applied at startup.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies any pending migrations from `migrations/`.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Row shape of the single-row `about_content` table.
#[derive(FromRow)]
struct AboutRow {
    title: String,
    description: String,
    images: Json<Vec<AboutImage>>,
}

impl From<AboutRow> for AboutContent {
    fn from(row: AboutRow) -> Self {
        Self {
            title: row.title,
            description: row.description,
            images: row.images.0,
        }
    }
}

/// Maps a unique-constraint violation to `Conflict`, anything else to `Database`.
fn unique_violation(err: sqlx::Error, field: &'static str) -> RepoError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => RepoError::Conflict(field),
        _ => RepoError::Database(err),
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_account(&self, id: Uuid) -> Result<Option<Account>, RepoError> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, RepoError> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn find_account_by_verification_code(
        &self,
        code: &str,
    ) -> Result<Option<Account>, RepoError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT * FROM accounts
            WHERE verification_code = $1
            ORDER BY verification_code_expires > NOW() DESC NULLS LAST,
                     verification_code_expires DESC NULLS LAST
            LIMIT 1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    async fn create_account(&self, account: NewAccount) -> Result<Account, RepoError> {
        sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (
                id, first_name, last_name, email, password_hash, birthday, location,
                gender, role, is_verified, verification_code, verification_code_expires
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(account.first_name)
        .bind(account.last_name)
        .bind(account.email)
        .bind(account.password_hash)
        .bind(account.birthday)
        .bind(account.location)
        .bind(account.gender)
        .bind(account.role.as_str())
        .bind(account.is_verified)
        .bind(account.verification_code)
        .bind(account.verification_code_expires)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "email"))
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, RepoError> {
        let accounts =
            sqlx::query_as::<_, Account>("SELECT * FROM accounts ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;
        Ok(accounts)
    }

    /// update_profile
    ///
    /// Uses `COALESCE` so only the fields present in `update` are written.
    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<Account>, RepoError> {
        sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email),
                birthday = COALESCE($5, birthday),
                location = COALESCE($6, location),
                gender = COALESCE($7, gender),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.first_name)
        .bind(update.last_name)
        .bind(update.email)
        .bind(update.birthday)
        .bind(update.location)
        .bind(update.gender)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "email"))
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<Option<Account>, RepoError> {
        let account = sqlx::query_as::<_, Account>(
            "UPDATE accounts SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    async fn mark_verified(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET is_verified = TRUE,
                verification_code = NULL,
                verification_code_expires = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_account(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_image(&self, image: NewImage) -> Result<ImageRecord, RepoError> {
        sqlx::query_as::<_, ImageRecord>(
            r#"
            INSERT INTO images (
                id, storage_key, image_url, content_type, size_bytes,
                width, height, original_name, uploaded_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(image.storage_key)
        .bind(image.image_url)
        .bind(image.content_type)
        .bind(image.size_bytes)
        .bind(image.width)
        .bind(image.height)
        .bind(image.original_name)
        .bind(image.uploaded_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "storage key"))
    }

    async fn get_image(&self, id: Uuid) -> Result<Option<ImageRecord>, RepoError> {
        let image = sqlx::query_as::<_, ImageRecord>("SELECT * FROM images WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(image)
    }

    async fn delete_image(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM images WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_events(&self, popular_only: bool) -> Result<Vec<Event>, RepoError> {
        // `$1 = FALSE` keeps the filter optional without building the query dynamically.
        let events = sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE ($1 = FALSE OR is_popular) ORDER BY date DESC",
        )
        .bind(popular_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn create_event(&self, event: NewEvent) -> Result<Event, RepoError> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (id, title, location, date, image_url, description, is_popular)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(event.title)
        .bind(event.location)
        .bind(event.date)
        .bind(event.image_url)
        .bind(event.description)
        .bind(event.is_popular)
        .fetch_one(&self.pool)
        .await?;
        Ok(event)
    }

    async fn update_event(
        &self,
        id: Uuid,
        update: EventUpdate,
    ) -> Result<Option<Event>, RepoError> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            UPDATE events
            SET title = COALESCE($2, title),
                location = COALESCE($3, location),
                date = COALESCE($4, date),
                image_url = COALESCE($5, image_url),
                description = COALESCE($6, description),
                is_popular = COALESCE($7, is_popular)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.title)
        .bind(update.location)
        .bind(update.date)
        .bind(update.image_url)
        .bind(update.description)
        .bind(update.is_popular)
        .fetch_optional(&self.pool)
        .await?;
        Ok(event)
    }

    async fn delete_event(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepoError> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, question, answer FROM faq_categories ORDER BY position ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    /// replace_categories
    ///
    /// Delete-then-insert inside one transaction.
    async fn replace_categories(
        &self,
        categories: Vec<CategoryInput>,
    ) -> Result<Vec<Category>, RepoError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM faq_categories")
            .execute(&mut *tx)
            .await?;

        let mut saved = Vec::with_capacity(categories.len());
        for (position, input) in categories.into_iter().enumerate() {
            let category = sqlx::query_as::<_, Category>(
                r#"
                INSERT INTO faq_categories (id, question, answer, position)
                VALUES ($1, $2, $3, $4)
                RETURNING id, question, answer
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(input.question)
            .bind(input.answer)
            .bind(position as i32)
            .fetch_one(&mut *tx)
            .await?;
            saved.push(category);
        }

        tx.commit().await?;
        Ok(saved)
    }

    async fn get_about(&self) -> Result<Option<AboutContent>, RepoError> {
        let row = sqlx::query_as::<_, AboutRow>(
            "SELECT title, description, images FROM about_content WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(AboutContent::from))
    }

    async fn upsert_about(&self, about: AboutContent) -> Result<AboutContent, RepoError> {
        let row = sqlx::query_as::<_, AboutRow>(
            r#"
            INSERT INTO about_content (id, title, description, images, updated_at)
            VALUES (1, $1, $2, $3, NOW())
            ON CONFLICT (id) DO UPDATE
            SET title = EXCLUDED.title,
                description = EXCLUDED.description,
                images = EXCLUDED.images,
                updated_at = NOW()
            RETURNING title, description, images
            "#,
        )
        .bind(about.title)
        .bind(about.description)
        .bind(Json(about.images))
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }
}
