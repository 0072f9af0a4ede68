/// PostgreSQL storage implementation
///
/// Implements all three store traits over a single `PgPool`. Queries are
/// runtime-checked so the crate builds without a live database.
///
/// # Atomicity
///
/// Every mutation is a single `UPDATE ... RETURNING` or `INSERT`. Refresh-token
/// rotation uses a conditional update:
///
/// ```sql
/// UPDATE accounts SET refresh_token = $3, updated_at = NOW()
/// WHERE id = $1 AND refresh_token = $2
/// ```
///
/// so two concurrent rotations presenting the same token cannot both win.
///
/// # Example
///
/// ```no_run
/// use streamhub_shared::db::pool::{create_pool, DatabaseConfig};
/// use streamhub_shared::store::{postgres::PgStore, AccountStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig {
///     url: std::env::var("DATABASE_URL")?,
///     ..Default::default()
/// })
/// .await?;
///
/// let store = PgStore::new(pool);
/// let account = store.find_by_username("nova").await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{AccountStore, StoreError, StoreResult, SubscriptionStore, VideoStore};
use crate::models::account::{Account, AccountChanges, AccountRecord};
use crate::models::video::{OwnerSummary, Video};

const ACCOUNT_COLUMNS: &str = "id, username, email, full_name, password_hash, avatar_url, \
     cover_image_url, watch_history, refresh_token, created_at, updated_at";

const VIDEO_COLUMNS: &str = "id, video_file, thumbnail, title, description, duration, views, \
     is_published, owner_id, created_at, updated_at";

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool, for health checks and shutdown
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps unique-constraint violations to [`StoreError::Duplicate`]
fn map_unique_violation(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        match db_err.constraint() {
            Some("accounts_username_key") => return StoreError::Duplicate { field: "username" },
            Some("accounts_email_key") => return StoreError::Duplicate { field: "email" },
            _ => {}
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl AccountStore for PgStore {
    async fn insert(&self, record: AccountRecord) -> StoreResult<Account> {
        let sql = format!(
            r#"
            INSERT INTO accounts (username, email, full_name, password_hash, avatar_url, cover_image_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Account>(&sql)
            .bind(record.username)
            .bind(record.email)
            .bind(record.full_name)
            .bind(record.password_hash)
            .bind(record.avatar_url)
            .bind(record.cover_image_url)
            .fetch_one(&self.pool)
            .await
            .map_err(map_unique_violation)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = $1");
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1");
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> StoreResult<Option<Account>> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = $1 OR email = $2 LIMIT 1"
        );
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(username)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    async fn update(&self, id: Uuid, changes: AccountChanges) -> StoreResult<Option<Account>> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE accounts SET updated_at = NOW()");
        let mut bind_count = 1;

        if changes.email.is_some() {
            bind_count += 1;
            query.push_str(&format!(", email = ${}", bind_count));
        }
        if changes.full_name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", full_name = ${}", bind_count));
        }
        if changes.password_hash.is_some() {
            bind_count += 1;
            query.push_str(&format!(", password_hash = ${}", bind_count));
        }
        if changes.avatar_url.is_some() {
            bind_count += 1;
            query.push_str(&format!(", avatar_url = ${}", bind_count));
        }
        if changes.cover_image_url.is_some() {
            bind_count += 1;
            query.push_str(&format!(", cover_image_url = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {ACCOUNT_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Account>(&query).bind(id);

        if let Some(email) = changes.email {
            q = q.bind(email);
        }
        if let Some(full_name) = changes.full_name {
            q = q.bind(full_name);
        }
        if let Some(password_hash) = changes.password_hash {
            q = q.bind(password_hash);
        }
        if let Some(avatar_url) = changes.avatar_url {
            q = q.bind(avatar_url);
        }
        if let Some(cover_image_url) = changes.cover_image_url {
            q = q.bind(cover_image_url);
        }

        q.fetch_optional(&self.pool)
            .await
            .map_err(map_unique_violation)
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET refresh_token = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn swap_refresh_token(
        &self,
        id: Uuid,
        expected: &str,
        replacement: &str,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET refresh_token = $3, updated_at = NOW()
            WHERE id = $1 AND refresh_token = $2 AND refresh_token <> ''
            "#,
        )
        .bind(id)
        .bind(expected)
        .bind(replacement)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn append_watch_history(&self, id: Uuid, video_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET watch_history = array_append(watch_history, $2), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(video_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_owners(&self, ids: &[Uuid]) -> StoreResult<Vec<OwnerSummary>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let owners = sqlx::query_as::<_, OwnerSummary>(
            "SELECT id, full_name, username, avatar_url FROM accounts WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(owners)
    }
}

#[async_trait]
impl SubscriptionStore for PgStore {
    async fn count_subscribers(&self, channel: Uuid) -> StoreResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions WHERE channel_id = $1")
                .bind(channel)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    async fn count_subscriptions(&self, subscriber: Uuid) -> StoreResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions WHERE subscriber_id = $1")
                .bind(subscriber)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    async fn is_subscribed(&self, subscriber: Uuid, channel: Uuid) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM subscriptions
                WHERE subscriber_id = $1 AND channel_id = $2
            )
            "#,
        )
        .bind(subscriber)
        .bind(channel)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}

#[async_trait]
impl VideoStore for PgStore {
    async fn find_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Video>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!("SELECT {VIDEO_COLUMNS} FROM videos WHERE id = ANY($1)");
        let videos = sqlx::query_as::<_, Video>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(videos)
    }
}
