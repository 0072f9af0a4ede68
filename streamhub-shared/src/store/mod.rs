/// Storage abstractions
///
/// The core never talks to a database directly. It goes through three
/// traits:
///
/// - [`AccountStore`]: the durable Account collection
/// - [`SubscriptionStore`]: read access to channel subscriptions
/// - [`VideoStore`]: read access to videos
///
/// Every mutating call is a single atomic operation on one account. In
/// particular [`AccountStore::swap_refresh_token`] is a conditional update
/// (match-and-set), which is what makes refresh-token rotation race-free.
///
/// Two implementations are provided: [`postgres::PgStore`] and
/// [`memory::InMemoryStore`].

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::account::{Account, AccountChanges, AccountRecord};
use crate::models::video::{OwnerSummary, Video};

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique field already belongs to another account
    #[error("Duplicate value for {field}")]
    Duplicate { field: &'static str },

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Durable account collection
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Inserts a new account
    ///
    /// Fails with [`StoreError::Duplicate`] if the username or email is taken.
    async fn insert(&self, record: AccountRecord) -> StoreResult<Account>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Account>>;

    /// Looks up by normalized username
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<Account>>;

    /// Looks up by normalized email
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>>;

    /// Returns any account holding either the username or the email
    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> StoreResult<Option<Account>>;

    /// Applies a partial update and bumps `updated_at`
    ///
    /// Returns `None` if the account does not exist.
    async fn update(&self, id: Uuid, changes: AccountChanges) -> StoreResult<Option<Account>>;

    /// Overwrites the refresh-token slot (`None` clears it)
    ///
    /// Returns false if the account does not exist.
    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> StoreResult<bool>;

    /// Replaces the refresh-token slot only if it still holds `expected`
    ///
    /// Returns false if the slot held something else (or the account is
    /// gone). The check and the write are one atomic step.
    async fn swap_refresh_token(
        &self,
        id: Uuid,
        expected: &str,
        replacement: &str,
    ) -> StoreResult<bool>;

    /// Appends a video to the account's watch history
    async fn append_watch_history(&self, id: Uuid, video_id: Uuid) -> StoreResult<bool>;

    /// Batched owner projection lookup
    ///
    /// Unknown IDs are silently skipped; order is unspecified.
    async fn find_owners(&self, ids: &[Uuid]) -> StoreResult<Vec<OwnerSummary>>;
}

/// Read access to channel subscriptions
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Number of accounts subscribed to `channel`
    async fn count_subscribers(&self, channel: Uuid) -> StoreResult<i64>;

    /// Number of channels `subscriber` is subscribed to
    async fn count_subscriptions(&self, subscriber: Uuid) -> StoreResult<i64>;

    async fn is_subscribed(&self, subscriber: Uuid, channel: Uuid) -> StoreResult<bool>;
}

/// Read access to videos
#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Batched lookup; unknown IDs are skipped and order is unspecified
    async fn find_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Video>>;
}
