//! In-memory storage implementation
//!
//! Used by tests and by local development when no `DATABASE_URL` is set.
//! Each operation takes the relevant lock once, so the atomicity guarantees
//! of the store traits hold here as well.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AccountStore, StoreError, StoreResult, SubscriptionStore, VideoStore};
use crate::models::account::{Account, AccountChanges, AccountRecord};
use crate::models::video::{OwnerSummary, Subscription, Video};

/// In-memory account, subscription and video store
#[derive(Default)]
pub struct InMemoryStore {
    accounts: RwLock<HashMap<Uuid, Account>>,
    subscriptions: RwLock<Vec<Subscription>>,
    videos: RwLock<HashMap<Uuid, Video>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a video record (videos are owned by another service)
    pub async fn insert_video(&self, video: Video) {
        self.videos.write().await.insert(video.id, video);
    }

    /// Records that `subscriber` follows `channel`
    ///
    /// Subscribing twice is a no-op.
    pub async fn subscribe(&self, subscriber: Uuid, channel: Uuid) -> Subscription {
        let mut subscriptions = self.subscriptions.write().await;
        if let Some(existing) = subscriptions
            .iter()
            .find(|s| s.subscriber == subscriber && s.channel == channel)
        {
            return existing.clone();
        }

        let subscription = Subscription {
            id: Uuid::new_v4(),
            subscriber,
            channel,
            created_at: Utc::now(),
        };
        subscriptions.push(subscription.clone());
        subscription
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn insert(&self, record: AccountRecord) -> StoreResult<Account> {
        let mut accounts = self.accounts.write().await;

        if accounts.values().any(|a| a.username == record.username) {
            return Err(StoreError::Duplicate { field: "username" });
        }
        if accounts.values().any(|a| a.email == record.email) {
            return Err(StoreError::Duplicate { field: "email" });
        }

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            username: record.username,
            email: record.email,
            full_name: record.full_name,
            password_hash: record.password_hash,
            avatar_url: record.avatar_url,
            cover_image_url: record.cover_image_url,
            watch_history: Vec::new(),
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Account>> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|a| a.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|a| a.email == email).cloned())
    }

    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> StoreResult<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|a| a.username == username || a.email == email)
            .cloned())
    }

    async fn update(&self, id: Uuid, changes: AccountChanges) -> StoreResult<Option<Account>> {
        let mut accounts = self.accounts.write().await;

        if let Some(ref email) = changes.email {
            if accounts.values().any(|a| a.id != id && &a.email == email) {
                return Err(StoreError::Duplicate { field: "email" });
            }
        }

        let Some(account) = accounts.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(email) = changes.email {
            account.email = email;
        }
        if let Some(full_name) = changes.full_name {
            account.full_name = full_name;
        }
        if let Some(password_hash) = changes.password_hash {
            account.password_hash = password_hash;
        }
        if let Some(avatar_url) = changes.avatar_url {
            account.avatar_url = avatar_url;
        }
        if let Some(cover_image_url) = changes.cover_image_url {
            account.cover_image_url = Some(cover_image_url);
        }
        account.updated_at = Utc::now();

        Ok(Some(account.clone()))
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> StoreResult<bool> {
        let mut accounts = self.accounts.write().await;
        match accounts.get_mut(&id) {
            Some(account) => {
                account.refresh_token = token.map(str::to_string);
                account.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn swap_refresh_token(
        &self,
        id: Uuid,
        expected: &str,
        replacement: &str,
    ) -> StoreResult<bool> {
        let mut accounts = self.accounts.write().await;
        match accounts.get_mut(&id) {
            Some(account) if account.holds_refresh_token(expected) => {
                account.refresh_token = Some(replacement.to_string());
                account.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn append_watch_history(&self, id: Uuid, video_id: Uuid) -> StoreResult<bool> {
        let mut accounts = self.accounts.write().await;
        match accounts.get_mut(&id) {
            Some(account) => {
                account.watch_history.push(video_id);
                account.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_owners(&self, ids: &[Uuid]) -> StoreResult<Vec<OwnerSummary>> {
        let accounts = self.accounts.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| accounts.get(id))
            .map(|a| OwnerSummary {
                id: a.id,
                full_name: a.full_name.clone(),
                username: a.username.clone(),
                avatar_url: a.avatar_url.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl SubscriptionStore for InMemoryStore {
    async fn count_subscribers(&self, channel: Uuid) -> StoreResult<i64> {
        let subscriptions = self.subscriptions.read().await;
        Ok(subscriptions.iter().filter(|s| s.channel == channel).count() as i64)
    }

    async fn count_subscriptions(&self, subscriber: Uuid) -> StoreResult<i64> {
        let subscriptions = self.subscriptions.read().await;
        Ok(subscriptions
            .iter()
            .filter(|s| s.subscriber == subscriber)
            .count() as i64)
    }

    async fn is_subscribed(&self, subscriber: Uuid, channel: Uuid) -> StoreResult<bool> {
        let subscriptions = self.subscriptions.read().await;
        Ok(subscriptions
            .iter()
            .any(|s| s.subscriber == subscriber && s.channel == channel))
    }
}

#[async_trait]
impl VideoStore for InMemoryStore {
    async fn find_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Video>> {
        let videos = self.videos.read().await;
        Ok(ids.iter().filter_map(|id| videos.get(id)).cloned().collect())
    }
}
