/// Profile aggregator
///
/// Read-only derived views, computed fresh per request:
///
/// - **Channel profile**: target account plus subscriber/subscription counts
///   and whether the requester follows the target. One count query per
///   statistic plus one existence check, run concurrently.
/// - **Watch history**: the principal's watched video IDs resolved to videos,
///   each embedding a single owner projection. One batched video lookup plus
///   one batched owner lookup, independent of history length.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::models::account::{normalize_identity, PublicAccount};
use crate::models::video::{ChannelProfile, OwnerSummary, Video, WatchedVideo};
use crate::store::{AccountStore, StoreError, SubscriptionStore, VideoStore};

/// Error type for profile views
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("Username is missing")]
    MissingUsername,

    #[error("Channel does not exist")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Builds channel profiles and watch histories
#[derive(Clone)]
pub struct ProfileAggregator {
    accounts: Arc<dyn AccountStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    videos: Arc<dyn VideoStore>,
}

impl ProfileAggregator {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        videos: Arc<dyn VideoStore>,
    ) -> Self {
        Self {
            accounts,
            subscriptions,
            videos,
        }
    }

    /// Channel profile of `username` as seen by `requester`
    pub async fn channel_profile(
        &self,
        username: &str,
        requester: Uuid,
    ) -> Result<ChannelProfile, ProfileError> {
        let username = normalize_identity(username);
        if username.is_empty() {
            return Err(ProfileError::MissingUsername);
        }

        let channel = self
            .accounts
            .find_by_username(&username)
            .await?
            .ok_or(ProfileError::NotFound)?;

        let (subscribers_count, channels_subscribed_to_count, is_subscribed) = tokio::try_join!(
            self.subscriptions.count_subscribers(channel.id),
            self.subscriptions.count_subscriptions(channel.id),
            self.subscriptions.is_subscribed(requester, channel.id),
        )?;

        debug!(
            channel_id = %channel.id,
            requester = %requester,
            subscribers_count,
            "Built channel profile"
        );

        Ok(ChannelProfile {
            full_name: channel.full_name,
            username: channel.username,
            subscribers_count,
            channels_subscribed_to_count,
            is_subscribed,
            avatar_url: channel.avatar_url,
            cover_image_url: channel.cover_image_url,
            email: channel.email,
        })
    }

    /// Watch history of `principal`, in stored order
    ///
    /// Entries whose video no longer exists are dropped. Repeated views stay
    /// repeated. An entry whose owner no longer exists carries `owner: None`.
    pub async fn watch_history(&self, principal: &PublicAccount) -> Result<Vec<WatchedVideo>, ProfileError> {
        if principal.watch_history.is_empty() {
            return Ok(Vec::new());
        }

        let mut unique_ids = principal.watch_history.clone();
        unique_ids.sort_unstable();
        unique_ids.dedup();

        let videos: HashMap<Uuid, Video> = self
            .videos
            .find_by_ids(&unique_ids)
            .await?
            .into_iter()
            .map(|v| (v.id, v))
            .collect();

        let mut owner_ids: Vec<Uuid> = videos.values().map(|v| v.owner).collect();
        owner_ids.sort_unstable();
        owner_ids.dedup();

        let owners: HashMap<Uuid, OwnerSummary> = self
            .accounts
            .find_owners(&owner_ids)
            .await?
            .into_iter()
            .map(|o| (o.id, o))
            .collect();

        let history: Vec<WatchedVideo> = principal
            .watch_history
            .iter()
            .filter_map(|id| videos.get(id))
            .map(|video| {
                let owner = owners.get(&video.owner).cloned();
                WatchedVideo::from_video(video.clone(), owner)
            })
            .collect();

        debug!(
            account_id = %principal.id,
            entries = history.len(),
            "Built watch history"
        );
        Ok(history)
    }
}
