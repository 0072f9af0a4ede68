/// Video and subscription records
///
/// Both entities belong to other parts of the service (upload pipeline,
/// subscription management). This crate reads them only to build derived
/// views, so the types here are plain read models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored video record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: Uuid,
    pub video_file: String,
    pub thumbnail: String,
    pub title: String,
    pub description: String,
    /// Length in seconds
    pub duration: f64,
    pub views: i64,
    pub is_published: bool,
    /// Owning account ID
    #[sqlx(rename = "owner_id")]
    pub owner: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Channel-follow relationship: `subscriber` follows `channel`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,
    #[sqlx(rename = "subscriber_id")]
    pub subscriber: Uuid,
    #[sqlx(rename = "channel_id")]
    pub channel: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Minimal owner projection embedded in watch-history entries
///
/// The ID is kept for joining but never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    #[serde(skip)]
    pub id: Uuid,
    pub full_name: String,
    pub username: String,
    pub avatar_url: String,
}

/// Video enriched with a single embedded owner object
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchedVideo {
    pub id: Uuid,
    pub video_file: String,
    pub thumbnail: String,
    pub title: String,
    pub description: String,
    pub duration: f64,
    pub views: i64,
    pub is_published: bool,
    /// `None` when the owning account no longer exists
    pub owner: Option<OwnerSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WatchedVideo {
    pub fn from_video(video: Video, owner: Option<OwnerSummary>) -> Self {
        Self {
            id: video.id,
            video_file: video.video_file,
            thumbnail: video.thumbnail,
            title: video.title,
            description: video.description,
            duration: video.duration,
            views: video.views,
            is_published: video.is_published,
            owner,
            created_at: video.created_at,
            updated_at: video.updated_at,
        }
    }
}

/// Channel profile view
///
/// Only these fields are projected; field names are part of the client
/// compatibility surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    pub full_name: String,
    pub username: String,
    pub subscribers_count: i64,
    pub channels_subscribed_to_count: i64,
    pub is_subscribed: bool,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    pub email: String,
}
