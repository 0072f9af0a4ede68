/// Account model
///
/// The Account is the only entity owned by this crate. It carries identity
/// (username, email), display data (full name, avatar, cover image), the
/// Argon2id password hash, the ordered watch history and the single active
/// refresh-token slot.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE accounts (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     username TEXT NOT NULL UNIQUE,
///     email TEXT NOT NULL UNIQUE,
///     full_name TEXT NOT NULL,
///     password_hash TEXT NOT NULL,
///     avatar_url TEXT NOT NULL,
///     cover_image_url TEXT,
///     watch_history UUID[] NOT NULL DEFAULT '{}',
///     refresh_token TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Secrets
///
/// [`Account`] is deliberately not `Serialize`. Anything leaving the process
/// goes through [`PublicAccount`], which has no `password_hash` and no
/// `refresh_token`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Stored account record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Account {
    /// Unique account ID (UUID v4), immutable
    pub id: Uuid,

    /// Lowercase, trimmed, globally unique
    pub username: String,

    /// Lowercase, trimmed, globally unique
    pub email: String,

    /// Trimmed display name
    pub full_name: String,

    /// Argon2id PHC string, never the plaintext
    pub password_hash: String,

    /// URL of the stored avatar blob
    pub avatar_url: String,

    /// URL of the stored cover image blob
    pub cover_image_url: Option<String>,

    /// Watched video IDs in stored order
    pub watch_history: Vec<Uuid>,

    /// Currently valid refresh token, if any
    pub refresh_token: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Projects the account without its secrets
    pub fn to_public(&self) -> PublicAccount {
        PublicAccount {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            avatar_url: self.avatar_url.clone(),
            cover_image_url: self.cover_image_url.clone(),
            watch_history: self.watch_history.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Returns true if `presented` is the token currently held in the slot
    pub fn holds_refresh_token(&self, presented: &str) -> bool {
        matches!(self.refresh_token.as_deref(), Some(stored) if !stored.is_empty() && stored == presented)
    }
}

/// Account as exposed to clients
///
/// Field names are part of the client compatibility surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicAccount {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    pub watch_history: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for PublicAccount {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            email: account.email,
            full_name: account.full_name,
            avatar_url: account.avatar_url,
            cover_image_url: account.cover_image_url,
            watch_history: account.watch_history,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Registration input, before normalization
///
/// Holds the plaintext password; it is hashed by the credential store and
/// dropped.
#[derive(Debug, Clone, Default, Validate)]
pub struct NewAccount {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Invalid email format")
    )]
    pub email: String,

    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    #[validate(length(min = 1, message = "Avatar is required"))]
    pub avatar_url: String,

    pub cover_image_url: Option<String>,
}

impl NewAccount {
    /// Applies trimming and case normalization
    ///
    /// The password is left untouched apart from the blank check performed
    /// by validation on its trimmed form.
    pub fn normalized(self) -> Self {
        Self {
            username: normalize_identity(&self.username),
            email: normalize_identity(&self.email),
            full_name: self.full_name.trim().to_string(),
            password: self.password,
            avatar_url: self.avatar_url.trim().to_string(),
            cover_image_url: self
                .cover_image_url
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
        }
    }

    /// True when the password is blank once trimmed
    pub fn password_is_blank(&self) -> bool {
        self.password.trim().is_empty()
    }
}

/// Row to insert, with the password already hashed
#[derive(Debug, Clone)]
pub struct AccountRecord {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
}

/// Partial update applied by the store
///
/// Only `Some` fields are written. `updated_at` is always bumped.
#[derive(Debug, Clone, Default)]
pub struct AccountChanges {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub password_hash: Option<String>,
    pub avatar_url: Option<String>,
    pub cover_image_url: Option<String>,
}

impl AccountChanges {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.full_name.is_none()
            && self.password_hash.is_none()
            && self.avatar_url.is_none()
            && self.cover_image_url.is_none()
    }
}

/// Profile fields a principal may edit directly
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
}

/// Trims and lowercases a username or email
pub fn normalize_identity(value: &str) -> String {
    value.trim().to_lowercase()
}
