/// Credential store
///
/// Owns every rule about the Account entity: normalization, required
/// fields, username/email uniqueness, password hashing and the persistence
/// of the refresh-token slot. Storage itself is delegated to an
/// [`AccountStore`].
///
/// Passwords are hashed only when the password is being set, never on
/// unrelated updates. Hashing and verification run on the blocking pool.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use streamhub_shared::credentials::CredentialStore;
/// use streamhub_shared::models::account::NewAccount;
/// use streamhub_shared::store::memory::InMemoryStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let credentials = CredentialStore::new(Arc::new(InMemoryStore::new()));
///
/// let created = credentials
///     .create_account(NewAccount {
///         username: "Nova".to_string(),
///         email: "n@x.com".to_string(),
///         full_name: "Nova".to_string(),
///         password: "p1".to_string(),
///         avatar_url: "/media/ab/abcd.png".to_string(),
///         cover_image_url: None,
///     })
///     .await?;
/// assert_eq!(created.username, "nova");
///
/// let account = credentials.find_by_identity("NOVA").await?.unwrap();
/// assert!(credentials.verify_password(&account, "p1").await?);
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::auth::password::{self, PasswordError};
use crate::models::account::{
    normalize_identity, Account, AccountChanges, AccountRecord, NewAccount, ProfileUpdate,
    PublicAccount,
};
use crate::store::{AccountStore, StoreError};

/// Error type for credential operations
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Missing, blank or malformed input
    #[error("{0}")]
    Validation(String),

    /// Username or email already taken
    #[error("User with this {field} already exists")]
    Conflict { field: &'static str },

    #[error("Account not found")]
    NotFound,

    /// Old password did not match during a password change
    #[error("Invalid old password")]
    InvalidPassword,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Store(StoreError),

    /// The blocking hash task panicked or was cancelled
    #[error("Password task failed: {0}")]
    Blocking(String),
}

impl From<StoreError> for CredentialError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { field } => CredentialError::Conflict { field },
            other => CredentialError::Store(other),
        }
    }
}

/// Field order used to pick the first validation message
const FIELD_ORDER: [&str; 5] = ["username", "email", "full_name", "password", "avatar_url"];

fn first_validation_message(errors: &ValidationErrors) -> String {
    let field_errors = errors.field_errors();

    FIELD_ORDER
        .iter()
        .filter_map(|field| field_errors.get(*field))
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "All fields are required".to_string())
}

#[derive(Validate)]
struct EmailField {
    #[validate(email(message = "Invalid email format"))]
    email: String,
}

async fn hash_blocking(plaintext: String) -> Result<String, CredentialError> {
    tokio::task::spawn_blocking(move || password::hash_password(&plaintext))
        .await
        .map_err(|e| CredentialError::Blocking(e.to_string()))?
        .map_err(CredentialError::from)
}

/// Account-facing operations over an [`AccountStore`]
#[derive(Clone)]
pub struct CredentialStore {
    accounts: Arc<dyn AccountStore>,
}

impl CredentialStore {
    pub fn new(accounts: Arc<dyn AccountStore>) -> Self {
        Self { accounts }
    }

    /// Rejects an email that is not well formed
    pub fn ensure_valid_email(&self, email: &str) -> Result<(), CredentialError> {
        let check = EmailField {
            email: normalize_identity(email),
        };
        check
            .validate()
            .map_err(|_| CredentialError::Validation("Invalid email format".to_string()))
    }

    /// Fails with [`CredentialError::Conflict`] if the normalized username or
    /// email is already taken
    ///
    /// Registration calls this before storing any media so a conflicting
    /// request leaves nothing behind.
    pub async fn ensure_available(&self, username: &str, email: &str) -> Result<(), CredentialError> {
        let username = normalize_identity(username);
        let email = normalize_identity(email);

        match self.accounts.find_by_username_or_email(&username, &email).await? {
            Some(existing) if existing.username == username => {
                Err(CredentialError::Conflict { field: "username" })
            }
            Some(_) => Err(CredentialError::Conflict { field: "email" }),
            None => Ok(()),
        }
    }

    /// Registers a new account
    ///
    /// # Errors
    ///
    /// - [`CredentialError::Validation`] if a required field is blank or the
    ///   email is malformed
    /// - [`CredentialError::Conflict`] if the username or email is taken
    pub async fn create_account(&self, input: NewAccount) -> Result<PublicAccount, CredentialError> {
        let input = input.normalized();

        if let Err(errors) = input.validate() {
            return Err(CredentialError::Validation(first_validation_message(&errors)));
        }
        if input.password_is_blank() {
            return Err(CredentialError::Validation("Password is required".to_string()));
        }

        self.ensure_available(&input.username, &input.email).await?;

        let password_hash = hash_blocking(input.password).await?;

        // The unique constraints still guard against a concurrent registration
        let account = self
            .accounts
            .insert(AccountRecord {
                username: input.username,
                email: input.email,
                full_name: input.full_name,
                password_hash,
                avatar_url: input.avatar_url,
                cover_image_url: input.cover_image_url,
            })
            .await?;

        info!(account_id = %account.id, username = %account.username, "Account created");
        Ok(account.to_public())
    }

    /// Looks up an account by username or email
    ///
    /// The identity is normalized; username takes precedence over email.
    pub async fn find_by_identity(&self, identity: &str) -> Result<Option<Account>, CredentialError> {
        let identity = normalize_identity(identity);
        if identity.is_empty() {
            return Ok(None);
        }

        if let Some(account) = self.accounts.find_by_username(&identity).await? {
            return Ok(Some(account));
        }
        Ok(self.accounts.find_by_email(&identity).await?)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<Account>, CredentialError> {
        Ok(self
            .accounts
            .find_by_username(&normalize_identity(username))
            .await?)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, CredentialError> {
        Ok(self.accounts.find_by_id(id).await?)
    }

    /// Checks a plaintext password against the account's stored hash
    pub async fn verify_password(&self, account: &Account, plaintext: &str) -> Result<bool, CredentialError> {
        let hash = account.password_hash.clone();
        let plaintext = plaintext.to_string();

        tokio::task::spawn_blocking(move || password::verify_password(&plaintext, &hash))
            .await
            .map_err(|e| CredentialError::Blocking(e.to_string()))?
            .map_err(CredentialError::from)
    }

    /// Re-hashes and replaces the password
    pub async fn update_password(&self, id: Uuid, new_plaintext: &str) -> Result<(), CredentialError> {
        if new_plaintext.trim().is_empty() {
            return Err(CredentialError::Validation("New password is required".to_string()));
        }

        let password_hash = hash_blocking(new_plaintext.to_string()).await?;
        self.accounts
            .update(
                id,
                AccountChanges {
                    password_hash: Some(password_hash),
                    ..Default::default()
                },
            )
            .await?
            .ok_or(CredentialError::NotFound)?;

        info!(account_id = %id, "Password updated");
        Ok(())
    }

    /// Verifies the old password, then replaces it
    pub async fn change_password(
        &self,
        id: Uuid,
        old_plaintext: &str,
        new_plaintext: &str,
    ) -> Result<(), CredentialError> {
        if old_plaintext.is_empty() || new_plaintext.trim().is_empty() {
            return Err(CredentialError::Validation(
                "Old and new passwords are required".to_string(),
            ));
        }

        let account = self.find_by_id(id).await?.ok_or(CredentialError::NotFound)?;
        if !self.verify_password(&account, old_plaintext).await? {
            debug!(account_id = %id, "Password change rejected: old password mismatch");
            return Err(CredentialError::InvalidPassword);
        }

        self.update_password(id, new_plaintext).await
    }

    /// Overwrites the refresh-token slot; `None` clears it
    pub async fn update_refresh_token(&self, id: Uuid, token: Option<&str>) -> Result<(), CredentialError> {
        if self.accounts.set_refresh_token(id, token).await? {
            Ok(())
        } else {
            Err(CredentialError::NotFound)
        }
    }

    /// Atomically replaces the slot if it still holds `expected`
    pub async fn swap_refresh_token(
        &self,
        id: Uuid,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, CredentialError> {
        Ok(self
            .accounts
            .swap_refresh_token(id, expected, replacement)
            .await?)
    }

    /// Updates full name and/or email
    ///
    /// At least one non-blank field is required. The email is normalized and
    /// must stay unique.
    pub async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<PublicAccount, CredentialError> {
        let full_name = update
            .full_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        let email = update
            .email
            .map(|email| normalize_identity(&email))
            .filter(|email| !email.is_empty());

        if full_name.is_none() && email.is_none() {
            return Err(CredentialError::Validation(
                "Full name or email is required".to_string(),
            ));
        }

        if let Some(ref email) = email {
            self.ensure_valid_email(email)?;
        }

        self.apply(
            id,
            AccountChanges {
                full_name,
                email,
                ..Default::default()
            },
        )
        .await
    }

    pub async fn update_avatar(&self, id: Uuid, url: &str) -> Result<PublicAccount, CredentialError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(CredentialError::Validation("Avatar file is missing".to_string()));
        }

        self.apply(
            id,
            AccountChanges {
                avatar_url: Some(url.to_string()),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn update_cover_image(&self, id: Uuid, url: &str) -> Result<PublicAccount, CredentialError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(CredentialError::Validation("Cover image file is missing".to_string()));
        }

        self.apply(
            id,
            AccountChanges {
                cover_image_url: Some(url.to_string()),
                ..Default::default()
            },
        )
        .await
    }

    /// Appends a video to the end of the account's watch history
    pub async fn record_watch(&self, id: Uuid, video_id: Uuid) -> Result<(), CredentialError> {
        if self.accounts.append_watch_history(id, video_id).await? {
            Ok(())
        } else {
            Err(CredentialError::NotFound)
        }
    }

    async fn apply(&self, id: Uuid, changes: AccountChanges) -> Result<PublicAccount, CredentialError> {
        let account = self
            .accounts
            .update(id, changes)
            .await?
            .ok_or(CredentialError::NotFound)?;

        debug!(account_id = %id, "Account updated");
        Ok(account.into())
    }
}
