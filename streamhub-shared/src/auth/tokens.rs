/// Token service
///
/// Issues, verifies, rotates and revokes access/refresh token pairs. Each
/// account has a single active refresh-token slot; issuing a pair overwrites
/// it, rotating replaces it through a compare-and-swap, revoking clears it.
///
/// # Rotation
///
/// ```text
/// verify(presented) ──► load account ──► slot == presented? ──► sign new pair
///                                                                   │
///                                     swap(slot: presented -> new) ◄┘
/// ```
///
/// The final swap only succeeds if the slot still holds the presented token,
/// so two concurrent rotations of the same token cannot both produce a valid
/// pair. The loser receives [`TokenError::Unauthorized`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use chrono::Duration;
/// use streamhub_shared::auth::tokens::{TokenConfig, TokenService};
/// use streamhub_shared::credentials::CredentialStore;
/// use streamhub_shared::store::memory::InMemoryStore;
///
/// let credentials = CredentialStore::new(Arc::new(InMemoryStore::new()));
/// let tokens = TokenService::new(
///     TokenConfig {
///         access_secret: "access-secret-at-least-32-bytes-long!".to_string(),
///         access_ttl: Duration::minutes(15),
///         refresh_secret: "refresh-secret-at-least-32-bytes-long".to_string(),
///         refresh_ttl: Duration::days(10),
///     },
///     credentials,
/// );
/// ```

use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::jwt::{self, AccessClaims, JwtError, RefreshClaims};
use crate::credentials::{CredentialError, CredentialStore};
use crate::models::account::Account;

/// Signing keys and lifetimes
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub access_secret: String,
    pub access_ttl: Duration,
    pub refresh_secret: String,
    pub refresh_ttl: Duration,
}

/// Freshly issued access/refresh pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Error type for token operations
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Bad signature, malformed, expired or wrong token kind
    #[error("Invalid token: {0}")]
    InvalidToken(#[from] JwtError),

    /// Token verified but does not match the account's active slot, or the
    /// account no longer exists
    #[error("{0}")]
    Unauthorized(String),

    #[error(transparent)]
    Credentials(#[from] CredentialError),
}

/// Issues and rotates tokens, persisting the refresh slot through the
/// credential store
#[derive(Clone)]
pub struct TokenService {
    config: Arc<TokenConfig>,
    credentials: CredentialStore,
}

impl TokenService {
    pub fn new(config: TokenConfig, credentials: CredentialStore) -> Self {
        Self {
            config: Arc::new(config),
            credentials,
        }
    }

    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, TokenError> {
        Ok(jwt::validate_token(token, &self.config.access_secret)?)
    }

    pub fn verify_refresh_token(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        Ok(jwt::validate_token(token, &self.config.refresh_secret)?)
    }

    /// Signs a new pair without touching storage
    fn sign_pair(&self, account: &Account) -> Result<TokenPair, TokenError> {
        let access = AccessClaims::new(account, self.config.access_ttl);
        let refresh = RefreshClaims::new(account.id, self.config.refresh_ttl);

        Ok(TokenPair {
            access_token: jwt::create_token(&access, &self.config.access_secret)?,
            refresh_token: jwt::create_token(&refresh, &self.config.refresh_secret)?,
        })
    }

    /// Issues a pair and makes its refresh token the account's active slot
    ///
    /// Any previously issued refresh token stops being accepted.
    pub async fn issue_pair(&self, account: &Account) -> Result<TokenPair, TokenError> {
        let pair = self.sign_pair(account)?;

        self.credentials
            .update_refresh_token(account.id, Some(&pair.refresh_token))
            .await?;

        debug!(account_id = %account.id, "Issued token pair");
        Ok(pair)
    }

    /// Exchanges a refresh token for a new pair
    ///
    /// # Errors
    ///
    /// - [`TokenError::InvalidToken`] if the token fails verification
    /// - [`TokenError::Unauthorized`] if the account is gone, the token is
    ///   not the active slot, or a concurrent rotation won the swap
    pub async fn rotate(&self, presented: &str) -> Result<TokenPair, TokenError> {
        let claims = self.verify_refresh_token(presented)?;

        let account = self
            .credentials
            .find_by_id(claims.id)
            .await?
            .ok_or_else(|| TokenError::Unauthorized("Invalid refresh token".to_string()))?;

        if !account.holds_refresh_token(presented) {
            warn!(account_id = %account.id, "Refresh token reuse or mismatch detected");
            return Err(TokenError::Unauthorized(
                "Refresh token is expired or used".to_string(),
            ));
        }

        let pair = self.sign_pair(&account)?;

        let swapped = self
            .credentials
            .swap_refresh_token(account.id, presented, &pair.refresh_token)
            .await?;

        if !swapped {
            warn!(account_id = %account.id, "Lost refresh token rotation race");
            return Err(TokenError::Unauthorized(
                "Refresh token is expired or used".to_string(),
            ));
        }

        info!(account_id = %account.id, "Rotated refresh token");
        Ok(pair)
    }

    /// Clears the account's refresh slot
    pub async fn revoke(&self, account_id: Uuid) -> Result<(), TokenError> {
        self.credentials.update_refresh_token(account_id, None).await?;
        info!(account_id = %account_id, "Revoked refresh token");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::account::NewAccount;
    use crate::store::memory::InMemoryStore;
    use crate::store::AccountStore;

    const ACCESS_SECRET: &str = "access-secret-at-least-32-bytes-long!";
    const REFRESH_SECRET: &str = "refresh-secret-at-least-32-bytes-long";

    struct Fixture {
        store: Arc<InMemoryStore>,
        credentials: CredentialStore,
        tokens: TokenService,
    }

    fn fixture_with_ttl(access_ttl: Duration) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let credentials = CredentialStore::new(store.clone());
        let tokens = TokenService::new(
            TokenConfig {
                access_secret: ACCESS_SECRET.to_string(),
                access_ttl,
                refresh_secret: REFRESH_SECRET.to_string(),
                refresh_ttl: Duration::days(10),
            },
            credentials.clone(),
        );
        Fixture {
            store,
            credentials,
            tokens,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_ttl(Duration::minutes(15))
    }

    async fn register(credentials: &CredentialStore) -> Account {
        let created = credentials
            .create_account(NewAccount {
                username: "nova".to_string(),
                email: "n@x.com".to_string(),
                full_name: "Nova".to_string(),
                password: "p1".to_string(),
                avatar_url: "/media/ab/a.png".to_string(),
                cover_image_url: None,
            })
            .await
            .unwrap();
        credentials.find_by_id(created.id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_issue_pair_persists_slot() {
        let f = fixture();
        let account = register(&f.credentials).await;

        let pair = f.tokens.issue_pair(&account).await.unwrap();

        let stored = f.store.find_by_id(account.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token.as_deref(), Some(pair.refresh_token.as_str()));

        let claims = f.tokens.verify_access_token(&pair.access_token).unwrap();
        assert_eq!(claims.id, account.id);
        assert_eq!(claims.username, "nova");
        assert_eq!(claims.email, "n@x.com");
        assert_eq!(claims.full_name, "Nova");

        let refresh = f.tokens.verify_refresh_token(&pair.refresh_token).unwrap();
        assert_eq!(refresh.id, account.id);
    }

    #[tokio::test]
    async fn test_expired_access_token_is_rejected() {
        let f = fixture_with_ttl(Duration::seconds(-1));
        let account = register(&f.credentials).await;

        let pair = f.tokens.issue_pair(&account).await.unwrap();
        assert!(matches!(
            f.tokens.verify_access_token(&pair.access_token),
            Err(TokenError::InvalidToken(JwtError::Expired))
        ));
    }

    #[tokio::test]
    async fn test_secrets_are_not_interchangeable() {
        let f = fixture();
        let account = register(&f.credentials).await;
        let pair = f.tokens.issue_pair(&account).await.unwrap();

        assert!(f.tokens.verify_access_token(&pair.refresh_token).is_err());
        assert!(f.tokens.verify_refresh_token(&pair.access_token).is_err());
    }

    #[tokio::test]
    async fn test_rotate_then_reuse_fails() {
        let f = fixture();
        let account = register(&f.credentials).await;
        let first = f.tokens.issue_pair(&account).await.unwrap();

        let second = f.tokens.rotate(&first.refresh_token).await.unwrap();
        assert_ne!(second.access_token, first.access_token);
        assert_ne!(second.refresh_token, first.refresh_token);

        let err = f.tokens.rotate(&first.refresh_token).await.unwrap_err();
        assert!(matches!(err, TokenError::Unauthorized(_)));

        // The newest token still works
        f.tokens.rotate(&second.refresh_token).await.unwrap();
    }

    #[tokio::test]
    async fn test_issue_pair_supersedes_previous_refresh_token() {
        let f = fixture();
        let account = register(&f.credentials).await;

        let first = f.tokens.issue_pair(&account).await.unwrap();
        f.tokens.issue_pair(&account).await.unwrap();

        assert!(matches!(
            f.tokens.rotate(&first.refresh_token).await,
            Err(TokenError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_revoke_blocks_rotation() {
        let f = fixture();
        let account = register(&f.credentials).await;
        let pair = f.tokens.issue_pair(&account).await.unwrap();

        f.tokens.revoke(account.id).await.unwrap();

        let stored = f.store.find_by_id(account.id).await.unwrap().unwrap();
        assert!(stored.refresh_token.is_none());
        assert!(matches!(
            f.tokens.rotate(&pair.refresh_token).await,
            Err(TokenError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_rotate_unknown_account() {
        let f = fixture();
        let claims = RefreshClaims::new(Uuid::new_v4(), Duration::days(1));
        let token = jwt::create_token(&claims, REFRESH_SECRET).unwrap();

        assert!(matches!(
            f.tokens.rotate(&token).await,
            Err(TokenError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_rotate_garbage() {
        let f = fixture();
        assert!(matches!(
            f.tokens.rotate("garbage").await,
            Err(TokenError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_rotation_has_one_winner() {
        let f = fixture();
        let account = register(&f.credentials).await;
        let pair = f.tokens.issue_pair(&account).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tokens = f.tokens.clone();
                let presented = pair.refresh_token.clone();
                tokio::spawn(async move { tokens.rotate(&presented).await })
            })
            .collect();

        let mut winners = Vec::new();
        for handle in handles {
            if let Ok(new_pair) = handle.await.unwrap() {
                winners.push(new_pair);
            }
        }

        assert_eq!(winners.len(), 1);
        let stored = f.store.find_by_id(account.id).await.unwrap().unwrap();
        assert_eq!(
            stored.refresh_token.as_deref(),
            Some(winners[0].refresh_token.as_str())
        );
    }
}
