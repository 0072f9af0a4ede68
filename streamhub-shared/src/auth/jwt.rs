/// JWT signing and verification
///
/// Two token kinds are issued, each with its own secret and lifetime:
///
/// - **Access token**: short-lived, carries `id`, `username`, `email` and
///   `fullName` so handlers can identify the caller without a lookup.
/// - **Refresh token**: long-lived, carries only `id`.
///
/// Both are HS256-signed, carry issuer `streamhub`, a `tokenType` claim and a
/// random `jti`. The `jti` makes every issued token distinct even when two
/// are minted for the same account within the same second.
///
/// Verification checks signature, issuer, `exp` and `nbf` with zero leeway,
/// then checks the token kind.
///
/// # Example
///
/// ```
/// use chrono::Duration;
/// use streamhub_shared::auth::jwt::{create_token, validate_token, RefreshClaims};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let id = Uuid::new_v4();
/// let secret = "refresh-secret-at-least-32-bytes-long";
///
/// let token = create_token(&RefreshClaims::new(id, Duration::days(10)), secret)?;
/// let claims: RefreshClaims = validate_token(&token, secret)?;
/// assert_eq!(claims.id, id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use crate::models::account::Account;

/// Issuer claim on every token
pub const ISSUER: &str = "streamhub";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    #[error("Token has expired")]
    Expired,

    #[error("Invalid issuer")]
    InvalidIssuer,

    #[error("Expected {expected:?} token, got {actual:?} token")]
    WrongTokenType {
        expected: TokenType,
        actual: TokenType,
    },
}

/// Token kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims types that know which token kind they describe
pub trait TypedClaims: Serialize + DeserializeOwned {
    const TOKEN_TYPE: TokenType;

    fn token_type(&self) -> TokenType;
}

/// Access token claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    /// Account ID
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,

    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    pub jti: Uuid,
    pub token_type: TokenType,
}

impl AccessClaims {
    /// Builds access claims for an account, expiring after `ttl`
    pub fn new(account: &Account, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            full_name: account.full_name.clone(),
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            nbf: now.timestamp(),
            jti: Uuid::new_v4(),
            token_type: TokenType::Access,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

impl TypedClaims for AccessClaims {
    const TOKEN_TYPE: TokenType = TokenType::Access;

    fn token_type(&self) -> TokenType {
        self.token_type
    }
}

/// Refresh token claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshClaims {
    /// Account ID
    pub id: Uuid,

    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    pub jti: Uuid,
    pub token_type: TokenType,
}

impl RefreshClaims {
    /// Builds refresh claims for an account ID, expiring after `ttl`
    pub fn new(id: Uuid, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            nbf: now.timestamp(),
            jti: Uuid::new_v4(),
            token_type: TokenType::Refresh,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Gets time until expiration
    pub fn time_until_expiration(&self) -> Option<Duration> {
        let now = Utc::now().timestamp();
        if self.exp > now {
            Some(Duration::seconds(self.exp - now))
        } else {
            None
        }
    }
}

impl TypedClaims for RefreshClaims {
    const TOKEN_TYPE: TokenType = TokenType::Refresh;

    fn token_type(&self) -> TokenType {
        self.token_type
    }
}

/// Signs claims with HS256
pub fn create_token<C: Serialize>(claims: &C, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Verifies a token and decodes its claims
///
/// # Errors
///
/// - [`JwtError::Expired`] once `exp` has passed
/// - [`JwtError::InvalidIssuer`] if the issuer is not `streamhub`
/// - [`JwtError::WrongTokenType`] if an access token is presented where a
///   refresh token is expected, or vice versa
/// - [`JwtError::ValidationError`] for bad signatures and malformed tokens
pub fn validate_token<C: TypedClaims>(token: &str, secret: &str) -> Result<C, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    let token_data = decode::<C>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    let claims = token_data.claims;
    if claims.token_type() != C::TOKEN_TYPE {
        return Err(JwtError::WrongTokenType {
            expected: C::TOKEN_TYPE,
            actual: claims.token_type(),
        });
    }

    Ok(claims)
}
