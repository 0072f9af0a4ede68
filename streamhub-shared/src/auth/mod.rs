/// Authentication and session handling
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: typed access/refresh claims, signing and validation
/// - [`tokens`]: token pair issuance, rotation and revocation
/// - [`middleware`]: Axum session middleware producing a [`middleware::Principal`]
///
/// # Example
///
/// ```
/// use chrono::Duration;
/// use streamhub_shared::auth::jwt::{create_token, validate_token, RefreshClaims};
/// use streamhub_shared::auth::password::{hash_password, verify_password};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("p1")?;
/// assert!(verify_password("p1", &hash)?);
///
/// let secret = "refresh-secret-at-least-32-bytes-long";
/// let token = create_token(&RefreshClaims::new(Uuid::new_v4(), Duration::days(10)), secret)?;
/// let _claims: RefreshClaims = validate_token(&token, secret)?;
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod tokens;
