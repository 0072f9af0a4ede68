/// Session middleware for Axum
///
/// Resolves the caller's access token into an authenticated [`Principal`]
/// and stores it in the request extensions.
///
/// # Credential sources
///
/// Checked in order, empty values count as absent:
///
/// 1. `accessToken` cookie
/// 2. `Authorization: Bearer <token>` header
///
/// # Outcomes
///
/// | Situation | Result |
/// |---|---|
/// | no credential | 401 `Unauthenticated` |
/// | bad signature, malformed, expired, wrong kind | 403 `InvalidToken` |
/// | valid token for an unknown account | 403 `InvalidToken` |
/// | storage failure | 500 |
///
/// The account is always re-loaded from storage, so profile edits show up
/// immediately and deleted accounts are locked out even with a valid token.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Extension, Router};
/// use streamhub_shared::auth::middleware::{session_middleware, Principal, SessionAuthenticator};
///
/// async fn whoami(Extension(Principal(account)): Extension<Principal>) -> String {
///     account.username
/// }
///
/// fn router(auth: SessionAuthenticator) -> Router {
///     Router::new()
///         .route("/whoami", get(whoami))
///         .layer(middleware::from_fn_with_state(auth, session_middleware))
/// }
/// ```

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;
use tracing::{debug, error};

use super::tokens::{TokenError, TokenService};
use crate::credentials::CredentialStore;
use crate::models::account::PublicAccount;

/// Name of the access-token cookie
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Authenticated caller, attached to request extensions
#[derive(Debug, Clone)]
pub struct Principal(pub PublicAccount);

/// Error type for session authentication
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No credential on the request
    #[error("Access denied. Please log in.")]
    Unauthenticated,

    /// Credential failed verification or names an unknown account
    #[error("Invalid token. Please log in again.")]
    InvalidToken(String),

    #[error("Internal server error")]
    Internal(String),
}

impl SessionError {
    pub fn status(&self) -> StatusCode {
        match self {
            SessionError::Unauthenticated => StatusCode::UNAUTHORIZED,
            SessionError::InvalidToken(_) => StatusCode::FORBIDDEN,
            SessionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        match &self {
            SessionError::InvalidToken(reason) => debug!(reason = %reason, "Rejected session"),
            SessionError::Internal(detail) => error!(error = %detail, "Session lookup failed"),
            SessionError::Unauthenticated => {}
        }

        let body = Json(json!({ "message": self.to_string() }));
        (self.status(), body).into_response()
    }
}

/// Pulls the access token from the cookie or the Bearer header
pub fn extract_credential(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(ACCESS_TOKEN_COOKIE) {
        let value = cookie.value().trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Turns a raw credential into a [`Principal`]
#[derive(Clone)]
pub struct SessionAuthenticator {
    tokens: TokenService,
    credentials: CredentialStore,
}

impl SessionAuthenticator {
    pub fn new(tokens: TokenService, credentials: CredentialStore) -> Self {
        Self {
            tokens,
            credentials,
        }
    }

    pub async fn authenticate(&self, credential: Option<&str>) -> Result<Principal, SessionError> {
        let token = credential
            .filter(|t| !t.is_empty())
            .ok_or(SessionError::Unauthenticated)?;

        let claims = self.tokens.verify_access_token(token)?;

        let account = self
            .credentials
            .find_by_id(claims.id)
            .await
            .map_err(|e| SessionError::Internal(e.to_string()))?
            .ok_or_else(|| SessionError::InvalidToken("Account no longer exists".to_string()))?;

        Ok(Principal(account.into()))
    }
}

impl From<TokenError> for SessionError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Credentials(e) => SessionError::Internal(e.to_string()),
            other => SessionError::InvalidToken(other.to_string()),
        }
    }
}

/// Requires a valid session and attaches the [`Principal`]
pub async fn session_middleware(
    State(auth): State<SessionAuthenticator>,
    mut req: Request,
    next: Next,
) -> Result<Response, SessionError> {
    let credential = extract_credential(req.headers());
    let principal = auth.authenticate(credential.as_deref()).await?;

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}
