/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use streamhub_api::{app::{build_router, AppState, StorageBackend}, config::Config};
/// use streamhub_shared::{media::DiskMediaStore, store::memory::InMemoryStore};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let media = Arc::new(DiskMediaStore::new(&config.media.root, config.media.base_url.clone()));
/// let state = AppState::new(config, Arc::new(InMemoryStore::new()), StorageBackend::Memory, media);
/// let app = build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use sqlx::PgPool;
use std::{path::PathBuf, sync::Arc};
use streamhub_shared::{
    auth::{
        middleware::{session_middleware, SessionAuthenticator},
        tokens::TokenService,
    },
    credentials::CredentialStore,
    media::MediaStore,
    profile::ProfileAggregator,
    store::{AccountStore, SubscriptionStore, VideoStore},
};
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Upper bound for multipart uploads
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Which storage the services run on, for health reporting
#[derive(Clone)]
pub enum StorageBackend {
    Postgres(PgPool),
    Memory,
}

/// Shared application state
///
/// Cloned per request; every field is an `Arc` or a handle around one.
#[derive(Clone)]
pub struct AppState {
    pub credentials: CredentialStore,
    pub tokens: TokenService,
    pub sessions: SessionAuthenticator,
    pub profiles: ProfileAggregator,
    pub media: Arc<dyn MediaStore>,
    pub storage: StorageBackend,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires every service over one store
    pub fn new<S>(config: Config, store: Arc<S>, storage: StorageBackend, media: Arc<dyn MediaStore>) -> Self
    where
        S: AccountStore + SubscriptionStore + VideoStore + 'static,
    {
        let accounts: Arc<dyn AccountStore> = store.clone();
        let subscriptions: Arc<dyn SubscriptionStore> = store.clone();
        let videos: Arc<dyn VideoStore> = store;

        let credentials = CredentialStore::new(accounts.clone());
        let tokens = TokenService::new(config.tokens.to_token_config(), credentials.clone());
        let sessions = SessionAuthenticator::new(tokens.clone(), credentials.clone());
        let profiles = ProfileAggregator::new(accounts, subscriptions, videos);

        Self {
            credentials,
            tokens,
            sessions,
            profiles,
            media,
            storage,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET /health
/// ├── /media/...                        static files (when served locally)
/// └── /api/v1/users
///     ├── GET   /                       banner
///     ├── POST  /register               multipart
///     ├── POST  /login
///     ├── POST  /refresh-access-token
///     └── (session required)
///         ├── POST  /logout
///         ├── POST  /reset-password
///         ├── GET   /current-user
///         ├── PATCH /update-account
///         ├── PATCH /update-avatar      multipart
///         ├── PATCH /update-cover-image multipart
///         ├── GET   /c/:username
///         └── GET   /history
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes::{health, users};

    let public_routes = Router::new()
        .route("/", get(users::banner))
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/refresh-access-token", post(users::refresh_access_token));

    let session_routes = Router::new()
        .route("/logout", post(users::logout))
        .route("/reset-password", post(users::reset_password))
        .route("/current-user", get(users::current_user))
        .route("/update-account", patch(users::update_account))
        .route("/update-avatar", patch(users::update_avatar))
        .route("/update-cover-image", patch(users::update_cover_image))
        .route("/c/:username", get(users::channel_profile))
        .route("/history", get(users::watch_history))
        .layer(axum::middleware::from_fn_with_state(
            state.sessions.clone(),
            session_middleware,
        ));

    let user_routes = public_routes
        .merge(session_routes)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES));

    let mut router = Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1/users", user_routes);

    // Only local paths can be served from disk; an absolute URL means a CDN
    let media_base = state.config.media.base_url.trim_end_matches('/').to_string();
    if media_base.starts_with('/') && media_base.len() > 1 {
        let media_root: PathBuf = state.config.media.root.clone();
        router = router.nest_service(&media_base, ServeDir::new(media_root));
    }

    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    let production = state.config.api.production;

    router
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(production))
        .with_state(state)
}
