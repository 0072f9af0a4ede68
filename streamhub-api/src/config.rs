/// Configuration management for the API server
///
/// Loaded from environment variables (a `.env` file is honoured in
/// development).
///
/// # Environment Variables
///
/// | Variable | Default |
/// |---|---|
/// | `API_HOST` | `0.0.0.0` |
/// | `API_PORT` | `8000` |
/// | `CORS_ORIGINS` | `*` (comma-separated list) |
/// | `COOKIE_SECURE` | `true` |
/// | `PRODUCTION` | `false` |
/// | `DATABASE_URL` | unset: in-memory storage |
/// | `DATABASE_MAX_CONNECTIONS` | `10` |
/// | `ACCESS_TOKEN_SECRET` | required, at least 32 characters |
/// | `ACCESS_TOKEN_TTL_SECONDS` | `900` |
/// | `REFRESH_TOKEN_SECRET` | required, at least 32 characters |
/// | `REFRESH_TOKEN_TTL_SECONDS` | `864000` |
/// | `MEDIA_ROOT` | `./media` |
/// | `MEDIA_BASE_URL` | `/media` |
///
/// # Example
///
/// ```no_run
/// use streamhub_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use chrono::Duration;
use streamhub_shared::auth::tokens::TokenConfig;

const MIN_SECRET_LEN: usize = 32;

/// Longest accepted token lifetime (one year)
const MAX_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub tokens: TokensConfig,
    pub media: MediaConfig,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `["*"]` allows any
    pub cors_origins: Vec<String>,

    /// Whether session cookies carry the `Secure` attribute
    pub cookie_secure: bool,

    /// Enables HSTS
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL; `None` selects in-memory storage
    pub url: Option<String>,
    pub max_connections: u32,
}

/// Token signing configuration
#[derive(Debug, Clone)]
pub struct TokensConfig {
    pub access_secret: String,
    pub access_ttl_seconds: i64,
    pub refresh_secret: String,
    pub refresh_ttl_seconds: i64,
}

impl TokensConfig {
    pub fn to_token_config(&self) -> TokenConfig {
        TokenConfig {
            access_secret: self.access_secret.clone(),
            access_ttl: Duration::seconds(self.access_ttl_seconds),
            refresh_secret: self.refresh_secret.clone(),
            refresh_ttl: Duration::seconds(self.refresh_ttl_seconds),
        }
    }
}

/// Media storage configuration
#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub root: PathBuf,

    /// URL prefix media is served under
    pub base_url: String,
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        None => Ok(default),
    }
}

fn required_secret(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<String> {
    let secret = lookup(key)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow::anyhow!("{} environment variable is required", key))?;

    if secret.len() < MIN_SECRET_LEN {
        anyhow::bail!("{} must be at least {} characters long", key, MIN_SECRET_LEN);
    }
    Ok(secret)
}

impl Config {
    /// Loads configuration from the process environment
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from any key lookup
    ///
    /// # Errors
    ///
    /// - a required secret is missing or shorter than 32 characters
    /// - the two token secrets are equal
    /// - a numeric or boolean variable does not parse
    /// - a TTL is not positive or exceeds one year
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let cors_origins: Vec<String> = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let api = ApiConfig {
            host: lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "API_PORT", 8000u16)?,
            cors_origins: if cors_origins.is_empty() {
                vec!["*".to_string()]
            } else {
                cors_origins
            },
            cookie_secure: parse_or(&lookup, "COOKIE_SECURE", true)?,
            production: parse_or(&lookup, "PRODUCTION", false)?,
        };

        let database = DatabaseConfig {
            url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10u32)?,
        };

        let tokens = TokensConfig {
            access_secret: required_secret(&lookup, "ACCESS_TOKEN_SECRET")?,
            access_ttl_seconds: parse_or(&lookup, "ACCESS_TOKEN_TTL_SECONDS", 900i64)?,
            refresh_secret: required_secret(&lookup, "REFRESH_TOKEN_SECRET")?,
            refresh_ttl_seconds: parse_or(&lookup, "REFRESH_TOKEN_TTL_SECONDS", 864_000i64)?,
        };

        if tokens.access_secret == tokens.refresh_secret {
            anyhow::bail!("ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ");
        }
        for (key, ttl) in [
            ("ACCESS_TOKEN_TTL_SECONDS", tokens.access_ttl_seconds),
            ("REFRESH_TOKEN_TTL_SECONDS", tokens.refresh_ttl_seconds),
        ] {
            if !(1..=MAX_TTL_SECONDS).contains(&ttl) {
                anyhow::bail!("{} must be between 1 and {} seconds", key, MAX_TTL_SECONDS);
            }
        }

        let media = MediaConfig {
            root: PathBuf::from(lookup("MEDIA_ROOT").unwrap_or_else(|| "./media".to_string())),
            base_url: lookup("MEDIA_BASE_URL").unwrap_or_else(|| "/media".to_string()),
        };

        Ok(Self {
            api,
            database,
            tokens,
            media,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}
