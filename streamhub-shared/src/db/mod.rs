/// PostgreSQL plumbing
///
/// - `pool`: connection pool creation, health check and shutdown
/// - `migrations`: embedded sqlx migrations for the accounts, videos and
///   subscriptions tables
///
/// Storage queries themselves live in [`crate::store::postgres`].

pub mod migrations;
pub mod pool;
