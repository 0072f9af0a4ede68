/// API route handlers
///
/// - `health`: health check endpoint
/// - `users`: account, session and profile endpoints under `/api/v1/users`

pub mod health;
pub mod users;
