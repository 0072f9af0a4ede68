/// Request extractors
///
/// [`JsonBody`] behaves like `axum::Json` but rejects with [`ApiError`], so a
/// malformed body gets the same `{ "message": ... }` shape as every other
/// error.

use axum::extract::FromRequest;

use crate::error::ApiError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);
