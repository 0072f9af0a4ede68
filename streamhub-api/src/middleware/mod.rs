/// Router-wide middleware
///
/// Session authentication lives in
/// [`streamhub_shared::auth::middleware`]; this module holds the layers that
/// apply to every response.

pub mod security;
