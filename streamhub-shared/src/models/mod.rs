/// Data models for Stream Hub
///
/// # Models
///
/// - `account`: Accounts, their public projection and update inputs
/// - `video`: Read models for videos and subscriptions, plus the derived
///   channel-profile and watch-history views
///
/// # Example
///
/// ```
/// use streamhub_shared::models::account::{normalize_identity, NewAccount};
///
/// let input = NewAccount {
///     username: " Nova ".to_string(),
///     email: "N@X.com".to_string(),
///     full_name: "Nova".to_string(),
///     password: "p1".to_string(),
///     avatar_url: "/media/ab/abcd.png".to_string(),
///     cover_image_url: None,
/// }
/// .normalized();
///
/// assert_eq!(input.username, normalize_identity("NOVA"));
/// ```

pub mod account;
pub mod video;
