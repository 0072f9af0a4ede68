/// User endpoints
///
/// Mounted under `/api/v1/users`.
///
/// # Public
///
/// - `GET /` - route banner
/// - `POST /register` - multipart: `fullName`, `email`, `username`,
///   `password`, `avatar` (file), `coverImage` (optional file)
/// - `POST /login` - `{ username?, email?, password }`, sets session cookies
/// - `POST /refresh-access-token` - refresh token from the `refreshToken`
///   cookie or body field, sets session cookies
///
/// # Session required
///
/// - `POST /logout`
/// - `POST /reset-password` - `{ oldPassword, newPassword }`
/// - `GET /current-user`
/// - `PATCH /update-account` - `{ fullName?, email? }`
/// - `PATCH /update-avatar` - multipart `avatar`
/// - `PATCH /update-cover-image` - multipart `coverImage`
/// - `GET /c/:username` - channel profile
/// - `GET /history` - watch history

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::StatusCode,
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use streamhub_shared::{
    auth::{
        middleware::{Principal, ACCESS_TOKEN_COOKIE},
        tokens::TokenPair,
    },
    media::{MediaError, MediaUpload},
    models::{
        account::{NewAccount, ProfileUpdate, PublicAccount},
        video::{ChannelProfile, WatchedVideo},
    },
};
use tracing::{error, info};

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::JsonBody,
    response::ApiResponse,
};

/// Name of the refresh-token cookie
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

fn session_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

fn with_session_cookies(jar: CookieJar, pair: &TokenPair, secure: bool) -> CookieJar {
    jar.add(session_cookie(ACCESS_TOKEN_COOKIE, pair.access_token.clone(), secure))
        .add(session_cookie(REFRESH_TOKEN_COOKIE, pair.refresh_token.clone(), secure))
}

fn expired_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    let mut cookie = session_cookie(name, String::new(), secure);
    cookie.make_removal();
    cookie
}

/// Expires both session cookies, whether or not the request carried them
fn without_session_cookies(jar: CookieJar, secure: bool) -> CookieJar {
    jar.add(expired_cookie(ACCESS_TOKEN_COOKIE, secure))
        .add(expired_cookie(REFRESH_TOKEN_COOKIE, secure))
}

/// Text fields and non-empty files of a multipart form
#[derive(Default)]
struct Form {
    fields: HashMap<String, String>,
    files: HashMap<String, MediaUpload>,
}

impl Form {
    async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = Form::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if field.file_name().is_some() {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await?;

                // An empty file input means no file was chosen
                if !data.is_empty() {
                    form.files.insert(
                        name,
                        MediaUpload {
                            file_name,
                            content_type,
                            data,
                        },
                    );
                }
            } else {
                form.fields.insert(name, field.text().await?);
            }
        }

        Ok(form)
    }

    fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }
}

/// Stores an upload; I/O failures surface as `failure`
async fn store_media(state: &AppState, upload: MediaUpload, failure: &str) -> ApiResult<String> {
    state.media.store(upload).await.map_err(|e| match e {
        MediaError::Io(io) => {
            error!(error = %io, "Media upload failed");
            ApiError::UploadFailed(failure.to_string())
        }
        other => other.into(),
    })
}

/// `{ user }` payload
#[derive(Debug, Serialize)]
pub struct UserData {
    pub user: PublicAccount,
}

/// Register response, with `user` at the top level
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub status_code: u16,
    pub user: PublicAccount,
    pub message: String,
    pub success: bool,
}

/// Login request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Login response, tokens at the top level next to `data`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub status_code: u16,
    pub data: PublicAccount,
    pub access_token: String,
    pub refresh_token: String,
    pub message: String,
    pub success: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

pub async fn banner() -> ApiResponse<Value> {
    ApiResponse::ok(json!({}), "Stream Hub Users route")
}

pub async fn register(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let mut form = Form::read(multipart).await?;

    let full_name = form.text("fullName");
    let email = form.text("email");
    let username = form.text("username");
    let password = form.text("password");

    if [&full_name, &email, &username, &password]
        .iter()
        .any(|field| field.trim().is_empty())
    {
        return Err(ApiError::BadRequest("All fields are required".to_string()));
    }

    // Reject bad input and duplicates before any blob is stored
    state.credentials.ensure_valid_email(&email)?;
    state.credentials.ensure_available(&username, &email).await?;

    let avatar = form
        .files
        .remove("avatar")
        .ok_or_else(|| ApiError::BadRequest("Avatar is required".to_string()))?;
    let avatar_url = store_media(&state, avatar, "Error uploading avatar").await?;

    let cover_image_url = match form.files.remove("coverImage") {
        Some(cover) => Some(store_media(&state, cover, "Error uploading cover image").await?),
        None => None,
    };

    let user = state
        .credentials
        .create_account(NewAccount {
            username,
            email,
            full_name,
            password,
            avatar_url,
            cover_image_url,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            status_code: StatusCode::CREATED.as_u16(),
            user,
            message: "User created successfully".to_string(),
            success: true,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(request): JsonBody<LoginRequest>,
) -> ApiResult<(CookieJar, Json<LoginResponse>)> {
    let identities: Vec<String> = [request.username, request.email]
        .into_iter()
        .flatten()
        .filter(|identity| !identity.trim().is_empty())
        .collect();

    if identities.is_empty() {
        return Err(ApiError::BadRequest("Username or email is required".to_string()));
    }

    let password = request
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Password is required".to_string()))?;

    let mut account = None;
    for identity in &identities {
        account = state.credentials.find_by_identity(identity).await?;
        if account.is_some() {
            break;
        }
    }
    let account = account.ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))?;

    if !state.credentials.verify_password(&account, &password).await? {
        info!(account_id = %account.id, "Login rejected: wrong password");
        return Err(ApiError::Unauthorized("Invalid user credentials".to_string()));
    }

    let pair = state.tokens.issue_pair(&account).await?;
    info!(account_id = %account.id, "User logged in");

    let jar = with_session_cookies(jar, &pair, state.config.api.cookie_secure);
    Ok((
        jar,
        Json(LoginResponse {
            status_code: StatusCode::OK.as_u16(),
            data: account.to_public(),
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            message: "User logged in successfully".to_string(),
            success: true,
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(Principal(account)): Extension<Principal>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, ApiResponse<Value>)> {
    state.tokens.revoke(account.id).await?;
    info!(account_id = %account.id, "User logged out");

    Ok((
        without_session_cookies(jar, state.config.api.cookie_secure),
        ApiResponse::ok(json!({}), "User logged out successfully"),
    ))
}

/// Exchanges a refresh token for a new pair
///
/// The cookie wins over the body field. An empty body is fine when the
/// cookie is present.
pub async fn refresh_access_token(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> ApiResult<(CookieJar, ApiResponse<TokenPair>)> {
    let from_cookie = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty());

    let presented = match from_cookie {
        Some(token) => token,
        None => {
            let request: RefreshRequest = if body.is_empty() {
                RefreshRequest::default()
            } else {
                serde_json::from_slice(&body)
                    .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))?
            };
            request
                .refresh_token
                .filter(|t| !t.is_empty())
                .ok_or_else(|| ApiError::Unauthorized("Unauthorized request".to_string()))?
        }
    };

    let pair = state.tokens.rotate(&presented).await?;

    let jar = with_session_cookies(jar, &pair, state.config.api.cookie_secure);
    Ok((jar, ApiResponse::ok(pair, "Access token refreshed")))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Extension(Principal(account)): Extension<Principal>,
    JsonBody(request): JsonBody<ResetPasswordRequest>,
) -> ApiResult<ApiResponse<Value>> {
    state
        .credentials
        .change_password(
            account.id,
            &request.old_password.unwrap_or_default(),
            &request.new_password.unwrap_or_default(),
        )
        .await?;

    Ok(ApiResponse::ok(json!({}), "Password changed successfully"))
}

pub async fn current_user(
    Extension(Principal(account)): Extension<Principal>,
) -> ApiResponse<UserData> {
    ApiResponse::ok(UserData { user: account }, "Current user fetched successfully")
}

pub async fn update_account(
    State(state): State<AppState>,
    Extension(Principal(account)): Extension<Principal>,
    JsonBody(update): JsonBody<ProfileUpdate>,
) -> ApiResult<ApiResponse<UserData>> {
    let user = state.credentials.update_profile(account.id, update).await?;
    Ok(ApiResponse::ok(UserData { user }, "Account details updated successfully"))
}

pub async fn update_avatar(
    State(state): State<AppState>,
    Extension(Principal(account)): Extension<Principal>,
    multipart: Multipart,
) -> ApiResult<ApiResponse<UserData>> {
    let mut form = Form::read(multipart).await?;
    let avatar = form
        .files
        .remove("avatar")
        .ok_or_else(|| ApiError::BadRequest("Avatar file is missing".to_string()))?;

    let url = store_media(&state, avatar, "Error uploading avatar").await?;
    let user = state.credentials.update_avatar(account.id, &url).await?;

    Ok(ApiResponse::ok(UserData { user }, "Avatar updated successfully"))
}

pub async fn update_cover_image(
    State(state): State<AppState>,
    Extension(Principal(account)): Extension<Principal>,
    multipart: Multipart,
) -> ApiResult<ApiResponse<UserData>> {
    let mut form = Form::read(multipart).await?;
    let cover = form
        .files
        .remove("coverImage")
        .ok_or_else(|| ApiError::BadRequest("Cover image file is missing".to_string()))?;

    let url = store_media(&state, cover, "Error uploading cover image").await?;
    let user = state.credentials.update_cover_image(account.id, &url).await?;

    Ok(ApiResponse::ok(UserData { user }, "Cover image updated successfully"))
}

pub async fn channel_profile(
    State(state): State<AppState>,
    Extension(Principal(account)): Extension<Principal>,
    Path(username): Path<String>,
) -> ApiResult<ApiResponse<ChannelProfile>> {
    let profile = state.profiles.channel_profile(&username, account.id).await?;
    Ok(ApiResponse::ok(profile, "User channel fetched successfully"))
}

pub async fn watch_history(
    State(state): State<AppState>,
    Extension(Principal(account)): Extension<Principal>,
) -> ApiResult<ApiResponse<Vec<WatchedVideo>>> {
    let history = state.profiles.watch_history(&account).await?;
    Ok(ApiResponse::ok(history, "Watch history fetched successfully"))
}
