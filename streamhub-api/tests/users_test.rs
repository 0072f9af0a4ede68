/// Integration tests for the user endpoints
///
/// Every test builds its own router over in-memory storage and a temporary
/// media directory, then drives it request by request.

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::{Duration, Utc};
use common::{TestContext, PNG};
use serde_json::json;
use streamhub_shared::{
    auth::jwt::{create_token, AccessClaims},
    models::{account::Account, video::Video},
    store::AccountStore,
};
use uuid::Uuid;

fn id_of(body: &serde_json::Value) -> Uuid {
    Uuid::parse_str(body.as_str().expect("id string")).expect("valid uuid")
}

#[tokio::test]
async fn test_banner_and_health() {
    let ctx = TestContext::new();

    let banner = ctx.get("/api/v1/users", None).await;
    assert_eq!(banner.status, StatusCode::OK);
    assert_eq!(banner.body["message"], "Stream Hub Users route");
    assert_eq!(banner.body["success"], true);

    let health = ctx.get("/health", None).await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body["status"], "healthy");
    assert_eq!(health.body["storage"], "memory");
}

#[tokio::test]
async fn test_register_login_refresh_scenario() {
    let ctx = TestContext::new();

    let registered = ctx.register("Nova", "n@x.com", "p1").await;
    assert_eq!(registered.status, StatusCode::CREATED);
    assert_eq!(registered.body["statusCode"], 201);
    assert_eq!(registered.body["user"]["username"], "nova");
    assert_eq!(registered.body["message"], "User created successfully");
    assert!(registered.body["user"].get("passwordHash").is_none());
    assert!(registered.body["user"].get("refreshToken").is_none());

    let login = ctx.login("nova", "p1").await;
    assert_eq!(login.status, StatusCode::OK);
    assert_eq!(login.body["data"]["username"], "nova");

    let cookies = login.cookies();
    let access_token = login.body["accessToken"].as_str().unwrap().to_string();
    let refresh_token = login.body["refreshToken"].as_str().unwrap().to_string();
    assert_eq!(cookies.get("accessToken"), Some(&access_token));
    assert_eq!(cookies.get("refreshToken"), Some(&refresh_token));

    let refreshed = ctx
        .json(
            "POST",
            "/api/v1/users/refresh-access-token",
            None,
            json!({ "refreshToken": refresh_token }),
        )
        .await;
    assert_eq!(refreshed.status, StatusCode::OK);

    let new_access = refreshed.body["data"]["accessToken"].as_str().unwrap();
    let new_refresh = refreshed.body["data"]["refreshToken"].as_str().unwrap();
    assert_ne!(new_access, access_token);
    assert_ne!(new_refresh, refresh_token);
    assert_eq!(refreshed.cookies().get("accessToken").map(String::as_str), Some(new_access));
}

#[tokio::test]
async fn test_password_is_hashed_at_rest() {
    let ctx = TestContext::new();
    let registered = ctx.register("nova", "n@x.com", "p1").await;
    let id = id_of(&registered.body["user"]["id"]);

    let stored = ctx.store.find_by_id(id).await.unwrap().unwrap();
    assert_ne!(stored.password_hash, "p1");
    assert!(stored.password_hash.starts_with("$argon2id$"));
}

#[tokio::test]
async fn test_cookie_attributes() {
    let ctx = TestContext::with_vars(&[("COOKIE_SECURE", "true")]);
    let login = ctx.signed_in("nova").await;

    for name in ["accessToken", "refreshToken"] {
        let raw = login.raw_cookie(name).unwrap();
        assert!(raw.contains("HttpOnly"), "{}", raw);
        assert!(raw.contains("Secure"), "{}", raw);
        assert!(raw.contains("SameSite=Lax"), "{}", raw);
        assert!(raw.contains("Path=/"), "{}", raw);
    }
}

#[tokio::test]
async fn test_refresh_token_reuse_is_rejected() {
    let ctx = TestContext::new();
    let login = ctx.signed_in("nova").await;
    let old_refresh = login.body["refreshToken"].as_str().unwrap().to_string();

    // Refresh through the cookie this time
    let first = ctx
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users/refresh-access-token")
                .header(header::COOKIE, format!("refreshToken={}", old_refresh))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(first.status, StatusCode::OK);

    let reused = ctx
        .json(
            "POST",
            "/api/v1/users/refresh-access-token",
            None,
            json!({ "refreshToken": old_refresh }),
        )
        .await;
    assert_eq!(reused.status, StatusCode::UNAUTHORIZED);
    assert!(reused.body["message"].is_string());
    assert_eq!(reused.body.as_object().unwrap().len(), 1);
}

#[tokio::test]
async fn test_refresh_without_token() {
    let ctx = TestContext::new();

    let response = ctx
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users/refresh-access-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let garbage = ctx
        .json(
            "POST",
            "/api/v1/users/refresh-access-token",
            None,
            json!({ "refreshToken": "not-a-token" }),
        )
        .await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_revokes_refresh_token() {
    let ctx = TestContext::new();
    let login = ctx.signed_in("nova").await;
    let access = login.body["accessToken"].as_str().unwrap().to_string();
    let refresh = login.body["refreshToken"].as_str().unwrap().to_string();

    let logout = ctx
        .json("POST", "/api/v1/users/logout", Some(&access), json!({}))
        .await;
    assert_eq!(logout.status, StatusCode::OK);
    assert_eq!(logout.body["message"], "User logged out successfully");

    // The request carried no cookies, yet both are expired in the response
    let cleared = logout.cookies();
    assert_eq!(cleared.get("accessToken").map(String::as_str), Some(""));
    assert_eq!(cleared.get("refreshToken").map(String::as_str), Some(""));
    for name in ["accessToken", "refreshToken"] {
        let raw = logout.raw_cookie(name).unwrap();
        assert!(raw.contains("Max-Age=0"), "{}", raw);
        assert!(raw.contains("Path=/"), "{}", raw);
    }

    let id = id_of(&login.body["data"]["id"]);
    let stored = ctx.store.find_by_id(id).await.unwrap().unwrap();
    assert!(stored.refresh_token.is_none());

    let refreshed = ctx
        .json(
            "POST",
            "/api/v1/users/refresh-access-token",
            None,
            json!({ "refreshToken": refresh }),
        )
        .await;
    assert_eq!(refreshed.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_with_cookies_only() {
    let ctx = TestContext::new();
    let login = ctx.signed_in("nova").await;
    let cookies = login.cookies();

    let logout = ctx
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users/logout")
                .header(
                    header::COOKIE,
                    format!(
                        "accessToken={}; refreshToken={}",
                        cookies["accessToken"], cookies["refreshToken"]
                    ),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(logout.status, StatusCode::OK);

    let cleared = logout.cookies();
    assert_eq!(cleared.get("accessToken").map(String::as_str), Some(""));
    assert_eq!(cleared.get("refreshToken").map(String::as_str), Some(""));
}

#[tokio::test]
async fn test_registration_validation() {
    let ctx = TestContext::new();

    let missing_field = ctx
        .multipart(
            "POST",
            "/api/v1/users/register",
            None,
            &[("fullName", "Nova"), ("email", "n@x.com"), ("username", "nova")],
            &[("avatar", "a.png", PNG)],
        )
        .await;
    assert_eq!(missing_field.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing_field.body["message"], "All fields are required");

    let blank_field = ctx
        .multipart(
            "POST",
            "/api/v1/users/register",
            None,
            &[
                ("fullName", "   "),
                ("email", "n@x.com"),
                ("username", "nova"),
                ("password", "p1"),
            ],
            &[("avatar", "a.png", PNG)],
        )
        .await;
    assert_eq!(blank_field.status, StatusCode::BAD_REQUEST);

    let missing_avatar = ctx
        .multipart(
            "POST",
            "/api/v1/users/register",
            None,
            &[
                ("fullName", "Nova"),
                ("email", "n@x.com"),
                ("username", "nova"),
                ("password", "p1"),
            ],
            &[],
        )
        .await;
    assert_eq!(missing_avatar.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing_avatar.body["message"], "Avatar is required");

    let bad_email = ctx.register("nova", "not-an-email", "p1").await;
    assert_eq!(bad_email.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_email.body["message"], "Invalid email format");

    assert_eq!(ctx.media_file_count(), 0);
}

#[tokio::test]
async fn test_rejected_registration_stores_no_avatar() {
    let ctx = TestContext::new();
    ctx.register("nova", "n@x.com", "p1").await;
    assert_eq!(ctx.media_file_count(), 1);

    let conflict = ctx
        .multipart(
            "POST",
            "/api/v1/users/register",
            None,
            &[
                ("fullName", "Other"),
                ("email", "other@x.com"),
                ("username", "NOVA"),
                ("password", "p1"),
            ],
            &[("avatar", "other.png", b"different-avatar-bytes")],
        )
        .await;
    assert_eq!(conflict.status, StatusCode::CONFLICT);
    assert_eq!(ctx.media_file_count(), 1);
}

#[tokio::test]
async fn test_duplicate_registration_is_case_insensitive() {
    let ctx = TestContext::new();
    assert_eq!(
        ctx.register("nova", "n@x.com", "p1").await.status,
        StatusCode::CREATED
    );

    let same_username = ctx.register("NOVA", "other@x.com", "p1").await;
    assert_eq!(same_username.status, StatusCode::CONFLICT);

    let same_email = ctx.register("other", "N@X.COM", "p1").await;
    assert_eq!(same_email.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_login_errors() {
    let ctx = TestContext::new();
    ctx.register("nova", "n@x.com", "p1").await;

    let unknown = ctx.login("ghost", "p1").await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown.body["message"], "User does not exist");

    let wrong = ctx.login("nova", "p2").await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["message"], "Invalid user credentials");

    let no_identity = ctx
        .json("POST", "/api/v1/users/login", None, json!({ "password": "p1" }))
        .await;
    assert_eq!(no_identity.status, StatusCode::BAD_REQUEST);

    let by_email = ctx
        .json(
            "POST",
            "/api/v1/users/login",
            None,
            json!({ "email": "N@x.com", "password": "p1" }),
        )
        .await;
    assert_eq!(by_email.status, StatusCode::OK);

    let malformed = ctx
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
    assert!(malformed.body["message"].is_string());
}

#[tokio::test]
async fn test_session_required() {
    let ctx = TestContext::new();

    let missing = ctx.get("/api/v1/users/current-user", None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.body["message"], "Access denied. Please log in.");

    let invalid = ctx.get("/api/v1/users/current-user", Some("garbage")).await;
    assert_eq!(invalid.status, StatusCode::FORBIDDEN);

    let login = ctx.signed_in("nova").await;
    let refresh = login.body["refreshToken"].as_str().unwrap();
    let wrong_kind = ctx.get("/api/v1/users/current-user", Some(refresh)).await;
    assert_eq!(wrong_kind.status, StatusCode::FORBIDDEN);

    // Valid signature and expiry, but the account does not exist
    let now = Utc::now();
    let ghost = Account {
        id: Uuid::new_v4(),
        username: "ghost".to_string(),
        email: "ghost@x.com".to_string(),
        full_name: "Ghost".to_string(),
        password_hash: String::new(),
        avatar_url: "/media/g.png".to_string(),
        cover_image_url: None,
        watch_history: Vec::new(),
        refresh_token: None,
        created_at: now,
        updated_at: now,
    };
    let token = create_token(
        &AccessClaims::new(&ghost, Duration::minutes(15)),
        &ctx.config.tokens.access_secret,
    )
    .unwrap();
    let unknown = ctx.get("/api/v1/users/current-user", Some(&token)).await;
    assert_eq!(unknown.status, StatusCode::FORBIDDEN);
    assert_eq!(unknown.body["message"], "Invalid token. Please log in again.");
}

#[tokio::test]
async fn test_current_user_via_cookie() {
    let ctx = TestContext::new();
    let login = ctx.signed_in("nova").await;
    let access = login.cookies().get("accessToken").cloned().unwrap();

    let response = ctx
        .send(
            Request::builder()
                .uri("/api/v1/users/current-user")
                .header(header::COOKIE, format!("accessToken={}", access))
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["user"]["username"], "nova");
    assert!(response.body["data"]["user"].get("passwordHash").is_none());
}

#[tokio::test]
async fn test_reset_password() {
    let ctx = TestContext::new();
    let login = ctx.signed_in("nova").await;
    let access = login.body["accessToken"].as_str().unwrap().to_string();

    let wrong = ctx
        .json(
            "POST",
            "/api/v1/users/reset-password",
            Some(&access),
            json!({ "oldPassword": "nope", "newPassword": "p2" }),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong.body["message"], "Invalid old password");

    let missing = ctx
        .json(
            "POST",
            "/api/v1/users/reset-password",
            Some(&access),
            json!({ "oldPassword": "p1" }),
        )
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let changed = ctx
        .json(
            "POST",
            "/api/v1/users/reset-password",
            Some(&access),
            json!({ "oldPassword": "p1", "newPassword": "p2" }),
        )
        .await;
    assert_eq!(changed.status, StatusCode::OK);

    assert_eq!(ctx.login("nova", "p1").await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(ctx.login("nova", "p2").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_update_account() {
    let ctx = TestContext::new();
    ctx.register("taken", "taken@x.com", "p1").await;
    let login = ctx.signed_in("nova").await;
    let access = login.body["accessToken"].as_str().unwrap().to_string();

    let empty = ctx
        .json("PATCH", "/api/v1/users/update-account", Some(&access), json!({}))
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);

    let duplicate = ctx
        .json(
            "PATCH",
            "/api/v1/users/update-account",
            Some(&access),
            json!({ "email": "TAKEN@x.com" }),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let updated = ctx
        .json(
            "PATCH",
            "/api/v1/users/update-account",
            Some(&access),
            json!({ "fullName": "Nova Prime", "email": "Prime@x.com" }),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["data"]["user"]["fullName"], "Nova Prime");
    assert_eq!(updated.body["data"]["user"]["email"], "prime@x.com");

    // The middleware reloads the account, so the same token sees the edit
    let current = ctx.get("/api/v1/users/current-user", Some(&access)).await;
    assert_eq!(current.body["data"]["user"]["fullName"], "Nova Prime");
}

#[tokio::test]
async fn test_update_avatar_and_cover_image() {
    let ctx = TestContext::new();
    let login = ctx.signed_in("nova").await;
    let access = login.body["accessToken"].as_str().unwrap().to_string();
    let old_avatar = login.body["data"]["avatarUrl"].as_str().unwrap().to_string();

    let missing = ctx
        .multipart("PATCH", "/api/v1/users/update-avatar", Some(&access), &[], &[])
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let avatar = ctx
        .multipart(
            "PATCH",
            "/api/v1/users/update-avatar",
            Some(&access),
            &[],
            &[("avatar", "new.jpg", b"new-avatar-bytes")],
        )
        .await;
    assert_eq!(avatar.status, StatusCode::OK);
    let avatar_url = avatar.body["data"]["user"]["avatarUrl"].as_str().unwrap().to_string();
    assert_ne!(avatar_url, old_avatar);
    assert!(avatar_url.starts_with("/media/"));
    assert!(avatar_url.ends_with(".jpg"));

    let served = ctx.get(&avatar_url, None).await;
    assert_eq!(served.status, StatusCode::OK);

    let cover = ctx
        .multipart(
            "PATCH",
            "/api/v1/users/update-cover-image",
            Some(&access),
            &[],
            &[("coverImage", "cover.png", b"cover-bytes")],
        )
        .await;
    assert_eq!(cover.status, StatusCode::OK);
    assert!(cover.body["data"]["user"]["coverImageUrl"]
        .as_str()
        .unwrap()
        .ends_with(".png"));
}

#[tokio::test]
async fn test_channel_profile() {
    let ctx = TestContext::new();
    let a = ctx.signed_in("alpha").await;
    let b = ctx.signed_in("bravo").await;
    let c = ctx.signed_in("charlie").await;
    let d = ctx.signed_in("delta").await;

    let a_id = id_of(&a.body["data"]["id"]);
    ctx.store.subscribe(id_of(&b.body["data"]["id"]), a_id).await;
    ctx.store.subscribe(id_of(&c.body["data"]["id"]), a_id).await;

    let b_token = b.body["accessToken"].as_str().unwrap();
    let seen_by_b = ctx.get("/api/v1/users/c/Alpha", Some(b_token)).await;
    assert_eq!(seen_by_b.status, StatusCode::OK);

    let profile = &seen_by_b.body["data"];
    assert_eq!(profile["username"], "alpha");
    assert_eq!(profile["subscribersCount"], 2);
    assert_eq!(profile["channelsSubscribedToCount"], 0);
    assert_eq!(profile["isSubscribed"], true);
    assert_eq!(profile.as_object().unwrap().len(), 8);

    let d_token = d.body["accessToken"].as_str().unwrap();
    let seen_by_d = ctx.get("/api/v1/users/c/alpha", Some(d_token)).await;
    assert_eq!(seen_by_d.body["data"]["isSubscribed"], false);

    let blank = ctx.get("/api/v1/users/c/%20", Some(d_token)).await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);
    assert_eq!(blank.body["message"], "Username is missing");

    let unknown = ctx.get("/api/v1/users/c/ghost", Some(d_token)).await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown.body["message"], "Channel does not exist");
}

#[tokio::test]
async fn test_watch_history() {
    let ctx = TestContext::new();
    let owner = ctx.signed_in("owner").await;
    let viewer = ctx.signed_in("viewer").await;

    let now = Utc::now();
    let video = Video {
        id: Uuid::new_v4(),
        video_file: "/media/v.mp4".to_string(),
        thumbnail: "/media/v.jpg".to_string(),
        title: "First upload".to_string(),
        description: "hello".to_string(),
        duration: 42.0,
        views: 7,
        is_published: true,
        owner: id_of(&owner.body["data"]["id"]),
        created_at: now,
        updated_at: now,
    };
    ctx.store.insert_video(video.clone()).await;
    ctx.store
        .append_watch_history(id_of(&viewer.body["data"]["id"]), video.id)
        .await
        .unwrap();

    let token = viewer.body["accessToken"].as_str().unwrap();
    let history = ctx.get("/api/v1/users/history", Some(token)).await;
    assert_eq!(history.status, StatusCode::OK);

    let entries = history.body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["title"], "First upload");

    let embedded = &entries[0]["owner"];
    assert!(embedded.is_object());
    assert_eq!(embedded["username"], "owner");
    assert_eq!(embedded["fullName"], owner.body["data"]["fullName"]);
    assert_eq!(embedded["avatarUrl"], owner.body["data"]["avatarUrl"]);
    assert_eq!(embedded.as_object().unwrap().len(), 3);
}
