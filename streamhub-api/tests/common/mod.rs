//! Common test utilities for integration tests
//!
//! - In-memory storage and a temporary media directory per test
//! - Request helpers driving the router with `oneshot`
//! - Multipart body builder
//! - Registration/login shortcuts

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::Value;
use streamhub_api::{
    app::{build_router, AppState, StorageBackend},
    config::Config,
};
use streamhub_shared::{media::DiskMediaStore, store::memory::InMemoryStore};
use tempfile::TempDir;
use tower::ServiceExt;

pub const BOUNDARY: &str = "streamhub-test-boundary";
pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake-image-bytes";

/// Test context containing all necessary resources
pub struct TestContext {
    pub app: Router,
    pub store: Arc<InMemoryStore>,
    pub config: Config,
    pub media_dir: TempDir,
}

/// Decoded response
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// `Set-Cookie` values keyed by cookie name
    pub fn cookies(&self) -> HashMap<String, String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|raw| {
                let pair = raw.split(';').next()?;
                let (name, value) = pair.split_once('=')?;
                Some((name.trim().to_string(), value.trim().to_string()))
            })
            .collect()
    }

    /// Full `Set-Cookie` header for `name`
    pub fn raw_cookie(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|raw| raw.starts_with(&format!("{}=", name)))
            .map(str::to_string)
    }
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_vars(&[])
    }

    /// Builds a context with extra configuration variables
    pub fn with_vars(extra: &[(&str, &str)]) -> Self {
        let media_dir = tempfile::tempdir().expect("create media dir");
        let media_root = media_dir.path().to_string_lossy().to_string();

        let mut vars: HashMap<String, String> = [
            ("ACCESS_TOKEN_SECRET", "test-access-secret-at-least-32-bytes!"),
            ("REFRESH_TOKEN_SECRET", "test-refresh-secret-at-least-32-bytes"),
            ("COOKIE_SECURE", "false"),
            ("MEDIA_BASE_URL", "/media"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        vars.insert("MEDIA_ROOT".to_string(), media_root);
        for (k, v) in extra {
            vars.insert(k.to_string(), v.to_string());
        }

        let config = Config::from_lookup(|key| vars.get(key).cloned()).expect("valid test config");

        let store = Arc::new(InMemoryStore::new());
        let media = Arc::new(DiskMediaStore::new(
            config.media.root.clone(),
            config.media.base_url.clone(),
        ));
        let state = AppState::new(config.clone(), store.clone(), StorageBackend::Memory, media);

        Self {
            app: build_router(state),
            store,
            config,
            media_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).to_string())
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, access_token: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = access_token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        access_token: Option<&str>,
        body: Value,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = access_token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    pub async fn multipart(
        &self,
        method: &str,
        uri: &str,
        access_token: Option<&str>,
        fields: &[(&str, &str)],
        files: &[(&str, &str, &[u8])],
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            );
        if let Some(token) = access_token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = multipart_body(fields, files);
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    /// Number of blobs written under the media root
    pub fn media_file_count(&self) -> usize {
        fn count(dir: &std::path::Path) -> usize {
            std::fs::read_dir(dir)
                .map(|entries| {
                    entries
                        .filter_map(Result::ok)
                        .map(|entry| {
                            let path = entry.path();
                            if path.is_dir() {
                                count(&path)
                            } else {
                                1
                            }
                        })
                        .sum()
                })
                .unwrap_or(0)
        }
        count(self.media_dir.path())
    }

    /// Registers an account with an avatar
    pub async fn register(&self, username: &str, email: &str, password: &str) -> TestResponse {
        self.multipart(
            "POST",
            "/api/v1/users/register",
            None,
            &[
                ("fullName", username),
                ("email", email),
                ("username", username),
                ("password", password),
            ],
            &[("avatar", "avatar.png", PNG)],
        )
        .await
    }

    pub async fn login(&self, username: &str, password: &str) -> TestResponse {
        self.json(
            "POST",
            "/api/v1/users/login",
            None,
            serde_json::json!({ "username": username, "password": password }),
        )
        .await
    }

    /// Registers and logs in, returning the login response
    pub async fn signed_in(&self, username: &str) -> TestResponse {
        let registered = self
            .register(username, &format!("{}@x.com", username), "p1")
            .await;
        assert_eq!(registered.status, StatusCode::CREATED, "{}", registered.body);

        let login = self.login(username, "p1").await;
        assert_eq!(login.status, StatusCode::OK, "{}", login.body);
        login
    }
}

/// Builds a `multipart/form-data` body using [`BOUNDARY`]
pub fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    for (name, file_name, data) in files {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                name, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}
