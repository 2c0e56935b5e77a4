//! Shared harness: the full router over the in-memory store, real Argon2
//! hashing, real JWTs and local media in a throwaway directory.

#![allow(dead_code)]

use std::sync::Arc;

use api_adapters::{router, AppState, Ports, RouterOptions};
use auth_adapters::{Argon2PasswordHasher, JwtCredentialService};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use domains::models::{Role, User};
use domains::ports::{PasswordHasher, UserRepo};
use serde_json::{json, Value};
use storage_adapters::media::LocalMediaStorage;
use storage_adapters::InMemoryStore;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &[u8] = b"integration-test-secret-0123456789";
pub const PASSWORD: &str = "secret1";
pub const MEDIA_PREFIX: &str = "/uploads";
/// Request body cap of the test router.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;
const BOUNDARY: &str = "civic-board-test-boundary";

/// A 1x1 PNG header; enough for format sniffing.
pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01\x08\x06\0\0\0";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub credentials: Arc<JwtCredentialService>,
    pub media_dir: TempDir,
}

/// A signed-up account and its bearer token.
pub struct Account {
    pub id: Uuid,
    pub token: String,
}

/// One part of a multipart body: `(name, file_name, content_type, bytes)`.
pub type Part<'a> = (&'a str, Option<&'a str>, Option<&'a str>, &'a [u8]);

pub struct Response {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let credentials = Arc::new(JwtCredentialService::new(
            JWT_SECRET,
            chrono::Duration::hours(1),
        ));
        let media_dir = TempDir::new().unwrap();

        let state = AppState::new(Ports {
            users: store.clone(),
            problems: store.clone(),
            solutions: store.clone(),
            comments: store.clone(),
            media: Arc::new(LocalMediaStorage::new(
                media_dir.path().to_path_buf(),
                MEDIA_PREFIX,
            )),
            hasher: Arc::new(Argon2PasswordHasher::new()),
            credentials: credentials.clone(),
        });

        let router = router(
            state,
            RouterOptions {
                max_body_bytes: MAX_BODY_BYTES,
                static_media: Some((MEDIA_PREFIX.to_string(), media_dir.path().to_path_buf())),
            },
        );

        Self {
            router,
            store,
            credentials,
            media_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        Response { status, body }
    }

    /// Sends a JSON request; `body` of `None` sends no body at all.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response {
        self.call(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Response {
        self.call(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> Response {
        self.call(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> Response {
        self.call(Method::DELETE, uri, token, None).await
    }

    /// Sends a `multipart/form-data` request built from `parts`.
    pub async fn multipart(
        &self,
        method: Method,
        uri: &str,
        token: &str,
        parts: &[Part<'_>],
    ) -> Response {
        let mut body = Vec::new();
        for (name, file_name, content_type, bytes) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            let disposition = match file_name {
                Some(file) => format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file}\"\r\n"
                ),
                None => format!("Content-Disposition: form-data; name=\"{name}\"\r\n"),
            };
            body.extend_from_slice(disposition.as_bytes());
            if let Some(ct) = content_type {
                body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
            }
            body.extend_from_slice(b"\r\n");
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    pub async fn signup(&self, username: &str) -> Account {
        let res = self
            .post(
                "/api/auth/signup",
                None,
                json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": PASSWORD,
                }),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "signup failed: {}", res.body);
        account(&res.body)
    }

    pub async fn login(&self, email: &str, password: &str) -> Response {
        self.post(
            "/api/auth/login",
            None,
            json!({ "email": email, "password": password }),
        )
        .await
    }

    /// Admins cannot sign up; they are written straight into the store.
    pub async fn admin(&self) -> Account {
        let hash = Argon2PasswordHasher::new().hash(PASSWORD).unwrap();
        self.store
            .create_user(User::new(
                "root".into(),
                "root@example.com".into(),
                hash,
                Role::Admin,
            ))
            .await
            .unwrap();
        let res = self.login("root@example.com", PASSWORD).await;
        assert_eq!(res.status, StatusCode::OK, "admin login failed: {}", res.body);
        account(&res.body)
    }

    pub async fn report(&self, token: &str, location: &str) -> Uuid {
        let res = self
            .post(
                "/api/problems",
                Some(token),
                json!({ "location": location, "description": "Needs attention" }),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "report failed: {}", res.body);
        id_of(&res.body)
    }

    pub async fn suggest(&self, token: &str, problem_id: Uuid, text: &str) -> Uuid {
        let res = self
            .post(
                &format!("/api/solutions/{problem_id}"),
                Some(token),
                json!({ "text": text }),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "suggest failed: {}", res.body);
        id_of(&res.body)
    }
}

fn account(body: &Value) -> Account {
    Account {
        id: id_of(&body["user"]),
        token: body["token"].as_str().unwrap().to_string(),
    }
}

pub fn id_of(body: &Value) -> Uuid {
    body["id"].as_str().unwrap().parse().unwrap()
}
