/// Common test utilities for integration tests
///
/// This module provides shared infrastructure for integration tests:
/// - An in-memory store behind the full router
/// - Seeded admin and regular users with tokens
/// - Request helpers returning status and JSON body

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tasktrack_api::app::{build_router, AppState};
use tasktrack_api::config::Config;
use tasktrack_shared::lifecycle::NewUser;
use tasktrack_shared::models::role::Role;
use tasktrack_shared::models::user::User;
use tasktrack_shared::store::{MemoryStore, SharedStore};
use tower::ServiceExt;

pub const PASSWORD: &str = "password123";

/// Test context containing all necessary resources
pub struct TestContext {
    pub state: AppState,
    pub app: axum::Router,
    pub store: SharedStore,
    pub admin: User,
    pub admin_token: String,
    pub user: User,
    pub user_token: String,
}

/// Configuration as the environment would provide it
pub fn test_config(extra: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = HashMap::from([(
        "JWT_SECRET".to_string(),
        "test-secret-key-at-least-32-bytes-long".to_string(),
    )]);
    for (key, value) in extra {
        vars.insert(key.to_string(), value.to_string());
    }

    Config::from_lookup(|key| vars.get(key).cloned()).expect("valid test config")
}

impl TestContext {
    pub async fn new() -> anyhow::Result<Self> {
        Self::with_config(test_config(&[])).await
    }

    /// Creates a context with a fresh in-memory store
    pub async fn with_config(config: Config) -> anyhow::Result<Self> {
        let store: SharedStore = Arc::new(MemoryStore::with_deletion_policy(
            config.domain.deletion,
        ));
        let state = AppState::new(store.clone(), config);

        let admin = state
            .lifecycle
            .create_user(NewUser {
                name: "Admin".to_string(),
                email: "admin@example.com".to_string(),
                password: PASSWORD.to_string(),
                role: Role::Admin,
                timezone: None,
                language: None,
            })
            .await?;
        let user = state
            .lifecycle
            .create_user(NewUser {
                name: "Regular User".to_string(),
                email: "user@example.com".to_string(),
                password: PASSWORD.to_string(),
                role: Role::User,
                timezone: None,
                language: None,
            })
            .await?;

        let admin_token = state.gate.issue_token(admin.id)?;
        let user_token = state.gate.issue_token(user.id)?;
        let app = build_router(state.clone());

        Ok(TestContext {
            state,
            app,
            store,
            admin,
            admin_token,
            user,
            user_token,
        })
    }

    /// Sends a request and returns the status with the parsed JSON body
    /// (`Value::Null` for an empty body)
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send_request(request).await
    }

    pub async fn send_request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                panic!("non-JSON body ({}): {}", status, String::from_utf8_lossy(&bytes))
            })
        };

        (status, json)
    }

    /// Shorthand for a request as the regular user
    pub async fn as_user(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send(method, uri, Some(&self.user_token), body).await
    }

    /// Shorthand for a request as the admin
    pub async fn as_admin(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send(method, uri, Some(&self.admin_token), body).await
    }
}

/// Creates a project through the API and returns its JSON
pub async fn create_project(ctx: &TestContext, name: &str, description: &str) -> Value {
    let (status, body) = ctx
        .as_user(
            "POST",
            "/projects",
            Some(serde_json::json!({
                "name": name,
                "description": description,
                "start_date": "2024-01-01",
                "end_date": "2024-12-31"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "create project failed: {}", body);
    body
}

/// Creates a task in `project_id` through the API and returns its JSON
pub async fn create_task(ctx: &TestContext, project_id: &str, title: &str) -> Value {
    let (status, body) = ctx
        .as_user(
            "POST",
            "/tasks",
            Some(serde_json::json!({
                "title": title,
                "description": "",
                "project_id": project_id
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "create task failed: {}", body);
    body
}
