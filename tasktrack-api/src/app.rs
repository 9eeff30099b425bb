/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tasktrack_api::{app::{build_router, AppState}, config::Config};
/// use tasktrack_shared::store::MemoryStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(MemoryStore::new()), config);
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{access::access_gate_layer, security::SecurityHeadersLayer},
    routes,
};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, patch, post, put},
    Router,
};
use chrono::Duration;
use std::sync::Arc;
use tasktrack_shared::{
    auth::gate::AccessGate,
    lifecycle::Lifecycle,
    search::{Aggregator, StoreIndex},
    store::SharedStore,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Domain store
    pub store: SharedStore,

    /// Business rules over the store
    pub lifecycle: Lifecycle,

    /// Token issuing and request authorization
    pub gate: AccessGate,

    /// Project/task search
    pub search: Aggregator,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the domain services to one store using the configured policies
    pub fn new(store: SharedStore, config: Config) -> Self {
        let lifecycle =
            Lifecycle::new(store.clone()).with_transition_policy(config.domain.transitions);
        let gate = AccessGate::new(store.clone(), config.jwt.secret.clone())
            .with_token_ttl(Duration::hours(config.jwt.expiration_hours));
        let search = Aggregator::new(Arc::new(StoreIndex::new(store.clone())))
            .with_max_results(config.search.max_results);

        Self {
            store,
            lifecycle,
            gate,
            search,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health                          (public)
/// ├── POST /users/register                  (public)
/// ├── POST /users/login                     (public)
/// ├── /users                 GET POST        (admin)
/// ├── /users/roles           GET             (admin)
/// ├── /users/me              GET
/// ├── /users/:id             PUT DELETE      (admin)
/// ├── /projects              GET POST
/// ├── /projects/:id          GET PATCH DELETE
/// ├── /projects/:id/tasks    GET
/// ├── /projects/:id/members  GET
/// ├── /projects/:id/members/:user_id   POST DELETE
/// ├── /tasks                 GET POST
/// ├── /tasks/:id             GET PATCH DELETE
/// ├── /tasks/:id/subtasks    GET POST
/// ├── /tasks/:id/subtasks/:subtask_id  GET PATCH DELETE
/// ├── /tasks/:id/comments    GET POST
/// ├── /notifications         GET POST
/// ├── /notifications/:id/read          PATCH
/// └── /search                GET
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Access gate (protected routes only)
pub fn build_router(state: AppState) -> Router {
    // Public, no token
    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/users/register", post(routes::users::register))
        .route("/users/login", post(routes::users::login));

    // Every route here must have an `Operation` entry
    let protected_routes = Router::new()
        .route(
            "/users",
            get(routes::users::list_users).post(routes::users::create_user),
        )
        .route("/users/roles", get(routes::users::list_roles))
        .route("/users/me", get(routes::users::current_user))
        .route(
            "/users/:id",
            put(routes::users::update_user).delete(routes::users::delete_user),
        )
        .route(
            "/projects",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route(
            "/projects/:id",
            get(routes::projects::get_project)
                .patch(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route("/projects/:id/tasks", get(routes::projects::list_project_tasks))
        .route("/projects/:id/members", get(routes::projects::list_members))
        .route(
            "/projects/:id/members/:user_id",
            post(routes::projects::add_member).delete(routes::projects::remove_member),
        )
        .route(
            "/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/tasks/:id",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route(
            "/tasks/:id/subtasks",
            get(routes::tasks::list_subtasks).post(routes::tasks::create_subtask),
        )
        .route(
            "/tasks/:id/subtasks/:subtask_id",
            get(routes::tasks::get_subtask)
                .patch(routes::tasks::update_subtask)
                .delete(routes::tasks::delete_subtask),
        )
        .route(
            "/tasks/:id/comments",
            get(routes::tasks::list_comments).post(routes::tasks::create_comment),
        )
        .route(
            "/notifications",
            get(routes::notifications::list_notifications)
                .post(routes::notifications::create_notification),
        )
        .route(
            "/notifications/:id/read",
            patch(routes::notifications::mark_read),
        )
        .route("/search", get(routes::search::search))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            access_gate_layer,
        ));

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}
