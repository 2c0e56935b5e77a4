//! Router creation and configuration.

use std::path::PathBuf;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method, StatusCode},
    middleware::map_response,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::handlers::{self, admin, auth, problems, solutions, users};
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct RouterOptions {
    /// Largest accepted request body, uploads included.
    pub max_body_bytes: usize,
    /// `(url_prefix, directory)` to serve locally stored uploads from.
    pub static_media: Option<(String, PathBuf)>,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            max_body_bytes: 10 * 1024 * 1024,
            static_media: None,
        }
    }
}

fn cors_policy() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/problems", get(problems::list).post(problems::create))
        .route("/problems/my", get(problems::list_mine))
        .route(
            "/problems/{id}",
            get(problems::get)
                .put(problems::update)
                .delete(problems::delete),
        )
        .route("/problems/{id}/upvote", post(problems::upvote))
        .route("/problems/{id}/downvote", post(problems::downvote))
        .route("/problems/{id}/comment", post(problems::comment))
        .route(
            "/solutions/{id}",
            get(solutions::list_for_problem)
                .post(solutions::suggest)
                .put(solutions::update)
                .delete(solutions::delete),
        )
        .route("/solutions/{id}/upvote", post(solutions::upvote))
        .route("/solutions/{id}/downvote", post(solutions::downvote))
        .route("/solutions/{id}/comment", post(solutions::comment))
        .route(
            "/users/profile",
            get(users::profile).put(users::update_profile),
        )
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/{id}", get(admin::get_user))
        .route("/admin/users/{id}/ban", put(admin::ban_user))
        .route("/admin/problems/{id}", axum::routing::delete(admin::delete_problem))
        .route("/admin/solutions/{id}", axum::routing::delete(admin::delete_solution))
}

/// Rewrites every 413, including the plain-text one from
/// `RequestBodyLimitLayer`, into the API's JSON error shape.
async fn body_limit_as_json(response: Response) -> Response {
    if response.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::payload_too_large().into_response();
    }
    response
}

/// The complete HTTP surface.
pub fn router(state: AppState, options: RouterOptions) -> Router {
    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .route("/test", get(handlers::health))
        .nest("/api", api_routes());

    if let Some((prefix, dir)) = options.static_media {
        app = app.nest_service(&prefix, ServeDir::new(dir));
    }

    app.with_state(state)
        .layer(DefaultBodyLimit::max(options.max_body_bytes))
        .layer(RequestBodyLimitLayer::new(options.max_body_bytes))
        .layer(map_response(body_limit_as_json))
        .layer(cors_policy())
        .layer(TraceLayer::new_for_http())
}
