//! HTTP API router.
//!
//! Public routes: `/health`, `/register`, `/login`.
//! Protected routes: `/patients`, `/patients/:id` (bearer token required).
//!
//! Middleware stack (outermost → innermost):
//! CORS → request logging → Extension(ApiContext) → auth (protected only)
//!
//! Auth is a route layer, so unknown paths fall through to a plain 404.

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the API router.
///
/// Middleware reads `Extension<ApiContext>` (injected outside the auth
/// layer). Handlers use `State<ApiContext>` (provided via `with_state`).
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn api_router(ctx: ApiContext) -> Router {
    let protected = Router::new()
        .route(
            "/patients",
            post(endpoints::patients::create).get(endpoints::patients::search),
        )
        .route("/patients/:id", put(endpoints::patients::update))
        .with_state(ctx.clone())
        .route_layer(axum::middleware::from_fn(middleware::auth::require_auth))
        .route_layer(axum::Extension(ctx.clone()));

    let public = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/register", post(endpoints::auth::register))
        .route("/login", post(endpoints::auth::login))
        .with_state(ctx);

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(axum::middleware::from_fn(middleware::logging::log_request))
        .layer(CorsLayer::permissive())
}
