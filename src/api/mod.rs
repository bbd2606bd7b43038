//! HTTP layer - handlers and routing
//!
//! Server-rendered pages for:
//! - The catalog and checkout
//! - The blog
//! - Registration, login and logout
//! - The admin panel

pub mod admin;
pub mod articles;
pub mod auth;
pub mod catalog;
pub mod cookies;
pub mod flash;
pub mod middleware;
pub mod pages;
pub mod view;


use axum::{middleware as axum_middleware, Router};
use tower_http::trace::TraceLayer;

pub use middleware::{AppError, AppState};

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    // Routes behind the login gate
    let protected_routes = Router::new()
        .merge(catalog::protected_router())
        .merge(articles::protected_router())
        .merge(auth::protected_router())
        .merge(admin::router())
        .route_layer(axum_middleware::from_fn(middleware::require_auth));

    Router::new()
        .merge(catalog::public_router())
        .merge(auth::public_router())
        .merge(pages::public_router())
        .merge(protected_routes)
        .fallback(pages::not_found)
        // Error pages need the session resolved first, so the session layer wraps them
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::render_errors,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::resolve_session,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
