//! Static pages and the not-found fallback

use axum::{extract::State, response::Response, routing::get, Router};
use tera::Context as TeraContext;

use crate::api::flash::Flash;
use crate::api::middleware::{AppError, AppState, MaybeUser};
use crate::api::view::render_page;

pub fn public_router() -> Router<AppState> {
    Router::new().route("/about", get(about))
}

async fn about(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    flash: Flash,
) -> Result<Response, AppError> {
    render_page(&state, "about.html", TeraContext::new(), viewer.as_ref(), flash)
}

/// Any unmatched route
pub async fn not_found() -> AppError {
    AppError::not_found()
}
