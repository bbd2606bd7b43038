//! Page rendering helpers

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
};
use tera::Context as TeraContext;

use crate::api::flash::Flash;
use crate::api::middleware::{AppError, AppState};
use crate::models::User;

/// Render a page template with the shared layout variables.
///
/// Adds `current_user` and `messages` to `context` and consumes the flash.
pub fn render_page(
    state: &AppState,
    template: &str,
    mut context: TeraContext,
    viewer: Option<&User>,
    flash: Flash,
) -> Result<Response, AppError> {
    let (messages, clear_flash) = flash.drain();
    context.insert("current_user", &viewer.map(|u| u.login.as_str()));
    context.insert("messages", &messages);

    let html = state
        .theme
        .render(template, &context)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to render {}: {}", template, e)))?;

    let mut response = Html(html).into_response();
    if let Some(value) = clear_flash {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    Ok(response)
}

/// 303 redirect that tolerates any location string.
///
/// Locations that are not valid header values fall back to `/`.
pub fn see_other(location: &str) -> Response {
    let value = HeaderValue::from_str(location).unwrap_or_else(|_| HeaderValue::from_static("/"));
    (StatusCode::SEE_OTHER, [(header::LOCATION, value)]).into_response()
}

/// Whether `target` is a path on this site.
///
/// Only these are followed after login.
pub fn is_local_path(target: &str) -> bool {
    target.starts_with('/')
        && !target.starts_with("//")
        && !target
            .chars()
            .any(|c| c == '\\' || c.is_control() || c.is_whitespace())
}
