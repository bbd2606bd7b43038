//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The HTTP error type and its branded error page
//! - Session resolution and the login gate
//! - Request extractors for the current user and record ids

use axum::{
    extract::{FromRequestParts, Path, Request, State},
    http::{header, request::Parts, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tera::Context as TeraContext;

use crate::api::cookies::SessionCookie;
use crate::api::view::see_other;
use crate::config::Config;
use crate::db::repositories::{
    SqlxArticleRepository, SqlxItemRepository, SqlxSessionRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::User;
use crate::services::{
    ArticleService, ArticleServiceError, CheckoutError, CheckoutService, ItemService,
    ItemServiceError, PaymentGateway, UserService, UserServiceError,
};
use crate::theme::ThemeEngine;

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub item_service: Arc<ItemService>,
    pub article_service: Arc<ArticleService>,
    pub user_service: Arc<UserService>,
    pub checkout_service: Arc<CheckoutService>,
    pub theme: Arc<ThemeEngine>,
    pub cookies: Arc<SessionCookie>,
}

impl AppState {
    /// Wire repositories and services on top of an open pool
    pub fn new(
        pool: DynDatabasePool,
        theme: ThemeEngine,
        gateway: Arc<dyn PaymentGateway>,
        config: &Config,
    ) -> Self {
        let user_service = UserService::with_session_ttl(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            config.session.ttl_hours,
        );

        Self {
            item_service: Arc::new(ItemService::new(SqlxItemRepository::boxed(pool.clone()))),
            article_service: Arc::new(ArticleService::new(SqlxArticleRepository::boxed(pool))),
            user_service: Arc::new(user_service),
            checkout_service: Arc::new(CheckoutService::new(
                gateway,
                config.payment.currency.clone(),
            )),
            theme: Arc::new(theme),
            cookies: Arc::new(SessionCookie::from_config(config)),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors a handler can end with.
///
/// Form validation problems are not errors here; handlers flash them and
/// re-render the form.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Gateway(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found() -> Self {
        Self::NotFound("The page you are looking for does not exist".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Gateway(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Marks a response as an error to be rendered with the error template
#[derive(Debug, Clone)]
pub struct ErrorPage {
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Internal(e) => {
                tracing::error!("Request failed: {:#}", e);
                "Something went wrong on our side".to_string()
            }
            Self::Gateway(msg) => {
                tracing::warn!("Payment gateway error: {}", msg);
                "The payment service is unavailable, please try again later".to_string()
            }
            other => other.to_string(),
        };

        let mut response = (status, message.clone()).into_response();
        response.extensions_mut().insert(ErrorPage { message });
        response
    }
}

impl From<ItemServiceError> for AppError {
    fn from(e: ItemServiceError) -> Self {
        match e {
            ItemServiceError::NotFound(_) => Self::not_found(),
            ItemServiceError::ValidationError(msg) => Self::Validation(msg),
            ItemServiceError::InternalError(e) => Self::Internal(e),
        }
    }
}

impl From<ArticleServiceError> for AppError {
    fn from(e: ArticleServiceError) -> Self {
        match e {
            ArticleServiceError::NotFound(_) => Self::not_found(),
            ArticleServiceError::ValidationError(msg) => Self::Validation(msg),
            ArticleServiceError::InternalError(e) => Self::Internal(e),
        }
    }
}

impl From<UserServiceError> for AppError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::NotFound(_) => Self::not_found(),
            UserServiceError::AuthenticationError(_) => Self::Unauthorized,
            UserServiceError::ValidationError(msg) | UserServiceError::UserExists(msg) => {
                Self::Validation(msg)
            }
            UserServiceError::InternalError(e) => Self::Internal(e),
        }
    }
}

impl From<CheckoutError> for AppError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::ValidationError(msg) => Self::Validation(msg),
            CheckoutError::Gateway(msg) => Self::Gateway(msg),
            CheckoutError::InternalError(e) => Self::Internal(e),
        }
    }
}

// ============================================================================
// Extractors
// ============================================================================

/// Logged-in user; rejects with 401 when there is none
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// Logged-in user, if any
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

/// Verified session token from the cookie
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

/// Numeric record id from the path; anything else is a 404
#[derive(Debug, Clone, Copy)]
pub struct RecordId(pub i64);

impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts.extensions.get::<AuthenticatedUser>().map(|u| u.0.clone()),
        ))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for SessionToken {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionToken>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RecordId {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<i64>::from_request_parts(parts, state)
            .await
            .map(|Path(id)| RecordId(id))
            .map_err(|_| AppError::not_found())
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Resolve the session cookie into the current user.
///
/// Inserts `AuthenticatedUser` and `SessionToken` extensions when the cookie
/// names a live session. A cookie that no longer resolves is cleared.
pub async fn resolve_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let mut stale_cookie = false;

    if let Some(token) = state.cookies.token_from(request.headers()) {
        match state.user_service.validate_session(&token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(AuthenticatedUser(user));
                request.extensions_mut().insert(SessionToken(token));
            }
            Ok(None) => stale_cookie = true,
            Err(e) => tracing::error!("Session lookup failed: {}", e),
        }
    }

    let mut response = next.run(request).await;
    let prefix = format!("{}=", state.cookies.name());
    let replaced = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .any(|v| v.as_bytes().starts_with(prefix.as_bytes()));
    if stale_cookie && !replaced {
        if let Ok(value) = HeaderValue::from_str(&state.cookies.clear_header()) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}

/// Login gate for route groups
pub async fn require_auth(request: Request, next: Next) -> Result<Response, AppError> {
    if request.extensions().get::<AuthenticatedUser>().is_none() {
        return Err(AppError::Unauthorized);
    }
    Ok(next.run(request).await)
}

/// Post-process error responses.
///
/// 401 becomes a redirect to the login page that remembers where the user was
/// headed; other responses marked with `ErrorPage` are rendered with
/// `error.html`.
pub async fn render_errors(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    let viewer = request
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|u| u.0.login.clone());

    let response = next.run(request).await;

    if response.status() == StatusCode::UNAUTHORIZED {
        return see_other(&login_redirect(&target));
    }

    let Some(page) = response.extensions().get::<ErrorPage>().cloned() else {
        return response;
    };

    let status = response.status();
    let mut context = TeraContext::new();
    context.insert("status", &status.as_u16());
    context.insert("reason", status.canonical_reason().unwrap_or("Error"));
    context.insert("message", &page.message);
    context.insert("current_user", &viewer);
    context.insert("messages", &Vec::<crate::api::flash::FlashMessage>::new());

    let html = state.theme.render_or_plain("error.html", &context, &page.message);
    (status, axum::response::Html(html)).into_response()
}

/// Login URL that returns to `target` afterwards
pub fn login_redirect(target: &str) -> String {
    format!("/login?next={}", urlencoding::encode(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[test]
    fn test_error_statuses() {
        assert_eq!(AppError::not_found().status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Gateway("down".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_response_carries_error_page() {
        let response = AppError::not_found().into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.extensions().get::<ErrorPage>().is_some());
    }

    #[test]
    fn test_internal_error_message_is_generic() {
        let response = AppError::Internal(anyhow::anyhow!("db password leaked")).into_response();
        let page = response.extensions().get::<ErrorPage>().unwrap();
        assert!(!page.message.contains("password"));
    }

    #[test]
    fn test_service_errors_map_to_app_errors() {
        assert!(matches!(
            AppError::from(ItemServiceError::NotFound(3)),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(ArticleServiceError::NotFound(3)),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(UserServiceError::NotFound(3)),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(CheckoutError::Gateway("refused".into())),
            AppError::Gateway(_)
        ));
        assert!(matches!(
            AppError::from(CheckoutError::ValidationError("too big".into())),
            AppError::Validation(_)
        ));
    }

    #[test]
    fn test_login_redirect_encodes_target() {
        assert_eq!(login_redirect("/home"), "/login?next=%2Fhome");
        assert_eq!(
            login_redirect("/posts/1/update?x=1&y=2"),
            "/login?next=%2Fposts%2F1%2Fupdate%3Fx%3D1%26y%3D2"
        );
    }

    #[tokio::test]
    async fn test_record_id_rejects_non_numeric() {
        let app = axum::Router::new().route(
            "/things/{id}",
            axum::routing::get(|RecordId(id): RecordId| async move { id.to_string() }),
        );

        let ok = app
            .clone()
            .oneshot(Request::builder().uri("/things/42").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);

        let bad = app
            .oneshot(Request::builder().uri("/things/abc").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(bad.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_authenticated_user_rejects_without_session() {
        let app = axum::Router::new().route(
            "/me",
            axum::routing::get(|AuthenticatedUser(user): AuthenticatedUser| async move {
                user.login
            }),
        );

        let response = app
            .oneshot(Request::builder().uri("/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
