//! Authentication endpoints
//!
//! - GET/POST /register - Create an account
//! - GET/POST /login - Log in, optionally returning to `next`
//! - GET /logout - End the current session

use axum::{
    extract::{Query, State},
    http::{header, HeaderValue},
    response::Response,
    routing::get,
    Form, Router,
};
use serde::Deserialize;
use tera::Context as TeraContext;

use crate::api::flash::Flash;
use crate::api::middleware::{AppError, AppState, MaybeUser, SessionToken};
use crate::api::view::{is_local_path, render_page};
use crate::services::{LoginInput, RegisterInput, UserServiceError};

/// Where to go after login when no usable `next` was given
const DEFAULT_LANDING: &str = "/home";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub login: String,
    pub password: String,
    pub password2: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub login: String,
    pub password: String,
    pub next: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NextQuery {
    pub next: String,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/register", get(register_form).post(register))
        .route("/login", get(login_form).post(login))
}

pub fn protected_router() -> Router<AppState> {
    Router::new().route("/logout", get(logout))
}

async fn register_form(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    flash: Flash,
) -> Result<Response, AppError> {
    render_page(&state, "register.html", TeraContext::new(), viewer.as_ref(), flash)
}

async fn register(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    mut flash: Flash,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    let input = RegisterInput::new(form.login, form.password, form.password2);
    match state.user_service.register(input).await {
        Ok(_) => {
            flash.success("Registration complete, please log in");
            Ok(flash.redirect("/login"))
        }
        Err(UserServiceError::InternalError(e)) => Err(AppError::Internal(e)),
        Err(e) => {
            flash.error(e.to_string());
            render_page(&state, "register.html", TeraContext::new(), viewer.as_ref(), flash)
        }
    }
}

async fn login_form(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Query(query): Query<NextQuery>,
    flash: Flash,
) -> Result<Response, AppError> {
    render_login(&state, &query.next, viewer.as_ref(), flash)
}

async fn login(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    mut flash: Flash,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let input = LoginInput::new(form.login, form.password);
    let session = match state.user_service.login(input).await {
        Ok((_, session)) => session,
        Err(UserServiceError::InternalError(e)) => return Err(AppError::Internal(e)),
        Err(e) => {
            flash.error(e.to_string());
            return render_login(&state, &form.next, viewer.as_ref(), flash);
        }
    };

    let target = if is_local_path(&form.next) {
        form.next.as_str()
    } else {
        DEFAULT_LANDING
    };

    let mut response = flash.redirect(target);
    let cookie = HeaderValue::from_str(&state.cookies.set_header(&session.id))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid session cookie: {}", e)))?;
    response.headers_mut().append(header::SET_COOKIE, cookie);
    Ok(response)
}

fn render_login(
    state: &AppState,
    next: &str,
    viewer: Option<&crate::models::User>,
    flash: Flash,
) -> Result<Response, AppError> {
    let mut context = TeraContext::new();
    context.insert("next", next);
    render_page(state, "login.html", context, viewer, flash)
}

async fn logout(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
    flash: Flash,
) -> Result<Response, AppError> {
    state.user_service.logout(&token).await?;

    let mut response = flash.redirect("/login");
    if let Ok(value) = HeaderValue::from_str(&state.cookies.clear_header()) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    Ok(response)
}
