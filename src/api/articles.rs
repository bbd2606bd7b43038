//! Blog endpoints
//!
//! - GET /posts - Articles, newest first
//! - GET /posts/{id} - Article detail
//! - GET/POST /create-article - Write an article
//! - GET/POST /posts/{id}/update - Edit an article
//! - GET /posts/{id}/delete - Delete an article

use axum::{extract::State, response::Response, routing::get, Form, Router};
use tera::Context as TeraContext;

use crate::api::flash::Flash;
use crate::api::middleware::{AppError, AppState, AuthenticatedUser, RecordId};
use crate::api::view::render_page;
use crate::models::ArticleInput;
use crate::services::ArticleServiceError;

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_articles))
        .route("/posts/{id}", get(show_article))
        .route("/posts/{id}/update", get(edit_article_form).post(update_article))
        .route("/posts/{id}/delete", get(delete_article))
        .route("/create-article", get(create_article_form).post(create_article))
}

async fn list_articles(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    flash: Flash,
) -> Result<Response, AppError> {
    let articles = state.article_service.list().await?;

    let mut context = TeraContext::new();
    context.insert("articles", &articles);
    render_page(&state, "posts.html", context, Some(&user), flash)
}

async fn show_article(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    RecordId(id): RecordId,
    flash: Flash,
) -> Result<Response, AppError> {
    let article = state.article_service.get(id).await?;

    let mut context = TeraContext::new();
    context.insert("article", &article);
    render_page(&state, "post.html", context, Some(&user), flash)
}

async fn create_article_form(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    flash: Flash,
) -> Result<Response, AppError> {
    let mut context = TeraContext::new();
    context.insert("form", &ArticleInput::default());
    render_page(&state, "create_article.html", context, Some(&user), flash)
}

async fn create_article(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    mut flash: Flash,
    Form(form): Form<ArticleInput>,
) -> Result<Response, AppError> {
    match state.article_service.create(&form).await {
        Ok(_) => {
            flash.success("Article created");
            Ok(flash.redirect("/posts"))
        }
        Err(ArticleServiceError::ValidationError(msg)) => {
            flash.error(msg);
            let mut context = TeraContext::new();
            context.insert("form", &form);
            render_page(&state, "create_article.html", context, Some(&user), flash)
        }
        Err(e) => Err(e.into()),
    }
}

async fn edit_article_form(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    RecordId(id): RecordId,
    flash: Flash,
) -> Result<Response, AppError> {
    let article = state.article_service.get(id).await?;
    render_edit_form(&state, id, &ArticleInput::from(&article), &user, flash)
}

async fn update_article(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    RecordId(id): RecordId,
    mut flash: Flash,
    Form(form): Form<ArticleInput>,
) -> Result<Response, AppError> {
    match state.article_service.update(id, &form).await {
        Ok(_) => {
            flash.success("Article updated");
            Ok(flash.redirect("/posts"))
        }
        Err(ArticleServiceError::ValidationError(msg)) => {
            flash.error(msg);
            render_edit_form(&state, id, &form, &user, flash)
        }
        Err(e) => Err(e.into()),
    }
}

fn render_edit_form(
    state: &AppState,
    id: i64,
    form: &ArticleInput,
    user: &crate::models::User,
    flash: Flash,
) -> Result<Response, AppError> {
    let mut context = TeraContext::new();
    context.insert("article_id", &id);
    context.insert("form", form);
    render_page(state, "update_article.html", context, Some(user), flash)
}

async fn delete_article(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    mut flash: Flash,
) -> Result<Response, AppError> {
    state.article_service.delete(id).await?;
    flash.success("Article deleted");
    Ok(flash.redirect("/posts"))
}
