//! Admin panel endpoints
//!
//! CRUD over items, articles and users, reusing the same services and
//! validation as the public pages. Every route requires a logged-in user.

use axum::{extract::State, response::Response, routing::{get, post}, Form, Router};
use serde::Deserialize;
use serde_json::json;
use tera::Context as TeraContext;

use crate::api::flash::Flash;
use crate::api::middleware::{AppError, AppState, AuthenticatedUser, RecordId};
use crate::api::view::render_page;
use crate::models::{ArticleInput, User};
use crate::services::{ArticleServiceError, ItemDraft, ItemServiceError, UserServiceError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin", get(dashboard))
        .route("/admin/items", get(list_items))
        .route("/admin/items/new", get(new_item_form).post(create_item))
        .route("/admin/items/{id}/edit", get(edit_item_form).post(update_item))
        .route("/admin/items/{id}/delete", post(delete_item))
        .route("/admin/articles", get(list_articles))
        .route("/admin/articles/new", get(new_article_form).post(create_article))
        .route("/admin/articles/{id}/edit", get(edit_article_form).post(update_article))
        .route("/admin/articles/{id}/delete", post(delete_article))
        .route("/admin/users", get(list_users))
        .route("/admin/users/new", get(new_user_form).post(create_user))
        .route("/admin/users/{id}/edit", get(edit_user_form).post(update_user))
        .route("/admin/users/{id}/delete", post(delete_user))
}

async fn dashboard(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    flash: Flash,
) -> Result<Response, AppError> {
    let counts = json!({
        "items": state.item_service.count().await?,
        "articles": state.article_service.count().await?,
        "users": state.user_service.count().await?,
    });

    let mut context = TeraContext::new();
    context.insert("counts", &counts);
    render_page(&state, "admin/dashboard.html", context, Some(&user), flash)
}

// ============================================================================
// Items
// ============================================================================

/// Admin item form; an unchecked checkbox is simply absent
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdminItemForm {
    pub title: String,
    pub price: String,
    pub description: String,
    pub is_active: Option<String>,
}

impl From<AdminItemForm> for ItemDraft {
    fn from(form: AdminItemForm) -> Self {
        Self {
            title: form.title,
            price: form.price,
            description: form.description,
            is_active: Some(form.is_active.is_some()),
        }
    }
}

async fn list_items(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    flash: Flash,
) -> Result<Response, AppError> {
    let items = state.item_service.list().await?;

    let mut context = TeraContext::new();
    context.insert("items", &items);
    render_page(&state, "admin/items.html", context, Some(&user), flash)
}

fn render_item_form(
    state: &AppState,
    heading: &str,
    action: &str,
    draft: &ItemDraft,
    user: &User,
    flash: Flash,
) -> Result<Response, AppError> {
    let mut context = TeraContext::new();
    context.insert("heading", heading);
    context.insert("action", action);
    context.insert(
        "form",
        &json!({
            "title": draft.title,
            "price": draft.price,
            "description": draft.description,
            "is_active": draft.is_active.unwrap_or(true),
        }),
    );
    render_page(state, "admin/item_form.html", context, Some(user), flash)
}

async fn new_item_form(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    flash: Flash,
) -> Result<Response, AppError> {
    render_item_form(&state, "New item", "/admin/items/new", &ItemDraft::default(), &user, flash)
}

async fn create_item(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    mut flash: Flash,
    Form(form): Form<AdminItemForm>,
) -> Result<Response, AppError> {
    let draft = ItemDraft::from(form);
    match state.item_service.create(&draft).await {
        Ok(item) => {
            flash.success(format!("Item \"{}\" created", item.title));
            Ok(flash.redirect("/admin/items"))
        }
        Err(ItemServiceError::ValidationError(msg)) => {
            flash.error(msg);
            render_item_form(&state, "New item", "/admin/items/new", &draft, &user, flash)
        }
        Err(e) => Err(e.into()),
    }
}

async fn edit_item_form(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    RecordId(id): RecordId,
    flash: Flash,
) -> Result<Response, AppError> {
    let item = state.item_service.get(id).await?;
    let action = format!("/admin/items/{}/edit", id);
    render_item_form(&state, "Edit item", &action, &ItemDraft::from(&item), &user, flash)
}

async fn update_item(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    RecordId(id): RecordId,
    mut flash: Flash,
    Form(form): Form<AdminItemForm>,
) -> Result<Response, AppError> {
    let draft = ItemDraft::from(form);
    match state.item_service.update(id, &draft).await {
        Ok(_) => {
            flash.success("Item updated");
            Ok(flash.redirect("/admin/items"))
        }
        Err(ItemServiceError::ValidationError(msg)) => {
            flash.error(msg);
            let action = format!("/admin/items/{}/edit", id);
            render_item_form(&state, "Edit item", &action, &draft, &user, flash)
        }
        Err(e) => Err(e.into()),
    }
}

async fn delete_item(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    mut flash: Flash,
) -> Result<Response, AppError> {
    state.item_service.delete(id).await?;
    flash.success("Item deleted");
    Ok(flash.redirect("/admin/items"))
}

// ============================================================================
// Articles
// ============================================================================

async fn list_articles(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    flash: Flash,
) -> Result<Response, AppError> {
    let articles = state.article_service.list().await?;

    let mut context = TeraContext::new();
    context.insert("articles", &articles);
    render_page(&state, "admin/articles.html", context, Some(&user), flash)
}

fn render_article_form(
    state: &AppState,
    heading: &str,
    action: &str,
    form: &ArticleInput,
    user: &User,
    flash: Flash,
) -> Result<Response, AppError> {
    let mut context = TeraContext::new();
    context.insert("heading", heading);
    context.insert("action", action);
    context.insert("form", form);
    render_page(state, "admin/article_form.html", context, Some(user), flash)
}

async fn new_article_form(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    flash: Flash,
) -> Result<Response, AppError> {
    render_article_form(
        &state,
        "New article",
        "/admin/articles/new",
        &ArticleInput::default(),
        &user,
        flash,
    )
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
            Ok(flash.redirect("/admin/articles"))
        }
        Err(ArticleServiceError::ValidationError(msg)) => {
            flash.error(msg);
            render_article_form(&state, "New article", "/admin/articles/new", &form, &user, flash)
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
    let action = format!("/admin/articles/{}/edit", id);
    render_article_form(
        &state,
        "Edit article",
        &action,
        &ArticleInput::from(&article),
        &user,
        flash,
    )
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
            Ok(flash.redirect("/admin/articles"))
        }
        Err(ArticleServiceError::ValidationError(msg)) => {
            flash.error(msg);
            let action = format!("/admin/articles/{}/edit", id);
            render_article_form(&state, "Edit article", &action, &form, &user, flash)
        }
        Err(e) => Err(e.into()),
    }
}

async fn delete_article(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    mut flash: Flash,
) -> Result<Response, AppError> {
    state.article_service.delete(id).await?;
    flash.success("Article deleted");
    Ok(flash.redirect("/admin/articles"))
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdminUserForm {
    pub login: String,
    pub password: String,
}

async fn list_users(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    flash: Flash,
) -> Result<Response, AppError> {
    let users = state.user_service.list().await?;

    let mut context = TeraContext::new();
    context.insert("users", &users);
    context.insert("current_user_id", &user.id);
    render_page(&state, "admin/users.html", context, Some(&user), flash)
}

fn render_user_form(
    state: &AppState,
    target: Option<i64>,
    login: &str,
    user: &User,
    flash: Flash,
) -> Result<Response, AppError> {
    let (heading, action) = match target {
        Some(id) => ("Edit user", format!("/admin/users/{}/edit", id)),
        None => ("New user", "/admin/users/new".to_string()),
    };

    let mut context = TeraContext::new();
    context.insert("heading", heading);
    context.insert("action", &action);
    context.insert("login", login);
    context.insert("is_new", &target.is_none());
    render_page(state, "admin/user_form.html", context, Some(user), flash)
}

async fn new_user_form(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    flash: Flash,
) -> Result<Response, AppError> {
    render_user_form(&state, None, "", &user, flash)
}

async fn create_user(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    mut flash: Flash,
    Form(form): Form<AdminUserForm>,
) -> Result<Response, AppError> {
    match state.user_service.create(&form.login, &form.password).await {
        Ok(created) => {
            flash.success(format!("User \"{}\" created", created.login));
            Ok(flash.redirect("/admin/users"))
        }
        Err(UserServiceError::InternalError(e)) => Err(AppError::Internal(e)),
        Err(e) => {
            flash.error(e.to_string());
            render_user_form(&state, None, &form.login, &user, flash)
        }
    }
}

async fn edit_user_form(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    RecordId(id): RecordId,
    flash: Flash,
) -> Result<Response, AppError> {
    let target = state.user_service.get(id).await?;
    render_user_form(&state, Some(id), &target.login, &user, flash)
}

async fn update_user(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    RecordId(id): RecordId,
    mut flash: Flash,
    Form(form): Form<AdminUserForm>,
) -> Result<Response, AppError> {
    match state
        .user_service
        .update(id, &form.login, Some(form.password.as_str()))
        .await
    {
        Ok(_) => {
            flash.success("User updated");
            Ok(flash.redirect("/admin/users"))
        }
        Err(e @ (UserServiceError::NotFound(_) | UserServiceError::InternalError(_))) => {
            Err(e.into())
        }
        Err(e) => {
            flash.error(e.to_string());
            render_user_form(&state, Some(id), &form.login, &user, flash)
        }
    }
}

async fn delete_user(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    RecordId(id): RecordId,
    mut flash: Flash,
) -> Result<Response, AppError> {
    match state.user_service.delete(id, user.id).await {
        Ok(()) => flash.success("User deleted"),
        Err(UserServiceError::ValidationError(msg)) => flash.error(msg),
        Err(e) => return Err(e.into()),
    }
    Ok(flash.redirect("/admin/users"))
}
