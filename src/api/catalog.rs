//! Catalog endpoints
//!
//! - GET /, GET /home - Items, cheapest first
//! - GET /index/{id} - Item detail
//! - GET/POST /add_item - Add an item
//! - GET /index/{id}/delete - Delete an item
//! - GET /buy/{id} - Start a checkout and redirect to the gateway

use axum::{extract::State, response::Response, routing::get, Form, Router};
use serde::Deserialize;
use tera::Context as TeraContext;

use crate::api::flash::Flash;
use crate::api::middleware::{AppError, AppState, AuthenticatedUser, RecordId};
use crate::api::view::{render_page, see_other};
use crate::services::{ItemDraft, ItemServiceError};

/// Submitted item form
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ItemForm {
    pub title: String,
    pub price: String,
    pub description: String,
}

impl From<ItemForm> for ItemDraft {
    fn from(form: ItemForm) -> Self {
        Self {
            title: form.title,
            price: form.price,
            description: form.description,
            is_active: None,
        }
    }
}

/// Routes that need a logged-in user
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_items))
        .route("/home", get(list_items))
        .route("/index/{id}", get(show_item))
        .route("/index/{id}/delete", get(delete_item))
        .route("/add_item", get(add_item_form).post(add_item))
}

pub fn public_router() -> Router<AppState> {
    Router::new().route("/buy/{id}", get(buy_item))
}

async fn list_items(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    flash: Flash,
) -> Result<Response, AppError> {
    let items = state.item_service.list().await?;

    let mut context = TeraContext::new();
    context.insert("items", &items);
    render_page(&state, "home.html", context, Some(&user), flash)
}

async fn show_item(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    RecordId(id): RecordId,
    flash: Flash,
) -> Result<Response, AppError> {
    let item = state.item_service.get(id).await?;

    let mut context = TeraContext::new();
    context.insert("item", &item);
    render_page(&state, "item.html", context, Some(&user), flash)
}

async fn add_item_form(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    flash: Flash,
) -> Result<Response, AppError> {
    render_page(&state, "add_item.html", TeraContext::new(), Some(&user), flash)
}

/// The form is shown empty again whether or not the item was saved
async fn add_item(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    mut flash: Flash,
    Form(form): Form<ItemForm>,
) -> Result<Response, AppError> {
    match state.item_service.create(&ItemDraft::from(form)).await {
        Ok(_) => flash.success("Item added"),
        Err(ItemServiceError::ValidationError(msg)) => flash.error(msg),
        Err(e) => return Err(e.into()),
    }
    render_page(&state, "add_item.html", TeraContext::new(), Some(&user), flash)
}

async fn delete_item(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    mut flash: Flash,
) -> Result<Response, AppError> {
    state.item_service.delete(id).await?;
    flash.success("Item deleted");
    Ok(flash.redirect("/home"))
}

/// Open a checkout with the payment gateway and send the buyer there
async fn buy_item(
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<Response, AppError> {
    let item = state.item_service.get(id).await?;
    let checkout = state.checkout_service.start(&item).await?;
    Ok(see_other(&checkout.checkout_url))
}
