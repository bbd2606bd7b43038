//! Item service
//!
//! Form parsing and validation for catalog items, plus CRUD on top of the
//! item repository.

use crate::db::repositories::ItemRepository;
use crate::models::{Item, ItemInput};
use anyhow::Context;
use std::sync::Arc;

pub const MSG_TITLE_AND_PRICE_REQUIRED: &str = "Title and price are required";
pub const MSG_PRICE_NOT_POSITIVE: &str = "Price must be a positive whole number";

/// Error types for item service operations
#[derive(Debug, thiserror::Error)]
pub enum ItemServiceError {
    #[error("Item not found: {0}")]
    NotFound(i64),

    /// Displays as the bare message for flashing
    #[error("{0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Raw item form values before validation
#[derive(Debug, Clone, Default)]
pub struct ItemDraft {
    pub title: String,
    pub price: String,
    pub description: String,
    /// `None` when the form has no active toggle; new items default to active
    pub is_active: Option<bool>,
}

impl ItemDraft {
    pub fn new(title: impl Into<String>, price: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            price: price.into(),
            ..Self::default()
        }
    }

    /// Turn the submitted strings into a validated [`ItemInput`]
    pub fn validate(&self) -> Result<ItemInput, ItemServiceError> {
        let title = self.title.trim();
        let price = self.price.trim();
        if title.is_empty() || price.is_empty() {
            return Err(ItemServiceError::ValidationError(
                MSG_TITLE_AND_PRICE_REQUIRED.to_string(),
            ));
        }

        let price = parse_price(price).ok_or_else(|| {
            ItemServiceError::ValidationError(MSG_PRICE_NOT_POSITIVE.to_string())
        })?;

        Ok(ItemInput::new(title, price)
            .with_description(self.description.trim())
            .with_active(self.is_active.unwrap_or(true)))
    }
}

impl From<&Item> for ItemDraft {
    fn from(item: &Item) -> Self {
        Self {
            title: item.title.clone(),
            price: item.price.to_string(),
            description: item.description.clone(),
            is_active: Some(item.is_active),
        }
    }
}

/// Parse a positive whole number of currency units
fn parse_price(raw: &str) -> Option<i64> {
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<i64>().ok().filter(|price| *price > 0)
}

/// Item service for the catalog
pub struct ItemService {
    repo: Arc<dyn ItemRepository>,
}

impl ItemService {
    pub fn new(repo: Arc<dyn ItemRepository>) -> Self {
        Self { repo }
    }

    /// All items, cheapest first
    pub async fn list(&self) -> Result<Vec<Item>, ItemServiceError> {
        Ok(self.repo.list_by_price().await.context("Failed to list items")?)
    }

    pub async fn get(&self, id: i64) -> Result<Item, ItemServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get item")?
            .ok_or(ItemServiceError::NotFound(id))
    }

    pub async fn create(&self, draft: &ItemDraft) -> Result<Item, ItemServiceError> {
        let input = draft.validate()?;
        let item = self.repo.create(&input).await.context("Failed to create item")?;
        tracing::info!("Created item {} priced {}", item.id, item.price);
        Ok(item)
    }

    pub async fn update(&self, id: i64, draft: &ItemDraft) -> Result<Item, ItemServiceError> {
        let existing = self.get(id).await?;
        let input = draft.validate()?;

        self.repo.update(id, &input).await.context("Failed to update item")?;
        tracing::info!("Updated item {}", id);

        Ok(Item {
            title: input.title,
            price: input.price,
            is_active: input.is_active,
            description: input.description,
            ..existing
        })
    }

    pub async fn delete(&self, id: i64) -> Result<(), ItemServiceError> {
        let deleted = self.repo.delete(id).await.context("Failed to delete item")?;
        if !deleted {
            return Err(ItemServiceError::NotFound(id));
        }
        tracing::info!("Deleted item {}", id);
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, ItemServiceError> {
        Ok(self.repo.count().await.context("Failed to count items")?)
    }
}
