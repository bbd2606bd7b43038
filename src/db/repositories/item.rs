//! Item repository
//!
//! Catalog items are read in ascending price order; ties fall back to
//! insertion order.

use super::with_pool;
use crate::db::DynDatabasePool;
use crate::models::{Item, ItemInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// Item repository trait
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// Insert a new item and return it with its generated id
    async fn create(&self, input: &ItemInput) -> Result<Item>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Item>>;

    /// All items, cheapest first
    async fn list_by_price(&self) -> Result<Vec<Item>>;

    /// Overwrite every editable field of an item
    async fn update(&self, id: i64, input: &ItemInput) -> Result<()>;

    /// Returns `false` when no row had this id
    async fn delete(&self, id: i64) -> Result<bool>;

    async fn count(&self) -> Result<i64>;
}

/// SQLx-based item repository
pub struct SqlxItemRepository {
    pool: DynDatabasePool,
}

impl SqlxItemRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ItemRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_ITEM: &str =
    "SELECT id, title, price, is_active, description, created_at FROM items";

#[async_trait]
impl ItemRepository for SqlxItemRepository {
    async fn create(&self, input: &ItemInput) -> Result<Item> {
        let created_at = Utc::now();
        let sql = r#"
            INSERT INTO items (title, price, is_active, description, created_at)
            VALUES (?, ?, ?, ?, ?)
        "#;

        let id = if let Some(pool) = self.pool.as_sqlite() {
            sqlx::query(sql)
                .bind(&input.title)
                .bind(input.price)
                .bind(input.is_active)
                .bind(&input.description)
                .bind(created_at)
                .execute(pool)
                .await
                .context("Failed to create item")?
                .last_insert_rowid()
        } else if let Some(pool) = self.pool.as_mysql() {
            sqlx::query(sql)
                .bind(&input.title)
                .bind(input.price)
                .bind(input.is_active)
                .bind(&input.description)
                .bind(created_at)
                .execute(pool)
                .await
                .context("Failed to create item")?
                .last_insert_id() as i64
        } else {
            anyhow::bail!("Unsupported database pool");
        };

        Ok(Item {
            id,
            title: input.title.clone(),
            price: input.price,
            is_active: input.is_active,
            description: input.description.clone(),
            created_at,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Item>> {
        let sql = format!("{} WHERE id = ?", SELECT_ITEM);
        with_pool!(self.pool, |pool| {
            sqlx::query_as::<_, Item>(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get item by ID")
        })
    }

    async fn list_by_price(&self) -> Result<Vec<Item>> {
        let sql = format!("{} ORDER BY price ASC, id ASC", SELECT_ITEM);
        with_pool!(self.pool, |pool| {
            sqlx::query_as::<_, Item>(&sql)
                .fetch_all(pool)
                .await
                .context("Failed to list items")
        })
    }

    async fn update(&self, id: i64, input: &ItemInput) -> Result<()> {
        let sql = r#"
            UPDATE items
            SET title = ?, price = ?, is_active = ?, description = ?
            WHERE id = ?
        "#;
        with_pool!(self.pool, |pool| {
            sqlx::query(sql)
                .bind(&input.title)
                .bind(input.price)
                .bind(input.is_active)
                .bind(&input.description)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to update item")?;
        });
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = with_pool!(self.pool, |pool| {
            sqlx::query("DELETE FROM items WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete item")?
                .rows_affected()
        });
        Ok(affected > 0)
    }

    async fn count(&self) -> Result<i64> {
        with_pool!(self.pool, |pool| {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM items")
                .fetch_one(pool)
                .await
                .context("Failed to count items")
        })
    }
}
