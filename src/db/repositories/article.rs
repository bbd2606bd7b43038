//! Article repository
//!
//! Articles are always listed newest first. Rows created within the same
//! timestamp are ordered by descending id so the listing stays stable.

use super::with_pool;
use crate::db::DynDatabasePool;
use crate::models::{Article, ArticleInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// Article repository trait
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Insert a new article stamped with the current time
    async fn create(&self, input: &ArticleInput) -> Result<Article>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Article>>;

    /// All articles ordered by `created_at` descending
    async fn list_newest_first(&self) -> Result<Vec<Article>>;

    /// Overwrite title, intro and body. `created_at` is left untouched.
    async fn update(&self, id: i64, input: &ArticleInput) -> Result<()>;

    /// Returns `false` when no row had this id
    async fn delete(&self, id: i64) -> Result<bool>;

    async fn count(&self) -> Result<i64>;
}

/// SQLx-based article repository
pub struct SqlxArticleRepository {
    pool: DynDatabasePool,
}

impl SqlxArticleRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ArticleRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_ARTICLE: &str = "SELECT id, title, intro, body, created_at FROM articles";

#[async_trait]
impl ArticleRepository for SqlxArticleRepository {
    async fn create(&self, input: &ArticleInput) -> Result<Article> {
        let created_at = Utc::now();
        let sql = "INSERT INTO articles (title, intro, body, created_at) VALUES (?, ?, ?, ?)";

        let id = if let Some(pool) = self.pool.as_sqlite() {
            sqlx::query(sql)
                .bind(&input.title)
                .bind(&input.intro)
                .bind(&input.body)
                .bind(created_at)
                .execute(pool)
                .await
                .context("Failed to create article")?
                .last_insert_rowid()
        } else if let Some(pool) = self.pool.as_mysql() {
            sqlx::query(sql)
                .bind(&input.title)
                .bind(&input.intro)
                .bind(&input.body)
                .bind(created_at)
                .execute(pool)
                .await
                .context("Failed to create article")?
                .last_insert_id() as i64
        } else {
            anyhow::bail!("Unsupported database pool");
        };

        Ok(Article {
            id,
            title: input.title.clone(),
            intro: input.intro.clone(),
            body: input.body.clone(),
            created_at,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Article>> {
        let sql = format!("{} WHERE id = ?", SELECT_ARTICLE);
        with_pool!(self.pool, |pool| {
            sqlx::query_as::<_, Article>(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get article by ID")
        })
    }

    async fn list_newest_first(&self) -> Result<Vec<Article>> {
        let sql = format!("{} ORDER BY created_at DESC, id DESC", SELECT_ARTICLE);
        with_pool!(self.pool, |pool| {
            sqlx::query_as::<_, Article>(&sql)
                .fetch_all(pool)
                .await
                .context("Failed to list articles")
        })
    }

    async fn update(&self, id: i64, input: &ArticleInput) -> Result<()> {
        let sql = "UPDATE articles SET title = ?, intro = ?, body = ? WHERE id = ?";
        with_pool!(self.pool, |pool| {
            sqlx::query(sql)
                .bind(&input.title)
                .bind(&input.intro)
                .bind(&input.body)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to update article")?;
        });
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = with_pool!(self.pool, |pool| {
            sqlx::query("DELETE FROM articles WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete article")?
                .rows_affected()
        });
        Ok(affected > 0)
    }

    async fn count(&self) -> Result<i64> {
        with_pool!(self.pool, |pool| {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM articles")
                .fetch_one(pool)
                .await
                .context("Failed to count articles")
        })
    }
}
