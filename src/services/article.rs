//! Article service

use crate::db::repositories::ArticleRepository;
use crate::models::{Article, ArticleInput};
use anyhow::Context;
use std::sync::Arc;

pub const MSG_ALL_FIELDS_REQUIRED: &str = "All fields are required";

/// Error types for article service operations
#[derive(Debug, thiserror::Error)]
pub enum ArticleServiceError {
    #[error("Article not found: {0}")]
    NotFound(i64),

    /// Displays as the bare message for flashing
    #[error("{0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Article service for the blog
pub struct ArticleService {
    repo: Arc<dyn ArticleRepository>,
}

impl ArticleService {
    pub fn new(repo: Arc<dyn ArticleRepository>) -> Self {
        Self { repo }
    }

    /// All articles, newest first
    pub async fn list(&self) -> Result<Vec<Article>, ArticleServiceError> {
        Ok(self.repo.list_newest_first().await.context("Failed to list articles")?)
    }

    pub async fn get(&self, id: i64) -> Result<Article, ArticleServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get article")?
            .ok_or(ArticleServiceError::NotFound(id))
    }

    /// Create an article. Title, intro and body must all be non-blank.
    pub async fn create(&self, input: &ArticleInput) -> Result<Article, ArticleServiceError> {
        validate(input)?;

        let article = self.repo.create(input).await.context("Failed to create article")?;
        tracing::info!("Created article {}", article.id);
        Ok(article)
    }

    /// Overwrite title, intro and body of an existing article
    pub async fn update(
        &self,
        id: i64,
        input: &ArticleInput,
    ) -> Result<Article, ArticleServiceError> {
        let existing = self.get(id).await?;
        validate(input)?;

        self.repo.update(id, input).await.context("Failed to update article")?;
        tracing::info!("Updated article {}", id);

        Ok(Article {
            title: input.title.clone(),
            intro: input.intro.clone(),
            body: input.body.clone(),
            ..existing
        })
    }

    pub async fn delete(&self, id: i64) -> Result<(), ArticleServiceError> {
        let deleted = self.repo.delete(id).await.context("Failed to delete article")?;
        if !deleted {
            return Err(ArticleServiceError::NotFound(id));
        }
        tracing::info!("Deleted article {}", id);
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, ArticleServiceError> {
        Ok(self.repo.count().await.context("Failed to count articles")?)
    }
}

fn validate(input: &ArticleInput) -> Result<(), ArticleServiceError> {
    if input.has_blank_field() {
        return Err(ArticleServiceError::ValidationError(
            MSG_ALL_FIELDS_REQUIRED.to_string(),
        ));
    }
    Ok(())
}
