//! Article model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A blog article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Article {
    pub id: i64,
    pub title: String,
    /// Short teaser shown in the listing
    pub intro: String,
    pub body: String,
    /// Set once at creation, never updated
    pub created_at: DateTime<Utc>,
}

/// Title, intro and body as submitted for create or update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub intro: String,
    #[serde(default)]
    pub body: String,
}

impl ArticleInput {
    pub fn new(
        title: impl Into<String>,
        intro: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            intro: intro.into(),
            body: body.into(),
        }
    }

    /// True when any of the three fields is blank after trimming
    pub fn has_blank_field(&self) -> bool {
        [&self.title, &self.intro, &self.body]
            .iter()
            .any(|field| field.trim().is_empty())
    }
}

impl From<&Article> for ArticleInput {
    fn from(article: &Article) -> Self {
        Self::new(&article.title, &article.intro, &article.body)
    }
}
