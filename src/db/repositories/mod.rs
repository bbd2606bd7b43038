//! Database repositories
//!
//! One trait per entity plus a `Sqlx*Repository` implementation that works on
//! both SQLite and MySQL.

/// Evaluate the same query expression against whichever backend the pool
/// wraps. The body is expanded once per backend, so it may only use APIs both
/// drivers share.
macro_rules! with_pool {
    ($pool:expr, |$conn:ident| $body:expr) => {{
        if let Some($conn) = $pool.as_sqlite() {
            $body
        } else if let Some($conn) = $pool.as_mysql() {
            $body
        } else {
            anyhow::bail!("Unsupported database pool")
        }
    }};
}

pub(crate) use with_pool;

pub mod article;
pub mod item;
pub mod session;
pub mod user;

pub use article::{ArticleRepository, SqlxArticleRepository};
pub use item::{ItemRepository, SqlxItemRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};

/// Whether a repository error was caused by a UNIQUE constraint
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
        _ => false,
    }
}
