//! Database layer
//!
//! SQLite is the default backend; MySQL is selected through
//! `database.driver` in the configuration. Callers work against the
//! `DatabasePool` trait and the repository traits in [`repositories`].
//!
//! ```ignore
//! let pool = storefront::db::create_pool(&config.database).await?;
//! storefront::db::migrations::run_migrations(&pool).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
