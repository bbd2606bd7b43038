//! User repository

use super::with_pool;
use crate::db::DynDatabasePool;
use crate::models::User;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user. Fails with a unique violation when the login is taken.
    async fn create(&self, user: &User) -> Result<User>;

    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    async fn get_by_login(&self, login: &str) -> Result<Option<User>>;

    /// All users ordered by id
    async fn list(&self) -> Result<Vec<User>>;

    /// Persist the login and password hash of an existing user
    async fn update(&self, user: &User) -> Result<()>;

    /// Returns `false` when no row had this id
    async fn delete(&self, id: i64) -> Result<bool>;

    async fn count(&self) -> Result<i64>;
}

/// SQLx-based user repository
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_USER: &str = "SELECT id, login, password_hash, created_at FROM users";

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        let sql = "INSERT INTO users (login, password_hash, created_at) VALUES (?, ?, ?)";

        let id = if let Some(pool) = self.pool.as_sqlite() {
            sqlx::query(sql)
                .bind(&user.login)
                .bind(&user.password_hash)
                .bind(user.created_at)
                .execute(pool)
                .await
                .context("Failed to create user")?
                .last_insert_rowid()
        } else if let Some(pool) = self.pool.as_mysql() {
            sqlx::query(sql)
                .bind(&user.login)
                .bind(&user.password_hash)
                .bind(user.created_at)
                .execute(pool)
                .await
                .context("Failed to create user")?
                .last_insert_id() as i64
        } else {
            anyhow::bail!("Unsupported database pool");
        };

        Ok(User {
            id,
            ..user.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("{} WHERE id = ?", SELECT_USER);
        with_pool!(self.pool, |pool| {
            sqlx::query_as::<_, User>(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get user by ID")
        })
    }

    async fn get_by_login(&self, login: &str) -> Result<Option<User>> {
        let sql = format!("{} WHERE login = ?", SELECT_USER);
        with_pool!(self.pool, |pool| {
            sqlx::query_as::<_, User>(&sql)
                .bind(login)
                .fetch_optional(pool)
                .await
                .context("Failed to get user by login")
        })
    }

    async fn list(&self) -> Result<Vec<User>> {
        let sql = format!("{} ORDER BY id ASC", SELECT_USER);
        with_pool!(self.pool, |pool| {
            sqlx::query_as::<_, User>(&sql)
                .fetch_all(pool)
                .await
                .context("Failed to list users")
        })
    }

    async fn update(&self, user: &User) -> Result<()> {
        with_pool!(self.pool, |pool| {
            sqlx::query("UPDATE users SET login = ?, password_hash = ? WHERE id = ?")
                .bind(&user.login)
                .bind(&user.password_hash)
                .bind(user.id)
                .execute(pool)
                .await
                .context("Failed to update user")?;
        });
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = with_pool!(self.pool, |pool| {
            sqlx::query("DELETE FROM users WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete user")?
                .rows_affected()
        });
        Ok(affected > 0)
    }

    async fn count(&self) -> Result<i64> {
        with_pool!(self.pool, |pool| {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
                .fetch_one(pool)
                .await
                .context("Failed to count users")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::is_unique_violation;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxUserRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxUserRepository::new(pool)
    }

    fn new_user(login: &str) -> User {
        User::new(login.to_string(), format!("hash-of-{}", login))
    }

    #[tokio::test]
    async fn test_create_user() {
        let repo = setup_test_repo().await;

        let created = repo.create(&new_user("alice")).await.expect("Failed to create");

        assert!(created.id > 0);
        assert_eq!(created.login, "alice");
        assert_eq!(created.password_hash, "hash-of-alice");
    }

    #[tokio::test]
    async fn test_get_user_by_login() {
        let repo = setup_test_repo().await;
        let created = repo.create(&new_user("alice")).await.unwrap();

        let found = repo
            .get_by_login("alice")
            .await
            .expect("Failed to get user")
            .expect("User not found");
        assert_eq!(found.id, created.id);

        assert!(repo.get_by_login("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_user_by_id() {
        let repo = setup_test_repo().await;
        let created = repo.create(&new_user("alice")).await.unwrap();

        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.login, "alice");
        assert!(repo.get_by_id(created.id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_login_is_unique_violation() {
        let repo = setup_test_repo().await;
        repo.create(&new_user("alice")).await.unwrap();

        let err = repo
            .create(&new_user("alice"))
            .await
            .expect_err("Duplicate login should fail");

        assert!(is_unique_violation(&err));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_user() {
        let repo = setup_test_repo().await;
        let mut user = repo.create(&new_user("alice")).await.unwrap();

        user.login = "alice2".to_string();
        user.password_hash = "new-hash".to_string();
        repo.update(&user).await.expect("Failed to update");

        let found = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(found.login, "alice2");
        assert_eq!(found.password_hash, "new-hash");
    }

    #[tokio::test]
    async fn test_list_and_delete_users() {
        let repo = setup_test_repo().await;
        let alice = repo.create(&new_user("alice")).await.unwrap();
        repo.create(&new_user("bob")).await.unwrap();

        let logins: Vec<String> = repo.list().await.unwrap().into_iter().map(|u| u.login).collect();
        assert_eq!(logins, vec!["alice", "bob"]);

        assert!(repo.delete(alice.id).await.unwrap());
        assert!(!repo.delete(alice.id).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
