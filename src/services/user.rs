//! User service
//!
//! Registration, login/logout, server-side session validation and the
//! account management used by the admin panel.

use crate::config::MAX_SESSION_TTL_HOURS;
use crate::db::repositories::{is_unique_violation, SessionRepository, UserRepository};
use crate::models::{Session, User};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use chrono::Duration;
use std::sync::Arc;

/// Default session lifetime in hours (one week)
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 168;

pub const MSG_FILL_ALL_FIELDS: &str = "Please fill in all fields";
pub const MSG_PASSWORDS_DIFFER: &str = "Passwords do not match";
pub const MSG_LOGIN_TAKEN: &str = "This login is already taken";
pub const MSG_LOGIN_REQUIRED: &str = "Please enter login and password";
pub const MSG_INVALID_CREDENTIALS: &str = "Invalid login or password";
pub const MSG_DELETE_SELF: &str = "You cannot delete your own account";

/// Error types for user service operations.
///
/// The user-facing variants display as the bare message so handlers can flash
/// them directly.
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Invalid credentials
    #[error("{0}")]
    AuthenticationError(String),

    #[error("{0}")]
    ValidationError(String),

    /// Login already in use
    #[error("{0}")]
    UserExists(String),

    #[error("User not found: {0}")]
    NotFound(i64),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Registration form values
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub login: String,
    pub password: String,
    pub password2: String,
}

impl RegisterInput {
    pub fn new(
        login: impl Into<String>,
        password: impl Into<String>,
        password2: impl Into<String>,
    ) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
            password2: password2.into(),
        }
    }
}

/// Login form values
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub login: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }
}

/// User service for accounts and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_ttl: Duration,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        Self::with_session_ttl(user_repo, session_repo, DEFAULT_SESSION_TTL_HOURS)
    }

    /// Create a service whose sessions last `ttl_hours`.
    ///
    /// The magnitude is capped at [`MAX_SESSION_TTL_HOURS`].
    pub fn with_session_ttl(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        ttl_hours: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_ttl: Duration::hours(
                ttl_hours.clamp(-MAX_SESSION_TTL_HOURS, MAX_SESSION_TTL_HOURS),
            ),
        }
    }

    fn start_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        Session::start(user_id, self.session_ttl)
            .ok_or_else(|| anyhow::anyhow!("Session expiry is out of range").into())
    }

    /// Register a new account.
    ///
    /// The login is checked for uniqueness before the insert; the UNIQUE
    /// constraint still decides races and is reported the same way.
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        let login = input.login.trim();
        if login.is_empty() || input.password.is_empty() || input.password2.is_empty() {
            return Err(UserServiceError::ValidationError(MSG_FILL_ALL_FIELDS.to_string()));
        }
        if input.password != input.password2 {
            return Err(UserServiceError::ValidationError(MSG_PASSWORDS_DIFFER.to_string()));
        }

        let user = self.insert_user(login, &input.password).await?;
        tracing::info!("Registered user '{}' (id {})", user.login, user.id);
        Ok(user)
    }

    /// Check credentials and open a new session
    pub async fn login(&self, input: LoginInput) -> Result<(User, Session), UserServiceError> {
        let login = input.login.trim();
        if login.is_empty() || input.password.is_empty() {
            return Err(UserServiceError::ValidationError(MSG_LOGIN_REQUIRED.to_string()));
        }

        let invalid = || UserServiceError::AuthenticationError(MSG_INVALID_CREDENTIALS.to_string());

        let user = self
            .user_repo
            .get_by_login(login)
            .await
            .context("Failed to look up user")?
            .ok_or_else(invalid)?;

        let valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;
        if !valid {
            tracing::info!("Failed login for '{}'", login);
            return Err(invalid());
        }

        let session = self
            .session_repo
            .create(&self.start_session(user.id)?)
            .await
            .context("Failed to create session")?;

        tracing::info!("User '{}' logged in", user.login);
        Ok((user, session))
    }

    /// Invalidate a session
    pub async fn logout(&self, token: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a session token to its user.
    ///
    /// Missing or expired sessions resolve to `None`; expired rows are
    /// deleted on the way.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(session) => session,
            None => return Ok(None),
        };

        if session.is_expired() {
            self.session_repo
                .delete(token)
                .await
                .context("Failed to delete expired session")?;
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get session user")?;
        Ok(user)
    }

    /// Remove every expired session, returning how many were deleted
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let removed = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Account management
    // ------------------------------------------------------------------

    pub async fn list(&self) -> Result<Vec<User>, UserServiceError> {
        Ok(self.user_repo.list().await.context("Failed to list users")?)
    }

    pub async fn get(&self, id: i64) -> Result<User, UserServiceError> {
        self.user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user")?
            .ok_or(UserServiceError::NotFound(id))
    }

    pub async fn count(&self) -> Result<i64, UserServiceError> {
        Ok(self.user_repo.count().await.context("Failed to count users")?)
    }

    /// Create an account directly, without the confirmation field
    pub async fn create(&self, login: &str, password: &str) -> Result<User, UserServiceError> {
        let login = login.trim();
        if login.is_empty() || password.is_empty() {
            return Err(UserServiceError::ValidationError(MSG_FILL_ALL_FIELDS.to_string()));
        }

        let user = self.insert_user(login, password).await?;
        tracing::info!("Created user '{}' (id {})", user.login, user.id);
        Ok(user)
    }

    /// Rename a user and optionally replace their password.
    ///
    /// An empty `new_password` keeps the current hash.
    pub async fn update(
        &self,
        id: i64,
        login: &str,
        new_password: Option<&str>,
    ) -> Result<User, UserServiceError> {
        let mut user = self.get(id).await?;

        let login = login.trim();
        if login.is_empty() {
            return Err(UserServiceError::ValidationError(MSG_FILL_ALL_FIELDS.to_string()));
        }

        if login != user.login && self.login_taken(login).await? {
            return Err(UserServiceError::UserExists(MSG_LOGIN_TAKEN.to_string()));
        }

        user.login = login.to_string();
        if let Some(password) = new_password.filter(|p| !p.is_empty()) {
            user.password_hash = hash_password(password).context("Failed to hash password")?;
        }

        match self.user_repo.update(&user).await {
            Ok(()) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(UserServiceError::UserExists(MSG_LOGIN_TAKEN.to_string()))
            }
            Err(e) => return Err(e.context("Failed to update user").into()),
        }

        tracing::info!("Updated user {}", user.id);
        Ok(user)
    }

    /// Delete an account. `acting_user_id` may not delete itself.
    pub async fn delete(&self, id: i64, acting_user_id: i64) -> Result<(), UserServiceError> {
        if id == acting_user_id {
            return Err(UserServiceError::ValidationError(MSG_DELETE_SELF.to_string()));
        }

        let deleted = self.user_repo.delete(id).await.context("Failed to delete user")?;
        if !deleted {
            return Err(UserServiceError::NotFound(id));
        }

        tracing::info!("Deleted user {}", id);
        Ok(())
    }

    async fn login_taken(&self, login: &str) -> Result<bool, UserServiceError> {
        Ok(self
            .user_repo
            .get_by_login(login)
            .await
            .context("Failed to check login")?
            .is_some())
    }

    async fn insert_user(&self, login: &str, password: &str) -> Result<User, UserServiceError> {
        if self.login_taken(login).await? {
            return Err(UserServiceError::UserExists(MSG_LOGIN_TAKEN.to_string()));
        }

        let password_hash = hash_password(password).context("Failed to hash password")?;
        let user = User::new(login.to_string(), password_hash);

        match self.user_repo.create(&user).await {
            Ok(user) => Ok(user),
            Err(e) if is_unique_violation(&e) => {
                Err(UserServiceError::UserExists(MSG_LOGIN_TAKEN.to_string()))
            }
            Err(e) => Err(e.context("Failed to create user").into()),
        }
    }
}
