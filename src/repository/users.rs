//! Identity store.
//!
//! The auth core reads and updates only two fields of a user record: the
//! confirmed flag and the single live refresh token. The store is a trait so
//! the gateway's rotation and confirmation logic can be exercised against an
//! in-memory implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AuthError, DatabaseError};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    /// The identity's sole live refresh token; any other presented refresh
    /// token is a reuse signal.
    pub refresh_token: Option<String>,
    pub confirmed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Create a user. Fails with `Conflict` if the email is already taken.
    async fn create(&self, new_user: NewUser) -> Result<User, AppError>;

    /// Flip the confirmed flag to true. A no-op for already-confirmed users.
    async fn set_confirmed(&self, email: &str) -> Result<(), AppError>;

    async fn set_refresh_token(&self, email: &str, token: Option<&str>) -> Result<(), AppError>;

    /// Atomically swap the stored refresh token: succeeds only if the stored
    /// value equals `presented` byte-for-byte, in which case `replacement`
    /// becomes the sole live value. On mismatch the stored token is cleared
    /// (forcing a full re-login) and the call fails with
    /// `RefreshReuseDetected`. Two racing calls for the same identity cannot
    /// both succeed.
    async fn rotate_refresh_token(
        &self,
        email: &str,
        presented: &str,
        replacement: &str,
    ) -> Result<(), AppError>;
}

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, refresh_token, confirmed, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, password_hash, confirmed, created_at)
            VALUES ($1, $2, $3, $4, FALSE, $5)
            RETURNING id, username, email, password_hash, refresh_token, confirmed, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn set_confirmed(&self, email: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET confirmed = TRUE WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_refresh_token(&self, email: &str, token: Option<&str>) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET refresh_token = $1 WHERE email = $2")
            .bind(token)
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        email: &str,
        presented: &str,
        replacement: &str,
    ) -> Result<(), AppError> {
        // Single transactional read-modify-write: the row lock makes the
        // compare-and-swap atomic with respect to concurrent rotations for
        // the same identity.
        let mut tx = self.pool.begin().await?;

        let stored: Option<Option<String>> = sqlx::query_scalar(
            "SELECT refresh_token FROM users WHERE email = $1 FOR UPDATE",
        )
        .bind(email)
        .fetch_optional(&mut tx)
        .await?;

        let stored = match stored {
            Some(stored) => stored,
            None => {
                return Err(AppError::Database(DatabaseError::NotFound(
                    "user".to_string(),
                )))
            }
        };

        if stored.as_deref() != Some(presented) {
            sqlx::query("UPDATE users SET refresh_token = NULL WHERE email = $1")
                .bind(email)
                .execute(&mut tx)
                .await?;
            tx.commit().await?;
            return Err(AppError::Auth(AuthError::RefreshReuseDetected));
        }

        sqlx::query("UPDATE users SET refresh_token = $1 WHERE email = $2")
            .bind(replacement)
            .bind(email)
            .execute(&mut tx)
            .await?;
        tx.commit().await?;

        Ok(())
    }
}

/// In-memory store backing the gateway unit tests. A single async mutex over
/// the user map makes every operation, rotation included, an atomic
/// read-modify-write.
#[cfg(test)]
pub struct InMemoryUserStore {
    users: tokio::sync::Mutex<std::collections::HashMap<String, User>>,
}

#[cfg(test)]
impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: tokio::sync::Mutex::new(std::collections::HashMap::new()),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let users = self.users.lock().await;
        Ok(users.get(email).cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        let mut users = self.users.lock().await;
        if users.contains_key(&new_user.email) {
            return Err(AppError::Auth(AuthError::Conflict));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email.clone(),
            password_hash: new_user.password_hash,
            refresh_token: None,
            confirmed: false,
            created_at: Utc::now(),
        };
        users.insert(new_user.email, user.clone());
        Ok(user)
    }

    async fn set_confirmed(&self, email: &str) -> Result<(), AppError> {
        let mut users = self.users.lock().await;
        if let Some(user) = users.get_mut(email) {
            user.confirmed = true;
        }
        Ok(())
    }

    async fn set_refresh_token(&self, email: &str, token: Option<&str>) -> Result<(), AppError> {
        let mut users = self.users.lock().await;
        if let Some(user) = users.get_mut(email) {
            user.refresh_token = token.map(str::to_owned);
        }
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        email: &str,
        presented: &str,
        replacement: &str,
    ) -> Result<(), AppError> {
        let mut users = self.users.lock().await;
        let user = users.get_mut(email).ok_or_else(|| {
            AppError::Database(DatabaseError::NotFound("user".to_string()))
        })?;

        if user.refresh_token.as_deref() != Some(presented) {
            user.refresh_token = None;
            return Err(AppError::Auth(AuthError::RefreshReuseDetected));
        }

        user.refresh_token = Some(replacement.to_string());
        Ok(())
    }
}
