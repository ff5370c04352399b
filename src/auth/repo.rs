use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};
use crate::error::RepoError;

/// Credential store. Email and username are unique; `create` reports a
/// violation as `RepoError::Duplicate` even when a concurrent signup slipped
/// past the pre-checks.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<User, RepoError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;
    /// Matches the email (case-insensitive) or the username (exact).
    async fn find_by_login(&self, login: &str) -> Result<Option<User>, RepoError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: NewUser) -> Result<User, RepoError> {
        let row = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, fullname, username, email, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, fullname, username, email, password_hash, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.fullname)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let row = sqlx::query_as::<_, User>(
            r#"
            SELECT id, fullname, username, email, password_hash, created_at
            FROM users
            WHERE email = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let row = sqlx::query_as::<_, User>(
            r#"
            SELECT id, fullname, username, email, password_hash, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<User>, RepoError> {
        let row = sqlx::query_as::<_, User>(
            r#"
            SELECT id, fullname, username, email, password_hash, created_at
            FROM users
            WHERE email = lower($1) OR username = $1
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(login)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }
}
