//! PostgreSQL Repository Implementations

use sqlx::PgPool;

use crate::domain::entity::Snippet;
use crate::domain::repository::{SnippetRepository, UserRepository};
use crate::error::{SiteError, SiteResult};
use crate::infra::verify_password;

/// Unique-violation SQLSTATE code
const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL-backed site repository
#[derive(Clone)]
pub struct PgSiteRepository {
    pool: PgPool,
}

impl PgSiteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Snippet Repository Implementation
// ============================================================================

impl SnippetRepository for PgSiteRepository {
    async fn insert(&self, title: &str, content: &str, expires_days: i64) -> SiteResult<i64> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO snippets (title, content, created, expires)
            VALUES ($1, $2, now(), now() + make_interval(days => $3))
            RETURNING id
            "#,
        )
        .bind(title)
        .bind(content)
        .bind(expires_days as i32)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get(&self, id: i64) -> SiteResult<Option<Snippet>> {
        let snippet = sqlx::query_as::<_, Snippet>(
            r#"
            SELECT id, title, content, created, expires
            FROM snippets
            WHERE expires > now() AND id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(snippet)
    }

    async fn latest(&self) -> SiteResult<Vec<Snippet>> {
        let snippets = sqlx::query_as::<_, Snippet>(
            r#"
            SELECT id, title, content, created, expires
            FROM snippets
            WHERE expires > now()
            ORDER BY id DESC
            LIMIT 10
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(snippets)
    }
}

// ============================================================================
// User Repository Implementation
// ============================================================================

impl UserRepository for PgSiteRepository {
    async fn create(&self, name: &str, email: &str, password_hash: &str) -> SiteResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (name, email, hashed_password, created)
            VALUES ($1, $2, $3, now())
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                Err(SiteError::DuplicateEmail)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn authenticate(&self, email: &str, password: &str) -> SiteResult<i64> {
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT id, hashed_password FROM users WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;

        let Some((id, hash)) = row else {
            return Err(SiteError::InvalidCredentials);
        };

        if verify_password(&hash, password)? {
            Ok(id)
        } else {
            Err(SiteError::InvalidCredentials)
        }
    }

    async fn exists(&self, id: i64) -> SiteResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }
}
