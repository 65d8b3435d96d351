//! Domain Entities

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A published text snippet
///
/// Snippets expire; an expired snippet is treated exactly like one that
/// never existed.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Snippet {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
}

/// A registered user account
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    /// PHC-formatted Argon2id hash, never rendered
    #[serde(skip)]
    pub hashed_password: String,
    pub created: DateTime<Utc>,
}
