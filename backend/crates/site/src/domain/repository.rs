//! Repository Traits
//!
//! Interfaces for data persistence. Implementation is in infrastructure layer.

use crate::domain::entity::Snippet;
use crate::error::SiteResult;

/// Snippet repository trait
#[trait_variant::make(SnippetRepository: Send)]
pub trait LocalSnippetRepository {
    /// Store a new snippet expiring in `expires_days`, returning its id
    async fn insert(&self, title: &str, content: &str, expires_days: i64) -> SiteResult<i64>;

    /// Find a snippet by id; expired snippets are `None`
    async fn get(&self, id: i64) -> SiteResult<Option<Snippet>>;

    /// The ten most recently created unexpired snippets, newest first
    async fn latest(&self) -> SiteResult<Vec<Snippet>>;
}

/// User repository trait
#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    /// Create a new user account
    ///
    /// Returns [`crate::error::SiteError::DuplicateEmail`] when the email
    /// is already registered.
    async fn create(&self, name: &str, email: &str, password_hash: &str) -> SiteResult<()>;

    /// Verify credentials, returning the user id on success
    ///
    /// Unknown email and wrong password are indistinguishable; both
    /// return [`crate::error::SiteError::InvalidCredentials`].
    async fn authenticate(&self, email: &str, password: &str) -> SiteResult<i64>;

    /// Check whether a user id still refers to an existing account
    async fn exists(&self, id: i64) -> SiteResult<bool>;
}
