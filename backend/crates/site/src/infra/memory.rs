//! In-Memory Repository Implementation
//!
//! Process-local backing store for tests and demos. Clones share the
//! same state.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{Duration, Utc};
use platform::password::ClearTextPassword;

use crate::domain::entity::{Snippet, User};
use crate::domain::repository::{SnippetRepository, UserRepository};
use crate::error::{SiteError, SiteResult};
use crate::infra::verify_password;

#[derive(Debug, Default)]
struct Inner {
    snippets: HashMap<i64, Snippet>,
    users: Vec<User>,
    next_snippet_id: i64,
    next_user_id: i64,
    snippet_inserts: usize,
    fail_user_lookups: bool,
}

/// In-memory site repository
#[derive(Debug, Clone, Default)]
pub struct MemorySiteRepository {
    inner: Arc<RwLock<Inner>>,
}

impl MemorySiteRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().expect("repository lock poisoned")
    }

    /// How many snippet inserts have been performed
    pub fn snippet_insert_calls(&self) -> usize {
        self.inner
            .read()
            .expect("repository lock poisoned")
            .snippet_inserts
    }

    /// Make subsequent user-id lookups fail with a storage error
    pub fn fail_user_lookups(&self) {
        self.lock().fail_user_lookups = true;
    }

    /// Insert a snippet directly, bypassing the insert counter
    pub fn seed_snippet(&self, title: &str, content: &str) -> i64 {
        let mut inner = self.lock();
        inner.next_snippet_id += 1;
        let id = inner.next_snippet_id;
        let now = Utc::now();
        inner.snippets.insert(
            id,
            Snippet {
                id,
                title: title.to_string(),
                content: content.to_string(),
                created: now,
                expires: now + Duration::days(365),
            },
        );
        id
    }

    /// Insert a user with a freshly hashed password
    pub fn seed_user(&self, name: &str, email: &str, password: &str) -> SiteResult<i64> {
        let hash = ClearTextPassword::new(password.to_string())
            .map_err(|e| SiteError::Internal(e.to_string()))?
            .hash()
            .map_err(|e| SiteError::Internal(e.to_string()))?;

        let mut inner = self.lock();
        inner.next_user_id += 1;
        let id = inner.next_user_id;
        inner.users.push(User {
            id,
            name: name.to_string(),
            email: email.to_string(),
            hashed_password: hash.as_str().to_string(),
            created: Utc::now(),
        });
        Ok(id)
    }

    /// Remove a user, simulating an account deleted mid-session
    pub fn remove_user(&self, id: i64) {
        self.lock().users.retain(|user| user.id != id);
    }
}

impl SnippetRepository for MemorySiteRepository {
    async fn insert(&self, title: &str, content: &str, expires_days: i64) -> SiteResult<i64> {
        let mut inner = self.lock();
        inner.snippet_inserts += 1;
        inner.next_snippet_id += 1;
        let id = inner.next_snippet_id;
        let now = Utc::now();
        inner.snippets.insert(
            id,
            Snippet {
                id,
                title: title.to_string(),
                content: content.to_string(),
                created: now,
                expires: now + Duration::days(expires_days),
            },
        );
        Ok(id)
    }

    async fn get(&self, id: i64) -> SiteResult<Option<Snippet>> {
        let inner = self.inner.read().expect("repository lock poisoned");
        Ok(inner
            .snippets
            .get(&id)
            .filter(|snippet| snippet.expires > Utc::now())
            .cloned())
    }

    async fn latest(&self) -> SiteResult<Vec<Snippet>> {
        let inner = self.inner.read().expect("repository lock poisoned");
        let now = Utc::now();
        let mut snippets: Vec<Snippet> = inner
            .snippets
            .values()
            .filter(|snippet| snippet.expires > now)
            .cloned()
            .collect();
        snippets.sort_by(|a, b| b.id.cmp(&a.id));
        snippets.truncate(10);
        Ok(snippets)
    }
}

impl UserRepository for MemorySiteRepository {
    async fn create(&self, name: &str, email: &str, password_hash: &str) -> SiteResult<()> {
        let mut inner = self.lock();
        if inner.users.iter().any(|user| user.email == email) {
            return Err(SiteError::DuplicateEmail);
        }
        inner.next_user_id += 1;
        let id = inner.next_user_id;
        inner.users.push(User {
            id,
            name: name.to_string(),
            email: email.to_string(),
            hashed_password: password_hash.to_string(),
            created: Utc::now(),
        });
        Ok(())
    }

    async fn authenticate(&self, email: &str, password: &str) -> SiteResult<i64> {
        let (id, hash) = {
            let inner = self.inner.read().expect("repository lock poisoned");
            match inner.users.iter().find(|user| user.email == email) {
                Some(user) => (user.id, user.hashed_password.clone()),
                None => return Err(SiteError::InvalidCredentials),
            }
        };

        if verify_password(&hash, password)? {
            Ok(id)
        } else {
            Err(SiteError::InvalidCredentials)
        }
    }

    async fn exists(&self, id: i64) -> SiteResult<bool> {
        let inner = self.inner.read().expect("repository lock poisoned");
        if inner.fail_user_lookups {
            return Err(SiteError::Internal("user lookup unavailable".to_string()));
        }
        Ok(inner.users.iter().any(|user| user.id == id))
    }
}
