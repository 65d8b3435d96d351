//! Server-Side Session Management
//!
//! Sessions are opaque-token key/value maps held server-side; the client
//! carries only the token in a cookie. [`load_and_save`] resolves the
//! session for each request, exposes a [`Session`] handle through request
//! extensions, and commits mutations back to the [`SessionStore`] when the
//! response is ready.
//!
//! Token lifecycle: an absent or unknown token starts a fresh empty
//! session; [`Session::renew_token`] issues a new token on privilege
//! changes (login/logout) so a pre-authentication token can never be
//! replayed into an authenticated session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::Value;

use crate::cookie::{self, CookieConfig};
use crate::crypto;

/// Default session lifetime
pub const DEFAULT_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// Session key/value payload
pub type SessionData = HashMap<String, Value>;

/// Session store backend errors
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Trait for session storage backends
///
/// The same token may be hit by concurrent requests; implementations must
/// serialize writes per token (coarse-grained last-write-wins is fine) and
/// never corrupt the mapping itself.
#[trait_variant::make(SessionStore: Send)]
pub trait LocalSessionStore {
    /// Load the payload for a token, `None` when unknown or expired
    async fn load(&self, token: &str) -> Result<Option<SessionData>, StoreError>;

    /// Save the payload under a token with the given lifetime
    async fn save(&self, token: &str, data: &SessionData, ttl: Duration) -> Result<(), StoreError>;

    /// Delete a token and its payload
    async fn delete(&self, token: &str) -> Result<(), StoreError>;
}

// ============================================================================
// Per-request session handle
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionStatus {
    Unchanged,
    Modified,
    Renewed,
    Destroyed,
}

#[derive(Debug)]
struct SessionInner {
    /// Token the session was loaded under, if any
    token: Option<String>,
    data: SessionData,
    status: SessionStatus,
}

/// Handle to the current request's session
///
/// Cheap to clone; all clones share the same state. Inserted into request
/// extensions by [`load_and_save`] and scoped to that request only.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<Mutex<SessionInner>>,
}

impl Session {
    pub(crate) fn new(token: Option<String>, data: SessionData) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                token,
                data,
                status: SessionStatus::Unchanged,
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionInner> {
        self.inner.lock().expect("session mutex poisoned")
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().data.get(key).cloned()
    }

    /// Get an integer value by key
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_i64())
    }

    /// Get a string value by key
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(str::to_string))
    }

    /// Store a value under a key
    pub fn put(&self, key: impl Into<String>, value: Value) {
        let mut inner = self.lock();
        if inner.status == SessionStatus::Destroyed {
            return;
        }
        inner.data.insert(key.into(), value);
        if inner.status == SessionStatus::Unchanged {
            inner.status = SessionStatus::Modified;
        }
    }

    /// Store an integer under a key
    pub fn put_int(&self, key: impl Into<String>, value: i64) {
        self.put(key, Value::from(value));
    }

    /// Store a string under a key
    pub fn put_string(&self, key: impl Into<String>, value: impl Into<String>) {
        self.put(key, Value::from(value.into()));
    }

    /// Read and delete a string value in one step
    pub fn pop_string(&self, key: &str) -> Option<String> {
        let mut inner = self.lock();
        let value = inner.data.remove(key)?;
        if inner.status == SessionStatus::Unchanged {
            inner.status = SessionStatus::Modified;
        }
        value.as_str().map(str::to_string)
    }

    /// Remove a key if present
    pub fn remove(&self, key: &str) {
        let mut inner = self.lock();
        if inner.data.remove(key).is_some() && inner.status == SessionStatus::Unchanged {
            inner.status = SessionStatus::Modified;
        }
    }

    /// Issue a new session token at commit time, keeping the data
    ///
    /// Called on privilege changes (login/logout) to prevent session
    /// fixation. The old token is deleted from the store.
    pub fn renew_token(&self) {
        let mut inner = self.lock();
        if inner.status != SessionStatus::Destroyed {
            inner.status = SessionStatus::Renewed;
        }
    }

    /// Destroy the session: data dropped, token deleted, cookie cleared
    pub fn destroy(&self) {
        let mut inner = self.lock();
        inner.data.clear();
        inner.status = SessionStatus::Destroyed;
    }

    fn snapshot(&self) -> (Option<String>, SessionData, SessionStatus) {
        let inner = self.lock();
        (inner.token.clone(), inner.data.clone(), inner.status)
    }
}

// ============================================================================
// Manager + middleware
// ============================================================================

/// Session manager: store handle plus cookie policy
#[derive(Clone)]
pub struct SessionManager<S>
where
    S: SessionStore + Clone + Send + Sync + 'static,
{
    store: Arc<S>,
    cookie: CookieConfig,
    ttl: Duration,
}

impl<S> SessionManager<S>
where
    S: SessionStore + Clone + Send + Sync + 'static,
{
    pub fn new(store: S, mut cookie: CookieConfig) -> Self {
        cookie.max_age_secs = Some(DEFAULT_TTL.as_secs() as i64);
        Self {
            store: Arc::new(store),
            cookie,
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self.cookie.max_age_secs = Some(ttl.as_secs() as i64);
        self
    }
}

fn server_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}

/// Middleware: load the session before the handler, commit it after
///
/// Mounted with `axum::middleware::from_fn_with_state`. Untouched fresh
/// sessions are not persisted and set no cookie.
pub async fn load_and_save<S>(
    State(manager): State<SessionManager<S>>,
    mut req: Request,
    next: Next,
) -> Response
where
    S: SessionStore + Clone + Send + Sync + 'static,
{
    let token = cookie::extract_cookie(req.headers(), &manager.cookie.name);

    let data = match &token {
        Some(token) => match manager.store.load(token).await {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(error = %e, "Session load failed");
                return server_error();
            }
        },
        None => None,
    };

    // An unknown or expired token starts a fresh session under a new token
    let session = match data {
        Some(data) => Session::new(token, data),
        None => Session::new(None, SessionData::new()),
    };

    req.extensions_mut().insert(session.clone());

    let mut response = next.run(req).await;

    let (old_token, data, status) = session.snapshot();

    let cookie_value = match status {
        SessionStatus::Destroyed => {
            if let Some(token) = &old_token {
                if let Err(e) = manager.store.delete(token).await {
                    tracing::error!(error = %e, "Session delete failed");
                    return server_error();
                }
            }
            cookie::delete_cookie_header(&manager.cookie)
        }
        SessionStatus::Renewed => {
            if let Some(token) = &old_token {
                if let Err(e) = manager.store.delete(token).await {
                    tracing::error!(error = %e, "Session delete failed");
                    return server_error();
                }
            }
            let new_token = crypto::random_token();
            if let Err(e) = manager.store.save(&new_token, &data, manager.ttl).await {
                tracing::error!(error = %e, "Session save failed");
                return server_error();
            }
            cookie::set_cookie_header(&manager.cookie, &new_token)
        }
        SessionStatus::Unchanged | SessionStatus::Modified => {
            // Nothing to persist for an untouched fresh session
            if old_token.is_none() && data.is_empty() {
                return response;
            }
            let token = old_token.unwrap_or_else(crypto::random_token);
            if let Err(e) = manager.store.save(&token, &data, manager.ttl).await {
                tracing::error!(error = %e, "Session save failed");
                return server_error();
            }
            cookie::set_cookie_header(&manager.cookie, &token)
        }
    };

    response
        .headers_mut()
        .append(header::SET_COOKIE, cookie_value);
    response
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Debug, Clone)]
struct StoredSession {
    data: SessionData,
    expires_at: Instant,
}

/// In-memory session store
///
/// Single-process backing store; clones share the same map. Expired
/// entries are treated as absent on load and reaped by
/// [`MemorySessionStore::cleanup_expired`].
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<RwLock<HashMap<String, StoredSession>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove expired entries, returning how many were reaped
    pub fn cleanup_expired(&self) -> usize {
        let mut map = self.inner.write().expect("session store lock poisoned");
        let now = Instant::now();
        let before = map.len();
        map.retain(|_, stored| stored.expires_at > now);
        before - map.len()
    }
}

impl SessionStore for MemorySessionStore {
    async fn load(&self, token: &str) -> Result<Option<SessionData>, StoreError> {
        let map = self.inner.read().expect("session store lock poisoned");
        Ok(map
            .get(token)
            .filter(|stored| stored.expires_at > Instant::now())
            .map(|stored| stored.data.clone()))
    }

    async fn save(&self, token: &str, data: &SessionData, ttl: Duration) -> Result<(), StoreError> {
        let mut map = self.inner.write().expect("session store lock poisoned");
        map.insert(
            token.to_string(),
            StoredSession {
                data: data.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, token: &str) -> Result<(), StoreError> {
        let mut map = self.inner.write().expect("session store lock poisoned");
        map.remove(token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use axum::routing::get;
    use axum::{Extension, Router, middleware};
    use tower::ServiceExt;

    #[test]
    fn test_put_get_and_pop() {
        let session = Session::new(None, SessionData::new());
        session.put_string("flash", "Snippet successfully created!");
        assert_eq!(
            session.get_string("flash").as_deref(),
            Some("Snippet successfully created!")
        );

        // pop is read-then-delete
        assert_eq!(
            session.pop_string("flash").as_deref(),
            Some("Snippet successfully created!")
        );
        assert_eq!(session.pop_string("flash"), None);
    }

    #[test]
    fn test_get_int() {
        let session = Session::new(None, SessionData::new());
        session.put_int("authenticatedUserID", 42);
        assert_eq!(session.get_int("authenticatedUserID"), Some(42));
        assert_eq!(session.get_int("missing"), None);
    }

    #[test]
    fn test_destroy_clears_data_and_wins_over_later_writes() {
        let session = Session::new(Some("tok".to_string()), SessionData::new());
        session.put_int("authenticatedUserID", 7);
        session.destroy();
        assert_eq!(session.get_int("authenticatedUserID"), None);

        // Writes after destroy are dropped at commit
        session.put_int("authenticatedUserID", 8);
        let (_, data, _) = session.snapshot();
        assert!(data.is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemorySessionStore::new();
        let mut data = SessionData::new();
        data.insert("k".to_string(), Value::from("v"));

        SessionStore::save(&store, "token-a", &data, Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            SessionStore::load(&store, "token-a").await.unwrap(),
            Some(data)
        );
        assert_eq!(SessionStore::load(&store, "token-b").await.unwrap(), None);

        SessionStore::delete(&store, "token-a").await.unwrap();
        assert_eq!(SessionStore::load(&store, "token-a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_store_expiry() {
        let store = MemorySessionStore::new();
        let data = SessionData::new();
        SessionStore::save(&store, "short-lived", &data, Duration::from_secs(0))
            .await
            .unwrap();

        assert_eq!(SessionStore::load(&store, "short-lived").await.unwrap(), None);
        assert_eq!(store.cleanup_expired(), 1);
        assert_eq!(store.cleanup_expired(), 0);
    }

    async fn counting_handler(Extension(session): Extension<Session>) -> &'static str {
        if session.get_string("seen").is_some() {
            "hit"
        } else {
            session.put_string("seen", "yes");
            "miss"
        }
    }

    fn test_router(store: MemorySessionStore) -> Router {
        let cookie = CookieConfig {
            secure: false,
            ..CookieConfig::default()
        };
        let manager = SessionManager::new(store, cookie);
        Router::new()
            .route("/", get(counting_handler))
            .layer(middleware::from_fn_with_state(
                manager,
                load_and_save::<MemorySessionStore>,
            ))
    }

    #[tokio::test]
    async fn test_middleware_issues_and_honors_cookie() {
        let store = MemorySessionStore::new();
        let router = test_router(store);

        let response = router
            .clone()
            .oneshot(HttpRequest::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("session cookie issued")
            .to_str()
            .unwrap()
            .to_string();
        let token_pair = set_cookie.split(';').next().unwrap().to_string();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"miss");

        let response = router
            .oneshot(
                HttpRequest::get("/")
                    .header(header::COOKIE, token_pair)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"hit");
    }

    #[tokio::test]
    async fn test_renew_token_invalidates_old_token() {
        let store = MemorySessionStore::new();
        let mut data = SessionData::new();
        data.insert("k".to_string(), Value::from("v"));
        SessionStore::save(&store, "old-token", &data, Duration::from_secs(60))
            .await
            .unwrap();

        let cookie = CookieConfig {
            secure: false,
            ..CookieConfig::default()
        };
        let manager = SessionManager::new(store.clone(), cookie);
        let router = Router::new()
            .route(
                "/renew",
                get(|Extension(session): Extension<Session>| async move {
                    session.renew_token();
                    "ok"
                }),
            )
            .layer(middleware::from_fn_with_state(
                manager,
                load_and_save::<MemorySessionStore>,
            ));

        let response = router
            .oneshot(
                HttpRequest::get("/renew")
                    .header(header::COOKIE, "session=old-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(!set_cookie.contains("old-token"));

        // Old token gone, data carried over under the new one
        assert_eq!(SessionStore::load(&store, "old-token").await.unwrap(), None);
        let new_token = set_cookie
            .split(';')
            .next()
            .unwrap()
            .trim_start_matches("session=")
            .to_string();
        let loaded = SessionStore::load(&store, &new_token).await.unwrap().unwrap();
        assert_eq!(loaded.get("k"), Some(&Value::from("v")));
    }
}
