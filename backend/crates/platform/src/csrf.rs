//! CSRF Protection Middleware
//!
//! Session-bound anti-forgery tokens. Safe methods ensure a token exists
//! in the session so templates can embed it; state-changing methods must
//! submit the token back (form field or header) and are rejected with 400
//! before the handler runs otherwise.
//!
//! A token lives inside one session's data, so a token issued for session
//! A can never validate for session B. [`rotate`] drops the stored token;
//! login/logout call it after renewing the session token so tokens never
//! survive a privilege change.

use axum::body::{Body, to_bytes};
use axum::extract::Request;
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::crypto;
use crate::session::Session;

/// Form field carrying the token
pub const TOKEN_FIELD: &str = "csrf_token";

/// Request header alternative to the form field
pub const TOKEN_HEADER: &str = "x-csrf-token";

/// Session key the token is stored under
const SESSION_KEY: &str = "csrfToken";

/// Upper bound for buffered form bodies
const MAX_FORM_BYTES: usize = 1 << 20;

/// Return the session's CSRF token, minting one if absent
pub fn token(session: &Session) -> String {
    if let Some(existing) = session.get_string(SESSION_KEY) {
        return existing;
    }
    let fresh = crypto::random_token();
    session.put_string(SESSION_KEY, fresh.clone());
    fresh
}

/// Drop the stored token so the next request mints a fresh one
pub fn rotate(session: &Session) {
    session.remove(SESSION_KEY);
}

fn is_safe(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

fn reject() -> Response {
    (StatusCode::BAD_REQUEST, "Bad Request").into_response()
}

/// Middleware guarding state-changing routes
///
/// Must run inside [`crate::session::load_and_save`]; the buffered form
/// body is replayed so downstream extractors still see it.
pub async fn guard(req: Request, next: Next) -> Response {
    let Some(session) = req.extensions().get::<Session>().cloned() else {
        tracing::error!("CSRF guard mounted without session middleware");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
    };

    if is_safe(req.method()) {
        // Make sure templates have a token to embed
        let _ = token(&session);
        return next.run(req).await;
    }

    let Some(expected) = session.get_string(SESSION_KEY) else {
        tracing::warn!(method = %req.method(), path = %req.uri().path(), "CSRF token absent from session");
        return reject();
    };

    let header_token = req
        .headers()
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let (req, submitted) = match header_token {
        Some(token) => (req, Some(token)),
        None => {
            let (parts, body) = req.into_parts();
            let bytes = match to_bytes(body, MAX_FORM_BYTES).await {
                Ok(bytes) => bytes,
                Err(_) => return reject(),
            };
            let submitted = serde_urlencoded::from_bytes::<Vec<(String, String)>>(&bytes)
                .ok()
                .and_then(|pairs| {
                    pairs
                        .into_iter()
                        .find(|(key, _)| key == TOKEN_FIELD)
                        .map(|(_, value)| value)
                });
            (Request::from_parts(parts, Body::from(bytes)), submitted)
        }
    };

    match submitted {
        Some(token) if crypto::constant_time_eq(token.as_bytes(), expected.as_bytes()) => {
            next.run(req).await
        }
        _ => {
            tracing::warn!(method = %req.method(), path = %req.uri().path(), "CSRF token mismatch");
            reject()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookie::CookieConfig;
    use crate::session::{MemorySessionStore, SessionData, SessionManager, SessionStore, load_and_save};
    use axum::http::{Request as HttpRequest, header};
    use axum::routing::post;
    use axum::{Router, middleware};
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    #[test]
    fn test_token_is_stable_until_rotated() {
        let session = Session::new(None, SessionData::new());
        let first = token(&session);
        assert_eq!(token(&session), first);

        rotate(&session);
        let second = token(&session);
        assert_ne!(first, second);
        assert_eq!(second.len(), 43);
    }

    async fn seeded_router() -> (Router, String) {
        let store = MemorySessionStore::new();
        let mut data = SessionData::new();
        data.insert("csrfToken".to_string(), Value::from("known-token"));
        store
            .save("tok", &data, Duration::from_secs(60))
            .await
            .unwrap();

        let manager = SessionManager::new(
            store,
            CookieConfig {
                secure: false,
                ..CookieConfig::default()
            },
        );
        let router = Router::new()
            .route("/submit", post(|body: String| async move { body }))
            .layer(middleware::from_fn(guard))
            .layer(middleware::from_fn_with_state(
                manager,
                load_and_save::<MemorySessionStore>,
            ));
        (router, "session=tok".to_string())
    }

    fn form_post(cookie: &str, body: &'static str) -> HttpRequest<Body> {
        HttpRequest::post("/submit")
            .header(header::COOKIE, cookie)
            .header(
                header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_token_passes_and_body_is_replayed() {
        let (router, cookie) = seeded_router().await;
        let response = router
            .oneshot(form_post(&cookie, "title=Hi&csrf_token=known-token"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // The handler still sees the full buffered body
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"title=Hi&csrf_token=known-token");
    }

    #[tokio::test]
    async fn test_header_token_accepted() {
        let (router, cookie) = seeded_router().await;
        let response = router
            .oneshot(
                HttpRequest::post("/submit")
                    .header(header::COOKIE, cookie)
                    .header(TOKEN_HEADER, "known-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_token_rejected() {
        let (router, cookie) = seeded_router().await;
        let response = router
            .oneshot(form_post(&cookie, "title=Hi"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_mismatched_token_rejected() {
        let (router, cookie) = seeded_router().await;
        let response = router
            .oneshot(form_post(&cookie, "title=Hi&csrf_token=wrong"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_token_from_other_session_rejected() {
        // A fresh session (no cookie) never accepts another session's token
        let (router, _) = seeded_router().await;
        let response = router
            .oneshot(
                HttpRequest::post("/submit")
                    .header(
                        header::CONTENT_TYPE,
                        "application/x-www-form-urlencoded",
                    )
                    .body(Body::from("csrf_token=known-token"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
