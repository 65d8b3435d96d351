//! Request-Pipeline Middleware
//!
//! The router mounts these in a fixed order: panic recovery wraps access
//! logging wraps security headers for every route, static files and 404s
//! included. Dynamic routes additionally get session loading, CSRF
//! protection and authentication, in that order, with the login gate
//! applied per-route on top.

use std::any::Any;
use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use platform::session::Session;

use crate::domain::repository::UserRepository;
use crate::presentation::handlers::{
    AUTH_USER_ID_KEY, REDIRECT_AFTER_LOGIN_KEY, SiteAppState,
};

/// Marker extension present when the session's user id passed the
/// existence check this request
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub i64);

/// Security headers applied to every response
pub async fn secure_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;

    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(
            "default-src 'self'; style-src 'self' fonts.googleapis.com; font-src fonts.gstatic.com",
        ),
    );
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("origin-when-cross-origin"),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("deny"));
    headers.insert(header::X_XSS_PROTECTION, HeaderValue::from_static("0"));

    response
}

/// Access log, one line per completed request
///
/// The remote address is only available when the server is started with
/// `into_make_service_with_connect_info`; it logs as `-` otherwise.
pub async fn log_request(req: Request, next: Next) -> Response {
    let remote = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.to_string());
    let method = req.method().clone();
    let uri = req.uri().clone();
    let start = Instant::now();

    let response = next.run(req).await;

    tracing::info!(
        remote = %remote.as_deref().unwrap_or("-"),
        method = %method,
        uri = %uri,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "request"
    );
    response
}

/// Panic handler for `CatchPanicLayer`
///
/// Converts a handler panic into a plain 500 and asks the client to drop
/// the connection, leaving the server able to take the next request.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    };
    tracing::error!(panic = %detail, "Request handler panicked");

    let mut response = (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("close"));
    response
}

/// Resolve the session's user id against the user store
///
/// A lookup error fails closed with a 500; a user id whose account no
/// longer exists is dropped from the session and the request continues
/// anonymous.
pub async fn authenticate<R>(
    State(state): State<SiteAppState<R>>,
    mut req: Request,
    next: Next,
) -> Response
where
    R: UserRepository + Clone + Send + Sync + 'static,
{
    let Some(session) = req.extensions().get::<Session>().cloned() else {
        tracing::error!("Authentication mounted without session middleware");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
    };

    if let Some(id) = session.get_int(AUTH_USER_ID_KEY) {
        match state.repo.exists(id).await {
            Err(e) => {
                tracing::error!(error = %e, user_id = id, "Authentication lookup failed");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
                    .into_response();
            }
            Ok(true) => {
                req.extensions_mut().insert(AuthenticatedUser(id));
            }
            Ok(false) => {
                session.remove(AUTH_USER_ID_KEY);
            }
        }
    }

    next.run(req).await
}

/// Gate for routes that require a signed-in user
///
/// Anonymous requests are bounced to the login page, remembering where
/// they were headed. Authenticated pages are marked uncacheable.
pub async fn require_authentication(req: Request, next: Next) -> Response {
    if req.extensions().get::<AuthenticatedUser>().is_none() {
        if let Some(session) = req.extensions().get::<Session>() {
            session.put_string(REDIRECT_AFTER_LOGIN_KEY, req.uri().path());
        }
        return Redirect::to("/user/login").into_response();
    }

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}
