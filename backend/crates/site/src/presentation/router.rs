//! Site Router

use std::path::PathBuf;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Router, middleware};
use platform::csrf;
use platform::session::{SessionManager, SessionStore, load_and_save};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;

use crate::domain::repository::{SnippetRepository, UserRepository};
use crate::presentation::handlers::{self, SiteAppState};
use crate::presentation::middleware::{
    authenticate, log_request, panic_response, require_authentication, secure_headers,
};

/// Site configuration
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Directory served under `/static`
    pub static_dir: PathBuf,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            static_dir: PathBuf::from("ui/static"),
        }
    }
}

/// Assemble the full site router
///
/// `/ping` and `/static` sit outside the session chain; everything else
/// runs through session loading, CSRF protection and authentication.
pub fn site_router<R, S>(repo: R, sessions: SessionManager<S>, config: SiteConfig) -> Router
where
    R: SnippetRepository + UserRepository + Clone + Send + Sync + 'static,
    S: SessionStore + Clone + Send + Sync + 'static,
{
    let state = SiteAppState {
        repo: Arc::new(repo),
    };

    // Outermost first: the session must wrap both the CSRF guard and the
    // authentication check
    let dynamic = ServiceBuilder::new()
        .layer(middleware::from_fn_with_state(sessions, load_and_save::<S>))
        .layer(middleware::from_fn(csrf::guard))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            authenticate::<R>,
        ));

    let protected = Router::new()
        .route(
            "/snippet/create",
            get(handlers::snippet_create_form).post(handlers::snippet_create::<R>),
        )
        .route("/user/logout", post(handlers::user_logout))
        .route_layer(middleware::from_fn(require_authentication));

    Router::new()
        .route("/", get(handlers::home::<R>))
        .route("/snippet/view/{id}", get(handlers::snippet_view::<R>))
        .route(
            "/user/signup",
            get(handlers::user_signup_form).post(handlers::user_signup::<R>),
        )
        .route(
            "/user/login",
            get(handlers::user_login_form).post(handlers::user_login::<R>),
        )
        .merge(protected)
        .layer(dynamic)
        .with_state(state)
        .route("/ping", get(handlers::ping))
        .nest_service("/static", ServeDir::new(&config.static_dir))
        // Unknown paths and methods share one 404 path, outside the
        // session chain
        .fallback(handlers::not_found)
        .method_not_allowed_fallback(handlers::not_found)
        .layer(middleware::from_fn(secure_headers))
        .layer(middleware::from_fn(log_request))
        .layer(CatchPanicLayer::custom(panic_response))
}
