//! Snippet Publishing Site
//!
//! Clean Architecture structure:
//! - `domain/` - Entities and repository traits
//! - `infra/` - PostgreSQL and in-memory implementations
//! - `presentation/` - HTTP handlers, forms, templates, middleware, router
//!
//! ## Features
//! - Create and view text snippets with a fixed expiry
//! - User signup/login with email + password
//! - Server-side sessions with flash messages
//! - CSRF protection on all state-changing routes
//!
//! ## Security Model
//! - Passwords hashed with Argon2id (NIST SP 800-63B compliant)
//! - Session token renewed on every privilege change
//! - Authentication gate fails closed on lookup errors
//! - Security headers applied to every response, static and 404 included

pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use error::{SiteError, SiteResult};
pub use infra::memory::MemorySiteRepository;
pub use infra::postgres::PgSiteRepository;
pub use presentation::router::{SiteConfig, site_router};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

pub mod handlers {
    pub use crate::presentation::handlers::*;
}

pub mod middleware {
    pub use crate::presentation::middleware::*;
}

pub mod router {
    pub use crate::presentation::router::*;
}
