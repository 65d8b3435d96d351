//! Presentation Layer

pub mod forms;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod templates;
