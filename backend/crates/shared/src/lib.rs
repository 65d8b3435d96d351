//! Shared Kernel - Domain-crossing minimal core
//!
//! This crate contains the "smallest core" of cross-cutting vocabulary:
//! - Common error types and result aliases
//! - The form validation accumulator and its rule predicates
//!
//! **Design Principle**: Only include things that are "hard to change"
//! and have consistent meaning across all domains.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod validate;
