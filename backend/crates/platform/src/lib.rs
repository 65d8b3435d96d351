//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (random tokens, constant-time compare)
//! - Password hashing (Argon2id, NIST SP 800-63B compliant)
//! - Cookie management
//! - Server-side session management (store trait + load/save middleware)
//! - CSRF protection middleware

pub mod cookie;
pub mod crypto;
pub mod csrf;
pub mod password;
pub mod session;
