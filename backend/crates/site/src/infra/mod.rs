//! Infrastructure Layer

pub mod memory;
pub mod postgres;

use platform::password::{ClearTextPassword, HashedPassword};

use crate::error::{SiteError, SiteResult};

/// Verify a submitted password against a stored PHC hash
///
/// A submission that cannot pass the signup policy can never match a
/// stored hash, so policy failures count as a plain mismatch.
pub(crate) fn verify_password(stored_hash: &str, password: &str) -> SiteResult<bool> {
    let clear = match ClearTextPassword::new(password.to_string()) {
        Ok(clear) => clear,
        Err(_) => return Ok(false),
    };

    HashedPassword::from_storage(stored_hash)
        .verify(&clear)
        .map_err(|e| SiteError::Internal(e.to_string()))
}
