//! Password hashing.

use crate::error::AuthError;
use bcrypt::{hash, verify, DEFAULT_COST};

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    hash(password, DEFAULT_COST).map_err(|e| AuthError::Hashing(e.to_string()))
}

/// False for a wrong password; error only when the stored hash is malformed.
pub fn verify_password(password: &str, hashed: &str) -> Result<bool, AuthError> {
    verify(password, hashed).map_err(|e| AuthError::Hashing(e.to_string()))
}
