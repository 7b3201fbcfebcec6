use crate::error::AppResult;

/// One-way salted hash of a plaintext password.
pub fn hash(plain: &str) -> AppResult<String> {
    Ok(bcrypt::hash(plain, bcrypt::DEFAULT_COST)?)
}

/// Verify a plaintext password against a stored hash. A malformed stored
/// hash verifies as false rather than erroring; the caller's response must
/// not depend on why verification failed.
pub fn verify(plain: &str, hash: &str) -> bool {
    bcrypt::verify(plain, hash).unwrap_or(false)
}
