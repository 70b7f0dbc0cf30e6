// Password hashing and verification service

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;

use crate::auth::error::AuthError;
use crate::validation::validate_password_length;

/// Password service for hashing and verification
///
/// Argon2id with a fixed cost chosen at construction. Hashing is CPU-bound
/// on purpose; async callers should go through `hash_async`/`verify_async`.
#[derive(Clone)]
pub struct PasswordService {
    params: Params,
    min_length: usize,
}

impl PasswordService {
    /// Create a PasswordService with the given Argon2 cost
    pub fn new(iterations: u32, memory_kib: u32, min_length: usize) -> Result<Self, AuthError> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?;
        Ok(Self { params, min_length })
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password into a salted PHC string
    pub fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        self.hasher()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::PasswordHash(e.to_string()))
    }

    /// Verify a password against a stored hash
    ///
    /// Returns false on mismatch and on any malformed hash.
    pub fn verify_password(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            tracing::warn!("Stored password hash could not be parsed");
            return false;
        };
        // params come from the PHC string; our instance only picks the algorithm family
        self.hasher()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// Hash on the blocking pool
    pub async fn hash_async(&self, password: String) -> Result<String, AuthError> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.hash_password(&password))
            .await
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?
    }

    /// Verify on the blocking pool; a failed join counts as a mismatch
    pub async fn verify_async(&self, password: String, hash: String) -> bool {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.verify_password(&password, &hash))
            .await
            .unwrap_or(false)
    }

    /// Validate password strength requirements
    pub fn validate_password_strength(&self, password: &str) -> Result<(), AuthError> {
        validate_password_length(password, self.min_length).map_err(AuthError::Validation)
    }
}
