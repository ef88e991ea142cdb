//! Argon2id password hashing.

use anyhow::{Result, anyhow};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

/// Hash a plaintext password into a PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow!("Failed to hash password: {}", e))
}

/// Check a plaintext password against a stored PHC hash.
///
/// A mismatch is `Ok(false)`; only an unparseable hash is an error.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| anyhow!("Stored password hash is malformed: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_never_equals_plaintext() -> Result<()> {
        let hash = hash_password("correct horse battery")?;
        assert_ne!(hash, "correct horse battery");
        assert!(hash.starts_with("$argon2id$"));
        Ok(())
    }

    #[test]
    fn test_verify_accepts_only_original_password() -> Result<()> {
        let hash = hash_password("s3cret-pass")?;
        assert!(verify_password("s3cret-pass", &hash)?);
        assert!(!verify_password("s3cret-pasS", &hash)?);
        assert!(!verify_password("", &hash)?);
        Ok(())
    }

    #[test]
    fn test_same_password_hashes_differently() -> Result<()> {
        let a = hash_password("repeat-me")?;
        let b = hash_password("repeat-me")?;
        assert_ne!(a, b);
        Ok(())
    }

    #[test]
    fn test_malformed_hash_is_error() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }
}
