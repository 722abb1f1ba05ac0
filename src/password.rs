use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use lazy_static::lazy_static;
use tracing::error;

use crate::error::ApiError;

/// Hashes a plaintext password into an argon2 PHC string with a fresh random salt.
pub fn hash_password(plain: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            ApiError::Internal(e.to_string())
        })
}

/// Returns `false` for a wrong password; a stored hash that cannot be parsed is an error.
pub fn verify_password(plain: &str, hash: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        ApiError::Internal(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

lazy_static! {
    // Same parameters as real hashes, so a check against it costs the same.
    static ref DUMMY_HASH: String = hash_password("postboard-unknown-user")
        .expect("argon2 must be able to hash a constant password");
}

/// Checks `plain` against `hash`, or against a throwaway hash when there is no user.
///
/// The `None` case always answers `false` but still pays for a full argon2
/// verification, so a login for an unknown username takes as long as a wrong password.
pub fn verify_password_or_dummy(plain: &str, hash: Option<&str>) -> Result<bool, ApiError> {
    match hash {
        Some(hash) => verify_password(plain, hash),
        None => verify_password(plain, &DUMMY_HASH).map(|_| false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let hash = hash_password("testpass123").expect("hashing should succeed");
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("testpass123", &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hash = hash_password("testpass123").expect("hashing should succeed");
        assert!(!verify_password("testpass1234", &hash).expect("verify should not error"));
    }

    #[test]
    fn same_password_gets_different_salts() {
        let a = hash_password("12345").unwrap();
        let b = hash_password("12345").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        assert!(verify_password("anything", "not-a-valid-hash").is_err());
    }

    #[test]
    fn dummy_hash_is_a_real_argon2_hash() {
        assert!(PasswordHash::new(&DUMMY_HASH).is_ok());
        assert!(DUMMY_HASH.starts_with("$argon2id$"));
    }

    #[test]
    fn missing_user_never_verifies() {
        assert!(!verify_password_or_dummy("postboard-unknown-user", None).unwrap());
        assert!(!verify_password_or_dummy("anything", None).unwrap());
    }

    #[test]
    fn present_hash_is_checked_normally() {
        let hash = hash_password("12345").unwrap();
        assert!(verify_password_or_dummy("12345", Some(&hash)).unwrap());
        assert!(!verify_password_or_dummy("54321", Some(&hash)).unwrap());
    }
}
