//! Stored client secret formats: an argon2 PHC string (`$argon2id$...`) or a
//! lowercase hex SHA-256 digest.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use caretrack_core::{CareError, Result};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

const ARGON2_PREFIX: &str = "$argon2";

/// Check a presented secret against its stored hash.
pub fn verify_secret(stored: &str, presented: &str) -> bool {
    if stored.starts_with(ARGON2_PREFIX) {
        return match PasswordHash::new(stored) {
            Ok(parsed) => Argon2::default()
                .verify_password(presented.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        };
    }
    let digest = hex::encode(Sha256::digest(presented.as_bytes()));
    let stored = stored.trim().to_ascii_lowercase();
    digest.as_bytes().ct_eq(stored.as_bytes()).into()
}

/// Argon2id PHC string for provisioning a new client secret.
pub fn hash_secret(secret: &str) -> Result<String> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|e| CareError::Internal(format!("salt encoding failed: {e}")))?;
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CareError::Internal(format!("secret hashing failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_hex_secrets_verify() {
        let stored = hex::encode(Sha256::digest(b"demo-secret"));
        assert!(verify_secret(&stored, "demo-secret"));
        assert!(verify_secret(&stored.to_uppercase(), "demo-secret"));
        assert!(!verify_secret(&stored, "demo-secret "));
        assert!(!verify_secret("", "demo-secret"));
        assert!(!verify_secret(&stored[..32], "demo-secret"));
    }

    #[test]
    fn argon2_secrets_verify() {
        let stored = hash_secret("s3cret").unwrap();
        assert!(stored.starts_with("$argon2id$"));
        assert!(verify_secret(&stored, "s3cret"));
        assert!(!verify_secret(&stored, "S3cret"));
    }

    #[test]
    fn malformed_argon2_string_never_verifies() {
        assert!(!verify_secret("$argon2id$garbage", "anything"));
    }
}
