//! Salted SHA-256 password hashes (`{SSHA256}` scheme).
//!
//! The stored form is `{SSHA256}` followed by the base64 encoding of
//! `sha256(password || salt) || salt`.

use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

pub const SSHA256_PREFIX: &str = "{SSHA256}";

const DIGEST_LEN: usize = 32;
const SALT_LEN: usize = 8;

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill(&mut salt);
    hash_password_with_salt(password, &salt)
}

pub fn hash_password_with_salt(password: &str, salt: &[u8]) -> String {
    let mut encoded = digest(password, salt).to_vec();
    encoded.extend_from_slice(salt);
    format!(
        "{}{}",
        SSHA256_PREFIX,
        base64::engine::general_purpose::STANDARD.encode(encoded)
    )
}

/// Verify a password against a stored hash in constant time.
///
/// Malformed hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((expected, salt)) = decode(stored) else {
        return false;
    };
    digest(password, &salt).ct_eq(&expected).into()
}

/// Whether `stored` is a well-formed `{SSHA256}` hash.
pub fn is_valid_hash(stored: &str) -> bool {
    decode(stored).is_some()
}

fn decode(stored: &str) -> Option<([u8; DIGEST_LEN], Vec<u8>)> {
    let encoded = stored.strip_prefix(SSHA256_PREFIX)?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    if bytes.len() <= DIGEST_LEN {
        return None;
    }
    let (hash, salt) = bytes.split_at(DIGEST_LEN);
    Some((hash.try_into().ok()?, salt.to_vec()))
}

fn digest(password: &str, salt: &[u8]) -> [u8; DIGEST_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(salt);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("secret");
        assert!(hash.starts_with(SSHA256_PREFIX));
        assert!(is_valid_hash(&hash));
        assert!(verify_password("secret", &hash));
        assert!(!verify_password("Secret", &hash));
        assert!(!verify_password("", &hash));
    }

    #[test]
    fn test_salts_differ() {
        assert_ne!(hash_password("secret"), hash_password("secret"));
    }

    #[test]
    fn test_known_salt_is_deterministic() {
        let salt = b"12345678";
        let a = hash_password_with_salt("secret", salt);
        let b = hash_password_with_salt("secret", salt);
        assert_eq!(a, b);
        assert!(verify_password("secret", &a));
    }

    #[test]
    fn test_malformed_hashes() {
        assert!(!is_valid_hash("secret"));
        assert!(!is_valid_hash("{SSHA}abcd"));
        assert!(!is_valid_hash("{SSHA256}not base64!"));
        // Digest only, no salt
        let digest_only = base64::engine::general_purpose::STANDARD.encode([0u8; DIGEST_LEN]);
        assert!(!is_valid_hash(&format!("{}{}", SSHA256_PREFIX, digest_only)));
        assert!(!verify_password("secret", "secret"));
    }
}
