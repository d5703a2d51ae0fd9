//! Salted, iterated SHA-256 password hashing.
//!
//! Stored form: `sha256$<iterations>$<salt hex>$<hash hex>`.

use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::billing::webhook::constant_time_eq;

/// Iterations applied to new hashes
pub const HASH_ITERATIONS: u32 = 10_000;

const SALT_LEN: usize = 16;
const SCHEME: &str = "sha256";

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let digest = derive(&salt, password, HASH_ITERATIONS);
    format!("{}${}${}${}", SCHEME, HASH_ITERATIONS, hex::encode(salt), hex::encode(digest))
}

/// Check a password against a stored hash. Malformed hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let parts: Vec<&str> = stored.split('$').collect();
    let [scheme, iterations, salt, expected] = parts.as_slice() else {
        return false;
    };
    if *scheme != SCHEME {
        return false;
    }

    let (Ok(iterations), Ok(salt), Ok(expected)) =
        (iterations.parse::<u32>(), hex::decode(salt), hex::decode(expected))
    else {
        return false;
    };
    if iterations == 0 {
        return false;
    }

    let digest = derive(&salt, password, iterations);
    constant_time_eq(&digest, &expected)
}

fn derive(salt: &[u8], password: &str, iterations: u32) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    let mut digest: [u8; 32] = hasher.finalize().into();

    for _ in 1..iterations {
        digest = Sha256::digest(digest).into();
    }
    digest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse");
        assert!(hash.starts_with("sha256$10000$"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn test_salts_differ() {
        assert_ne!(hash_password("same"), hash_password("same"));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "md5$1$00$00"));
        assert!(!verify_password("x", "sha256$abc$00$00"));
        assert!(!verify_password("x", "sha256$0$00$00"));
        assert!(!verify_password("x", "sha256$10$zz$00"));
    }
}
