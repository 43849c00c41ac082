//! Credential hashing and connection-secret derivation.

use rand::Rng;
use sha2::{Digest, Sha224};

/// Compute SHA-224 and return it as a lowercase hex string.
#[inline]
#[must_use]
pub fn sha224_hex(input: &str) -> String {
    let mut hasher = Sha224::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// The credential proxy clients present: `username.secret`.
#[must_use]
pub fn connection_secret(username: &str, secret: &str) -> String {
    format!("{username}.{secret}")
}

/// Random alphanumeric string, used for generated usernames and passwords.
#[must_use]
pub fn random_string(len: usize) -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha224_known_vector() {
        assert_eq!(
            sha224_hex("abc"),
            "23097d223405d8228642a477bda255b32aadbce4bda0b3f7e36c9da7"
        );
    }

    #[test]
    fn test_connection_secret_shape() {
        assert_eq!(connection_secret("alice", "x9Yz"), "alice.x9Yz");
    }

    #[test]
    fn test_random_string() {
        let s = random_string(6);
        assert_eq!(s.len(), 6);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
