// Cryptographic utilities for generating and hashing sign-in nonces

use base64::{engine::general_purpose, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Generate a cryptographically secure nonce of the specified byte length
///
/// Token-based providers bind each identity token to a one-time nonce: the
/// raw value goes to the backend for verification while the provider flow
/// receives its SHA-256 digest.
///
/// # Arguments
///
/// * `length` - Number of bytes to generate (recommended: 16-32)
///
/// # Returns
///
/// A base64url-encoded string representing the specified bytes of random data
#[must_use]
pub fn generate_nonce(length: usize) -> String {
    let mut nonce = vec![0u8; length];
    rand::rng().fill_bytes(&mut nonce);
    general_purpose::URL_SAFE_NO_PAD.encode(nonce)
}

/// Hash a raw nonce with SHA-256 and return the lowercase hex digest
#[must_use]
pub fn sha256_hex(input: &str) -> String {
    use std::fmt::Write as _;

    let digest = Sha256::digest(input.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonce_length_and_uniqueness() {
        let first = generate_nonce(32);
        let second = generate_nonce(32);
        assert_ne!(first, second);
        // 32 bytes of base64url without padding is 43 characters
        assert_eq!(first.len(), 43);
    }

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
