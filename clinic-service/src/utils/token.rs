//! Opaque token generation and hashing. Invitations, verification tokens,
//! refresh sessions, and API keys all store the SHA-256 hex of the token;
//! the plaintext leaves the service exactly once.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Byte length of opaque tokens (256 bits of entropy).
const TOKEN_BYTES: usize = 32;

/// Generate an opaque token from the OS CSPRNG, hex encoded.
pub fn generate_opaque_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hash a token for storage.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_64_hex_chars() {
        let token = generate_opaque_token();
        assert_eq!(token.len(), TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generated_tokens_are_unique() {
        let a = generate_opaque_token();
        let b = generate_opaque_token();
        assert_ne!(a, b);
    }

    #[test]
    fn hash_is_stable_and_distinct_from_input() {
        let token = generate_opaque_token();
        let hash = hash_token(&token);
        assert_eq!(hash, hash_token(&token));
        assert_ne!(hash, token);
        assert_eq!(hash.len(), 64);
    }
}
