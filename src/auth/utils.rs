//! Small helpers for credential normalization and refresh token handling.

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

/// Raw refresh tokens carry 256 bits of entropy.
pub const REFRESH_TOKEN_BYTES: usize = 32;
/// Anything longer than this cannot be one of ours; reject before hashing.
pub const MAX_REFRESH_TOKEN_LEN: usize = 256;

/// Normalize an email for lookup/uniqueness checks.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Create a new opaque refresh token from the OS CSPRNG.
///
/// The raw value is only returned to the client; the store keeps its hash.
pub(crate) fn generate_refresh_token() -> Result<String> {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate refresh token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Hash a refresh token so raw values never touch the store.
#[must_use]
pub fn hash_refresh_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Cheap shape check before a presented refresh token reaches the store.
#[must_use]
pub(crate) fn plausible_refresh_token(token: &str) -> bool {
    !token.is_empty()
        && token.len() <= MAX_REFRESH_TOKEN_LEN
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn refresh_token_has_256_bits() -> Result<()> {
        let token = generate_refresh_token()?;
        let decoded = Base64UrlUnpadded::decode_vec(&token)
            .map_err(|_| anyhow::anyhow!("refresh token is not base64url"))?;
        assert_eq!(decoded.len(), REFRESH_TOKEN_BYTES);
        assert!(plausible_refresh_token(&token));
        Ok(())
    }

    #[test]
    fn refresh_tokens_do_not_repeat() -> Result<()> {
        let mut seen = HashSet::new();
        for _ in 0..256 {
            assert!(seen.insert(generate_refresh_token()?));
        }
        Ok(())
    }

    #[test]
    fn hash_refresh_token_stable() {
        let first = hash_refresh_token("token");
        let second = hash_refresh_token("token");
        let different = hash_refresh_token("other");
        assert_eq!(first, second);
        assert_ne!(first, different);
        assert_eq!(first.len(), 32);
    }

    #[test]
    fn plausible_refresh_token_rejects_garbage() {
        assert!(!plausible_refresh_token(""));
        assert!(!plausible_refresh_token("has space"));
        assert!(!plausible_refresh_token("a.b.c"));
        assert!(!plausible_refresh_token(&"a".repeat(MAX_REFRESH_TOKEN_LEN + 1)));
    }
}
