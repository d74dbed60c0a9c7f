//! Password hashing and token generation.

use argon2::password_hash::rand_core::OsRng as SaltRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use thiserror::Error;

use crate::config;

const SESSION_TOKEN_BYTES: usize = 32;
const REFERRAL_CODE_BYTES: usize = 4;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid argon2 parameters: {0}")]
    Params(argon2::Error),

    #[error("password hashing failed: {0}")]
    Hash(argon2::password_hash::Error),
}

/// Hashing and random-token helper shared through [`crate::AppState`].
pub struct Crypto {
    hasher: Argon2<'static>,
}

impl Crypto {
    /// Create a new [`Crypto`] from the optional `argon2` configuration
    /// section.
    pub fn new(config: Option<config::Argon2>) -> Result<Self, CryptoError> {
        let config = config.unwrap_or_default();
        let params = Params::new(
            config.memory_cost,
            config.iterations,
            config.parallelism,
            Some(config.hash_length),
        )
        .map_err(CryptoError::Params)?;

        Ok(Self {
            hasher: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a plaintext password with Argon2id.
    pub fn hash_password(&self, password: &str) -> Result<String, CryptoError> {
        let salt = SaltString::generate(&mut SaltRng);
        let hash = self
            .hasher
            .hash_password(password.as_bytes(), &salt)
            .map_err(CryptoError::Hash)?;

        Ok(hash.to_string())
    }

    /// Check a plaintext password against a stored hash. Parameters are
    /// read back from the encoded hash itself.
    pub fn verify_password(&self, password: &str, hash: &str) -> bool {
        PasswordHash::new(hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }

    /// Generate an opaque bearer-session token.
    pub fn session_token(&self) -> String {
        let mut bytes = [0u8; SESSION_TOKEN_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Generate a short referral code for a new profile.
    pub fn referral_code(&self) -> String {
        let mut bytes = [0u8; REFERRAL_CODE_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        hex::encode_upper(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex_lite::Regex;

    fn fast_crypto() -> Crypto {
        Crypto::new(Some(config::Argon2 {
            memory_cost: 1024,
            iterations: 1,
            parallelism: 1,
            hash_length: 32,
        }))
        .unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let crypto = fast_crypto();
        let hash = crypto.hash_password("P$soW%920$n&").unwrap();

        assert!(
            Regex::new(r"^\$argon2id\$v=\d+\$m=\d+,t=\d+,p=\d+\$")
                .unwrap()
                .is_match(&hash)
        );
        assert!(crypto.verify_password("P$soW%920$n&", &hash));
        assert!(!crypto.verify_password("wrong-password", &hash));
        assert!(!crypto.verify_password("P$soW%920$n&", "not-a-hash"));
    }

    #[test]
    fn test_tokens_are_unique() {
        let crypto = fast_crypto();

        let token = crypto.session_token();
        assert_eq!(token.len(), SESSION_TOKEN_BYTES * 2);
        assert_ne!(token, crypto.session_token());

        let code = crypto.referral_code();
        assert_eq!(code.len(), REFERRAL_CODE_BYTES * 2);
        assert_eq!(code, code.to_uppercase());
    }
}
