// File: pointcast-core/src/crypto/mod.rs
//
// OAuth tokens are encrypted at rest; the credentials repository runs
// every token column through this before touching the database.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::rngs::OsRng;
use rand_core::TryRngCore;
use std::sync::Arc;

use crate::Error;

#[derive(Clone)]
pub struct TokenCipher {
    cipher: Arc<Aes256Gcm>,
}

impl TokenCipher {
    /// Requires a 32-byte key (AES-256).
    pub fn new(key_bytes: &[u8]) -> Result<Self, Error> {
        if key_bytes.len() != 32 {
            return Err(Error::KeyDerivation(format!(
                "AES-256 key must be 32 bytes, got {}",
                key_bytes.len()
            )));
        }
        let key = Key::<Aes256Gcm>::clone_from_slice(key_bytes);
        Ok(Self {
            cipher: Arc::new(Aes256Gcm::new(&key)),
        })
    }

    /// Builds a cipher from a base64-encoded 32-byte key, as supplied
    /// via `POINTCAST_ENC_KEY`.
    pub fn from_base64_key(encoded: &str) -> Result<Self, Error> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| Error::KeyDerivation(e.to_string()))?;
        Self::new(&bytes)
    }

    /// Encrypts `data` into base64(`nonce || ciphertext`), with a fresh
    /// 12-byte nonce each call.
    pub fn encrypt(&self, data: &str) -> Result<String, Error> {
        let mut nonce_bytes = [0u8; 12];
        let mut rng = OsRng;
        rng.try_fill_bytes(&mut nonce_bytes)
            .map_err(|e| Error::Encryption(e.to_string()))?;

        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = self
            .cipher
            .encrypt(nonce, data.as_bytes())
            .map_err(|e| Error::Encryption(e.to_string()))?;

        let mut combined = nonce_bytes.to_vec();
        combined.extend(ciphertext);
        Ok(BASE64.encode(combined))
    }

    /// Decrypts base64(`nonce || ciphertext`) back into a `String`.
    pub fn decrypt(&self, encrypted: &str) -> Result<String, Error> {
        let data = BASE64
            .decode(encrypted)
            .map_err(|e| Error::Decryption(e.to_string()))?;

        if data.len() < 12 {
            return Err(Error::Decryption(
                "Ciphertext too short (missing nonce)".to_owned(),
            ));
        }
        let (nonce_bytes, ciphertext) = data.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| Error::Decryption(e.to_string()))?;

        String::from_utf8(plaintext).map_err(|e| Error::Decryption(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_token() {
        let cipher = TokenCipher::new(&[7u8; 32]).unwrap();
        let token = "oauth:abcdef0123456789";
        let sealed = cipher.encrypt(token).unwrap();
        assert_ne!(sealed, token);
        assert_eq!(cipher.decrypt(&sealed).unwrap(), token);
    }

    #[test]
    fn nonces_differ_between_calls() {
        let cipher = TokenCipher::new(&[7u8; 32]).unwrap();
        let a = cipher.encrypt("same").unwrap();
        let b = cipher.encrypt("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_short_keys() {
        assert!(TokenCipher::new(&[1u8; 16]).is_err());
    }
}
