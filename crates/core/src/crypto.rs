//! Payload-at-rest cipher.
//!
//! [`PayloadCipher`] encrypts and decrypts the opaque job payload with
//! AES-256-GCM under a single static key and a single static nonce, both
//! configured at process start. The output is base64 so it can live in a
//! text column.
//!
//! The fixed key/nonce pair makes encryption deterministic, which the stored
//! data format relies on, but it is a known cryptographic weakness: equal
//! payloads produce equal ciphertexts, and reusing a GCM nonce forfeits its
//! authenticity guarantees. A real deployment should move to per-record
//! random nonces; see DESIGN.md before changing the storage format.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Cipher construction or round-trip failure.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Invalid key material: {0}")]
    KeyMaterial(String),

    #[error("Encryption failed")]
    Encrypt,

    #[error("Decryption failed: {0}")]
    Decrypt(String),
}

/// Deterministic payload cipher with process-wide key material.
pub struct PayloadCipher {
    cipher: Aes256Gcm,
    nonce: [u8; NONCE_LEN],
}

impl PayloadCipher {
    /// Build a cipher from base64-encoded key and nonce.
    ///
    /// The key must decode to exactly 32 bytes and the nonce to 12 bytes;
    /// anything else is a configuration error, fatal at startup.
    pub fn new(key_b64: &str, nonce_b64: &str) -> Result<Self, CryptoError> {
        let key = STANDARD
            .decode(key_b64)
            .map_err(|e| CryptoError::KeyMaterial(format!("key is not valid base64: {e}")))?;
        if key.len() != KEY_LEN {
            return Err(CryptoError::KeyMaterial(format!(
                "key must decode to {KEY_LEN} bytes, got {}",
                key.len()
            )));
        }

        let nonce = STANDARD
            .decode(nonce_b64)
            .map_err(|e| CryptoError::KeyMaterial(format!("nonce is not valid base64: {e}")))?;
        let nonce: [u8; NONCE_LEN] = nonce.as_slice().try_into().map_err(|_| {
            CryptoError::KeyMaterial(format!("nonce must decode to {NONCE_LEN} bytes"))
        })?;

        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| CryptoError::KeyMaterial(format!("invalid cipher key: {e}")))?;

        Ok(Self { cipher, nonce })
    }

    /// Encrypt a plaintext payload to base64 ciphertext.
    ///
    /// Empty input returns empty output without invoking the cipher.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&self.nonce), plaintext.as_bytes())
            .map_err(|_| CryptoError::Encrypt)?;
        Ok(STANDARD.encode(ciphertext))
    }

    /// Decrypt a base64 ciphertext back to the plaintext payload.
    ///
    /// Empty input returns empty output without invoking the cipher.
    pub fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError> {
        if ciphertext.is_empty() {
            return Ok(String::new());
        }

        let raw = STANDARD
            .decode(ciphertext)
            .map_err(|e| CryptoError::Decrypt(format!("invalid base64: {e}")))?;
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(&self.nonce), raw.as_slice())
            .map_err(|_| CryptoError::Decrypt("cipher rejected ciphertext".into()))?;
        String::from_utf8(plain).map_err(|e| CryptoError::Decrypt(format!("not utf8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> PayloadCipher {
        let key = STANDARD.encode([7u8; KEY_LEN]);
        let nonce = STANDARD.encode([3u8; NONCE_LEN]);
        PayloadCipher::new(&key, &nonce).expect("valid key material")
    }

    #[test]
    fn round_trips_non_empty_payloads() {
        let cipher = test_cipher();
        for payload in [
            "{\"targetUrl\":\"https://example.com/form\"}",
            "plain text",
            "ünïcødé ✓",
        ] {
            let encrypted = cipher.encrypt(payload).expect("encrypt");
            assert_ne!(encrypted, payload);
            assert_eq!(cipher.decrypt(&encrypted).expect("decrypt"), payload);
        }
    }

    #[test]
    fn empty_input_passes_through_both_ways() {
        let cipher = test_cipher();
        assert_eq!(cipher.encrypt("").expect("encrypt"), "");
        assert_eq!(cipher.decrypt("").expect("decrypt"), "");
    }

    #[test]
    fn encryption_is_deterministic_under_fixed_key_material() {
        let cipher = test_cipher();
        let a = cipher.encrypt("same payload").expect("encrypt");
        let b = cipher.encrypt("same payload").expect("encrypt");
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_short_key() {
        let key = STANDARD.encode([1u8; 16]);
        let nonce = STANDARD.encode([0u8; NONCE_LEN]);
        assert!(matches!(
            PayloadCipher::new(&key, &nonce),
            Err(CryptoError::KeyMaterial(_))
        ));
    }

    #[test]
    fn rejects_tampered_ciphertext() {
        let cipher = test_cipher();
        let encrypted = cipher.encrypt("payload").expect("encrypt");
        let mut raw = STANDARD.decode(&encrypted).expect("base64");
        raw[0] ^= 0xff;
        let tampered = STANDARD.encode(raw);
        assert!(matches!(
            cipher.decrypt(&tampered),
            Err(CryptoError::Decrypt(_))
        ));
    }
}
