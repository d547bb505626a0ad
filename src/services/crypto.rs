//! Secret-at-rest encryption for provider API keys.
//!
//! AES-256-GCM under a single process-wide master key supplied via the
//! `MASTER_KEY` environment variable (32 bytes, base64). Ciphertext and
//! nonce are stored base64-encoded in separate columns; plaintext keys only
//! exist in memory for the duration of one call.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

const NONCE_LEN: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid master key: {0}")]
    InvalidKey(String),

    #[error("encryption failed")]
    Encrypt,

    /// Wrong key, wrong nonce, or tampered ciphertext. AES-GCM does not
    /// distinguish, and neither do we.
    #[error("decryption failed")]
    Decrypt,

    #[error("invalid encoded secret: {0}")]
    Encoding(String),
}

/// An encrypted secret ready for storage.
#[derive(Debug, Clone)]
pub struct EncryptedSecret {
    pub ciphertext: String,
    pub iv: String,
}

/// Process-wide symmetric key wrapping the AES-256-GCM cipher.
#[derive(Clone, Debug)]
pub struct MasterKey(Key<Aes256Gcm>);

impl MasterKey {
    /// Parse a base64-encoded 32-byte key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKey`] on bad base64 or wrong length.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidKey(format!("expected 32 bytes, got {}", bytes.len())));
        }
        Ok(Self(Key::<Aes256Gcm>::clone_from_slice(&bytes)))
    }

    /// Encrypt a plaintext secret under a fresh random nonce.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Encrypt`] if the cipher fails.
    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedSecret, CryptoError> {
        let cipher = Aes256Gcm::new(&self.0);
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::Encrypt)?;
        Ok(EncryptedSecret { ciphertext: BASE64.encode(ciphertext), iv: BASE64.encode(nonce) })
    }

    /// Decrypt a stored secret.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Encoding`] on malformed base64 and
    /// [`CryptoError::Decrypt`] on authentication failure.
    pub fn decrypt(&self, ciphertext: &str, iv: &str) -> Result<String, CryptoError> {
        let ciphertext = BASE64
            .decode(ciphertext)
            .map_err(|e| CryptoError::Encoding(e.to_string()))?;
        let iv = BASE64.decode(iv).map_err(|e| CryptoError::Encoding(e.to_string()))?;
        if iv.len() != NONCE_LEN {
            return Err(CryptoError::Encoding(format!("expected {NONCE_LEN}-byte nonce, got {}", iv.len())));
        }

        let cipher = Aes256Gcm::new(&self.0);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&iv), ciphertext.as_ref())
            .map_err(|_| CryptoError::Decrypt)?;
        String::from_utf8(plaintext).map_err(|e| CryptoError::Encoding(e.to_string()))
    }
}
