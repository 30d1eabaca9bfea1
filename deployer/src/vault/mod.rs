//! Credential vault: symmetric sealing of provider secrets at rest.
//!
//! Ciphertexts are `base64(nonce || ciphertext+tag)` produced with
//! ChaCha20-Poly1305 under a key derived from the configured secret with
//! SHA-256. Every call to [`Vault::encrypt`] draws a fresh random nonce, so
//! sealing the same secret twice yields different ciphertexts.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::errors::SitecastError;

const NONCE_LEN: usize = 12;

/// Seal/open contract used at the persistence edge.
///
/// `decrypt` never fails: malformed, tampered or empty input yields an empty
/// string and callers must treat that as a missing secret.
pub trait Vault: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String, SitecastError>;

    fn decrypt(&self, ciphertext: &str) -> String;
}

/// ChaCha20-Poly1305 vault with per-record random nonces
pub struct SealedVault {
    cipher: ChaCha20Poly1305,
}

impl SealedVault {
    /// Derive the vault key from a configured secret
    pub fn new(secret: &SecretString) -> Self {
        let digest = Sha256::digest(secret.expose_secret().as_bytes());
        let key = Key::from_slice(digest.as_slice());
        Self {
            cipher: ChaCha20Poly1305::new(key),
        }
    }
}

impl std::fmt::Debug for SealedVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SealedVault").finish_non_exhaustive()
    }
}

impl Vault for SealedVault {
    fn encrypt(&self, plaintext: &str) -> Result<String, SitecastError> {
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| SitecastError::VaultError(format!("encryption failed: {}", e)))?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(nonce.as_slice());
        out.extend_from_slice(&sealed);
        Ok(STANDARD.encode(out))
    }

    fn decrypt(&self, ciphertext: &str) -> String {
        if ciphertext.is_empty() {
            return String::new();
        }

        let raw = match STANDARD.decode(ciphertext.trim()) {
            Ok(raw) if raw.len() > NONCE_LEN => raw,
            Ok(_) => {
                warn!("Decryption failed: ciphertext too short");
                return String::new();
            }
            Err(e) => {
                warn!("Decryption failed: {}", e);
                return String::new();
            }
        };

        let (nonce, sealed) = raw.split_at(NONCE_LEN);
        match self.cipher.decrypt(Nonce::from_slice(nonce), sealed) {
            Ok(plain) => String::from_utf8(plain).unwrap_or_default(),
            Err(_) => {
                warn!("Decryption failed: authentication tag mismatch");
                String::new()
            }
        }
    }
}
