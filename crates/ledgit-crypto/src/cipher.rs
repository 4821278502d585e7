use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;

use crate::error::CryptoError;
use crate::keys::RepoKey;

const NONCE_LEN: usize = 12;

/// AES-256-GCM envelope for private repository content.
///
/// Output layout is `nonce (12 bytes) || ciphertext+tag`. A fresh random
/// nonce is drawn for every message.
pub struct RepoCipher {
    cipher: Aes256Gcm,
}

impl RepoCipher {
    pub fn new(key: &RepoKey) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes())),
        }
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| CryptoError::Encryption)?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    pub fn decrypt(&self, envelope: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if envelope.len() < NONCE_LEN {
            return Err(CryptoError::Decryption);
        }
        let (nonce, ciphertext) = envelope.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::Decryption)
    }
}
