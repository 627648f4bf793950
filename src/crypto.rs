use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit, OsRng, Payload},
};
use anyhow::{Result, anyhow};
use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;

// AES Key size for AES256-GCM
const AES_KEY_SIZE: usize = 32; // 256 bits
const NONCE_SIZE: usize = 12; // 96 bits for GCM

/// Seals cookie values with AES-256-GCM. The cookie name is bound as
/// associated data, so a sealed `k_rt` does not open as `k_at`.
#[derive(Clone)]
pub struct CookieSealer {
    cipher: Aes256Gcm,
}

impl CookieSealer {
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != AES_KEY_SIZE {
            return Err(anyhow!(
                "Invalid AES key size: expected {AES_KEY_SIZE} bytes, got {}",
                key.len()
            ));
        }
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| anyhow!("Failed to create AES cipher: {}", e))?;
        Ok(Self { cipher })
    }

    /// Key from standard base64, e.g. the output of `openssl rand -base64 32`.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let key = general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| anyhow!("Failed to decode cookie secret: {}", e))?;
        Self::new(&key)
    }

    /// Fresh random key. Sealed cookies stop opening once the process exits.
    pub fn generate() -> Self {
        let mut key = [0u8; AES_KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        Self {
            cipher: Aes256Gcm::new(&key.into()),
        }
    }

    /// Returns URL-safe base64 of `nonce || ciphertext`.
    pub fn seal(&self, name: &str, value: &str) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(
                nonce,
                Payload {
                    msg: value.as_bytes(),
                    aad: name.as_bytes(),
                },
            )
            .map_err(|e| anyhow!("Failed to seal cookie: {}", e))?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(general_purpose::URL_SAFE_NO_PAD.encode(sealed))
    }

    pub fn open(&self, name: &str, sealed: &str) -> Result<String> {
        let raw = general_purpose::URL_SAFE_NO_PAD
            .decode(sealed)
            .map_err(|e| anyhow!("Failed to decode sealed cookie: {}", e))?;
        if raw.len() <= NONCE_SIZE {
            return Err(anyhow!("Sealed cookie is too short"));
        }

        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher
            .decrypt(
                Nonce::from_slice(nonce_bytes),
                Payload {
                    msg: ciphertext,
                    aad: name.as_bytes(),
                },
            )
            .map_err(|e| anyhow!("Failed to open cookie: {}", e))?;

        String::from_utf8(plaintext).map_err(|e| anyhow!("Sealed cookie is not UTF-8: {}", e))
    }
}
