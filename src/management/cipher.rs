use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha256};

use crate::error::{Result, SyncError};

const SEALED_PREFIX: &str = "enc:v1:";
const NONCE_LEN: usize = 12;

/// Seals token values before they reach the disk.
///
/// The AES-256-GCM key is the SHA-256 digest of the configured secret. A
/// sealed value reads `enc:v1:` followed by base64 of nonce and ciphertext,
/// with a fresh random nonce per value.
#[derive(Clone)]
pub struct TokenCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenCipher(..)")
    }
}

impl TokenCipher {
    /// # Errors
    ///
    /// [`SyncError::Config`] for an empty secret.
    pub fn from_secret(secret: &str) -> Result<Self> {
        if secret.trim().is_empty() {
            return Err(SyncError::Config(
                "encryption key must not be empty".to_string(),
            ));
        }
        let key = Sha256::digest(secret.as_bytes());
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| SyncError::Config(format!("cannot build cipher: {e}")))?;
        Ok(Self { cipher })
    }

    pub fn seal(&self, plaintext: &str) -> Result<String> {
        let nonce_bytes: [u8; NONCE_LEN] = rand::random();
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| SyncError::Store("cannot encrypt token".to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(format!("{SEALED_PREFIX}{}", STANDARD.encode(sealed)))
    }

    /// # Errors
    ///
    /// [`SyncError::Store`] when the value is not sealed, was sealed with
    /// another key, or was tampered with.
    pub fn open(&self, sealed: &str) -> Result<String> {
        let unreadable = || SyncError::Store("cannot decrypt stored token".to_string());

        let encoded = sealed.strip_prefix(SEALED_PREFIX).ok_or_else(unreadable)?;
        let bytes = STANDARD.decode(encoded).map_err(|_| unreadable())?;
        if bytes.len() <= NONCE_LEN {
            return Err(unreadable());
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| unreadable())?;
        String::from_utf8(plaintext).map_err(|_| unreadable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sealed_values_differ_and_open_back() {
        let cipher = TokenCipher::from_secret("correct horse").unwrap();
        let first = cipher.seal("BQD-access").unwrap();
        let second = cipher.seal("BQD-access").unwrap();

        assert!(first.starts_with(SEALED_PREFIX));
        assert!(!first.contains("BQD-access"));
        assert_ne!(first, second);
        assert_eq!(cipher.open(&first).unwrap(), "BQD-access");
        assert_eq!(cipher.open(&second).unwrap(), "BQD-access");
    }

    #[test]
    fn wrong_key_and_plain_values_are_refused() {
        let sealed = TokenCipher::from_secret("one").unwrap().seal("token").unwrap();
        let other = TokenCipher::from_secret("two").unwrap();

        assert!(matches!(other.open(&sealed), Err(SyncError::Store(_))));
        assert!(matches!(other.open("token"), Err(SyncError::Store(_))));
        assert!(matches!(other.open("enc:v1:AAAA"), Err(SyncError::Store(_))));
    }

    #[test]
    fn empty_secret_is_config_error() {
        assert!(matches!(
            TokenCipher::from_secret("  "),
            Err(SyncError::Config(_))
        ));
    }
}
