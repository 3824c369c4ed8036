//! Local message encryption
//!
//! Messages are sealed with AES-256-GCM under a fresh random key. The key
//! itself never leaves this process in the clear except towards the key
//! network, which wraps it under an access policy.
//!
//! Blob layout: `nonce (12 bytes) || ciphertext || tag (16 bytes)`.

use crate::{Error, Result};
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use secrecy::{ExposeSecret, SecretBox};

/// Size of an AES-GCM nonce in bytes
pub const NONCE_SIZE: usize = 12;
/// Size of the symmetric key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;
/// Size of the GCM authentication tag in bytes
pub const TAG_SIZE: usize = 16;

/// A 256-bit symmetric key, zeroized on drop
pub struct SymmetricKey(SecretBox<[u8; KEY_SIZE]>);

impl SymmetricKey {
    pub fn generate() -> Self {
        let key = Aes256Gcm::generate_key(OsRng);
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(key.as_slice());
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(SecretBox::new(Box::new(bytes)))
    }

    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let bytes: [u8; KEY_SIZE] = data.try_into().map_err(|_| {
            Error::Crypto(format!(
                "invalid key size, expected {}, got {}",
                KEY_SIZE,
                data.len()
            ))
        })?;
        Ok(Self::from_bytes(bytes))
    }

    pub fn from_hex(key_hex: &str) -> Result<Self> {
        let trimmed = key_hex.strip_prefix("0x").unwrap_or(key_hex);
        let bytes =
            hex::decode(trimmed).map_err(|e| Error::Crypto(format!("invalid key hex: {}", e)))?;
        Self::from_slice(&bytes)
    }

    /// Raw key bytes. Only the key network client should need these.
    pub fn expose(&self) -> &[u8; KEY_SIZE] {
        self.0.expose_secret()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.expose())
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(self.expose()))
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey([REDACTED])")
    }
}

/// Encrypt a message under a fresh key, returning the blob and the key
pub fn encrypt_string(message: &str) -> Result<(Vec<u8>, SymmetricKey)> {
    let key = SymmetricKey::generate();
    let blob = encrypt_with(&key, message.as_bytes())?;
    Ok((blob, key))
}

pub fn encrypt_with(key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = key
        .cipher()
        .encrypt(&nonce, plaintext)
        .map_err(|_| Error::Crypto("encrypt error".to_string()))?;

    let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(nonce.as_slice());
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt a blob produced by [`encrypt_string`] back into text
pub fn decrypt_string(blob: &[u8], key: &SymmetricKey) -> Result<String> {
    if blob.len() < NONCE_SIZE + TAG_SIZE {
        return Err(Error::Crypto(format!(
            "ciphertext too short: {} bytes",
            blob.len()
        )));
    }
    let (nonce, ciphertext) = blob.split_at(NONCE_SIZE);
    let plaintext = key
        .cipher()
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| Error::Crypto("decrypt error".to_string()))?;

    String::from_utf8(plaintext)
        .map_err(|e| Error::Crypto(format!("decrypted message is not UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt_recovers_message() {
        let (blob, key) = encrypt_string("hello").unwrap();
        assert_eq!(blob.len(), NONCE_SIZE + "hello".len() + TAG_SIZE);
        assert_eq!(decrypt_string(&blob, &key).unwrap(), "hello");
    }

    #[test]
    fn wrong_key_fails() {
        let (blob, _) = encrypt_string("hello").unwrap();
        let other = SymmetricKey::generate();
        assert!(matches!(decrypt_string(&blob, &other), Err(Error::Crypto(_))));
    }

    #[test]
    fn tampered_blob_fails() {
        let (mut blob, key) = encrypt_string("hello").unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0x01;
        assert!(decrypt_string(&blob, &key).is_err());
        assert!(decrypt_string(&blob[..10], &key).is_err());
    }

    #[test]
    fn key_hex_round_trip_and_size_check() {
        let key = SymmetricKey::generate();
        let parsed = SymmetricKey::from_hex(&format!("0x{}", key.to_hex())).unwrap();
        assert_eq!(key.expose(), parsed.expose());
        assert!(SymmetricKey::from_slice(&[0u8; 16]).is_err());
        assert_eq!(format!("{:?}", key), "SymmetricKey([REDACTED])");
    }
}
