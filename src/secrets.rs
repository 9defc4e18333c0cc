use std::fs;
use std::io::Write;
use std::path::Path;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use zeroize::Zeroize;

use crate::error::{ReporterError, Result};

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Symmetric key material for the token cipher.
pub struct EncryptionKey {
    key: [u8; KEY_LEN],
}

impl EncryptionKey {
    /// Fresh key from the OS random number generator.
    pub fn generate() -> Self {
        let key = Aes256Gcm::generate_key(&mut OsRng);
        Self { key: key.into() }
    }

    fn encoded(&self) -> String {
        URL_SAFE.encode(self.key)
    }

    fn from_encoded(text: &str) -> Result<Self> {
        let mut bytes = URL_SAFE
            .decode(text.trim())
            .map_err(|_| ReporterError::Decryption("key file is not valid base64".to_string()))?;
        if bytes.len() != KEY_LEN {
            let got = bytes.len();
            bytes.zeroize();
            return Err(ReporterError::Decryption(format!(
                "key file holds {got} bytes, expected {KEY_LEN}"
            )));
        }
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(Self { key })
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new((&self.key).into())
    }
}

impl Drop for EncryptionKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// Generate a key and write it to `path`, replacing any existing key file.
pub fn generate_key(path: &Path) -> Result<EncryptionKey> {
    let key = EncryptionKey::generate();
    write_key_file(path, &key).map_err(|e| ReporterError::io(path, e))?;
    tracing::debug!(path = %path.display(), "wrote encryption key");
    Ok(key)
}

#[cfg(unix)]
fn write_key_file(path: &Path, key: &EncryptionKey) -> std::io::Result<()> {
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(key.encoded().as_bytes())
}

#[cfg(not(unix))]
fn write_key_file(path: &Path, key: &EncryptionKey) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(key.encoded().as_bytes())
}

/// Read the key written by [`generate_key`].
pub fn load_key(path: &Path) -> Result<EncryptionKey> {
    let mut text = fs::read_to_string(path).map_err(|e| ReporterError::io(path, e))?;
    let key = EncryptionKey::from_encoded(&text);
    text.zeroize();
    key
}

pub fn encrypt(plaintext: &str, key: &EncryptionKey) -> Result<String> {
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let sealed = key
        .cipher()
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|e| ReporterError::Encryption(e.to_string()))?;

    let mut framed = Vec::with_capacity(NONCE_LEN + sealed.len());
    framed.extend_from_slice(&nonce);
    framed.extend_from_slice(&sealed);
    Ok(URL_SAFE.encode(framed))
}

/// Decrypt and authenticate a token. Any tampering, a wrong key or a
/// malformed encoding is a [`ReporterError::Decryption`].
pub fn decrypt(ciphertext: &str, key: &EncryptionKey) -> Result<String> {
    let framed = URL_SAFE
        .decode(ciphertext.trim())
        .map_err(|_| ReporterError::Decryption("ciphertext is not valid base64".to_string()))?;
    if framed.len() < NONCE_LEN + TAG_LEN {
        return Err(ReporterError::Decryption("ciphertext is truncated".to_string()));
    }

    let (nonce, sealed) = framed.split_at(NONCE_LEN);
    let plaintext = key
        .cipher()
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map_err(|_| {
            ReporterError::Decryption(
                "authentication failed - wrong key or tampered data".to_string(),
            )
        })?;

    String::from_utf8(plaintext)
        .map_err(|_| ReporterError::Decryption("token is not valid UTF-8".to_string()))
}
