//! Passphrase-based wrapping of the serialized cookie file.
//!
//! Layout: `salt(16) || nonce(12) || ciphertext+tag`. The key is derived with
//! Argon2id from the passphrase and the per-file salt, then used for
//! AES-256-GCM. Salt and nonce are fresh on every call to [`encrypt`].

use super::SessionError;
use aes_gcm::{
    aead::{rand_core::RngCore, Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use argon2::Argon2;
use secrecy::{ExposeSecret, SecretString};

pub const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

pub fn encrypt(plaintext: &[u8], passphrase: &SecretString) -> Result<Vec<u8>, SessionError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let key = derive_key(passphrase, &salt)?;
    let cipher = Aes256Gcm::new(&key);
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| SessionError::Corrupt(format!("encryption failed: {}", e)))?;

    let mut blob = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Reverse of [`encrypt`].
///
/// A blob too short to hold salt, nonce and tag is `Corrupt`. A tag mismatch
/// is `AuthFailed`: AES-GCM cannot tell a wrong passphrase from a modified
/// file, and neither case may yield plaintext.
pub fn decrypt(blob: &[u8], passphrase: &SecretString) -> Result<Vec<u8>, SessionError> {
    if blob.len() < SALT_LEN + NONCE_LEN + TAG_LEN {
        return Err(SessionError::Corrupt(format!(
            "encrypted blob is {} bytes, need at least {}",
            blob.len(),
            SALT_LEN + NONCE_LEN + TAG_LEN
        )));
    }

    let (salt, rest) = blob.split_at(SALT_LEN);
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

    let key = derive_key(passphrase, salt)?;
    let cipher = Aes256Gcm::new(&key);

    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| SessionError::AuthFailed)
}

fn derive_key(passphrase: &SecretString, salt: &[u8]) -> Result<Key<Aes256Gcm>, SessionError> {
    let mut key = Key::<Aes256Gcm>::default();
    Argon2::default()
        .hash_password_into(
            passphrase.expose_secret().as_bytes(),
            salt,
            key.as_mut_slice(),
        )
        .map_err(|e| SessionError::Corrupt(format!("key derivation failed: {}", e)))?;
    Ok(key)
}
