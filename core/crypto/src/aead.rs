//! Authenticated encryption using AES-256-GCM.
//!
//! The cipher runs with a 16-byte nonce (GHASH-derived counter block) and a
//! detached 16-byte tag, so ciphertext and digest are stored separately.
//!
//! [`AesGcmEnvelope`] always holds both views of the data, plaintext and
//! ciphertext plus digest, and keeps them consistent under the current key
//! and nonce: replacing any of key derivation, nonce or plaintext
//! re-encrypts before the setter returns.

use aes_gcm::{
    aead::{consts::U16, generic_array::GenericArray, AeadInPlace, KeyInit},
    aes::Aes256,
    AesGcm,
};
use std::fmt;
use tracing::warn;
use zeroize::Zeroizing;

use crate::kdf::ScryptKdf;
use crate::keys::{fixed_length, DerivedKey, Nonce};
use coffer_common::{Error, Result};

/// Authentication tag size (16 bytes).
pub const MAC_LENGTH: usize = 16;

/// AES-256-GCM instantiated with a 16-byte nonce.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Encrypt `plaintext`, returning the ciphertext and the detached tag.
fn seal(key: &DerivedKey, nonce: &Nonce, plaintext: &[u8]) -> Result<(Vec<u8>, [u8; MAC_LENGTH])> {
    let cipher = Aes256Gcm16::new(GenericArray::from_slice(key.as_bytes()));

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(nonce.as_bytes()), b"", &mut buffer)
        .map_err(|e| Error::Crypto(format!("Encryption failed: {}", e)))?;

    let mut digest = [0u8; MAC_LENGTH];
    digest.copy_from_slice(&tag);
    Ok((buffer, digest))
}

/// Verify `digest` and decrypt `encrypted`.
///
/// # Errors
/// - Returns `Error::Authentication` on any tag mismatch
fn open(
    key: &DerivedKey,
    nonce: &Nonce,
    encrypted: &[u8],
    digest: &[u8; MAC_LENGTH],
) -> Result<Zeroizing<Vec<u8>>> {
    let cipher = Aes256Gcm16::new(GenericArray::from_slice(key.as_bytes()));

    let mut buffer = Zeroizing::new(encrypted.to_vec());
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(nonce.as_bytes()),
            b"",
            &mut buffer,
            GenericArray::from_slice(digest),
        )
        .map_err(|_| Error::Authentication)?;

    Ok(buffer)
}

/// Plaintext and its authenticated encryption under one key and nonce.
#[derive(Clone)]
pub struct AesGcmEnvelope {
    key_derivation: ScryptKdf,
    nonce: Nonce,
    decrypted: Zeroizing<Vec<u8>>,
    encrypted: Vec<u8>,
    digest: [u8; MAC_LENGTH],
}

impl AesGcmEnvelope {
    /// Encrypt path: build an envelope from plaintext.
    ///
    /// # Postconditions
    /// - `encrypted` and `digest` are the AES-GCM output for
    ///   (key, nonce, plaintext)
    pub fn seal(key_derivation: ScryptKdf, nonce: Nonce, decrypted: Vec<u8>) -> Result<Self> {
        let decrypted = Zeroizing::new(decrypted);
        let (encrypted, digest) = seal(key_derivation.key(), &nonce, &decrypted)?;
        Ok(Self {
            key_derivation,
            nonce,
            decrypted,
            encrypted,
            digest,
        })
    }

    /// Decrypt path: build an envelope from ciphertext and tag.
    ///
    /// # Errors
    /// - `Error::Validation` if `digest` is not MAC_LENGTH bytes
    /// - `Error::Authentication` if the tag does not verify (wrong key,
    ///   wrong nonce, or tampered ciphertext/tag)
    pub fn open(
        key_derivation: ScryptKdf,
        nonce: Nonce,
        encrypted: Vec<u8>,
        digest: &[u8],
    ) -> Result<Self> {
        let digest: [u8; MAC_LENGTH] = fixed_length(digest, "digest")?;
        let decrypted = open(key_derivation.key(), &nonce, &encrypted, &digest).map_err(|e| {
            warn!("Envelope failed authentication");
            e
        })?;
        Ok(Self {
            key_derivation,
            nonce,
            decrypted,
            encrypted,
            digest,
        })
    }

    /// Get the key derivation.
    pub fn key_derivation(&self) -> &ScryptKdf {
        &self.key_derivation
    }

    /// Get the nonce.
    pub fn nonce(&self) -> &Nonce {
        &self.nonce
    }

    /// Get the tag length in bytes.
    pub fn mac_length(&self) -> usize {
        MAC_LENGTH
    }

    /// Get the plaintext.
    pub fn decrypted(&self) -> &[u8] {
        &self.decrypted
    }

    /// Get the ciphertext (without tag).
    pub fn encrypted(&self) -> &[u8] {
        &self.encrypted
    }

    /// Get the authentication tag.
    pub fn digest(&self) -> &[u8; MAC_LENGTH] {
        &self.digest
    }

    /// Replace the plaintext and re-encrypt under the current key and nonce.
    pub fn set_decrypted(&mut self, decrypted: Vec<u8>) -> Result<()> {
        let decrypted = Zeroizing::new(decrypted);
        let (encrypted, digest) = seal(self.key_derivation.key(), &self.nonce, &decrypted)?;
        self.decrypted = decrypted;
        self.encrypted = encrypted;
        self.digest = digest;
        Ok(())
    }

    /// Replace the nonce and re-encrypt the current plaintext under it.
    pub fn set_nonce(&mut self, nonce: Nonce) -> Result<()> {
        let (encrypted, digest) = seal(self.key_derivation.key(), &nonce, &self.decrypted)?;
        self.nonce = nonce;
        self.encrypted = encrypted;
        self.digest = digest;
        Ok(())
    }

    /// Replace the key derivation and re-encrypt the current plaintext.
    pub fn set_key_derivation(&mut self, key_derivation: ScryptKdf) -> Result<()> {
        let (encrypted, digest) = seal(key_derivation.key(), &self.nonce, &self.decrypted)?;
        self.key_derivation = key_derivation;
        self.encrypted = encrypted;
        self.digest = digest;
        Ok(())
    }
}

impl fmt::Debug for AesGcmEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AesGcmEnvelope")
            .field("key_derivation", &self.key_derivation)
            .field("nonce", &self.nonce)
            .field("encrypted_len", &self.encrypted.len())
            .finish_non_exhaustive()
    }
}
