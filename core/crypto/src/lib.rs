//! Cryptographic primitives for coffer.
//!
//! This module provides:
//! - Key derivation using scrypt (N = 2^20, r = 8, p = 1 by default)
//! - Authenticated encryption using AES-256-GCM with a 16-byte nonce and a
//!   detached 16-byte tag
//! - Key, salt and nonce types with automatic zeroization where it matters
//!
//! # Security Guarantees
//! - All key material is automatically zeroized on drop
//! - No passphrase, key or plaintext is ever logged
//! - Decryption failures never say whether the key or the data was wrong

pub mod aead;
pub mod kdf;
pub mod keys;

pub use aead::{AesGcmEnvelope, MAC_LENGTH};
pub use kdf::{derive_key, ScryptKdf, ScryptParams};
pub use keys::{DerivedKey, Nonce, Salt, KEY_LENGTH, NONCE_LENGTH, SALT_LENGTH};
