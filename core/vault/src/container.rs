//! On-disk container format.
//!
//! A container is a JSON object describing the cipher and key-derivation
//! schemes by `class` tag, with binary fields in standard base64:
//!
//! ```json
//! {"encrypter": {"class": "AESGCM",
//!                "key_derivation": {"class": "Scrypt", "salt": "...", "key_length": 32,
//!                                   "cost": 1048576, "block_size": 8, "parallelization": 1},
//!                "nonce": "...", "mac_length": 16, "digest": "...", "encrypted": "..."}}
//! ```
//!
//! Unknown scheme tags are rejected; there is no fallback scheme.

use serde::{Deserialize, Serialize};

use coffer_common::{Error, Result, SensitiveBytes};
use coffer_crypto::{AesGcmEnvelope, Nonce, Salt, ScryptKdf, ScryptParams, MAC_LENGTH};

/// Top-level container object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub encrypter: EncrypterRecord,
}

/// Cipher scheme and its output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class")]
pub enum EncrypterRecord {
    #[serde(rename = "AESGCM")]
    AesGcm {
        key_derivation: KeyDerivationRecord,
        #[serde(with = "base64_field")]
        nonce: Vec<u8>,
        mac_length: usize,
        #[serde(with = "base64_field")]
        digest: Vec<u8>,
        #[serde(with = "base64_field")]
        encrypted: Vec<u8>,
    },
}

/// Key-derivation scheme and its public parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class")]
pub enum KeyDerivationRecord {
    Scrypt {
        #[serde(with = "base64_field")]
        salt: Vec<u8>,
        key_length: usize,
        cost: u64,
        block_size: u32,
        parallelization: u32,
    },
}

impl Container {
    /// Describe an envelope. The passphrase and plaintext are not included.
    pub fn from_envelope(envelope: &AesGcmEnvelope) -> Self {
        let kdf = envelope.key_derivation();
        let params = kdf.params();
        Self {
            encrypter: EncrypterRecord::AesGcm {
                key_derivation: KeyDerivationRecord::Scrypt {
                    salt: kdf.salt().as_bytes().to_vec(),
                    key_length: params.key_length,
                    cost: params.cost,
                    block_size: params.block_size,
                    parallelization: params.parallelization,
                },
                nonce: envelope.nonce().as_bytes().to_vec(),
                mac_length: envelope.mac_length(),
                digest: envelope.digest().to_vec(),
                encrypted: envelope.encrypted().to_vec(),
            },
        }
    }

    /// Parse container bytes.
    ///
    /// # Errors
    /// - `Error::Format` on malformed JSON, missing keys, bad base64 or an
    ///   unknown `class` tag
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::Format(e.to_string()))
    }

    /// Render container bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// The scrypt parameters recorded in the container.
    pub fn kdf_params(&self) -> ScryptParams {
        let EncrypterRecord::AesGcm { key_derivation, .. } = &self.encrypter;
        let KeyDerivationRecord::Scrypt {
            key_length,
            cost,
            block_size,
            parallelization,
            ..
        } = key_derivation;
        ScryptParams {
            key_length: *key_length,
            cost: *cost,
            block_size: *block_size,
            parallelization: *parallelization,
        }
    }

    /// Derive the key for `passphrase` and authenticate and decrypt.
    ///
    /// Lengths, the tag size and the scrypt parameters are checked before
    /// the key is derived.
    ///
    /// # Errors
    /// - `Error::Format` if `mac_length` is not 16 or the scrypt parameters
    ///   fall outside [`ScryptParams::check_bounds`]
    /// - `Error::Validation` on a wrong-length salt, nonce or digest
    /// - `Error::Authentication` if the passphrase is wrong or the data was
    ///   tampered with
    pub fn open(&self, passphrase: SensitiveBytes) -> Result<AesGcmEnvelope> {
        let EncrypterRecord::AesGcm {
            key_derivation,
            nonce,
            mac_length,
            digest,
            encrypted,
        } = &self.encrypter;
        let KeyDerivationRecord::Scrypt { salt, .. } = key_derivation;

        if *mac_length != MAC_LENGTH {
            return Err(Error::Format(format!(
                "Unsupported mac_length {}: expected {}",
                mac_length, MAC_LENGTH
            )));
        }
        let params = self.kdf_params();
        if let Err(error) = params.check_bounds() {
            return Err(Error::Format(format!(
                "Unsupported key derivation parameters: {}",
                error
            )));
        }
        if digest.len() != MAC_LENGTH {
            return Err(Error::Validation(format!(
                "Invalid digest length: expected {}, got {}",
                MAC_LENGTH,
                digest.len()
            )));
        }
        let salt = Salt::from_slice(salt)?;
        let nonce = Nonce::from_slice(nonce)?;

        let kdf = ScryptKdf::new(passphrase, salt, params)?;
        AesGcmEnvelope::open(kdf, nonce, encrypted.clone(), digest)
    }
}

mod base64_field {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text.as_bytes()).map_err(serde::de::Error::custom)
    }
}
