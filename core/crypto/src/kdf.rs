//! Key derivation using scrypt.
//!
//! scrypt is a memory-hard password-based KDF: with the default parameters
//! every derivation touches 1 GiB of memory, which is what makes offline
//! guessing against a stolen container expensive.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::keys::{DerivedKey, Salt, KEY_LENGTH};
use coffer_common::{Error, Result, SensitiveBytes};

/// Parameters for scrypt key derivation.
///
/// The field names match the names written into the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScryptParams {
    /// Output length in bytes. Always KEY_LENGTH.
    pub key_length: usize,
    /// CPU/memory cost factor N. Must be a power of two greater than 1.
    pub cost: u64,
    /// Block size r.
    pub block_size: u32,
    /// Parallelization p.
    pub parallelization: u32,
}

impl ScryptParams {
    /// Cost factor of the standard scheme (2^20).
    pub const STANDARD_COST: u64 = 1 << 20;

    /// The fixed production parameters: N = 2^20, r = 8, p = 1, 32-byte key.
    pub const fn standard() -> Self {
        Self {
            key_length: KEY_LENGTH,
            cost: Self::STANDARD_COST,
            block_size: Self::BLOCK_SIZE,
            parallelization: Self::PARALLELIZATION,
        }
    }

    /// Block size r of the standard scheme.
    pub const BLOCK_SIZE: u32 = 8;

    /// Parallelization p of the standard scheme.
    pub const PARALLELIZATION: u32 = 1;

    /// Create validated parameters with a 32-byte output.
    ///
    /// # Errors
    /// - Returns a validation error if the parameters fall outside
    ///   [`ScryptParams::check_bounds`] or are not accepted by scrypt
    pub fn new(cost: u64, block_size: u32, parallelization: u32) -> Result<Self> {
        let params = Self {
            key_length: KEY_LENGTH,
            cost,
            block_size,
            parallelization,
        };
        params.check_bounds()?;
        params.to_scrypt()?;
        Ok(params)
    }

    /// Check the parameters against the range this scheme accepts.
    ///
    /// Cost may be lowered below the standard 2^20 but never raised above it;
    /// block size, parallelization and key length are fixed. Parameters read
    /// from untrusted input must pass this before any derivation, since
    /// scrypt allocates `128 * cost * block_size` bytes up front.
    ///
    /// # Errors
    /// - Returns a validation error naming the first parameter out of range
    pub fn check_bounds(&self) -> Result<()> {
        self.log_n()?;
        if self.cost > Self::STANDARD_COST {
            return Err(Error::Validation(format!(
                "Scrypt cost {} exceeds the maximum {}",
                self.cost,
                Self::STANDARD_COST
            )));
        }
        if self.block_size != Self::BLOCK_SIZE {
            return Err(Error::Validation(format!(
                "Unsupported scrypt block size {}: expected {}",
                self.block_size,
                Self::BLOCK_SIZE
            )));
        }
        if self.parallelization != Self::PARALLELIZATION {
            return Err(Error::Validation(format!(
                "Unsupported scrypt parallelization {}: expected {}",
                self.parallelization,
                Self::PARALLELIZATION
            )));
        }
        if self.key_length != KEY_LENGTH {
            return Err(Error::Validation(format!(
                "Invalid key length: expected {}, got {}",
                KEY_LENGTH, self.key_length
            )));
        }
        Ok(())
    }

    /// log2 of the cost factor.
    ///
    /// # Errors
    /// - Returns a validation error if cost is not a power of two above 1
    pub fn log_n(&self) -> Result<u8> {
        if self.cost < 2 || !self.cost.is_power_of_two() {
            return Err(Error::Validation(format!(
                "Invalid scrypt cost {}: must be a power of two greater than 1",
                self.cost
            )));
        }
        Ok(self.cost.trailing_zeros() as u8)
    }

    /// Convert into the parameter object the scrypt crate expects.
    fn to_scrypt(self) -> Result<scrypt::Params> {
        if self.key_length != KEY_LENGTH {
            return Err(Error::Validation(format!(
                "Invalid key length: expected {}, got {}",
                KEY_LENGTH, self.key_length
            )));
        }
        scrypt::Params::new(
            self.log_n()?,
            self.block_size,
            self.parallelization,
            self.key_length,
        )
        .map_err(|e| Error::Validation(format!("Invalid scrypt parameters: {}", e)))
    }
}

impl Default for ScryptParams {
    fn default() -> Self {
        Self::standard()
    }
}

/// Derive a key from a passphrase and salt using scrypt.
///
/// # Postconditions
/// - The derived key is deterministic given the same inputs
///
/// # Errors
/// - Returns error if the scrypt parameters are invalid
///
/// # Security
/// - Passphrase is not stored or logged
pub fn derive_key(passphrase: &[u8], salt: &Salt, params: &ScryptParams) -> Result<DerivedKey> {
    let scrypt_params = params.to_scrypt()?;

    debug!(cost = params.cost, "Deriving key");

    let mut key_bytes = [0u8; KEY_LENGTH];
    scrypt::scrypt(passphrase, salt.as_bytes(), &scrypt_params, &mut key_bytes)
        .map_err(|e| Error::Crypto(format!("Key derivation failed: {}", e)))?;

    let key = DerivedKey::from_bytes(key_bytes);
    zeroize::Zeroize::zeroize(&mut key_bytes);
    Ok(key)
}

/// Passphrase, salt and parameters together with the key they produce.
///
/// The key is recomputed synchronously whenever the passphrase or the salt
/// is replaced, so it is never stale relative to its inputs.
#[derive(Clone)]
pub struct ScryptKdf {
    passphrase: SensitiveBytes,
    salt: Salt,
    params: ScryptParams,
    key: DerivedKey,
}

impl ScryptKdf {
    /// Derive a key for `passphrase` and `salt`.
    ///
    /// # Errors
    /// - Returns a validation error if `params` is invalid
    pub fn new(passphrase: SensitiveBytes, salt: Salt, params: ScryptParams) -> Result<Self> {
        let key = derive_key(passphrase.as_bytes(), &salt, &params)?;
        Ok(Self {
            passphrase,
            salt,
            params,
            key,
        })
    }

    /// Get the salt.
    pub fn salt(&self) -> &Salt {
        &self.salt
    }

    /// Get the parameters.
    pub fn params(&self) -> &ScryptParams {
        &self.params
    }

    /// Get the derived key.
    pub fn key(&self) -> &DerivedKey {
        &self.key
    }

    /// Replace the passphrase and recompute the key.
    pub fn set_passphrase(&mut self, passphrase: SensitiveBytes) -> Result<()> {
        self.key = derive_key(passphrase.as_bytes(), &self.salt, &self.params)?;
        self.passphrase = passphrase;
        Ok(())
    }

    /// Replace the salt and recompute the key.
    pub fn set_salt(&mut self, salt: Salt) -> Result<()> {
        self.key = derive_key(self.passphrase.as_bytes(), &salt, &self.params)?;
        self.salt = salt;
        Ok(())
    }
}

impl fmt::Debug for ScryptKdf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScryptKdf")
            .field("salt", &self.salt)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
