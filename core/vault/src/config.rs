//! Vault configuration.

use serde::{Deserialize, Serialize};

use coffer_common::{Error, Result};
use coffer_crypto::ScryptParams;

/// Label given to the root group of a freshly created vault.
pub const ROOT_LABEL: &str = "New";

/// How long a soft-deleted node is kept before a sync purges it (24 hours).
pub const DEFAULT_RETENTION_SECS: i64 = 86_400;

/// Tunables for creating and maintaining a vault.
///
/// The KDF parameters only matter at creation time; an unlocked vault keeps
/// whatever parameters its container was written with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// scrypt parameters for new vaults.
    pub kdf: ScryptParams,
    /// Age in seconds after which soft-deleted nodes are purged on sync.
    pub retention_secs: i64,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            kdf: ScryptParams::standard(),
            retention_secs: DEFAULT_RETENTION_SECS,
        }
    }
}

impl VaultConfig {
    /// Serialize configuration to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize configuration from JSON. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }
}
