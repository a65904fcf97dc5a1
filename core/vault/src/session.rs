//! The unlocked vault: one secret tree and the envelope that encrypts it.
//!
//! Node setters notify the vault through a weak listener handle. The vault
//! counts those notifications and resyncs once at the end of every
//! [`Vault::edit`] scope, so the ciphertext matches the tree whenever control
//! is back with the caller.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{VaultConfig, ROOT_LABEL};
use crate::container::Container;
use crate::listener::{listener_ref, GroupListener, ListenerRef};
use crate::tree::Group;
use coffer_common::{Result, SensitiveBytes};
use coffer_crypto::{AesGcmEnvelope, Nonce, Salt, ScryptKdf};

/// Pending-change counter shared with every node of the tree.
#[derive(Debug, Default)]
struct SyncSignal {
    pending: AtomicUsize,
}

impl SyncSignal {
    fn take(&self) -> usize {
        self.pending.swap(0, Ordering::SeqCst)
    }
}

impl GroupListener for SyncSignal {
    fn sync(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }
}

/// An unlocked vault.
///
/// Holds the plaintext tree and the passphrase-derived key in memory; both
/// are dropped (key material zeroized) with the vault.
pub struct Vault {
    root: Group,
    envelope: AesGcmEnvelope,
    config: VaultConfig,
    signal: Arc<SyncSignal>,
    handle: ListenerRef,
}

impl Vault {
    /// Create a new vault with the default configuration.
    ///
    /// # Postconditions
    /// - Root group is labelled "New" and empty
    /// - Salt and nonce are fresh random values
    pub fn create(passphrase: &str) -> Result<Self> {
        Self::create_with_config(passphrase, VaultConfig::default())
    }

    /// Create a new vault with explicit KDF parameters and retention.
    ///
    /// # Errors
    /// - Validation error if the scrypt parameters fall outside the range
    ///   unlock accepts
    pub fn create_with_config(passphrase: &str, config: VaultConfig) -> Result<Self> {
        config.kdf.check_bounds()?;
        let kdf = ScryptKdf::new(SensitiveBytes::from(passphrase), Salt::generate(), config.kdf)?;
        let root = Group::new(ROOT_LABEL, None)?;
        let plaintext = root.to_portable_json()?;
        let envelope = AesGcmEnvelope::seal(kdf, Nonce::generate(), plaintext)?;

        info!(cost = config.kdf.cost, "Created vault");
        Ok(Self::assemble(root, envelope, config))
    }

    /// Unlock container bytes with the default retention.
    pub fn unlock(passphrase: &str, container: &[u8]) -> Result<Self> {
        Self::unlock_with_config(passphrase, container, VaultConfig::default())
    }

    /// Unlock container bytes.
    ///
    /// The KDF parameters come from the container; only `config.retention_secs`
    /// is taken from `config`.
    ///
    /// # Errors
    /// - `Error::Format` if the container or the decrypted tree is malformed
    /// - `Error::Authentication` if the passphrase is wrong or the container
    ///   was tampered with
    pub fn unlock_with_config(passphrase: &str, container: &[u8], config: VaultConfig) -> Result<Self> {
        let container = Container::from_bytes(container)?;
        let kdf = container.kdf_params();
        let envelope = container.open(SensitiveBytes::from(passphrase))?;
        let root = Group::from_portable_json(envelope.decrypted())?;

        info!(entries = root.entries().len(), "Unlocked vault");
        Ok(Self::assemble(root, envelope, VaultConfig { kdf, ..config }))
    }

    fn assemble(mut root: Group, envelope: AesGcmEnvelope, config: VaultConfig) -> Self {
        let signal = Arc::new(SyncSignal::default());
        let handle = listener_ref(&signal);
        root.set_listener(Some(handle.clone()));
        Self {
            root,
            envelope,
            config,
            signal,
            handle,
        }
    }

    /// The secret tree.
    pub fn root(&self) -> &Group {
        &self.root
    }

    /// The current envelope: key derivation, nonce, plaintext, ciphertext.
    pub fn envelope(&self) -> &AesGcmEnvelope {
        &self.envelope
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Mutate the tree.
    ///
    /// The vault resyncs once before returning, even when `f` fails, so a
    /// node that lost its listener inside `f` cannot leave the ciphertext
    /// behind the tree. Resyncing an unchanged tree reproduces the same
    /// ciphertext.
    pub fn edit<T>(&mut self, f: impl FnOnce(&mut Group) -> Result<T>) -> Result<T> {
        let outcome = f(&mut self.root);
        self.root.set_listener(Some(self.handle.clone()));
        self.sync()?;
        outcome
    }

    /// Purge expired deletions, sort, and re-encrypt under the current nonce.
    pub fn sync(&mut self) -> Result<()> {
        let changes = self.signal.take();
        let purged = self.root.purge_deleted(self.config.retention_secs);
        self.root.sort_entries();
        let plaintext = self.root.to_portable_json()?;
        self.envelope.set_decrypted(plaintext)?;
        debug!(
            changes,
            purged,
            entries = self.root.entries().len(),
            encrypted = self.envelope.encrypted().len(),
            "Resynced vault"
        );
        Ok(())
    }

    /// Re-key the vault under a new passphrase and a fresh salt.
    pub fn change_passphrase(&mut self, passphrase: &str) -> Result<()> {
        let kdf = ScryptKdf::new(
            SensitiveBytes::from(passphrase),
            Salt::generate(),
            *self.envelope.key_derivation().params(),
        )?;
        self.envelope.set_key_derivation(kdf)?;
        info!("Changed vault passphrase");
        Ok(())
    }

    /// Re-encrypt under a fresh nonce and render the container.
    pub fn export(&mut self) -> Result<Vec<u8>> {
        self.envelope.set_nonce(Nonce::generate())?;
        let bytes = Container::from_envelope(&self.envelope).to_bytes()?;
        info!(bytes = bytes.len(), "Exported vault");
        Ok(bytes)
    }

    /// The tree in portable form, as it is encrypted.
    pub fn portable_json(&self) -> Result<Vec<u8>> {
        self.root.to_portable_json()
    }
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("root", &self.root.label())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
