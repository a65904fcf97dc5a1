//! Vault engine for coffer.
//!
//! This module provides:
//! - The secret tree of groups and entries, with soft delete, sorting and
//!   change notification
//! - Prefix search and retention purging over the tree
//! - The container format that persists an encrypted tree
//! - The [`Vault`] controller tying tree and envelope together
//!
//! # Architecture
//! Nodes report every mutation to a listener. The vault listens, and after
//! each edit purges, sorts, serializes and re-encrypts the whole tree, so the
//! envelope always holds the encryption of the current tree.

pub mod config;
pub mod container;
pub mod listener;
pub mod retention;
pub mod search;
pub mod session;
pub mod timestamp;
pub mod tree;

pub use config::{VaultConfig, DEFAULT_RETENTION_SECS, ROOT_LABEL};
pub use container::{Container, EncrypterRecord, KeyDerivationRecord};
pub use listener::{listener_ref, same_listener, GroupListener, ListenerRef};
pub use search::{matches_phrase, Lineage};
pub use session::Vault;
pub use tree::{Entry, Group, Node};
