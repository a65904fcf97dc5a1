//! Common utilities and types shared across coffer modules.
//!
//! This module provides the error taxonomy used by every layer and the small
//! validated value types that tree nodes and the crypto layer are built from.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{GroupPath, NonEmptyText, SensitiveBytes};
