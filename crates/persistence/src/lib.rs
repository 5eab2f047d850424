#![deny(warnings)]

//! Persistence layer: save payload encoding, shape validation and stores.
//!
//! A save is a flat JSON object holding every persisted [`PlayerState`] field
//! plus `version` and `lastSaved` (milliseconds since the Unix epoch). Loading
//! never fails: corrupt or incompatible payloads are logged and replaced by a
//! fresh default state.
//!
//! [`PlayerState`]: crumbs_core::PlayerState

mod save;
mod store;

pub use save::{
    decode, encode, load, reset, save, LoadOrigin, Loaded, MIN_COMPATIBLE_VERSION, SAVE_VERSION,
};
pub use store::{FileStore, MemoryStore, SaveStore};

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by stores and the save codec.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Payload is not a compatible save.
    #[error("invalid save data: {0}")]
    InvalidSaveData(String),
    /// The store could not be read.
    #[error("failed to read save: {0}")]
    ReadFailure(String),
    /// The store rejected a write (quota, permissions, unavailable).
    #[error("failed to write save: {0}")]
    WriteFailure(String),
    #[error("failed to serialize save: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Returns the default directory used for local saves.
pub fn default_save_dir() -> PathBuf {
    PathBuf::from("./saves")
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn save_dir_is_relative() {
        assert!(default_save_dir().is_relative());
    }
}
