//! Local device storage.
//!
//! A flat key-value store of JSON strings, the same shape a browser's
//! `localStorage` offers. Each state container owns one key and rewrites the
//! whole snapshot on every mutation.
//!
//! # Backends
//!
//! - [`FileStorage`] - one file per key under a directory (native clients)
//! - [`MemoryStorage`] - process-local map, optionally quota-limited (tests, SSR)

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use std::fmt::Debug;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Well-known storage keys.
pub mod keys {
    /// Cart line items (JSON array of `CartItem`).
    pub const CART: &str = "ebasi_cart";

    /// Guest wishlist (JSON array of `WishlistItem`).
    pub const WISHLIST: &str = "wishlist";

    /// Backend auth token (raw string, not JSON).
    pub const AUTH_TOKEN: &str = "authToken";
}

/// Errors raised by a storage backend or by snapshot (de)serialization.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing medium failed.
    #[error("storage I/O error for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// The stored snapshot is not valid JSON for the expected type.
    #[error("corrupt snapshot for key '{key}': {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be serialized.
    #[error("failed to serialize value for key '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Writing would exceed the backend's size limit.
    #[error("storage quota exceeded writing '{key}' ({needed} bytes, {available} available)")]
    QuotaExceeded {
        key: String,
        needed: usize,
        available: usize,
    },

    /// Key contains characters the backend cannot represent.
    #[error("invalid storage key: '{0}'")]
    InvalidKey(String),
}

/// A key-value store for string snapshots.
///
/// All methods take `&self`; implementations use interior mutability so one
/// handle can be shared by every state container.
pub trait LocalStorage: Send + Sync + Debug {
    /// Read a value. Returns `Ok(None)` if the key is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or replace a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written or is full.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a value. Succeeds if the key was already absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Load and decode a JSON snapshot.
///
/// # Errors
///
/// Returns [`StorageError::Corrupt`] if the stored value does not parse, or
/// any backend read error.
pub fn load_json<T: DeserializeOwned>(
    storage: &dyn LocalStorage,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = storage.get_item(key)? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| StorageError::Corrupt {
            key: key.to_string(),
            source,
        })
}

/// Encode and store a JSON snapshot.
///
/// # Errors
///
/// Returns an error if serialization or the backend write fails.
pub fn save_json<T: Serialize + ?Sized>(
    storage: &dyn LocalStorage,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Serialize {
        key: key.to_string(),
        source,
    })?;
    storage.set_item(key, &raw)
}
