//! Local key-value persistence for the cart.
//!
//! # Architecture
//!
//! - [`PersistenceBackend`] is synchronous, like browser local storage
//! - The cart is stored under [`CART_KEY`] as a versioned JSON envelope
//! - Backends only move strings; encoding lives in [`codec`]
//!
//! # Backends
//!
//! - [`MemoryStorage`] - process-local map, used in tests and for guests
//! - [`FileStorage`] - a JSON object file holding every key

mod codec;
mod file;
mod memory;

use std::sync::Arc;

use thiserror::Error;

pub use codec::{CART_FORMAT_VERSION, DecodeError, decode_cart, encode_cart};
pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Key the cart is stored under.
pub const CART_KEY: &str = "@RocketShoes:cart";

/// Errors that can occur when reading or writing storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the underlying file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value or the storage file could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Synchronous string key-value store.
///
/// Writes replace the whole value; there are no partial updates.
pub trait PersistenceBackend: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value could not be written. The previous value
    /// is left in place.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<T: PersistenceBackend + ?Sized> PersistenceBackend for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

impl<T: PersistenceBackend + ?Sized> PersistenceBackend for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}
