//! Record store trait definition.

use crate::error::StoreResult;

/// A keyed blob store for yomilog collections.
///
/// Record stores are **opaque blob stores**. They hold at most one blob per
/// key and provide simple load/save/remove operations. The engine owns all
/// document interpretation - stores do not understand collections, entities,
/// or serialization formats.
///
/// # Invariants
///
/// - `load` returns exactly the blob last passed to `save` for that key,
///   or `None` if the key was never saved or has been removed
/// - `save` replaces any previous blob for the key
/// - `remove` of an absent key is a no-op, not an error
/// - Stores must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing and ephemeral sessions
/// - [`super::FileStore`] - For persistent storage
/// - [`super::NoopStore`] - For contexts without a durable medium
pub trait RecordStore: Send + Sync {
    /// Loads the blob stored under `key`.
    ///
    /// Returns `None` if no blob is stored under the key.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be read.
    fn load(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Saves `blob` under `key`, replacing any previous blob.
    ///
    /// After this returns successfully, a subsequent `load` of the same
    /// key returns exactly `blob`.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be written.
    fn save(&mut self, key: &str, blob: &[u8]) -> StoreResult<()>;

    /// Removes the blob stored under `key`, if any.
    ///
    /// Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be written.
    fn remove(&mut self, key: &str) -> StoreResult<()>;
}
