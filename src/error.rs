//! Error types for dictionary boundary input.

use thiserror::Error;

/// Errors raised when a dictionary is rebuilt from external state.
///
/// Mutations on a live dictionary never fail; conflicts are resolved by the
/// merge policy instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DictionaryError {
    /// Some removed keys have no matching added entry.
    #[error("snapshot holds {count} tombstone(s) for keys that were never added")]
    OrphanTombstones {
        /// Number of offending keys.
        count: usize,
    },

    /// The recorded live count disagrees with the maps.
    #[error("snapshot live count is {recorded} but its maps describe {derived} visible key(s)")]
    LiveCountMismatch {
        /// Count stored in the snapshot.
        recorded: usize,
        /// Count derived from the snapshot's maps.
        derived: usize,
    },
}

/// Result type for dictionary operations that can fail.
pub type Result<T> = std::result::Result<T, DictionaryError>;
