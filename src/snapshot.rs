//! Whole-state snapshots for shipping a replica to a peer.
//!
//! A [`Snapshot`] is a plain copy of a dictionary's two maps. Restoring one
//! validates it first, since it may come from an untrusted peer.

use std::collections::BTreeMap;

use tracing::warn;

use crate::dictionary::State;
use crate::error::{DictionaryError, Result};
use crate::{Dictionary, Element};

/// A detached copy of a dictionary's internal state.
///
/// # Example
///
/// ```
/// use crdt_dict::prelude::*;
///
/// let d = Dictionary::new();
/// d.add("k", "v", 1);
///
/// let restored = Dictionary::from_snapshot(d.snapshot()).unwrap();
/// assert_eq!(restored, d);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot<K: Ord, V, T = u64> {
    /// Latest element written to each key.
    pub added: BTreeMap<K, Element<V, T>>,
    /// Tombstone for each removed key.
    pub removed: BTreeMap<K, Element<V, T>>,
    /// Number of visible keys.
    pub live: usize,
}

impl<K: Ord + Clone, V: Clone, T: Ord + Clone> Dictionary<K, V, T> {
    /// Copy the current state under the read lock.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<K, V, T> {
        let state = self.read_state();
        Snapshot {
            added: state.added.clone(),
            removed: state.removed.clone(),
            live: state.live,
        }
    }

    /// Rebuild a dictionary from a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`DictionaryError::OrphanTombstones`] if a removed key has no
    /// added element, and [`DictionaryError::LiveCountMismatch`] if the
    /// recorded live count does not match the maps.
    pub fn from_snapshot(snapshot: Snapshot<K, V, T>) -> Result<Self> {
        let orphans = snapshot
            .removed
            .keys()
            .filter(|key| !snapshot.added.contains_key(*key))
            .count();
        if orphans > 0 {
            warn!(count = orphans, "rejecting snapshot with orphan tombstones");
            return Err(DictionaryError::OrphanTombstones { count: orphans });
        }

        let derived = snapshot.added.len() - snapshot.removed.len();
        if derived != snapshot.live {
            warn!(
                recorded = snapshot.live,
                derived, "rejecting snapshot with inconsistent live count"
            );
            return Err(DictionaryError::LiveCountMismatch {
                recorded: snapshot.live,
                derived,
            });
        }

        Ok(Self::from_state(State {
            added: snapshot.added,
            removed: snapshot.removed,
            live: snapshot.live,
        }))
    }
}
