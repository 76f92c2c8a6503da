//! Operations as delivered by a replication layer, and what applying them did.

/// A single mutation, as shipped between replicas.
///
/// Updates are expressed as [`Operation::Add`]: the two are the same
/// operation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operation<K, V, T = u64> {
    /// Add or update `key`.
    Add {
        /// Key to write.
        key: K,
        /// Value to store.
        value: V,
        /// Timestamp of the write.
        timestamp: T,
    },
    /// Remove `key`.
    Remove {
        /// Key to tombstone.
        key: K,
        /// Timestamp of the removal.
        timestamp: T,
    },
}

impl<K, V, T> Operation<K, V, T> {
    /// Build an add (or update) operation.
    pub fn add(key: K, value: V, timestamp: T) -> Self {
        Self::Add {
            key,
            value,
            timestamp,
        }
    }

    /// Build a remove operation.
    pub fn remove(key: K, timestamp: T) -> Self {
        Self::Remove { key, timestamp }
    }

    /// The key this operation targets.
    #[must_use]
    pub fn key(&self) -> &K {
        match self {
            Self::Add { key, .. } | Self::Remove { key, .. } => key,
        }
    }

    /// The timestamp carried by this operation.
    #[must_use]
    pub fn timestamp(&self) -> &T {
        match self {
            Self::Add { timestamp, .. } | Self::Remove { timestamp, .. } => timestamp,
        }
    }
}

/// The effect an operation had on a dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Outcome {
    /// First add for the key; it became visible.
    Inserted,
    /// A newer add replaced the stored element.
    Overwritten,
    /// First accepted remove for the key; it is now deleted for good.
    Tombstoned,
    /// An earlier remove replaced the tombstone's timestamp.
    TombstoneMoved,
    /// The conflict policy ignored the operation.
    Rejected(Rejection),
}

impl Outcome {
    /// Whether the operation changed the dictionary's state.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}

/// Why an operation was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Rejection {
    /// An add targeted a key that has already been removed.
    Tombstoned,
    /// The stored entry is at least as recent as the incoming add, or the
    /// stored tombstone is at least as early as the incoming remove.
    Superseded,
    /// A remove targeted a key that was never added. It is dropped, not
    /// buffered.
    NeverAdded,
}

impl Rejection {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Tombstoned => "tombstoned",
            Self::Superseded => "superseded",
            Self::NeverAdded => "never added",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_cover_both_variants() {
        let add: Operation<&str, i32> = Operation::add("k", 1, 5);
        let rm: Operation<&str, i32> = Operation::remove("k", 9);
        assert_eq!(*add.key(), "k");
        assert_eq!(*add.timestamp(), 5);
        assert_eq!(*rm.key(), "k");
        assert_eq!(*rm.timestamp(), 9);
    }

    #[test]
    fn only_rejections_are_not_accepted() {
        assert!(Outcome::Inserted.is_accepted());
        assert!(Outcome::TombstoneMoved.is_accepted());
        assert!(!Outcome::Rejected(Rejection::Superseded).is_accepted());
    }
}
