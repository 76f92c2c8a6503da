use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::ptr;

use parking_lot::{RwLock, RwLockReadGuard};
use tracing::{debug, trace};

use crate::operation::{Operation, Outcome, Rejection};
use crate::{Crdt, Element};

/// A replicated key/value dictionary with last-writer-wins updates and
/// permanent, remove-wins tombstones.
///
/// The dictionary keeps two maps: one holding the latest element written to
/// each key, one holding a tombstone for each removed key. A key is visible
/// while it has an element and no tombstone. Once removed, a key can never be
/// added again, on this replica or on any replica it is merged with.
///
/// Conflict resolution is asymmetric on purpose:
/// - adds keep the **latest** timestamp, and an equal timestamp does not
///   replace the stored element;
/// - removes keep the **earliest** timestamp.
///
/// Timestamps are supplied by the caller. The dictionary never reads a clock.
///
/// All methods take `&self`. A single reader/writer lock guards the state, so
/// a dictionary can be shared between threads (for example behind an `Arc`).
///
/// # Example
///
/// ```
/// use crdt_dict::prelude::*;
///
/// let d1 = Dictionary::new();
/// d1.add("k1", "v1", 1);
/// d1.add("k2", "v2", 2);
/// d1.remove(&"k2", 3);
///
/// let d2 = Dictionary::new();
/// d2.add("k2", "resurrected?", 4); // concurrent add on another replica
/// d2.add("k3", "v3", 5);
///
/// let merged = d1.merge(&d2);
/// assert_eq!(merged.get(&"k1").map(|e| *e.value()), Some("v1"));
/// assert!(merged.get(&"k2").is_none()); // tombstone wins
/// assert_eq!(merged.size(), 2);
/// ```
#[derive(Debug)]
pub struct Dictionary<K, V, T = u64> {
    state: RwLock<State<K, V, T>>,
}

/// The lock-protected state. Every mutation goes through [`State::add`] or
/// [`State::remove`], including merge replay.
#[derive(Debug, Clone)]
pub(crate) struct State<K, V, T> {
    pub(crate) added: BTreeMap<K, Element<V, T>>,
    pub(crate) removed: BTreeMap<K, Element<V, T>>,
    /// Number of keys in `added` that are absent from `removed`.
    pub(crate) live: usize,
}

impl<K: Ord + Clone, V: Clone, T: Ord + Clone> State<K, V, T> {
    pub(crate) fn new() -> Self {
        Self {
            added: BTreeMap::new(),
            removed: BTreeMap::new(),
            live: 0,
        }
    }

    fn get(&self, key: &K) -> Option<&Element<V, T>> {
        if self.removed.contains_key(key) {
            return None;
        }
        self.added.get(key)
    }

    fn visible(&self) -> impl Iterator<Item = (&K, &Element<V, T>)> + '_ {
        self.added
            .iter()
            .filter(move |(key, _)| !self.removed.contains_key(*key))
    }

    fn add(&mut self, key: K, value: V, timestamp: T) -> Outcome {
        if self.removed.contains_key(&key) {
            return Outcome::Rejected(Rejection::Tombstoned);
        }
        match self.added.entry(key) {
            Entry::Occupied(mut slot) => {
                if *slot.get().timestamp() >= timestamp {
                    return Outcome::Rejected(Rejection::Superseded);
                }
                slot.insert(Element::new(value, timestamp));
                Outcome::Overwritten
            }
            Entry::Vacant(slot) => {
                slot.insert(Element::new(value, timestamp));
                self.live += 1;
                Outcome::Inserted
            }
        }
    }

    fn remove(&mut self, key: &K, timestamp: T) -> Outcome {
        let Some(current) = self.added.get(key) else {
            return Outcome::Rejected(Rejection::NeverAdded);
        };
        match self.removed.get_mut(key) {
            Some(tombstone) => {
                if timestamp >= *tombstone.timestamp() {
                    return Outcome::Rejected(Rejection::Superseded);
                }
                *tombstone = Element::new(current.value().clone(), timestamp);
                Outcome::TombstoneMoved
            }
            None => {
                self.removed
                    .insert(key.clone(), Element::new(current.value().clone(), timestamp));
                self.live -= 1;
                Outcome::Tombstoned
            }
        }
    }

    fn apply(&mut self, op: Operation<K, V, T>) -> Outcome {
        match op {
            Operation::Add {
                key,
                value,
                timestamp,
            } => self.add(key, value, timestamp),
            Operation::Remove { key, timestamp } => self.remove(&key, timestamp),
        }
    }

    /// Replay another state's history: its adds first, then its removes.
    fn replay(&mut self, other: &Self) {
        for (key, element) in &other.added {
            self.add(key.clone(), element.value().clone(), element.timestamp().clone());
        }
        for (key, tombstone) in &other.removed {
            self.remove(key, tombstone.timestamp().clone());
        }
    }
}

impl<K, V, T> Dictionary<K, V, T> {
    pub(crate) fn from_state(state: State<K, V, T>) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    pub(crate) fn read_state(&self) -> RwLockReadGuard<'_, State<K, V, T>> {
        self.state.read()
    }

    /// Read-lock two distinct instances in ascending address order, so that
    /// `a.merge(&b)` and `b.merge(&a)` running concurrently cannot deadlock.
    ///
    /// Callers must handle `self` and `other` being the same instance first.
    fn read_pair<'a>(
        &'a self,
        other: &'a Self,
    ) -> (
        RwLockReadGuard<'a, State<K, V, T>>,
        RwLockReadGuard<'a, State<K, V, T>>,
    ) {
        debug_assert!(!ptr::eq(self, other));
        if (self as *const Self) < (other as *const Self) {
            let mine = self.state.read();
            let theirs = other.state.read();
            (mine, theirs)
        } else {
            let theirs = other.state.read();
            let mine = self.state.read();
            (mine, theirs)
        }
    }
}

impl<K: Ord + Clone, V: Clone, T: Ord + Clone> Dictionary<K, V, T> {
    /// Create an empty dictionary.
    #[must_use]
    pub fn new() -> Self {
        Self::from_state(State::new())
    }

    /// Add `key` with `value`, or update it if it already exists.
    ///
    /// Ignored when the key has been removed, or when the stored element's
    /// timestamp is equal to or later than `timestamp`.
    pub fn add(&self, key: K, value: V, timestamp: T) {
        self.apply(Operation::add(key, value, timestamp));
    }

    /// Same as [`Dictionary::add`].
    pub fn update(&self, key: K, value: V, timestamp: T) {
        self.add(key, value, timestamp);
    }

    /// Remove `key`.
    ///
    /// Ignored when the key was never added to this replica. A remove for a
    /// key that is already removed only moves the tombstone to an earlier
    /// `timestamp`.
    pub fn remove(&self, key: &K, timestamp: T) {
        let outcome = self.state.write().remove(key, timestamp);
        log_outcome("remove", outcome);
    }

    /// Apply an operation and report what it did.
    ///
    /// This is the only way to tell an accepted mutation from one the
    /// conflict policy ignored.
    ///
    /// ```
    /// use crdt_dict::prelude::*;
    ///
    /// let d = Dictionary::new();
    /// assert_eq!(d.apply(Operation::add("k", 1, 10)), Outcome::Inserted);
    /// assert_eq!(
    ///     d.apply(Operation::add("k", 2, 5)),
    ///     Outcome::Rejected(Rejection::Superseded)
    /// );
    /// ```
    pub fn apply(&self, op: Operation<K, V, T>) -> Outcome {
        let kind = match op {
            Operation::Add { .. } => "add",
            Operation::Remove { .. } => "remove",
        };
        let outcome = self.state.write().apply(op);
        log_outcome(kind, outcome);
        outcome
    }

    /// Get a copy of the element stored for `key`, if it is visible.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<Element<V, T>> {
        self.state.read().get(key).cloned()
    }

    /// Check whether `key` is visible.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.state.read().get(key).is_some()
    }

    /// Number of visible keys.
    #[must_use]
    pub fn size(&self) -> usize {
        self.state.read().live
    }

    /// Same as [`Dictionary::size`].
    #[must_use]
    pub fn len(&self) -> usize {
        self.size()
    }

    /// Check whether no key is visible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Visible keys in ascending order.
    #[must_use]
    pub fn keys(&self) -> Vec<K> {
        self.state
            .read()
            .visible()
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Copies of all visible entries, in ascending key order.
    #[must_use]
    pub fn entries(&self) -> Vec<(K, Element<V, T>)> {
        self.state
            .read()
            .visible()
            .map(|(key, element)| (key.clone(), element.clone()))
            .collect()
    }
}

fn log_outcome(kind: &'static str, outcome: Outcome) {
    match outcome {
        Outcome::Rejected(reason) => {
            trace!(op = kind, reason = reason.as_str(), "operation ignored");
        }
        accepted => trace!(op = kind, outcome = ?accepted, "operation applied"),
    }
}

impl<K: Ord + Clone, V: Clone, T: Ord + Clone> Crdt for Dictionary<K, V, T> {
    fn merge(&self, other: &Self) -> Self {
        let mut merged = State::new();
        if ptr::eq(self, other) {
            merged.replay(&self.state.read());
        } else {
            let (mine, theirs) = self.read_pair(other);
            merged.replay(&mine);
            merged.replay(&theirs);
        }
        debug!(
            visible = merged.live,
            tombstones = merged.removed.len(),
            "merged replicas"
        );
        Self::from_state(merged)
    }
}

impl<K: Ord + Clone, V: Clone, T: Ord + Clone> Default for Dictionary<K, V, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, V: Clone, T: Clone> Clone for Dictionary<K, V, T> {
    fn clone(&self) -> Self {
        Self::from_state(self.state.read().clone())
    }
}

/// Two dictionaries are equal when they expose the same visible entries.
/// Tombstones and shadowed elements are not compared.
impl<K, V, T> PartialEq for Dictionary<K, V, T>
where
    K: Ord + Clone,
    V: Clone + PartialEq,
    T: Ord + Clone,
{
    fn eq(&self, other: &Self) -> bool {
        if ptr::eq(self, other) {
            return true;
        }
        let (mine, theirs) = self.read_pair(other);
        mine.live == theirs.live && mine.visible().eq(theirs.visible())
    }
}

impl<K: Ord + Clone, V: Clone, T: Ord + Clone> Extend<Operation<K, V, T>>
    for Dictionary<K, V, T>
{
    fn extend<I: IntoIterator<Item = Operation<K, V, T>>>(&mut self, iter: I) {
        let state = self.state.get_mut();
        for op in iter {
            state.apply(op);
        }
    }
}

impl<K: Ord + Clone, V: Clone, T: Ord + Clone> FromIterator<Operation<K, V, T>>
    for Dictionary<K, V, T>
{
    fn from_iter<I: IntoIterator<Item = Operation<K, V, T>>>(iter: I) -> Self {
        let mut dict = Self::new();
        dict.extend(iter);
        dict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_dictionary_is_empty() {
        let d = Dictionary::<String, String>::new();
        assert!(d.is_empty());
        assert_eq!(d.size(), 0);
        assert!(d.get(&"k".to_string()).is_none());
    }

    #[test]
    fn add_update_remove_scenario() {
        let d = Dictionary::new();
        d.add("k1", "v1", 1);
        d.add("k2", "v", 2);
        d.update("k2", "v2", 3);
        d.add("k3", "v3", 4);
        d.remove(&"k3", 5);

        assert_eq!(d.get(&"k1").map(Element::into_value), Some("v1"));
        assert_eq!(d.get(&"k2").map(Element::into_value), Some("v2"));
        assert!(d.get(&"k3").is_none());
        assert!(d.get(&"k4").is_none());
        assert_eq!(d.size(), 2);
    }

    #[test]
    fn later_add_wins_in_either_order() {
        let forward = Dictionary::new();
        forward.add("k", "old", 1);
        forward.add("k", "new", 2);

        let backward = Dictionary::new();
        backward.add("k", "new", 2);
        backward.add("k", "old", 1);

        assert_eq!(forward.get(&"k"), Some(Element::new("new", 2)));
        assert_eq!(backward.get(&"k"), Some(Element::new("new", 2)));
        assert_eq!(forward.size(), 1);
    }

    #[test]
    fn add_tie_keeps_existing_element() {
        let d = Dictionary::new();
        d.add("k", "first", 7);
        assert_eq!(
            d.apply(Operation::add("k", "second", 7)),
            Outcome::Rejected(Rejection::Superseded)
        );
        assert_eq!(d.get(&"k").map(Element::into_value), Some("first"));
    }

    #[test]
    fn remove_keeps_earliest_timestamp() {
        let d = Dictionary::new();
        d.add("k", "v", 1);
        assert_eq!(d.apply(Operation::remove("k", 10)), Outcome::Tombstoned);
        assert_eq!(d.apply(Operation::remove("k", 5)), Outcome::TombstoneMoved);
        assert_eq!(
            d.apply(Operation::remove("k", 8)),
            Outcome::Rejected(Rejection::Superseded)
        );
        assert_eq!(*d.read_state().removed[&"k"].timestamp(), 5);
        assert_eq!(d.size(), 0);
    }

    #[test]
    fn remove_tie_is_ignored() {
        let d = Dictionary::new();
        d.add("k", "v", 1);
        d.remove(&"k", 4);
        assert_eq!(
            d.apply(Operation::remove("k", 4)),
            Outcome::Rejected(Rejection::Superseded)
        );
        assert_eq!(d.size(), 0);
    }

    #[test]
    fn tombstone_records_current_value() {
        let d = Dictionary::new();
        d.add("k", "v1", 1);
        d.update("k", "v2", 2);
        d.remove(&"k", 3);
        assert_eq!(d.read_state().removed[&"k"], Element::new("v2", 3));
    }

    #[test]
    fn remove_of_unknown_key_is_dropped() {
        let d = Dictionary::<&str, &str>::new();
        assert_eq!(
            d.apply(Operation::remove("ghost", 1)),
            Outcome::Rejected(Rejection::NeverAdded)
        );
        // The later add is not cancelled by the earlier-delivered remove.
        d.add("ghost", "boo", 0);
        assert!(d.contains_key(&"ghost"));
        assert_eq!(d.size(), 1);
    }

    #[test]
    fn removed_key_cannot_be_readded() {
        let d = Dictionary::new();
        d.add("k", "v", 1);
        d.remove(&"k", 2);
        assert_eq!(
            d.apply(Operation::add("k", "again", 100)),
            Outcome::Rejected(Rejection::Tombstoned)
        );
        assert!(d.get(&"k").is_none());
        assert_eq!(d.size(), 0);
    }

    #[test]
    fn remove_wins_on_merge() {
        let d1 = Dictionary::new();
        d1.add("k", "v", 1);
        d1.remove(&"k", 2);

        let d2 = Dictionary::new();
        d2.add("k", "v", 3); // concurrent add

        assert!(d1.merge(&d2).get(&"k").is_none());
        assert!(d2.merge(&d1).get(&"k").is_none());
    }

    #[test]
    fn merge_scenario() {
        let d1 = Dictionary::new();
        d1.add("k1", "v1", 1);
        d1.add("k2", "v2", 2);
        d1.remove(&"k2", 3);

        let d2 = Dictionary::new();
        d2.add("k3", "v3", 4);
        d2.add("k4", "v4", 5);
        d2.remove(&"k4", 6);

        let d3 = d1.merge(&d2);
        assert_eq!(d3.get(&"k1").map(Element::into_value), Some("v1"));
        assert!(d3.get(&"k2").is_none());
        assert_eq!(d3.get(&"k3").map(Element::into_value), Some("v3"));
        assert!(d3.get(&"k4").is_none());
        assert_eq!(d3.size(), 2);
    }

    #[test]
    fn merge_does_not_touch_inputs() {
        let d1 = Dictionary::new();
        d1.add("a", 1, 1);
        let d2 = Dictionary::new();
        d2.add("b", 2, 2);

        let _ = d1.merge(&d2);
        assert_eq!(d1.keys(), vec!["a"]);
        assert_eq!(d2.keys(), vec!["b"]);
    }

    #[test]
    fn merge_with_self_is_identity() {
        let d = Dictionary::new();
        d.add("a", 1, 1);
        d.add("b", 2, 2);
        d.remove(&"b", 3);

        let merged = d.merge(&d);
        assert_eq!(merged, d);
        assert_eq!(merged.size(), 1);
    }

    #[test]
    fn merge_is_commutative() {
        let d1 = Dictionary::new();
        d1.add("a", 1, 1);
        d1.add("b", 2, 2);
        d1.remove(&"a", 5);

        let d2 = Dictionary::new();
        d2.add("b", 20, 3);
        d2.add("c", 30, 4);

        let left = d1.merge(&d2);
        let right = d2.merge(&d1);
        assert_eq!(left, right);
        assert_eq!(
            left.entries(),
            vec![("b", Element::new(20, 3)), ("c", Element::new(30, 4))]
        );
    }

    #[test]
    fn clone_is_independent() {
        let d = Dictionary::new();
        d.add("a", 1, 1);
        let copy = d.clone();
        d.add("b", 2, 2);
        assert_eq!(copy.size(), 1);
        assert_eq!(d.size(), 2);
    }

    #[test]
    fn collects_from_operations() {
        let d: Dictionary<&str, i32> = vec![
            Operation::add("a", 1, 1),
            Operation::add("b", 2, 2),
            Operation::remove("a", 3),
        ]
        .into_iter()
        .collect();
        assert_eq!(d.keys(), vec!["b"]);
    }

    #[test]
    fn entries_skip_tombstoned_keys() {
        let d = Dictionary::new();
        d.add(3, "c", 1);
        d.add(1, "a", 2);
        d.add(2, "b", 3);
        d.remove(&2, 4);
        assert_eq!(d.keys(), vec![1, 3]);
        assert_eq!(d.entries().len(), d.size());
    }
}
