/// Core trait for state-based CRDTs in this crate.
///
/// A CRDT (Conflict-free Replicated Data Type) guarantees that replicas
/// updated independently converge to the same state after merging, without
/// requiring coordination.
///
/// Merging never mutates either input. Replicas may be shared between
/// threads while a merge reads them, so the result is a fresh, unshared
/// instance.
///
/// # Properties
///
/// All implementations must satisfy, up to observable state:
/// - **Commutativity:** `a.merge(b) == b.merge(a)`
/// - **Associativity:** `a.merge(b).merge(c) == a.merge(b.merge(c))`
/// - **Idempotency:** `a.merge(a) == a`
pub trait Crdt: Sized {
    /// Combine this replica with another one into a new replica.
    ///
    /// The result holds the union of the operation history of both inputs.
    #[must_use]
    fn merge(&self, other: &Self) -> Self;
}
