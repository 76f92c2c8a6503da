//! # crdt-dict
//!
//! A replicated key/value dictionary that can be mutated independently on
//! many nodes and merged back into one consistent state without
//! coordination.
//!
//! A CRDT (Conflict-free Replicated Data Type) is a data structure that can be
//! replicated across multiple devices and updated independently. When replicas
//! are merged, they are guaranteed to converge to the same state without
//! requiring coordination or consensus.
//!
//! ## Quick Start
//!
//! ```
//! use crdt_dict::prelude::*;
//!
//! let laptop = Dictionary::new();
//! laptop.add("theme", "dark", 1);
//!
//! let phone = Dictionary::new();
//! phone.add("theme", "light", 2);
//! phone.add("font", "mono", 3);
//!
//! let merged = laptop.merge(&phone);
//! assert_eq!(merged.get(&"theme").map(|e| *e.value()), Some("light"));
//! assert_eq!(merged.size(), 2);
//! ```
//!
//! ## Conflict resolution
//!
//! - Adds and updates are last-writer-wins by timestamp. On a tie the
//!   element already stored is kept.
//! - Removes are permanent. Once a key is tombstoned it can never be added
//!   again, and the earliest remove timestamp is kept.
//! - A remove for a key the replica has never seen is dropped.
//!
//! Timestamps are any `Ord` type chosen by the caller (`u64` by default).
//! Generating them, shipping operations between replicas and storing
//! snapshots are left to the application.
//!
//! ## Features
//!
//! - `serde`: derive `Serialize`/`Deserialize` for [`Element`],
//!   [`Operation`], [`Outcome`], [`Rejection`] and [`Snapshot`].
//!
//! ## The `Crdt` Trait
//!
//! [`Dictionary`] implements the [`Crdt`] trait, whose [`Crdt::merge`]
//! builds a new replica from two existing ones. Merge is commutative,
//! associative, and idempotent.

#![warn(missing_docs)]

mod crdt;
mod dictionary;
mod element;

pub mod error;
pub mod operation;
pub mod prelude;
pub mod snapshot;

pub use crdt::Crdt;
pub use dictionary::Dictionary;
pub use element::Element;
pub use error::{DictionaryError, Result};
pub use operation::{Operation, Outcome, Rejection};
pub use snapshot::Snapshot;
