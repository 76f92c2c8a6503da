//! Convenient re-exports for common usage.
//!
//! ```
//! use crdt_dict::prelude::*;
//! ```

pub use crate::Crdt;
pub use crate::Dictionary;
pub use crate::Element;
pub use crate::Operation;
pub use crate::Outcome;
pub use crate::Rejection;
pub use crate::Snapshot;
