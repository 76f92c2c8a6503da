/// A value paired with the timestamp of the operation that produced it.
///
/// Elements returned by [`Dictionary::get`](crate::Dictionary::get) are
/// copies; mutating them never affects the dictionary.
///
/// # Example
///
/// ```
/// use crdt_dict::Element;
///
/// let e = Element::new("hello", 7u64);
/// assert_eq!(*e.value(), "hello");
/// assert_eq!(*e.timestamp(), 7);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Element<V, T = u64> {
    value: V,
    timestamp: T,
}

impl<V, T> Element<V, T> {
    /// Create an element from a value and the timestamp that wrote it.
    pub fn new(value: V, timestamp: T) -> Self {
        Self { value, timestamp }
    }

    /// The stored value.
    #[must_use]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// The timestamp of the operation that produced this element.
    #[must_use]
    pub fn timestamp(&self) -> &T {
        &self.timestamp
    }

    /// Consume the element, keeping only the value.
    pub fn into_value(self) -> V {
        self.value
    }

    /// Split the element into its value and timestamp.
    pub fn into_parts(self) -> (V, T) {
        (self.value, self.timestamp)
    }
}
