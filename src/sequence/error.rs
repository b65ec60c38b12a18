//! Error types for sequences and their views.
//!
//! Every fallible operation reports a [`SequenceError`]. Errors are raised
//! synchronously and nothing is retried. Arguments are validated before the
//! chain is touched, so a returned error means nothing changed.
//!
//! There is no rollback: a predicate that panics in the middle of
//! [`remove_where`](super::LinkedSequence::remove_where) leaves the sequence
//! and its views partially updated.

/// Errors raised by [`LinkedSequence`](super::LinkedSequence) and the
/// ranges and iterators derived from it.
///
/// # Examples
///
/// ```rust
/// use seqview::sequence::{LinkedSequence, SequenceError};
///
/// let mut sequence: LinkedSequence<i32> = (1..=3).collect();
/// assert_eq!(
///     sequence.remove_at(5),
///     Err(SequenceError::IndexOutOfRange { index: 5, length: 3 })
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceError {
    /// The view was disposed or invalidated, or its root was disposed.
    Disposed,
    /// The sequence changed structurally while a range or iterator was live.
    ConcurrentModification,
    /// The sequence is borrowed by an element guard from
    /// [`get`](super::LinkedSequence::get) or by a running callback.
    Borrowed,
    /// A single index was outside `0..length`.
    IndexOutOfRange {
        /// The rejected index.
        index: usize,
        /// The length of the sequence or view at the time of the call.
        length: usize,
    },
    /// A `(start, count)` pair did not fit inside `0..length`.
    RangeOutOfBounds {
        /// The requested start; negative when a slide moved past the front.
        start: isize,
        /// The requested number of elements.
        count: usize,
        /// The length the range was checked against.
        length: usize,
    },
    /// Two views that do not share a root were combined.
    IncompatibleView,
    /// A view-only operation was invoked on a root sequence.
    NotAView,
    /// The sequence or view holds no elements.
    EmptyCollection,
    /// Two elements could not be ordered relative to each other.
    NotOrderable,
}

impl std::fmt::Display for SequenceError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disposed => write!(formatter, "view or sequence has been disposed"),
            Self::ConcurrentModification => {
                write!(formatter, "sequence was modified during enumeration")
            }
            Self::Borrowed => write!(formatter, "sequence is already borrowed"),
            Self::IndexOutOfRange { index, length } => write!(
                formatter,
                "index {index} is out of range for length {length}"
            ),
            Self::RangeOutOfBounds {
                start,
                count,
                length,
            } => write!(
                formatter,
                "range starting at {start} with {count} elements is out of bounds for length {length}"
            ),
            Self::IncompatibleView => write!(formatter, "views do not share the same root"),
            Self::NotAView => write!(formatter, "operation requires a view, not a root sequence"),
            Self::EmptyCollection => write!(formatter, "sequence is empty"),
            Self::NotOrderable => write!(formatter, "elements have no well-defined ordering"),
        }
    }
}

impl std::error::Error for SequenceError {}

/// Result alias used throughout the sequence module.
pub type Result<T> = std::result::Result<T, SequenceError>;
