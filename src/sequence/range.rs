//! Stamp-checked ranges and iterators.
//!
//! A [`Range`] or [`Iter`] captures the root's stamp when it is created and
//! compares it before yielding each element. After a structural edit the
//! next step yields `Err(SequenceError::ConcurrentModification)` once and
//! the iterator is exhausted from then on.
//!
//! Neither keeps the sequence borrowed between steps, so the sequence may be
//! edited while an iterator is alive; the iterator simply fails afterwards.
//!
//! ```rust
//! use seqview::sequence::{LinkedSequence, SequenceError};
//!
//! let mut sequence: LinkedSequence<i32> = (1..=3).collect();
//! let mut iter = sequence.iter();
//! assert_eq!(iter.next(), Some(Ok(1)));
//!
//! sequence.insert_first(0).unwrap();
//! assert_eq!(iter.next(), Some(Err(SequenceError::ConcurrentModification)));
//! assert_eq!(iter.next(), None);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::error::{Result, SequenceError};
use super::node::NodeId;
use super::state::Core;

/// Iterator over cloned elements of a sequence, view or range.
pub struct Iter<T> {
    core: Rc<RefCell<Core<T>>>,
    stamp: u64,
    front: NodeId,
    back: NodeId,
    remaining: usize,
    forward: bool,
    error: Option<SequenceError>,
}

impl<T> Iter<T> {
    /// Iterates over the `count` elements strictly between `start` and `end`.
    pub(crate) fn between(
        core: Rc<RefCell<Core<T>>>,
        start: NodeId,
        end: NodeId,
        count: usize,
        forward: bool,
    ) -> Self {
        let (stamp, front, back) = {
            let shared = core.borrow();
            (shared.stamp, shared.nodes.next(start), shared.nodes.prev(end))
        };
        Self {
            core,
            stamp,
            front,
            back,
            remaining: count,
            forward,
            error: None,
        }
    }

    /// An iterator that yields `error` once.
    pub(crate) fn failed(core: Rc<RefCell<Core<T>>>, error: SequenceError) -> Self {
        Self {
            core,
            stamp: 0,
            front: 0,
            back: 0,
            remaining: 0,
            forward: true,
            error: Some(error),
        }
    }

    fn with_stamp(mut self, stamp: u64) -> Self {
        self.stamp = stamp;
        self
    }
}

impl<T: Clone> Iter<T> {
    fn step(&mut self, from_front: bool) -> Option<Result<T>> {
        if let Some(error) = self.error.take() {
            return Some(Err(error));
        }
        if self.remaining == 0 {
            return None;
        }
        let core = self.core.borrow();
        if let Err(error) = core.check_stamp(self.stamp) {
            self.remaining = 0;
            return Some(Err(error));
        }
        let item = if from_front {
            let item = core.nodes.item(self.front).clone();
            self.front = core.nodes.next(self.front);
            item
        } else {
            let item = core.nodes.item(self.back).clone();
            self.back = core.nodes.prev(self.back);
            item
        };
        self.remaining -= 1;
        Some(Ok(item))
    }
}

impl<T: Clone> Iterator for Iter<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let forward = self.forward;
        self.step(forward)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let upper = self.remaining.max(usize::from(self.error.is_some()));
        (0, Some(upper))
    }
}

impl<T: Clone> DoubleEndedIterator for Iter<T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let forward = self.forward;
        self.step(!forward)
    }
}

impl<T> fmt::Debug for Iter<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Iter")
            .field("stamp", &self.stamp)
            .field("remaining", &self.remaining)
            .field("forward", &self.forward)
            .finish_non_exhaustive()
    }
}

/// A directed, read-only slice of a sequence taken by index.
///
/// The range remembers its boundary nodes and the stamp at creation. Any
/// structural edit of the root afterwards makes the range stale.
///
/// # Examples
///
/// ```rust
/// use seqview::sequence::LinkedSequence;
///
/// let sequence: LinkedSequence<i32> = (0..10).collect();
/// let range = sequence.range(2, 3).unwrap();
/// assert_eq!(range.len(), Ok(3));
///
/// let forward: Vec<i32> = range.iter().map(Result::unwrap).collect();
/// assert_eq!(forward, vec![2, 3, 4]);
///
/// let backward: Vec<i32> = range.backwards().iter().map(Result::unwrap).collect();
/// assert_eq!(backward, vec![4, 3, 2]);
/// ```
pub struct Range<T> {
    core: Rc<RefCell<Core<T>>>,
    stamp: u64,
    start: NodeId,
    end: NodeId,
    count: usize,
    forward: bool,
}

impl<T> Range<T> {
    pub(crate) fn new(
        core: Rc<RefCell<Core<T>>>,
        start: NodeId,
        end: NodeId,
        count: usize,
    ) -> Self {
        let stamp = core.borrow().stamp;
        Self {
            core,
            stamp,
            start,
            end,
            count,
            forward: true,
        }
    }

    /// Number of elements in the range.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::ConcurrentModification`] if the root changed
    /// since the range was taken.
    pub fn len(&self) -> Result<usize> {
        self.core.borrow().check_stamp(self.stamp)?;
        Ok(self.count)
    }

    /// Returns `true` if the range holds no element.
    ///
    /// # Errors
    ///
    /// Same as [`Range::len`].
    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|count| count == 0)
    }

    /// Returns `true` while the root has not changed since the range was taken.
    pub fn is_valid(&self) -> bool {
        self.core.borrow().check_stamp(self.stamp).is_ok()
    }

    /// Returns `true` if the range enumerates front to back.
    pub const fn is_forward(&self) -> bool {
        self.forward
    }

    /// The same range enumerated in the opposite direction.
    #[must_use]
    pub fn backwards(mut self) -> Self {
        self.forward = !self.forward;
        self
    }
}

impl<T: Clone> Range<T> {
    /// Iterates over the range in its direction.
    pub fn iter(&self) -> Iter<T> {
        if let Err(error) = self.core.borrow().check_stamp(self.stamp) {
            return Iter::failed(Rc::clone(&self.core), error);
        }
        Iter::between(
            Rc::clone(&self.core),
            self.start,
            self.end,
            self.count,
            self.forward,
        )
        .with_stamp(self.stamp)
    }
}

impl<T: Clone> IntoIterator for Range<T> {
    type Item = Result<T>;
    type IntoIter = Iter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Clone> IntoIterator for &Range<T> {
    type Item = Result<T>;
    type IntoIter = Iter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> fmt::Debug for Range<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Range")
            .field("count", &self.count)
            .field("forward", &self.forward)
            .field("valid", &self.is_valid())
            .finish_non_exhaustive()
    }
}
