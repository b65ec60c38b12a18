//! Linked sequences with live, overlapping views.
//!
//! This module provides [`LinkedSequence`], a doubly linked sequence that
//! can hand out any number of *views*: windows over a contiguous run of the
//! same nodes. Reads and writes through a view hit the root's storage, and
//! every open view is kept consistent as the root (or any other view)
//! changes.
//!
//! # Overview
//!
//! - A **root** owns its elements.
//! - A **view** borrows a run of the root's nodes. It knows its offset into
//!   the root and its size, and it can be slid, resized and spanned.
//! - Edits through any handle update every other view in `O(views)` for
//!   single-position edits and in one sweep for batch removals.
//! - Edits that cannot be expressed as a boundary move invalidate the
//!   affected views. Using an invalidated view fails with
//!   [`SequenceError::Disposed`].
//! - Iterators and ranges fail with
//!   [`SequenceError::ConcurrentModification`] once the root changes.
//!
//! # How edits affect other views
//!
//! Each view is classified against the edited window with [`Relation`]:
//!
//! | Edit | `Disjoint` | `Contains` | `ContainedIn` | `Overlapping` |
//! |------|------------|------------|---------------|---------------|
//! | `remove_interval`, `clear` | shifted | shrinks | collapses to size 0 | disposed |
//! | `remove_all`, `retain_all`, `remove_where` | shifted | shrinks | shrinks | shrinks |
//! | `reverse` | kept | kept | mirrored | disposed |
//! | `sort`, `shuffle` | kept | kept | disposed | disposed |
//!
//! Sorting relinks nodes, so unlike `reverse` it does not follow contained
//! views to their new positions and disposes them instead.
//!
//! # Examples
//!
//! ```rust
//! use seqview::sequence::LinkedSequence;
//!
//! let mut root: LinkedSequence<i32> = vec![1, 2, 3, 4].into_iter().collect();
//! let view = root.view(1, 2).unwrap();
//! assert_eq!(view.to_vec().unwrap(), vec![2, 3]);
//!
//! // Inserting in front of the view shifts it.
//! root.insert(1, 99).unwrap();
//! assert_eq!(root.to_vec().unwrap(), vec![1, 99, 2, 3, 4]);
//! assert_eq!(view.offset(), Ok(2));
//! assert_eq!(view.to_vec().unwrap(), vec![2, 3]);
//! ```
//!
//! # Threading
//!
//! Handles share their state through `Rc<RefCell<_>>` and are neither
//! `Send` nor `Sync`. Callbacks passed to [`LinkedSequence::remove_where`]
//! and the sort comparators run while the sequence is borrowed: calls they
//! make on the same root fail with [`SequenceError::Borrowed`]. So do
//! structural calls made while an element guard from
//! [`LinkedSequence::get`] is alive.

mod batch;
mod error;
mod events;
mod fixup;
mod node;
mod range;
mod registry;
mod reorder;
mod state;
mod traits;

pub use error::{Result, SequenceError};
pub use events::{ObserverId, SequenceEvent};
pub use range::{Iter, Range};
pub use registry::Relation;
pub use traits::OrderedCollection;

use std::cell::Ref;
use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use self::events::{Detached, EventBatch, dispatch};
use self::registry::{ViewKey, Window};
use self::state::{Core, Shared, check_range};

#[cfg(feature = "fxhash")]
type Multiset<T> = rustc_hash::FxHashMap<T, usize>;

#[cfg(not(feature = "fxhash"))]
type Multiset<T> = std::collections::HashMap<T, usize>;

/// A doubly linked sequence, or a view onto one.
///
/// A `LinkedSequence` is either a root that owns its nodes or a view onto a
/// contiguous run of a root's nodes. Both expose the same operations;
/// indices are always relative to the handle.
///
/// # Time Complexity
///
/// | Operation | Complexity |
/// |-----------|------------|
/// | `get`, `set`, `insert`, `remove_at` | O(min(i, n - i)) + O(views) |
/// | `insert_first`, `insert_last`, `remove_first`, `remove_last` | O(1) + O(views) |
/// | `view`, `slide` | O(distance to the closest known node) |
/// | `remove_all`, `retain_all`, `remove_where`, `remove_interval` | O(n + views log views) |
/// | `reverse` | O(n + views log views) |
/// | `sort` | O(n log n) |
///
/// # Examples
///
/// ```rust
/// use seqview::sequence::LinkedSequence;
///
/// let mut root: LinkedSequence<i32> = (0..6).collect();
/// let mut view = root.view(2, 2).unwrap();
///
/// view.set(0, 20).unwrap();
/// assert_eq!(root.to_vec().unwrap(), vec![0, 1, 20, 3, 4, 5]);
///
/// view.slide(2).unwrap();
/// assert_eq!(view.to_vec().unwrap(), vec![4, 5]);
/// ```
pub struct LinkedSequence<T> {
    shared: Rc<Shared<T>>,
    key: Option<ViewKey>,
}

impl<T> LinkedSequence<T> {
    /// Creates an empty root sequence.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use seqview::sequence::LinkedSequence;
    ///
    /// let sequence: LinkedSequence<i32> = LinkedSequence::new();
    /// assert_eq!(sequence.len(), Ok(0));
    /// assert!(!sequence.is_view());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Rc::new(Shared::new(Core::new())),
            key: None,
        }
    }

    fn handle(&self, key: Option<ViewKey>) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
            key,
        }
    }

    fn window(&self) -> Result<Window> {
        self.shared.read()?.window(self.key)
    }

    /// Runs a mutation and delivers the events it recorded.
    fn mutate<R>(
        &self,
        operation: impl FnOnce(&mut Core<T>, &mut EventBatch<T>) -> Result<R>,
    ) -> Result<R> {
        let mut batch = self.shared.observers.borrow().batch();
        let result = {
            let mut core = self.shared.write()?;
            operation(&mut core, &mut batch)
        };
        if result.is_ok() {
            dispatch(&self.shared.observers, batch);
        }
        result
    }

    // =========================================================================
    // Handle state
    // =========================================================================

    /// Returns `true` if this handle is a view rather than a root.
    pub const fn is_view(&self) -> bool {
        self.key.is_some()
    }

    /// Returns `true` if the handle can still be used.
    ///
    /// A root is valid until [`LinkedSequence::dispose`] is called on it. A
    /// view becomes invalid when disposed, when its root is disposed, or
    /// when an edit invalidates it.
    pub fn is_valid(&self) -> bool {
        self.window().is_ok()
    }

    /// Number of elements in this sequence or view.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::Disposed`] for an invalidated handle.
    pub fn len(&self) -> Result<usize> {
        self.window().map(|window| window.size)
    }

    /// Returns `true` if this sequence or view holds no element.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::Disposed`] for an invalidated handle.
    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|length| length == 0)
    }

    /// Index of this view's first element in the root. Always `0` for a root.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::Disposed`] for an invalidated handle.
    pub fn offset(&self) -> Result<usize> {
        self.window().map(|window| window.offset)
    }

    /// The root's edit counter.
    ///
    /// Incremented once by every call that changes the sequence structure
    /// or replaces an element, whichever handle it goes through.
    ///
    /// # Panics
    ///
    /// Panics if called from a [`LinkedSequence::remove_where`] predicate or
    /// a sort comparator running on the same root.
    pub fn stamp(&self) -> u64 {
        self.shared.core.borrow().stamp
    }

    /// A handle to the root this view was opened on, or `None` for a root.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use seqview::sequence::LinkedSequence;
    ///
    /// let root: LinkedSequence<i32> = (0..4).collect();
    /// let view = root.view(1, 2).unwrap();
    /// assert!(root.underlying().is_none());
    /// assert_eq!(view.underlying().unwrap().len(), Ok(4));
    /// ```
    pub fn underlying(&self) -> Option<Self> {
        self.key.map(|_| self.handle(None))
    }

    /// Another handle to the root behind this handle, for a root or a view.
    ///
    /// Handles are not `Clone`, since cloning a sequence would suggest a copy
    /// of its elements; this shares them instead.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use seqview::sequence::LinkedSequence;
    ///
    /// let root: LinkedSequence<i32> = (0..3).collect();
    /// let mut other = root.root();
    /// other.insert_last(3).unwrap();
    /// assert_eq!(root.to_vec().unwrap(), vec![0, 1, 2, 3]);
    /// assert!(root.same_root(&other));
    /// ```
    pub fn root(&self) -> Self {
        self.handle(None)
    }

    /// Returns `true` if both handles share the same root.
    pub fn same_root(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }

    /// Classifies `other` relative to this handle's window.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::IncompatibleView`] if the handles do not
    /// share a root and [`SequenceError::Disposed`] if either is invalid.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use seqview::sequence::{LinkedSequence, Relation};
    ///
    /// let root: LinkedSequence<i32> = (0..10).collect();
    /// let outer = root.view(2, 6).unwrap();
    /// let inner = root.view(3, 2).unwrap();
    /// assert_eq!(outer.relation_to(&inner), Ok(Relation::ContainedIn));
    /// assert_eq!(inner.relation_to(&outer), Ok(Relation::Contains));
    /// ```
    pub fn relation_to(&self, other: &Self) -> Result<Relation> {
        if !self.same_root(other) {
            return Err(SequenceError::IncompatibleView);
        }
        let core = self.shared.read()?;
        let reference = core.window(self.key)?;
        let window = core.window(other.key)?;
        Ok(Relation::classify(&reference, &window))
    }

    /// Disposes this handle.
    ///
    /// Disposing a view removes it from its root and leaves the root and
    /// every sibling view untouched. Disposing a root drops all elements
    /// and invalidates every view opened on it. Disposing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::Borrowed`] while the root is borrowed.
    pub fn dispose(&mut self) -> Result<()> {
        let mut core = self.shared.write()?;
        match self.key {
            Some(key) => {
                core.dispose_view(key);
            }
            None => core.dispose_root(),
        }
        Ok(())
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Opens a view over `count` elements starting at `start`.
    ///
    /// Opening a view on a view yields another view on the same root.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::RangeOutOfBounds`] if the run does not fit
    /// and [`SequenceError::Disposed`] for an invalidated handle.
    pub fn view(&self, start: usize, count: usize) -> Result<Self> {
        let key = self.shared.write()?.open_view(self.key, start, count)?;
        Ok(self.handle(Some(key)))
    }

    /// Moves this view by `delta` positions, keeping its size.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::NotAView`] on a root and
    /// [`SequenceError::RangeOutOfBounds`] if the moved view would not fit.
    pub fn slide(&mut self, delta: isize) -> Result<()> {
        let size = self.len()?;
        self.slide_by(delta, size)
    }

    /// Moves this view by `delta` positions and resizes it to `size`.
    ///
    /// # Errors
    ///
    /// Same as [`LinkedSequence::slide`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use seqview::sequence::LinkedSequence;
    ///
    /// let root: LinkedSequence<char> = "abcdef".chars().collect();
    /// let mut view = root.view(1, 1).unwrap();
    /// view.slide_by(2, 3).unwrap();
    /// assert_eq!(view.to_vec().unwrap(), vec!['d', 'e', 'f']);
    /// ```
    pub fn slide_by(&mut self, delta: isize, size: usize) -> Result<()> {
        self.shared.write()?.slide(self.key, delta, size)
    }

    /// Like [`LinkedSequence::slide_by`], but returns `false` instead of
    /// failing when the moved view would not fit.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::NotAView`] on a root and
    /// [`SequenceError::Disposed`] for an invalidated view.
    pub fn try_slide(&mut self, delta: isize, size: usize) -> Result<bool> {
        match self.slide_by(delta, size) {
            Ok(()) => Ok(true),
            Err(SequenceError::RangeOutOfBounds { .. }) => Ok(false),
            Err(error) => Err(error),
        }
    }

    /// Opens the smallest view covering both this handle and `other`.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::IncompatibleView`] if the handles do not
    /// share a root and [`SequenceError::Disposed`] if either is invalid.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use seqview::sequence::LinkedSequence;
    ///
    /// let root: LinkedSequence<i32> = (0..10).collect();
    /// let left = root.view(2, 2).unwrap();
    /// let right = root.view(4, 3).unwrap();
    /// let both = left.span(&right).unwrap();
    /// assert_eq!(both.offset(), Ok(2));
    /// assert_eq!(both.len(), Ok(5));
    /// ```
    pub fn span(&self, other: &Self) -> Result<Self> {
        if !self.same_root(other) {
            return Err(SequenceError::IncompatibleView);
        }
        let key = {
            let mut core = self.shared.write()?;
            let first = core.window(self.key)?;
            let second = core.window(other.key)?;
            core.open_span(&first, &second)
        };
        Ok(self.handle(Some(key)))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Borrows the element at `index`.
    ///
    /// The returned guard keeps the whole root borrowed. While it is alive,
    /// every call that edits the root, opens, slides or disposes a view
    /// fails with [`SequenceError::Borrowed`], whichever handle it goes
    /// through.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::IndexOutOfRange`] or
    /// [`SequenceError::Disposed`].
    pub fn get(&self, index: usize) -> Result<Ref<'_, T>> {
        let core = self.shared.read()?;
        let window = core.window(self.key)?;
        let node = core.node_at(&window, index)?;
        Ok(Ref::map(core, |core| core.nodes.item(node)))
    }

    /// Index of the first element matching `predicate`.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::Disposed`] for an invalidated handle.
    pub fn find_index(&self, predicate: impl FnMut(&T) -> bool) -> Result<Option<usize>> {
        let core = self.shared.read()?;
        let window = core.window(self.key)?;
        Ok(core.position(&window, predicate))
    }

    /// Index of the last element matching `predicate`.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::Disposed`] for an invalidated handle.
    pub fn find_last_index(&self, predicate: impl FnMut(&T) -> bool) -> Result<Option<usize>> {
        let core = self.shared.read()?;
        let window = core.window(self.key)?;
        Ok(core.last_position(&window, predicate))
    }

    /// Visits every element front to back.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::Disposed`] for an invalidated handle.
    pub fn for_each(&self, visit: impl FnMut(&T)) -> Result<()> {
        let core = self.shared.read()?;
        let window = core.window(self.key)?;
        core.for_each(&window, visit);
        Ok(())
    }

    /// Verifies the chain and every open view's boundaries.
    ///
    /// Intended for tests and debugging; runs in `O(n * views)`.
    #[doc(hidden)]
    pub fn check_integrity(&self) -> bool {
        self.shared.core.borrow().check_integrity()
    }

    // =========================================================================
    // Batch edits and reordering
    // =========================================================================

    /// Removes `count` elements starting at `start`.
    ///
    /// Views overlapping the removed run are disposed, views inside it
    /// collapse to size 0, and views containing it shrink by `count`.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::RangeOutOfBounds`] or
    /// [`SequenceError::Disposed`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use seqview::sequence::LinkedSequence;
    ///
    /// let mut root: LinkedSequence<i32> = vec![10, 20, 30, 40, 50].into_iter().collect();
    /// let view = root.view(1, 3).unwrap();
    ///
    /// root.remove_interval(0, 2).unwrap();
    /// assert_eq!(root.to_vec().unwrap(), vec![30, 40, 50]);
    /// assert!(!view.is_valid());
    /// ```
    pub fn remove_interval(&mut self, start: usize, count: usize) -> Result<()> {
        let full = self.key.is_none();
        self.mutate(|core, batch| {
            let root_size = core.size;
            if let Some(first) = core.remove_interval(self.key, start, count)? {
                batch.push_with(|| SequenceEvent::Cleared {
                    full: full && count == root_size,
                    count,
                    start: first,
                });
                batch.changed();
            }
            Ok(())
        })
    }

    /// Removes every element of this sequence or view.
    ///
    /// On a root no view is disposed: every view collapses to size 0.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::Disposed`] for an invalidated handle.
    pub fn clear(&mut self) -> Result<()> {
        let size = self.len()?;
        self.remove_interval(0, size)
    }

    /// Removes every element matching `predicate` in one sweep.
    ///
    /// Views are rebased, never disposed: a view whose elements were all
    /// removed ends up empty. `predicate` must not access this sequence.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::Disposed`] for an invalidated handle.
    pub fn remove_where(&mut self, predicate: impl FnMut(&T) -> bool) -> Result<usize> {
        self.mutate(|core, batch| {
            let removed = core.remove_where(self.key, predicate, |_, item| {
                batch.push_with(|| SequenceEvent::Removed { item, count: 1 });
            })?;
            if removed > 0 {
                batch.changed();
            }
            Ok(removed)
        })
    }

    /// Reverses this sequence or view in place.
    ///
    /// Views contained in the reversed window follow their elements;
    /// overlapping views are disposed. Reversing twice restores every view.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::Disposed`] for an invalidated handle.
    pub fn reverse(&mut self) -> Result<()> {
        self.mutate(|core, batch| {
            if core.reverse(self.key)? {
                batch.changed();
            }
            Ok(())
        })
    }

    /// Stable sort with a total comparator.
    ///
    /// Contained and overlapping views are disposed.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::Disposed`] for an invalidated handle.
    pub fn sort_by(&mut self, mut compare: impl FnMut(&T, &T) -> Ordering) -> Result<()> {
        self.try_sort_by(|left, right| Some(compare(left, right)))
    }

    /// Stable sort with a comparator that may reject a pair.
    ///
    /// The order is computed before anything changes, so a rejected pair
    /// leaves the sequence and its views untouched.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::NotOrderable`] if `compare` returns `None`
    /// and [`SequenceError::Disposed`] for an invalidated handle.
    pub fn try_sort_by(
        &mut self,
        compare: impl FnMut(&T, &T) -> Option<Ordering>,
    ) -> Result<()> {
        self.mutate(|core, batch| {
            if core.sort(self.key, compare)? {
                batch.changed();
            }
            Ok(())
        })
    }

    /// Randomly permutes the elements using `rng`.
    ///
    /// Contained and overlapping views are disposed.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::Disposed`] for an invalidated handle.
    #[cfg(feature = "shuffle")]
    pub fn shuffle_with<R: rand::Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        self.mutate(|core, batch| {
            if core.shuffle(self.key, rng)? {
                batch.changed();
            }
            Ok(())
        })
    }

    /// Randomly permutes the elements using the thread-local generator.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::Disposed`] for an invalidated handle.
    #[cfg(feature = "shuffle")]
    pub fn shuffle(&mut self) -> Result<()> {
        self.shuffle_with(&mut rand::rng())
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// Registers `observer` on the root behind this handle.
    ///
    /// The observer sees the edits made through every handle of the root.
    /// An observer that captures a handle to the same root keeps that root
    /// alive until it is unsubscribed. Subscribing works even while the root
    /// is borrowed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::cell::RefCell;
    /// use std::rc::Rc;
    /// use seqview::sequence::{LinkedSequence, SequenceEvent};
    ///
    /// let mut root: LinkedSequence<i32> = LinkedSequence::new();
    /// let seen = Rc::new(RefCell::new(Vec::new()));
    /// let sink = Rc::clone(&seen);
    /// root.subscribe(move |event: &SequenceEvent<i32>| sink.borrow_mut().push(event.clone()));
    ///
    /// root.insert_last(7).unwrap();
    /// assert_eq!(
    ///     *seen.borrow(),
    ///     vec![
    ///         SequenceEvent::Inserted { item: 7, index: 0 },
    ///         SequenceEvent::Added { item: 7, count: 1 },
    ///         SequenceEvent::Changed,
    ///     ]
    /// );
    /// ```
    pub fn subscribe(&self, observer: impl FnMut(&SequenceEvent<T>) + 'static) -> ObserverId {
        self.shared.observers.borrow_mut().subscribe(Box::new(observer))
    }

    /// Removes a previously registered observer.
    ///
    /// Returns `false` if `id` is unknown. Called from inside an observer
    /// while events are being delivered, the observer still receives the
    /// rest of the current mutation's events.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let detached = self.shared.observers.borrow_mut().unsubscribe(id);
        match detached {
            Some(Detached::Removed(callback)) => {
                // may hold handles whose drop needs the root
                drop(callback);
                true
            }
            Some(Detached::Deferred) => true,
            None => false,
        }
    }
}

impl<T: Clone> LinkedSequence<T> {
    /// Clone of the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::IndexOutOfRange`] or
    /// [`SequenceError::Disposed`].
    pub fn get_cloned(&self, index: usize) -> Result<T> {
        self.get(index).map(|item| item.clone())
    }

    /// Clone of the first element.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::EmptyCollection`] or
    /// [`SequenceError::Disposed`].
    pub fn first(&self) -> Result<T> {
        if self.is_empty()? {
            return Err(SequenceError::EmptyCollection);
        }
        self.get_cloned(0)
    }

    /// Clone of the last element.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::EmptyCollection`] or
    /// [`SequenceError::Disposed`].
    pub fn last(&self) -> Result<T> {
        match self.len()? {
            0 => Err(SequenceError::EmptyCollection),
            length => self.get_cloned(length - 1),
        }
    }

    /// Replaces the element at `index`, returning the old one.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::IndexOutOfRange`] or
    /// [`SequenceError::Disposed`].
    pub fn set(&mut self, index: usize, item: T) -> Result<T> {
        self.mutate(|core, batch| {
            let new = batch.is_live().then(|| item.clone());
            let (absolute, old) = core.replace(self.key, index, item)?;
            if let Some(new) = new {
                batch.push_with(|| SequenceEvent::RemovedAt {
                    item: old.clone(),
                    index: absolute,
                });
                batch.push_with(|| SequenceEvent::Removed {
                    item: old.clone(),
                    count: 1,
                });
                batch.push_with(|| SequenceEvent::Inserted {
                    item: new.clone(),
                    index: absolute,
                });
                batch.push_with(|| SequenceEvent::Added {
                    item: new,
                    count: 1,
                });
            }
            batch.changed();
            Ok(old)
        })
    }

    /// Inserts `item` before position `index`.
    ///
    /// Views starting at `index` shift right, views ending at `index` do
    /// not grow, and views straddling `index` grow by one.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::IndexOutOfRange`] if `index > len` and
    /// [`SequenceError::Disposed`] for an invalidated handle.
    pub fn insert(&mut self, index: usize, item: T) -> Result<()> {
        self.insert_all(index, std::iter::once(item))
    }

    /// Inserts `item` at the front.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::Disposed`] for an invalidated handle.
    pub fn insert_first(&mut self, item: T) -> Result<()> {
        self.insert(0, item)
    }

    /// Inserts `item` at the back.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::Disposed`] for an invalidated handle.
    pub fn insert_last(&mut self, item: T) -> Result<()> {
        let length = self.len()?;
        self.insert(length, item)
    }

    /// Inserts every item of `items` before position `index`, in order.
    ///
    /// The run is linked in with a single fixup pass and a single stamp
    /// increment. `items` is collected before the sequence is borrowed, so
    /// it may read from this sequence.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::IndexOutOfRange`] if `index > len` and
    /// [`SequenceError::Disposed`] for an invalidated handle.
    pub fn insert_all(&mut self, index: usize, items: impl IntoIterator<Item = T>) -> Result<()> {
        let items: Vec<T> = items.into_iter().collect();
        self.mutate(|core, batch| {
            let Some(insertion) = core.insert_run(self.key, index, items)? else {
                return Ok(());
            };
            if batch.is_live() {
                let mut node = insertion.first;
                for offset in 0..insertion.count {
                    let item = core.nodes.item(node);
                    batch.push_with(|| SequenceEvent::Inserted {
                        item: item.clone(),
                        index: insertion.index + offset,
                    });
                    batch.push_with(|| SequenceEvent::Added {
                        item: item.clone(),
                        count: 1,
                    });
                    node = core.nodes.next(node);
                }
            }
            batch.changed();
            Ok(())
        })
    }

    /// Appends every item of `items`.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::Disposed`] for an invalidated handle.
    pub fn add_all(&mut self, items: impl IntoIterator<Item = T>) -> Result<()> {
        let length = self.len()?;
        self.insert_all(length, items)
    }

    /// Removes and returns the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::IndexOutOfRange`] or
    /// [`SequenceError::Disposed`].
    pub fn remove_at(&mut self, index: usize) -> Result<T> {
        self.mutate(|core, batch| {
            let (absolute, item) = core.remove_at(self.key, index)?;
            batch.push_with(|| SequenceEvent::RemovedAt {
                item: item.clone(),
                index: absolute,
            });
            batch.push_with(|| SequenceEvent::Removed {
                item: item.clone(),
                count: 1,
            });
            batch.changed();
            Ok(item)
        })
    }

    /// Removes and returns the first element.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::EmptyCollection`] or
    /// [`SequenceError::Disposed`].
    pub fn remove_first(&mut self) -> Result<T> {
        if self.is_empty()? {
            return Err(SequenceError::EmptyCollection);
        }
        self.remove_at(0)
    }

    /// Removes and returns the last element.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::EmptyCollection`] or
    /// [`SequenceError::Disposed`].
    pub fn remove_last(&mut self) -> Result<T> {
        match self.len()? {
            0 => Err(SequenceError::EmptyCollection),
            length => self.remove_at(length - 1),
        }
    }

    /// Iterates over clones of the elements.
    ///
    /// The iterator fails with [`SequenceError::ConcurrentModification`] if
    /// the root changes before it is exhausted, and yields a single
    /// [`SequenceError::Disposed`] for an invalidated handle.
    pub fn iter(&self) -> Iter<T> {
        match self.window() {
            Ok(window) => Iter::between(
                Rc::clone(&self.shared.core),
                window.start,
                window.end,
                window.size,
                true,
            ),
            Err(error) => Iter::failed(Rc::clone(&self.shared.core), error),
        }
    }

    /// A stamp-checked range over `count` elements starting at `start`.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::RangeOutOfBounds`] or
    /// [`SequenceError::Disposed`].
    pub fn range(&self, start: usize, count: usize) -> Result<Range<T>> {
        let (first, after) = {
            let core = self.shared.read()?;
            let window = core.window(self.key)?;
            check_range(start, count, window.size)?;
            let anchors = core.anchors(&window);
            let slot = window.offset + start;
            (
                core.nodes.locate(&anchors, slot),
                core.nodes.locate(&anchors, slot + count + 1),
            )
        };
        Ok(Range::new(Rc::clone(&self.shared.core), first, after, count))
    }

    /// Clones every element into a `Vec`.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::Disposed`] for an invalidated handle.
    pub fn to_vec(&self) -> Result<Vec<T>> {
        let mut items = Vec::with_capacity(self.len()?);
        self.for_each(|item| items.push(item.clone()))?;
        Ok(items)
    }
}

impl<T: PartialEq> LinkedSequence<T> {
    /// Index of the first element equal to `item`.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::Disposed`] for an invalidated handle.
    pub fn index_of(&self, item: &T) -> Result<Option<usize>> {
        self.find_index(|candidate| candidate == item)
    }

    /// Index of the last element equal to `item`.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::Disposed`] for an invalidated handle.
    pub fn last_index_of(&self, item: &T) -> Result<Option<usize>> {
        self.find_last_index(|candidate| candidate == item)
    }

    /// Returns `true` if some element equals `item`.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::Disposed`] for an invalidated handle.
    pub fn contains(&self, item: &T) -> Result<bool> {
        self.index_of(item).map(|index| index.is_some())
    }

    /// Number of elements equal to `item`.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::Disposed`] for an invalidated handle.
    pub fn count_of(&self, item: &T) -> Result<usize> {
        let mut count = 0;
        self.for_each(|candidate| {
            if candidate == item {
                count += 1;
            }
        })?;
        Ok(count)
    }

    /// A one-element view on the first occurrence of `item`.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::Disposed`] for an invalidated handle.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use seqview::sequence::LinkedSequence;
    ///
    /// let root: LinkedSequence<i32> = vec![1, 2, 3, 2].into_iter().collect();
    /// assert_eq!(root.view_of(&2).unwrap().unwrap().offset(), Ok(1));
    /// assert_eq!(root.last_view_of(&2).unwrap().unwrap().offset(), Ok(3));
    /// assert!(root.view_of(&9).unwrap().is_none());
    /// ```
    pub fn view_of(&self, item: &T) -> Result<Option<Self>> {
        self.index_of(item)?
            .map(|index| self.view(index, 1))
            .transpose()
    }

    /// A one-element view on the last occurrence of `item`.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::Disposed`] for an invalidated handle.
    pub fn last_view_of(&self, item: &T) -> Result<Option<Self>> {
        self.last_index_of(item)?
            .map(|index| self.view(index, 1))
            .transpose()
    }
}

impl<T: Clone + PartialEq> LinkedSequence<T> {
    /// Removes the first element equal to `item`.
    ///
    /// Returns `false` if there is none.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::Disposed`] for an invalidated handle.
    pub fn remove(&mut self, item: &T) -> Result<bool> {
        match self.index_of(item)? {
            Some(index) => self.remove_at(index).map(|_| true),
            None => Ok(false),
        }
    }
}

impl<T: Clone + Eq + Hash> LinkedSequence<T> {
    /// Removes one occurrence for each item of `items`, in one sweep.
    ///
    /// An item listed twice removes up to two equal elements. Returns the
    /// number of removed elements.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::Disposed`] for an invalidated handle.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use seqview::sequence::LinkedSequence;
    ///
    /// let mut root: LinkedSequence<i32> = vec![1, 2, 2, 3, 2].into_iter().collect();
    /// assert_eq!(root.remove_all([2, 2]), Ok(2));
    /// assert_eq!(root.to_vec().unwrap(), vec![1, 3, 2]);
    /// ```
    pub fn remove_all(&mut self, items: impl IntoIterator<Item = T>) -> Result<usize> {
        let mut wanted = multiset(items);
        self.remove_where(|item| take_one(&mut wanted, item))
    }

    /// Keeps one element for each item of `items` and removes the rest.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::Disposed`] for an invalidated handle.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use seqview::sequence::LinkedSequence;
    ///
    /// let mut root: LinkedSequence<i32> = vec![1, 2, 2, 3, 2].into_iter().collect();
    /// assert_eq!(root.retain_all([2, 3]), Ok(3));
    /// assert_eq!(root.to_vec().unwrap(), vec![2, 3]);
    /// ```
    pub fn retain_all(&mut self, items: impl IntoIterator<Item = T>) -> Result<usize> {
        let mut kept = multiset(items);
        self.remove_where(|item| !take_one(&mut kept, item))
    }
}

impl<T: PartialOrd> LinkedSequence<T> {
    /// Stable ascending sort.
    ///
    /// Contained and overlapping views are disposed.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::NotOrderable`] if two elements cannot be
    /// compared (a `NaN`, say), leaving the sequence untouched, and
    /// [`SequenceError::Disposed`] for an invalidated handle.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use seqview::sequence::{LinkedSequence, SequenceError};
    ///
    /// let mut numbers: LinkedSequence<f64> = vec![2.0, 1.0, 3.0].into_iter().collect();
    /// numbers.sort().unwrap();
    /// assert_eq!(numbers.to_vec().unwrap(), vec![1.0, 2.0, 3.0]);
    ///
    /// numbers.insert_last(f64::NAN).unwrap();
    /// numbers.insert_first(5.0).unwrap();
    /// assert_eq!(numbers.sort(), Err(SequenceError::NotOrderable));
    /// ```
    pub fn sort(&mut self) -> Result<()> {
        self.try_sort_by(T::partial_cmp)
    }

    /// Returns `true` if the elements are in non-descending order.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::NotOrderable`] if two neighbours cannot be
    /// compared and [`SequenceError::Disposed`] for an invalidated handle.
    pub fn is_sorted(&self) -> Result<bool> {
        let core = self.shared.read()?;
        let window = core.window(self.key)?;
        let mut previous: Option<&T> = None;
        let mut node = core.nodes.next(window.start);
        for _ in 0..window.size {
            let item = core.nodes.item(node);
            if let Some(previous) = previous {
                match previous.partial_cmp(item) {
                    None => return Err(SequenceError::NotOrderable),
                    Some(Ordering::Greater) => return Ok(false),
                    Some(_) => {}
                }
            }
            previous = Some(item);
            node = core.nodes.next(node);
        }
        Ok(true)
    }
}

fn multiset<T: Eq + Hash>(items: impl IntoIterator<Item = T>) -> Multiset<T> {
    let mut counts = Multiset::default();
    for item in items {
        *counts.entry(item).or_insert(0) += 1;
    }
    counts
}

fn take_one<T: Eq + Hash>(counts: &mut Multiset<T>, item: &T) -> bool {
    match counts.get_mut(item) {
        Some(count) if *count > 0 => {
            *count -= 1;
            true
        }
        _ => false,
    }
}

impl<T> Default for LinkedSequence<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for LinkedSequence<T> {
    fn drop(&mut self) {
        if let Some(key) = self.key {
            self.shared.release(key);
        }
    }
}

impl<T> FromIterator<T> for LinkedSequence<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let sequence = Self::new();
        {
            let mut core = sequence.shared.core.borrow_mut();
            let items: Vec<T> = iter.into_iter().collect();
            // a fresh root has no observers and no views
            let _ = core.insert_run(None, 0, items);
        }
        sequence
    }
}

impl<T: Clone> IntoIterator for &LinkedSequence<T> {
    type Item = Result<T>;
    type IntoIter = Iter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: PartialEq> PartialEq for LinkedSequence<T> {
    fn eq(&self, other: &Self) -> bool {
        let (Ok(left_core), Ok(right_core)) = (self.shared.read(), other.shared.read()) else {
            return false;
        };
        let (Ok(left), Ok(right)) = (left_core.window(self.key), right_core.window(other.key))
        else {
            return false;
        };
        if left.size != right.size {
            return false;
        }
        let (mut left_node, mut right_node) = (left.start, right.start);
        for _ in 0..left.size {
            left_node = left_core.nodes.next(left_node);
            right_node = right_core.nodes.next(right_node);
            if left_core.nodes.item(left_node) != right_core.nodes.item(right_node) {
                return false;
            }
        }
        true
    }
}

impl<T: fmt::Debug> fmt::Debug for LinkedSequence<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Ok(core) = self.shared.read() else {
            return formatter.write_str("LinkedSequence(<borrowed>)");
        };
        match core.window(self.key) {
            Ok(window) => {
                let mut list = formatter.debug_list();
                core.for_each(&window, |item| {
                    list.entry(item);
                });
                list.finish()
            }
            Err(_) => formatter.write_str("LinkedSequence(<disposed>)"),
        }
    }
}

static_assertions::assert_not_impl_any!(LinkedSequence<()>: Send, Sync);
static_assertions::assert_not_impl_any!(Iter<()>: Send, Sync);
static_assertions::assert_not_impl_any!(Range<()>: Send, Sync);
