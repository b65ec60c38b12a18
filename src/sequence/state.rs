//! State shared by a root and all of its views.
//!
//! Every operation here works on absolute positions and takes the acting
//! view's key (`None` for the root). Operations validate their arguments
//! before touching the chain, run the matching fixup, and bump the stamp
//! once when something actually changed.

use std::cell::{Ref, RefCell, RefMut};
use std::cmp::Ordering;
use std::rc::Rc;

use super::batch;
use super::error::{Result, SequenceError};
use super::events::Observers;
use super::fixup;
use super::node::{Anchor, Anchors, HEAD, NodeId, NodeStore, TAIL};
use super::registry::{Relation, ViewKey, ViewRegistry, Window};
use super::reorder;

/// Where a run of elements was inserted.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Insertion {
    pub(crate) index: usize,
    pub(crate) first: NodeId,
    pub(crate) count: usize,
}

/// What every handle of one root points at.
///
/// Observers and released view keys live beside the core so they stay
/// reachable while the core is borrowed, whether by an element guard or by
/// a mutation in progress.
pub(crate) struct Shared<T> {
    pub(crate) core: Rc<RefCell<Core<T>>>,
    pub(crate) observers: RefCell<Observers<T>>,
    released: RefCell<Vec<ViewKey>>,
}

impl<T> Shared<T> {
    pub(crate) fn new(core: Core<T>) -> Self {
        Self {
            core: Rc::new(RefCell::new(core)),
            observers: RefCell::new(Observers::default()),
            released: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn read(&self) -> Result<Ref<'_, Core<T>>> {
        self.core.try_borrow().map_err(|_| SequenceError::Borrowed)
    }

    /// Borrows the core mutably, first disposing every view released while
    /// it was borrowed.
    pub(crate) fn write(&self) -> Result<RefMut<'_, Core<T>>> {
        let mut core = self.core.try_borrow_mut().map_err(|_| SequenceError::Borrowed)?;
        for key in self.released.borrow_mut().drain(..) {
            core.dispose_view(key);
        }
        Ok(core)
    }

    /// Disposes the view `key` now, or on the next [`Shared::write`] if the
    /// core is borrowed.
    pub(crate) fn release(&self, key: ViewKey) {
        match self.core.try_borrow_mut() {
            Ok(mut core) => {
                core.dispose_view(key);
            }
            Err(_) => {
                tracing::trace!("core borrowed, deferring view disposal");
                self.released.borrow_mut().push(key);
            }
        }
    }
}

pub(crate) struct Core<T> {
    pub(crate) nodes: NodeStore<T>,
    pub(crate) size: usize,
    pub(crate) stamp: u64,
    pub(crate) views: ViewRegistry,
    pub(crate) disposed: bool,
}

impl<T> Core<T> {
    pub(crate) fn new() -> Self {
        Self {
            nodes: NodeStore::new(),
            size: 0,
            stamp: 0,
            views: ViewRegistry::default(),
            disposed: false,
        }
    }

    pub(crate) const fn root_window(&self) -> Window {
        Window {
            offset: 0,
            size: self.size,
            start: HEAD,
            end: TAIL,
        }
    }

    /// Resolves the window of `key`, or of the root for `None`.
    pub(crate) fn window(&self, key: Option<ViewKey>) -> Result<Window> {
        if self.disposed {
            return Err(SequenceError::Disposed);
        }
        match key {
            None => Ok(self.root_window()),
            Some(key) => self.views.get(key).copied().ok_or(SequenceError::Disposed),
        }
    }

    pub(crate) const fn check_stamp(&self, stamp: u64) -> Result<()> {
        if self.disposed {
            Err(SequenceError::Disposed)
        } else if self.stamp != stamp {
            Err(SequenceError::ConcurrentModification)
        } else {
            Ok(())
        }
    }

    /// Known positions near `window`: both sentinels and its boundaries.
    pub(crate) fn anchors(&self, window: &Window) -> Anchors {
        let mut anchors = Anchors::new();
        anchors.push(Anchor::new(0, HEAD));
        anchors.push(Anchor::new(self.size + 1, TAIL));
        anchors.push(Anchor::new(window.start_slot(), window.start));
        anchors.push(Anchor::new(window.end_slot(), window.end));
        anchors
    }

    /// Node holding the element at `index` of `window`.
    pub(crate) fn node_at(&self, window: &Window, index: usize) -> Result<NodeId> {
        if index >= window.size {
            return Err(SequenceError::IndexOutOfRange {
                index,
                length: window.size,
            });
        }
        Ok(self
            .nodes
            .locate(&self.anchors(window), window.offset + index + 1))
    }

    /// Locates the boundaries of `count` elements starting at absolute
    /// `offset`.
    fn bounds(&self, anchors: &[Anchor], offset: usize, count: usize) -> Window {
        Window {
            offset,
            size: count,
            start: self.nodes.locate(anchors, offset),
            end: self.nodes.locate(anchors, offset + count + 1),
        }
    }

    fn grow(&mut self, key: Option<ViewKey>, added: usize) {
        self.size += added;
        if let Some(window) = key.and_then(|key| self.views.get_mut(key)) {
            window.size += added;
        }
    }

    fn shrink(&mut self, key: Option<ViewKey>, removed: usize) {
        self.size -= removed;
        if let Some(window) = key.and_then(|key| self.views.get_mut(key)) {
            window.size -= removed;
        }
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Registers a view over `count` elements starting at `start` of the
    /// acting window.
    pub(crate) fn open_view(
        &mut self,
        key: Option<ViewKey>,
        start: usize,
        count: usize,
    ) -> Result<ViewKey> {
        let window = self.window(key)?;
        check_range(start, count, window.size)?;
        let anchors = self.anchors(&window);
        let record = self.bounds(&anchors, window.offset + start, count);
        Ok(self.register(record))
    }

    /// Registers the smallest view covering both windows.
    pub(crate) fn open_span(&mut self, first: &Window, second: &Window) -> ViewKey {
        let offset = first.offset.min(second.offset);
        let end = first.end_index().max(second.end_index());
        let mut anchors = self.anchors(first);
        anchors.push(Anchor::new(second.start_slot(), second.start));
        anchors.push(Anchor::new(second.end_slot(), second.end));
        let record = self.bounds(&anchors, offset, end - offset);
        self.register(record)
    }

    fn register(&mut self, record: Window) -> ViewKey {
        let key = self.views.register(record);
        tracing::trace!(
            offset = record.offset,
            size = record.size,
            open = self.views.len(),
            "opened view"
        );
        key
    }

    /// Moves a view by `delta` and resizes it to `size`.
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub(crate) fn slide(&mut self, key: Option<ViewKey>, delta: isize, size: usize) -> Result<()> {
        let Some(key) = key else {
            return Err(SequenceError::NotAView);
        };
        let current = self.window(Some(key))?;
        let target = current.offset as isize + delta;
        let fits = target >= 0
            && (target as usize)
                .checked_add(size)
                .is_some_and(|end| end <= self.size);
        if !fits {
            return Err(SequenceError::RangeOutOfBounds {
                start: target,
                count: size,
                length: self.size,
            });
        }
        let anchors = self.anchors(&current);
        let record = self.bounds(&anchors, target as usize, size);
        if let Some(window) = self.views.get_mut(key) {
            *window = record;
        }
        Ok(())
    }

    pub(crate) fn dispose_view(&mut self, key: ViewKey) -> bool {
        let removed = self.views.remove(key);
        if removed {
            tracing::trace!(open = self.views.len(), "disposed view");
        }
        removed
    }

    /// Disposes the root, invalidating every view and dropping all elements.
    pub(crate) fn dispose_root(&mut self) {
        if self.disposed {
            return;
        }
        let views = self.views.clear();
        self.nodes.clear();
        self.size = 0;
        self.stamp += 1;
        self.disposed = true;
        tracing::debug!(views, "disposed root sequence");
    }

    // =========================================================================
    // Single-position edits
    // =========================================================================

    /// Links `items` in before `index` of the acting window.
    pub(crate) fn insert_run(
        &mut self,
        key: Option<ViewKey>,
        index: usize,
        items: Vec<T>,
    ) -> Result<Option<Insertion>> {
        let window = self.window(key)?;
        if index > window.size {
            return Err(SequenceError::IndexOutOfRange {
                index,
                length: window.size,
            });
        }
        if items.is_empty() {
            return Ok(None);
        }
        let absolute = window.offset + index;
        let predecessor = self.nodes.locate(&self.anchors(&window), absolute);
        let count = items.len();
        let mut last = predecessor;
        for item in items {
            last = self.nodes.insert_after(last, item);
        }
        let first = self.nodes.next(predecessor);
        self.grow(key, count);
        fixup::after_insert(&mut self.views, key, absolute, count, first, last);
        self.stamp += 1;
        Ok(Some(Insertion {
            index: absolute,
            first,
            count,
        }))
    }

    /// Unlinks the element at `index` of the acting window.
    ///
    /// Returns the element and its absolute index.
    pub(crate) fn remove_at(&mut self, key: Option<ViewKey>, index: usize) -> Result<(usize, T)> {
        let window = self.window(key)?;
        let node = self.node_at(&window, index)?;
        let absolute = window.offset + index;
        fixup::before_remove(
            &mut self.views,
            key,
            absolute,
            self.nodes.prev(node),
            self.nodes.next(node),
        );
        let item = self.nodes.unlink(node);
        self.shrink(key, 1);
        self.stamp += 1;
        Ok((absolute, item))
    }

    /// Replaces the element at `index`, returning the old one and its
    /// absolute index.
    pub(crate) fn replace(
        &mut self,
        key: Option<ViewKey>,
        index: usize,
        item: T,
    ) -> Result<(usize, T)> {
        let window = self.window(key)?;
        let node = self.node_at(&window, index)?;
        let old = self.nodes.replace(node, item);
        self.stamp += 1;
        Ok((window.offset + index, old))
    }

    // =========================================================================
    // Batch edits
    // =========================================================================

    /// Removes `count` elements starting at `start` of the acting window.
    ///
    /// Views overlapping the removed run are disposed first; the sweep then
    /// collapses contained views and shrinks containing ones. Returns the
    /// absolute index of the first removed element, or `None` if nothing
    /// was removed.
    pub(crate) fn remove_interval(
        &mut self,
        key: Option<ViewKey>,
        start: usize,
        count: usize,
    ) -> Result<Option<usize>> {
        let window = self.window(key)?;
        check_range(start, count, window.size)?;
        if count == 0 {
            return Ok(None);
        }
        let anchors = self.anchors(&window);
        let removed_run = self.bounds(&anchors, window.offset + start, count);
        self.views
            .dispose_related(key, &removed_run, |relation| relation == Relation::Overlapping);
        let removed = batch::sweep_remove(
            &mut self.nodes,
            &mut self.views,
            key,
            &removed_run,
            |_| true,
            |_, item| drop(item),
        );
        debug_assert_eq!(removed, count);
        self.shrink(key, count);
        self.stamp += 1;
        Ok(Some(removed_run.offset))
    }

    /// Removes every element of the acting window matching `remove`.
    ///
    /// `sink` receives each removed element with its absolute index before
    /// removal.
    pub(crate) fn remove_where(
        &mut self,
        key: Option<ViewKey>,
        remove: impl FnMut(&T) -> bool,
        sink: impl FnMut(usize, T),
    ) -> Result<usize> {
        let window = self.window(key)?;
        let removed =
            batch::sweep_remove(&mut self.nodes, &mut self.views, key, &window, remove, sink);
        if removed > 0 {
            self.shrink(key, removed);
            self.stamp += 1;
        }
        Ok(removed)
    }

    // =========================================================================
    // Reordering
    // =========================================================================

    pub(crate) fn reverse(&mut self, key: Option<ViewKey>) -> Result<bool> {
        let window = self.window(key)?;
        if window.size < 2 {
            return Ok(false);
        }
        reorder::reverse(&mut self.nodes, &mut self.views, key, &window);
        self.stamp += 1;
        Ok(true)
    }

    pub(crate) fn sort(
        &mut self,
        key: Option<ViewKey>,
        compare: impl FnMut(&T, &T) -> Option<Ordering>,
    ) -> Result<bool> {
        let window = self.window(key)?;
        if window.size < 2 {
            return Ok(false);
        }
        let changed = reorder::sort(&mut self.nodes, &mut self.views, key, &window, compare)?;
        if changed {
            self.stamp += 1;
        }
        Ok(changed)
    }

    #[cfg(feature = "shuffle")]
    pub(crate) fn shuffle<R: rand::Rng + ?Sized>(
        &mut self,
        key: Option<ViewKey>,
        rng: &mut R,
    ) -> Result<bool> {
        let window = self.window(key)?;
        if window.size < 2 {
            return Ok(false);
        }
        reorder::shuffle(&mut self.nodes, &mut self.views, key, &window, rng);
        self.stamp += 1;
        Ok(true)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Index (relative to `window`) of the first element matching `found`.
    pub(crate) fn position(
        &self,
        window: &Window,
        mut found: impl FnMut(&T) -> bool,
    ) -> Option<usize> {
        let mut node = self.nodes.next(window.start);
        for index in 0..window.size {
            if found(self.nodes.item(node)) {
                return Some(index);
            }
            node = self.nodes.next(node);
        }
        None
    }

    /// Index (relative to `window`) of the last element matching `found`.
    pub(crate) fn last_position(
        &self,
        window: &Window,
        mut found: impl FnMut(&T) -> bool,
    ) -> Option<usize> {
        let mut node = self.nodes.prev(window.end);
        for index in (0..window.size).rev() {
            if found(self.nodes.item(node)) {
                return Some(index);
            }
            node = self.nodes.prev(node);
        }
        None
    }

    /// Visits the elements of `window` front to back.
    pub(crate) fn for_each(&self, window: &Window, mut visit: impl FnMut(&T)) {
        let mut node = self.nodes.next(window.start);
        for _ in 0..window.size {
            visit(self.nodes.item(node));
            node = self.nodes.next(node);
        }
    }

    /// Checks the chain and every registered view for consistency.
    pub(crate) fn check_integrity(&self) -> bool {
        if self.disposed {
            return self.views.len() == 0 && self.size == 0;
        }
        let mut node = HEAD;
        for _ in 0..=self.size {
            let next = self.nodes.next(node);
            if next == HEAD || self.nodes.prev(next) != node {
                return false;
            }
            node = next;
        }
        if node != TAIL || self.nodes.live() != self.size {
            return false;
        }
        let anchors = [Anchor::new(0, HEAD), Anchor::new(self.size + 1, TAIL)];
        self.views.others(None).all(|(_, window)| {
            window.end_index() <= self.size
                && self.nodes.locate(&anchors, window.start_slot()) == window.start
                && self.nodes.locate(&anchors, window.end_slot()) == window.end
        })
    }
}

#[allow(clippy::cast_possible_wrap)]
pub(crate) const fn check_range(start: usize, count: usize, length: usize) -> Result<()> {
    match start.checked_add(count) {
        Some(end) if end <= length => Ok(()),
        _ => Err(SequenceError::RangeOutOfBounds {
            start: start as isize,
            count,
            length,
        }),
    }
}
