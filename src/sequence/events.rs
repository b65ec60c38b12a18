//! Change notifications.
//!
//! Observers are closures registered on a root (through any of its
//! handles). A mutation raises its per-item events first and then exactly
//! one [`SequenceEvent::Changed`]. Events are collected while the sequence
//! is borrowed and delivered after the borrow is released, so observers may
//! read or even mutate the sequence. The events of a mutation performed
//! from inside an observer are queued and delivered, in order, once the
//! current mutation's events have reached every observer.
//!
//! Indices carried by events are absolute indices into the root.

use std::cell::RefCell;
use std::collections::VecDeque;

/// A single change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceEvent<T> {
    /// `count` copies of `item` were added.
    Added {
        /// The added element.
        item: T,
        /// How many copies were added.
        count: usize,
    },
    /// `count` copies of `item` were removed.
    Removed {
        /// The removed element.
        item: T,
        /// How many copies were removed.
        count: usize,
    },
    /// `item` was inserted at `index`.
    Inserted {
        /// The inserted element.
        item: T,
        /// Absolute index of the new element.
        index: usize,
    },
    /// `item` was removed from `index`.
    RemovedAt {
        /// The removed element.
        item: T,
        /// Absolute index the element occupied.
        index: usize,
    },
    /// A contiguous run was cleared.
    Cleared {
        /// `true` when the whole root was cleared.
        full: bool,
        /// Number of removed elements.
        count: usize,
        /// Absolute index of the first removed element.
        start: usize,
    },
    /// The sequence changed. Always the last event of a mutation.
    Changed,
}

/// Identifies a registered observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

type Callback<T> = Box<dyn FnMut(&SequenceEvent<T>)>;

/// Outcome of unsubscribing a known observer.
pub(crate) enum Detached<T> {
    /// The callback is handed back so it can be dropped outside any borrow.
    Removed(Callback<T>),
    /// The callback is being dispatched; it is dropped once the current
    /// mutation's events are delivered.
    Deferred,
}

/// Observers registered on one root.
pub(crate) struct Observers<T> {
    entries: Vec<(ObserverId, Callback<T>)>,
    next_id: u64,
    dispatching: bool,
    detached: Vec<ObserverId>,
    pending: VecDeque<Vec<SequenceEvent<T>>>,
}

impl<T> Default for Observers<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
            dispatching: false,
            detached: Vec::new(),
            pending: VecDeque::new(),
        }
    }
}

impl<T> Observers<T> {
    pub(crate) fn subscribe(&mut self, callback: Callback<T>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, callback));
        id
    }

    /// Detaches `id`, or returns `None` if it is not registered.
    pub(crate) fn unsubscribe(&mut self, id: ObserverId) -> Option<Detached<T>> {
        if let Some(index) = self.entries.iter().position(|(entry, _)| *entry == id) {
            let (_, callback) = self.entries.remove(index);
            return Some(Detached::Removed(callback));
        }
        if self.dispatching && id.0 < self.next_id && !self.detached.contains(&id) {
            self.detached.push(id);
            return Some(Detached::Deferred);
        }
        None
    }

    /// Starts collecting events for one mutation.
    ///
    /// The batch only records anything when at least one observer is
    /// registered. While a dispatch runs the observers are checked out, so
    /// the batch stays live.
    pub(crate) fn batch(&self) -> EventBatch<T> {
        EventBatch {
            events: (self.dispatching || !self.entries.is_empty()).then(Vec::new),
        }
    }

    fn begin_dispatch(&mut self) -> Vec<(ObserverId, Callback<T>)> {
        self.dispatching = true;
        std::mem::take(&mut self.entries)
    }

    /// Applies the subscriptions made while `entries` were checked out.
    ///
    /// Detached callbacks are returned for the caller to drop outside the
    /// borrow. Observers subscribed meanwhile join `entries` and see the
    /// events of the queued mutations.
    fn settle(&mut self, entries: &mut Vec<(ObserverId, Callback<T>)>) -> Vec<Callback<T>> {
        let detached = std::mem::take(&mut self.detached);
        let mut retired = Vec::new();
        let mut kept = Vec::with_capacity(entries.len() + self.entries.len());
        for (id, callback) in entries.drain(..) {
            if detached.contains(&id) {
                retired.push(callback);
            } else {
                kept.push((id, callback));
            }
        }
        kept.append(&mut self.entries);
        *entries = kept;
        retired
    }

    fn end_dispatch(&mut self, entries: Vec<(ObserverId, Callback<T>)>) {
        self.entries = entries;
        self.dispatching = false;
    }
}

/// Events recorded by one mutation, if anyone is listening.
pub(crate) struct EventBatch<T> {
    events: Option<Vec<SequenceEvent<T>>>,
}

impl<T> EventBatch<T> {
    /// Records the event built by `event`. The closure only runs when the
    /// batch is live, so payloads are cloned only when someone listens.
    pub(crate) fn push_with(&mut self, event: impl FnOnce() -> SequenceEvent<T>) {
        if let Some(events) = &mut self.events {
            events.push(event());
        }
    }

    pub(crate) const fn is_live(&self) -> bool {
        self.events.is_some()
    }

    /// Appends the closing [`SequenceEvent::Changed`].
    pub(crate) fn changed(&mut self) {
        self.push_with(|| SequenceEvent::Changed);
    }
}

/// Delivers `batch` to every observer.
///
/// Called from inside an observer, the batch is queued behind the one
/// being delivered.
pub(crate) fn dispatch<T>(observers: &RefCell<Observers<T>>, batch: EventBatch<T>) {
    let Some(events) = batch.events.filter(|events| !events.is_empty()) else {
        return;
    };
    let mut entries = {
        let mut list = observers.borrow_mut();
        if list.dispatching {
            list.pending.push_back(events);
            return;
        }
        list.begin_dispatch()
    };
    let mut next = Some(events);
    while let Some(events) = next {
        for event in &events {
            for (_, callback) in &mut entries {
                callback(event);
            }
        }
        // retired callbacks may hold view handles, drop them unborrowed
        let retired = observers.borrow_mut().settle(&mut entries);
        drop(retired);
        next = observers.borrow_mut().pending.pop_front();
    }
    observers.borrow_mut().end_dispatch(entries);
}
