//! View registry and the relationship classifier.
//!
//! The registry is a generational slot arena. A [`ViewKey`] stays valid
//! until its slot is released, after which the slot's generation moves on
//! and the stale key no longer resolves. Nothing in the registry keeps a
//! view handle alive, and a handle never dangles: it just stops resolving.

use super::node::NodeId;

/// Location of a window on the root chain.
///
/// `start` is the node just before the first element and `end` the node
/// just after the last one. For the root these are the two sentinels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Window {
    pub(crate) offset: usize,
    pub(crate) size: usize,
    pub(crate) start: NodeId,
    pub(crate) end: NodeId,
}

impl Window {
    /// Absolute index one past the last element.
    #[inline]
    pub(crate) const fn end_index(&self) -> usize {
        self.offset + self.size
    }

    /// Slot of the `start` boundary node.
    #[inline]
    pub(crate) const fn start_slot(&self) -> usize {
        self.offset
    }

    /// Slot of the `end` boundary node.
    #[inline]
    pub(crate) const fn end_slot(&self) -> usize {
        self.offset + self.size + 1
    }
}

/// How one window relates to another on the same root.
///
/// The classification always describes the *other* window relative to a
/// reference window, see [`LinkedSequence::relation_to`].
///
/// [`LinkedSequence::relation_to`]: super::LinkedSequence::relation_to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Relation {
    /// The windows share no element. Empty windows sitting exactly on the
    /// reference window's edge are disjoint.
    Disjoint,
    /// The other window covers the whole reference window.
    Contains,
    /// The other window lies inside the reference window.
    ContainedIn,
    /// The windows share some elements but neither covers the other.
    Overlapping,
}

impl Relation {
    /// Classifies `other` against `reference`.
    ///
    /// An empty reference window strictly inside `other` is contained by
    /// it, and an empty `other` strictly inside the reference is contained
    /// in it.
    pub(crate) const fn classify(reference: &Window, other: &Window) -> Self {
        let (reference_start, reference_end) = (reference.offset, reference.end_index());
        let (other_start, other_end) = (other.offset, other.end_index());
        if other_start >= reference_end || other_end <= reference_start {
            Self::Disjoint
        } else if reference.size == 0
            || (other_start <= reference_start && other_end >= reference_end)
        {
            Self::Contains
        } else if other.size == 0 || (other_start >= reference_start && other_end <= reference_end)
        {
            Self::ContainedIn
        } else {
            Self::Overlapping
        }
    }
}

/// Generational handle to a registered view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct ViewKey {
    index: u32,
    generation: u32,
}

struct Slot {
    generation: u32,
    window: Option<Window>,
}

/// Every view currently open on one root.
#[derive(Default)]
pub(crate) struct ViewRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl ViewRegistry {
    /// Number of open views.
    pub(crate) const fn len(&self) -> usize {
        self.live
    }

    pub(crate) fn register(&mut self, window: Window) -> ViewKey {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.window = Some(window);
            return ViewKey {
                index,
                generation: slot.generation,
            };
        }
        let index = u32::try_from(self.slots.len())
            .unwrap_or_else(|_| unreachable!("more than u32::MAX open views"));
        self.slots.push(Slot {
            generation: 0,
            window: Some(window),
        });
        ViewKey {
            index,
            generation: 0,
        }
    }

    pub(crate) fn get(&self, key: ViewKey) -> Option<&Window> {
        self.slots
            .get(key.index as usize)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.window.as_ref())
    }

    pub(crate) fn get_mut(&mut self, key: ViewKey) -> Option<&mut Window> {
        self.slots
            .get_mut(key.index as usize)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.window.as_mut())
    }

    /// Releases the slot behind `key`. Returns `false` for stale keys.
    pub(crate) fn remove(&mut self, key: ViewKey) -> bool {
        let Some(slot) = self.slots.get_mut(key.index as usize) else {
            return false;
        };
        if slot.generation != key.generation || slot.window.is_none() {
            return false;
        }
        slot.window = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index);
        self.live -= 1;
        true
    }

    /// Releases every slot, invalidating all outstanding keys.
    pub(crate) fn clear(&mut self) -> usize {
        let released = self.live;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.window.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
            }
        }
        self.live = 0;
        released
    }

    /// Iterates over every view except `exclude`.
    pub(crate) fn others(
        &self,
        exclude: Option<ViewKey>,
    ) -> impl Iterator<Item = (ViewKey, &Window)> {
        self.slots.iter().enumerate().filter_map(move |(index, slot)| {
            let key = ViewKey {
                index: index as u32,
                generation: slot.generation,
            };
            match &slot.window {
                Some(window) if Some(key) != exclude => Some((key, window)),
                _ => None,
            }
        })
    }

    /// Mutable counterpart of [`ViewRegistry::others`].
    pub(crate) fn others_mut(
        &mut self,
        exclude: Option<ViewKey>,
    ) -> impl Iterator<Item = (ViewKey, &mut Window)> {
        self.slots.iter_mut().enumerate().filter_map(move |(index, slot)| {
            let key = ViewKey {
                index: index as u32,
                generation: slot.generation,
            };
            match &mut slot.window {
                Some(window) if Some(key) != exclude => Some((key, window)),
                _ => None,
            }
        })
    }

    /// Disposes every other view whose relation to `reference` matches.
    ///
    /// Returns the number of disposed views.
    pub(crate) fn dispose_related(
        &mut self,
        exclude: Option<ViewKey>,
        reference: &Window,
        mut matches: impl FnMut(Relation) -> bool,
    ) -> usize {
        let doomed: Vec<ViewKey> = self
            .others(exclude)
            .filter(|(_, window)| matches(Relation::classify(reference, window)))
            .map(|(key, _)| key)
            .collect();
        for &key in &doomed {
            self.remove(key);
        }
        if !doomed.is_empty() {
            tracing::debug!(
                disposed = doomed.len(),
                offset = reference.offset,
                size = reference.size,
                "disposed views invalidated by edit"
            );
        }
        doomed.len()
    }
}
