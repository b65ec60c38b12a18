//! Batch-edit fixup.
//!
//! Removing many elements one at a time would cost `O(removed * views)`.
//! Instead, [`sweep_remove`] walks the affected window once and a
//! [`ViewHandler`] keeps the left and right boundaries of every other view
//! sorted by index, so both walks advance together:
//!
//! ```text
//! index     0   1   2   3   4   5   6
//! chain     a  [b   c   d]  e   f   g        window being swept: 1..4
//! removed       x       x
//! view A   [-----------)                     0..3 -> 0..2
//! view B                   [-------)         4..6 -> 2..4
//! ```
//!
//! A left boundary met at index `i` after `r` removals becomes `i - r` and
//! is anchored on the last kept node. A right boundary becomes `i - r` and
//! waits for the next kept node (or the window's end node) to anchor on.
//! Boundaries past the window only shift by the total removed count.
//!
//! The total cost is `O(window + views * log(views))`.

use smallvec::SmallVec;

use super::node::{NodeId, NodeStore};
use super::registry::{ViewKey, ViewRegistry, Window};

#[derive(Clone, Copy, Debug)]
struct Position {
    fix: usize,
    index: usize,
}

struct Fix {
    key: ViewKey,
    offset: usize,
    end_index: usize,
    start: NodeId,
    end: NodeId,
}

/// Two-pointer sweep state over the boundaries of every other view.
pub(crate) struct ViewHandler {
    fixes: Vec<Fix>,
    lefts: SmallVec<[Position; 8]>,
    rights: SmallVec<[Position; 8]>,
    next_left: usize,
    next_right: usize,
    pending: SmallVec<[usize; 4]>,
}

impl ViewHandler {
    pub(crate) fn new(views: &ViewRegistry, exclude: Option<ViewKey>) -> Self {
        let fixes: Vec<Fix> = views
            .others(exclude)
            .map(|(key, window)| Fix {
                key,
                offset: window.offset,
                end_index: window.end_index(),
                start: window.start,
                end: window.end,
            })
            .collect();
        let mut lefts: SmallVec<[Position; 8]> = fixes
            .iter()
            .enumerate()
            .map(|(fix, entry)| Position {
                fix,
                index: entry.offset,
            })
            .collect();
        let mut rights: SmallVec<[Position; 8]> = fixes
            .iter()
            .enumerate()
            .map(|(fix, entry)| Position {
                fix,
                index: entry.end_index,
            })
            .collect();
        lefts.sort_unstable_by_key(|position| position.index);
        rights.sort_unstable_by_key(|position| position.index);
        Self {
            fixes,
            lefts,
            rights,
            next_left: 0,
            next_right: 0,
            pending: SmallVec::new(),
        }
    }

    /// Rebases every boundary at `index`, skipping those before it.
    fn reach(&mut self, index: usize, removed: usize, last_kept: NodeId) {
        while let Some(position) = self.lefts.get(self.next_left).copied() {
            if position.index > index {
                break;
            }
            if position.index == index {
                let fix = &mut self.fixes[position.fix];
                fix.offset = index - removed;
                fix.start = last_kept;
            }
            self.next_left += 1;
        }
        while let Some(position) = self.rights.get(self.next_right).copied() {
            if position.index > index {
                break;
            }
            if position.index == index {
                self.fixes[position.fix].end_index = index - removed;
                self.pending.push(position.fix);
            }
            self.next_right += 1;
        }
    }

    /// Anchors every waiting right boundary on `node`.
    fn resolve(&mut self, node: NodeId) {
        for fix in self.pending.drain(..) {
            self.fixes[fix].end = node;
        }
    }

    /// Shifts the boundaries past the swept window and writes every view back.
    fn finish(mut self, removed: usize, views: &mut ViewRegistry) {
        for position in &self.lefts[self.next_left..] {
            self.fixes[position.fix].offset -= removed;
        }
        for position in &self.rights[self.next_right..] {
            self.fixes[position.fix].end_index -= removed;
        }
        for fix in &self.fixes {
            if let Some(window) = views.get_mut(fix.key) {
                *window = Window {
                    offset: fix.offset,
                    size: fix.end_index - fix.offset,
                    start: fix.start,
                    end: fix.end,
                };
            }
        }
    }
}

/// Unlinks every element of `window` matching `remove`, fixing up all other
/// views in the same pass.
///
/// Each removed element is handed to `sink` with its absolute index before
/// removal. The window owner (excluded through `exclude`) is not updated.
/// Returns the number of removed elements.
pub(crate) fn sweep_remove<T>(
    nodes: &mut NodeStore<T>,
    views: &mut ViewRegistry,
    exclude: Option<ViewKey>,
    window: &Window,
    mut remove: impl FnMut(&T) -> bool,
    mut sink: impl FnMut(usize, T),
) -> usize {
    let mut handler = ViewHandler::new(views, exclude);
    let mut removed = 0;
    let mut last_kept = window.start;
    let mut node = nodes.next(window.start);
    for index in window.offset..window.end_index() {
        handler.reach(index, removed, last_kept);
        let next = nodes.next(node);
        if remove(nodes.item(node)) {
            nodes.link(last_kept, next);
            sink(index, nodes.release(node));
            removed += 1;
        } else {
            handler.resolve(node);
            last_kept = node;
        }
        node = next;
    }
    handler.reach(window.end_index(), removed, last_kept);
    handler.resolve(window.end);
    handler.finish(removed, views);
    tracing::trace!(
        offset = window.offset,
        size = window.size,
        removed,
        "batch removal swept window"
    );
    removed
}
