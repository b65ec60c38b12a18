//! Fixups for edits that touch a single position.
//!
//! Both routines run in `O(views)` and never walk the chain. Indices are
//! absolute root indices. The view performing the edit is excluded; the
//! caller updates its own window directly.

use super::node::NodeId;
use super::registry::{ViewKey, ViewRegistry};

/// Adjusts every other view after `added` elements were linked in at
/// absolute `index`.
///
/// `first` and `last` are the first and last inserted nodes.
///
/// - a non-empty view starting at `index` keeps its elements after the new
///   run: its start moves to `last` and its offset shifts;
/// - a view ending at `index` now ends before the new run: its end moves to
///   `first`;
/// - a view straddling `index` absorbs the run;
/// - a view starting after `index` shifts.
pub(crate) fn after_insert(
    views: &mut ViewRegistry,
    acting: Option<ViewKey>,
    index: usize,
    added: usize,
    first: NodeId,
    last: NodeId,
) {
    for (_, window) in views.others_mut(acting) {
        let starts_here = window.offset == index && window.size > 0;
        if starts_here {
            window.start = last;
        }
        if window.end_index() == index {
            window.end = first;
        }
        if window.offset < index && window.end_index() > index {
            window.size += added;
        }
        if window.offset > index || starts_here {
            window.offset += added;
        }
    }
}

/// Adjusts every other view before the node at absolute `index` is
/// unlinked. `prev` and `next` are that node's current neighbours.
pub(crate) fn before_remove(
    views: &mut ViewRegistry,
    acting: Option<ViewKey>,
    index: usize,
    prev: NodeId,
    next: NodeId,
) {
    for (_, window) in views.others_mut(acting) {
        if window.offset == index + 1 {
            window.start = prev;
        }
        if window.end_index() == index {
            window.end = next;
        }
        if window.offset <= index && window.end_index() > index {
            window.size -= 1;
        }
        if window.offset > index {
            window.offset -= 1;
        }
    }
}
