//! Reorder fixup for reverse, sort and shuffle.
//!
//! All three classify the other views against the reordered window first.
//! `Overlapping` views are always disposed and `Contains`/`Disjoint` views
//! keep their boundaries. Views `ContainedIn` the window are treated
//! differently:
//!
//! | Operation | Contained views | Moves |
//! |-----------|-----------------|-------|
//! | reverse   | mirrored        | payloads |
//! | sort      | disposed        | nodes (relinked) |
//! | shuffle   | disposed        | payloads |
//!
//! Sort relinks nodes rather than swapping payloads, so it does not try to
//! follow contained views through the merge.

use std::cmp::Ordering;

use super::error::{Result, SequenceError};
use super::node::{HEAD, NodeId, NodeStore};
use super::registry::{Relation, ViewKey, ViewRegistry, Window};

#[derive(Clone, Copy, Debug)]
struct Mirror {
    view: usize,
    left: bool,
    slot: usize,
}

/// Reverses `window` in place, mirroring every view contained in it.
///
/// Two cursors walk inward from the window's boundary nodes, swapping
/// payloads. The boundary slots of contained views are sorted once and
/// consumed from both ends in lockstep with the cursors: a boundary at the
/// left cursor's slot is re-pointed at the right cursor's node and vice
/// versa. Reversing twice restores every boundary.
pub(crate) fn reverse<T>(
    nodes: &mut NodeStore<T>,
    views: &mut ViewRegistry,
    acting: Option<ViewKey>,
    window: &Window,
) {
    views.dispose_related(acting, window, |relation| relation == Relation::Overlapping);
    let mirrored: Vec<(ViewKey, Window)> = views
        .others(acting)
        .filter(|(_, other)| Relation::classify(window, other) == Relation::ContainedIn)
        .map(|(key, other)| (key, *other))
        .collect();
    let mut positions: Vec<Mirror> = mirrored
        .iter()
        .enumerate()
        .flat_map(|(view, (_, other))| {
            [
                Mirror {
                    view,
                    left: true,
                    slot: other.start_slot(),
                },
                Mirror {
                    view,
                    left: false,
                    slot: other.end_slot(),
                },
            ]
        })
        .collect();
    positions.sort_unstable_by_key(|position| position.slot);

    // (start, end) node each mirrored boundary resolves to
    let mut resolved = vec![(HEAD, HEAD); mirrored.len()];
    let mut assign = |position: Mirror, node: NodeId| {
        let entry = &mut resolved[position.view];
        if position.left {
            entry.0 = node;
        } else {
            entry.1 = node;
        }
    };

    let (mut low_slot, mut high_slot) = (window.start_slot(), window.end_slot());
    let (mut low, mut high) = (window.start, window.end);
    let (mut front, mut back) = (0, positions.len());
    while low_slot <= high_slot {
        while front < back && positions[front].slot == low_slot {
            assign(positions[front], high);
            front += 1;
        }
        while front < back && positions[back - 1].slot == high_slot {
            assign(positions[back - 1], low);
            back -= 1;
        }
        if low_slot > window.start_slot() && low_slot < high_slot {
            nodes.swap_items(low, high);
        }
        low = nodes.next(low);
        high = nodes.prev(high);
        low_slot += 1;
        high_slot -= 1;
    }

    let mirror_sum = window.start_slot() + window.end_slot();
    for ((key, old), (start_target, end_target)) in mirrored.iter().zip(resolved) {
        if let Some(current) = views.get_mut(*key) {
            *current = Window {
                offset: mirror_sum - old.end_slot(),
                size: old.size,
                start: end_target,
                end: start_target,
            };
        }
    }
    tracing::trace!(
        offset = window.offset,
        size = window.size,
        mirrored = mirrored.len(),
        "reversed window"
    );
}

/// Stable merge sort of `window` by relinking its nodes.
///
/// The order is computed before anything is touched, so an incomparable
/// pair leaves the chain and every view unchanged. Returns `false` when the
/// window was already sorted.
pub(crate) fn sort<T>(
    nodes: &mut NodeStore<T>,
    views: &mut ViewRegistry,
    acting: Option<ViewKey>,
    window: &Window,
    mut compare: impl FnMut(&T, &T) -> Option<Ordering>,
) -> Result<bool> {
    let ids = nodes.ids_after(window.start, window.size);
    let sorted = {
        let store = &*nodes;
        merge_sort(&ids, |left, right| compare(store.item(left), store.item(right)))?
    };
    if sorted == ids {
        return Ok(false);
    }

    views.dispose_related(acting, window, |relation| {
        matches!(relation, Relation::ContainedIn | Relation::Overlapping)
    });
    let mut previous = window.start;
    for &node in &sorted {
        nodes.link(previous, node);
        previous = node;
    }
    nodes.link(previous, window.end);

    let (first, last) = (sorted[0], sorted[sorted.len() - 1]);
    for (_, other) in views.others_mut(acting) {
        if other.end_index() == window.offset {
            other.end = first;
        }
        if other.offset == window.end_index() {
            other.start = last;
        }
    }
    tracing::trace!(offset = window.offset, size = window.size, "sorted window");
    Ok(true)
}

/// Natural bottom-up merge sort over node ids.
///
/// Non-descending runs are detected first, then adjacent runs are merged
/// pairwise until one run remains. Ties keep their original order.
pub(crate) fn merge_sort(
    ids: &[NodeId],
    mut compare: impl FnMut(NodeId, NodeId) -> Option<Ordering>,
) -> Result<Vec<NodeId>> {
    let mut runs: Vec<(usize, usize)> = Vec::new();
    let mut run_start = 0;
    for index in 1..=ids.len() {
        let breaks = index == ids.len()
            || compare(ids[index - 1], ids[index]).ok_or(SequenceError::NotOrderable)?
                == Ordering::Greater;
        if breaks {
            runs.push((run_start, index));
            run_start = index;
        }
    }

    let mut source = ids.to_vec();
    let mut target = Vec::with_capacity(ids.len());
    while runs.len() > 1 {
        target.clear();
        let mut merged = Vec::with_capacity(runs.len().div_ceil(2));
        for pair in runs.chunks(2) {
            let begin = target.len();
            match *pair {
                [(left_start, left_end), (right_start, right_end)] => merge(
                    &source[left_start..left_end],
                    &source[right_start..right_end],
                    &mut target,
                    &mut compare,
                )?,
                [(start, end)] => target.extend_from_slice(&source[start..end]),
                _ => unreachable!("chunks(2) yields one or two runs"),
            }
            merged.push((begin, target.len()));
        }
        std::mem::swap(&mut source, &mut target);
        runs = merged;
    }
    Ok(source)
}

fn merge(
    left: &[NodeId],
    right: &[NodeId],
    target: &mut Vec<NodeId>,
    compare: &mut impl FnMut(NodeId, NodeId) -> Option<Ordering>,
) -> Result<()> {
    let (mut left_index, mut right_index) = (0, 0);
    while left_index < left.len() && right_index < right.len() {
        let ordering = compare(left[left_index], right[right_index])
            .ok_or(SequenceError::NotOrderable)?;
        if ordering == Ordering::Greater {
            target.push(right[right_index]);
            right_index += 1;
        } else {
            target.push(left[left_index]);
            left_index += 1;
        }
    }
    target.extend_from_slice(&left[left_index..]);
    target.extend_from_slice(&right[right_index..]);
    Ok(())
}

/// Randomly permutes the payloads of `window`.
#[cfg(feature = "shuffle")]
pub(crate) fn shuffle<T, R: rand::Rng + ?Sized>(
    nodes: &mut NodeStore<T>,
    views: &mut ViewRegistry,
    acting: Option<ViewKey>,
    window: &Window,
    rng: &mut R,
) {
    use rand::seq::SliceRandom;

    views.dispose_related(acting, window, |relation| {
        matches!(relation, Relation::ContainedIn | Relation::Overlapping)
    });
    let ids = nodes.ids_after(window.start, window.size);
    let mut items: Vec<T> = ids.iter().map(|&node| nodes.take(node)).collect();
    items.shuffle(rng);
    for (node, item) in ids.into_iter().zip(items) {
        nodes.put(node, item);
    }
    tracing::trace!(offset = window.offset, size = window.size, "shuffled window");
}
