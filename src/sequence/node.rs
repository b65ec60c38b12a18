//! Arena-backed doubly linked chain.
//!
//! Nodes live in a single `Vec` and refer to each other by index, so a view
//! can hold on to a boundary node without borrowing the chain. Slots `0` and
//! `1` are the before-first and after-last sentinels; they never carry an
//! element and are never released.
//!
//! # Slots
//!
//! Positional lookups are expressed in *slots*: slot `0` is [`HEAD`], slot
//! `k` (for `1 <= k <= len`) is the element at index `k - 1`, and slot
//! `len + 1` is [`TAIL`]. A window at `offset` with `size` elements is
//! therefore bounded by the nodes at slots `offset` and `offset + size + 1`.

use smallvec::SmallVec;

/// Index of a node inside the arena.
pub(crate) type NodeId = usize;

/// The before-first sentinel.
pub(crate) const HEAD: NodeId = 0;

/// The after-last sentinel.
pub(crate) const TAIL: NodeId = 1;

/// A node whose slot position is already known.
///
/// Lookups start from whichever anchor is closest to the target slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Anchor {
    pub(crate) slot: usize,
    pub(crate) node: NodeId,
}

impl Anchor {
    #[inline]
    pub(crate) const fn new(slot: usize, node: NodeId) -> Self {
        Self { slot, node }
    }
}

/// Anchors rarely exceed four entries: two sentinels plus a window's bounds.
pub(crate) type Anchors = SmallVec<[Anchor; 4]>;

struct Node<T> {
    item: Option<T>,
    prev: NodeId,
    next: NodeId,
}

impl<T> Node<T> {
    const fn sentinel() -> Self {
        Self {
            item: None,
            prev: HEAD,
            next: TAIL,
        }
    }
}

/// Doubly linked chain stored in an arena with slot recycling.
pub(crate) struct NodeStore<T> {
    nodes: Vec<Node<T>>,
    free: Vec<NodeId>,
}

impl<T> NodeStore<T> {
    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![Node::sentinel(), Node::sentinel()],
            free: Vec::new(),
        }
    }

    /// Number of element-carrying nodes currently allocated.
    pub(crate) fn live(&self) -> usize {
        self.nodes.len() - 2 - self.free.len()
    }

    #[inline]
    pub(crate) fn next(&self, node: NodeId) -> NodeId {
        self.nodes[node].next
    }

    #[inline]
    pub(crate) fn prev(&self, node: NodeId) -> NodeId {
        self.nodes[node].prev
    }

    /// Returns the element held by `node`.
    ///
    /// # Panics
    ///
    /// Panics if `node` is a sentinel or a released slot.
    #[inline]
    pub(crate) fn item(&self, node: NodeId) -> &T {
        match &self.nodes[node].item {
            Some(item) => item,
            None => unreachable!("node {node} carries no element"),
        }
    }

    #[inline]
    pub(crate) fn item_mut(&mut self, node: NodeId) -> &mut T {
        match &mut self.nodes[node].item {
            Some(item) => item,
            None => unreachable!("node {node} carries no element"),
        }
    }

    /// Replaces the element held by `node`, returning the previous one.
    pub(crate) fn replace(&mut self, node: NodeId, item: T) -> T {
        std::mem::replace(self.item_mut(node), item)
    }

    /// Moves the elements of two nodes into each other's slot.
    pub(crate) fn swap_items(&mut self, first: NodeId, second: NodeId) {
        if first == second {
            return;
        }
        let taken = self.nodes[first].item.take();
        let replaced = std::mem::replace(&mut self.nodes[second].item, taken);
        self.nodes[first].item = replaced;
    }

    /// Removes the element of `node`, leaving the node linked but empty.
    ///
    /// The caller must put an element back with [`NodeStore::put`] before
    /// the node is read again.
    pub(crate) fn take(&mut self, node: NodeId) -> T {
        match self.nodes[node].item.take() {
            Some(item) => item,
            None => unreachable!("node {node} carries no element"),
        }
    }

    pub(crate) fn put(&mut self, node: NodeId, item: T) {
        debug_assert!(self.nodes[node].item.is_none());
        self.nodes[node].item = Some(item);
    }

    /// Makes `second` the successor of `first`.
    #[inline]
    pub(crate) fn link(&mut self, first: NodeId, second: NodeId) {
        self.nodes[first].next = second;
        self.nodes[second].prev = first;
    }

    /// Allocates a node for `item` and links it right after `anchor`.
    pub(crate) fn insert_after(&mut self, anchor: NodeId, item: T) -> NodeId {
        let successor = self.nodes[anchor].next;
        let node = Node {
            item: Some(item),
            prev: anchor,
            next: successor,
        };
        let id = match self.free.pop() {
            Some(id) => {
                self.nodes[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };
        self.nodes[anchor].next = id;
        self.nodes[successor].prev = id;
        id
    }

    /// Releases a node that is no longer reachable from the chain.
    pub(crate) fn release(&mut self, node: NodeId) -> T {
        debug_assert!(node != HEAD && node != TAIL, "sentinels are never released");
        let item = self.take(node);
        self.nodes[node].prev = node;
        self.nodes[node].next = node;
        self.free.push(node);
        item
    }

    /// Unlinks `node` from its neighbours and releases it.
    pub(crate) fn unlink(&mut self, node: NodeId) -> T {
        let (prev, next) = (self.nodes[node].prev, self.nodes[node].next);
        self.link(prev, next);
        self.release(node)
    }

    /// Drops every element and resets the chain to the two sentinels.
    pub(crate) fn clear(&mut self) {
        self.nodes.truncate(2);
        self.nodes[HEAD] = Node::sentinel();
        self.nodes[TAIL] = Node::sentinel();
        self.free.clear();
    }

    /// Walks `steps` links forward from `node`.
    fn forward(&self, mut node: NodeId, steps: usize) -> NodeId {
        for _ in 0..steps {
            node = self.nodes[node].next;
        }
        node
    }

    /// Walks `steps` links backward from `node`.
    fn backward(&self, mut node: NodeId, steps: usize) -> NodeId {
        for _ in 0..steps {
            node = self.nodes[node].prev;
        }
        node
    }

    /// Finds the node at `slot`, walking from the closest anchor.
    ///
    /// `anchors` must be non-empty and every anchor must describe the
    /// current chain.
    pub(crate) fn locate(&self, anchors: &[Anchor], slot: usize) -> NodeId {
        let closest = anchors
            .iter()
            .min_by_key(|anchor| anchor.slot.abs_diff(slot))
            .unwrap_or_else(|| unreachable!("locate needs at least one anchor"));
        if closest.slot <= slot {
            self.forward(closest.node, slot - closest.slot)
        } else {
            self.backward(closest.node, closest.slot - slot)
        }
    }

    /// Collects the ids of the `count` nodes following `start`.
    pub(crate) fn ids_after(&self, start: NodeId, count: usize) -> Vec<NodeId> {
        let mut ids = Vec::with_capacity(count);
        let mut node = self.nodes[start].next;
        for _ in 0..count {
            ids.push(node);
            node = self.nodes[node].next;
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_of(values: &[i32]) -> NodeStore<i32> {
        let mut store = NodeStore::new();
        let mut last = HEAD;
        for &value in values {
            last = store.insert_after(last, value);
        }
        store
    }

    fn collect(store: &NodeStore<i32>) -> Vec<i32> {
        let mut values = Vec::new();
        let mut node = store.next(HEAD);
        while node != TAIL {
            values.push(*store.item(node));
            node = store.next(node);
        }
        values
    }

    #[test]
    fn new_store_links_sentinels() {
        let store: NodeStore<i32> = NodeStore::new();
        assert_eq!(store.next(HEAD), TAIL);
        assert_eq!(store.prev(TAIL), HEAD);
        assert_eq!(store.live(), 0);
    }

    #[test]
    fn insert_after_keeps_order() {
        let store = store_of(&[1, 2, 3]);
        assert_eq!(collect(&store), vec![1, 2, 3]);
        assert_eq!(store.live(), 3);
    }

    #[test]
    fn unlink_recycles_slot() {
        let mut store = store_of(&[1, 2, 3]);
        let middle = store.next(store.next(HEAD));
        assert_eq!(store.unlink(middle), 2);
        assert_eq!(collect(&store), vec![1, 3]);

        let reused = store.insert_after(HEAD, 0);
        assert_eq!(reused, middle);
        assert_eq!(collect(&store), vec![0, 1, 3]);
    }

    #[test]
    fn locate_walks_from_closest_anchor() {
        let store = store_of(&[10, 20, 30, 40, 50]);
        let anchors = [Anchor::new(0, HEAD), Anchor::new(6, TAIL)];
        assert_eq!(store.locate(&anchors, 0), HEAD);
        assert_eq!(*store.item(store.locate(&anchors, 1)), 10);
        assert_eq!(*store.item(store.locate(&anchors, 5)), 50);
        assert_eq!(store.locate(&anchors, 6), TAIL);

        let third = store.locate(&anchors, 3);
        let anchors = [Anchor::new(3, third)];
        assert_eq!(*store.item(store.locate(&anchors, 2)), 20);
        assert_eq!(*store.item(store.locate(&anchors, 4)), 40);
    }

    #[test]
    fn swap_items_exchanges_payloads_only() {
        let mut store = store_of(&[1, 2]);
        let first = store.next(HEAD);
        let second = store.next(first);
        store.swap_items(first, second);
        assert_eq!(collect(&store), vec![2, 1]);
        assert_eq!(store.next(HEAD), first);
    }

    #[test]
    fn clear_resets_to_sentinels() {
        let mut store = store_of(&[1, 2, 3]);
        store.clear();
        assert_eq!(store.next(HEAD), TAIL);
        assert_eq!(store.live(), 0);
    }
}
