//! Property-based tests for LinkedSequence.
//!
//! Every property runs the sequence side by side with a `Vec` model and
//! checks the internal chain and view boundaries after each edit.

use proptest::prelude::*;
use seqview::sequence::{LinkedSequence, Relation};

// =============================================================================
// Strategies
// =============================================================================

/// Generates up to `max_size` small integers, so duplicates are common.
fn items_strategy(max_size: usize) -> impl Strategy<Value = Vec<i32>> {
    prop::collection::vec(0..10_i32, 0..max_size)
}

/// Generates items together with a valid `(start, count)` window on them.
fn items_with_window() -> impl Strategy<Value = (Vec<i32>, usize, usize)> {
    items_strategy(30).prop_flat_map(|items| {
        let length = items.len();
        (Just(items), 0..=length).prop_flat_map(move |(items, start)| {
            (Just(items), Just(start), 0..=length - start)
        })
    })
}

/// Generates items with several valid windows on them.
fn items_with_windows() -> impl Strategy<Value = (Vec<i32>, Vec<(usize, usize)>)> {
    items_strategy(30).prop_flat_map(|items| {
        let length = items.len();
        let window = (0..=length).prop_flat_map(move |start| (Just(start), 0..=length - start));
        (Just(items), prop::collection::vec(window, 0..6))
    })
}

#[derive(Clone, Debug)]
enum Edit {
    Insert(usize, i32),
    InsertAll(usize, Vec<i32>),
    RemoveAt(usize),
    Set(usize, i32),
    RemoveValue(i32),
    RemoveInterval(usize, usize),
    Reverse,
    Sort,
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (any::<usize>(), 0..10_i32).prop_map(|(index, item)| Edit::Insert(index, item)),
        (any::<usize>(), items_strategy(4))
            .prop_map(|(index, items)| Edit::InsertAll(index, items)),
        any::<usize>().prop_map(Edit::RemoveAt),
        (any::<usize>(), 0..10_i32).prop_map(|(index, item)| Edit::Set(index, item)),
        (0..10_i32).prop_map(Edit::RemoveValue),
        (any::<usize>(), any::<usize>())
            .prop_map(|(start, count)| Edit::RemoveInterval(start, count)),
        Just(Edit::Reverse),
        Just(Edit::Sort),
    ]
}

/// Applies `edit` to both the sequence and the model, scaling indices into
/// the valid range.
fn apply(sequence: &mut LinkedSequence<i32>, model: &mut Vec<i32>, edit: &Edit) {
    let length = model.len();
    match edit {
        Edit::Insert(index, item) => {
            let index = index % (length + 1);
            sequence.insert(index, *item).unwrap();
            model.insert(index, *item);
        }
        Edit::InsertAll(index, items) => {
            let index = index % (length + 1);
            sequence.insert_all(index, items.iter().copied()).unwrap();
            for (offset, item) in items.iter().enumerate() {
                model.insert(index + offset, *item);
            }
        }
        Edit::RemoveAt(index) if length > 0 => {
            let index = index % length;
            assert_eq!(sequence.remove_at(index).unwrap(), model.remove(index));
        }
        Edit::Set(index, item) if length > 0 => {
            let index = index % length;
            let old = std::mem::replace(&mut model[index], *item);
            assert_eq!(sequence.set(index, *item).unwrap(), old);
        }
        Edit::RemoveValue(item) => {
            let removed = sequence.remove(item).unwrap();
            let position = model.iter().position(|candidate| candidate == item);
            assert_eq!(removed, position.is_some());
            if let Some(position) = position {
                model.remove(position);
            }
        }
        Edit::RemoveInterval(start, count) => {
            let start = start % (length + 1);
            let count = count % (length - start + 1);
            sequence.remove_interval(start, count).unwrap();
            model.drain(start..start + count);
        }
        Edit::Reverse => {
            sequence.reverse().unwrap();
            model.reverse();
        }
        Edit::Sort => {
            sequence.sort().unwrap();
            model.sort();
        }
        Edit::RemoveAt(_) | Edit::Set(..) => {}
    }
}

proptest! {
    // =========================================================================
    // Model agreement
    // =========================================================================

    #[test]
    fn prop_edits_agree_with_vec_model(
        items in items_strategy(20),
        edits in prop::collection::vec(edit_strategy(), 0..30),
    ) {
        let mut sequence: LinkedSequence<i32> = items.iter().copied().collect();
        let mut model = items;
        for edit in &edits {
            apply(&mut sequence, &mut model, edit);
            prop_assert!(sequence.check_integrity());
        }
        prop_assert_eq!(sequence.to_vec().unwrap(), model.clone());
        prop_assert_eq!(sequence.len().unwrap(), model.len());
    }

    #[test]
    fn prop_edits_keep_every_view_consistent(
        (items, windows) in items_with_windows(),
        edits in prop::collection::vec(edit_strategy(), 0..20),
    ) {
        let mut sequence: LinkedSequence<i32> = items.iter().copied().collect();
        let mut model = items;
        let views: Vec<LinkedSequence<i32>> = windows
            .iter()
            .map(|&(start, count)| sequence.view(start, count).unwrap())
            .collect();
        for edit in &edits {
            apply(&mut sequence, &mut model, edit);
            prop_assert!(sequence.check_integrity());
            for view in views.iter().filter(|view| view.is_valid()) {
                let (offset, size) = (view.offset().unwrap(), view.len().unwrap());
                prop_assert!(offset + size <= model.len());
                prop_assert_eq!(view.to_vec().unwrap(), model[offset..offset + size].to_vec());
            }
        }
    }

    #[test]
    fn prop_view_reads_back_root_slice((items, start, count) in items_with_window()) {
        let sequence: LinkedSequence<i32> = items.iter().copied().collect();
        let view = sequence.view(start, count).unwrap();
        prop_assert_eq!(view.to_vec().unwrap(), items[start..start + count].to_vec());
        let ranged: Vec<i32> = sequence
            .range(start, count)
            .unwrap()
            .iter()
            .map(Result::unwrap)
            .collect();
        prop_assert_eq!(ranged, items[start..start + count].to_vec());
    }

    // =========================================================================
    // View fixups
    // =========================================================================

    #[test]
    fn prop_insert_shifts_views_at_or_after_index(
        (items, windows) in items_with_windows(),
        index in any::<usize>(),
        added in items_strategy(5),
    ) {
        let mut sequence: LinkedSequence<i32> = items.iter().copied().collect();
        let index = index % (items.len() + 1);
        let views: Vec<LinkedSequence<i32>> = windows
            .iter()
            .map(|&(start, count)| sequence.view(start, count).unwrap())
            .collect();
        sequence.insert_all(index, added.iter().copied()).unwrap();
        for (view, &(start, count)) in views.iter().zip(&windows) {
            let offset = view.offset().unwrap();
            if start >= index && (count > 0 || start > index) {
                prop_assert_eq!(offset, start + added.len());
            } else if start + count <= index {
                prop_assert_eq!(offset, start);
                prop_assert_eq!(view.len().unwrap(), count);
            }
            if start > index || (start == index && count > 0) || start + count <= index {
                prop_assert_eq!(view.to_vec().unwrap(), items[start..start + count].to_vec());
            }
        }
        prop_assert!(sequence.check_integrity());
    }

    #[test]
    fn prop_remove_interval_follows_relation(
        (items, windows) in items_with_windows(),
        start in any::<usize>(),
        count in any::<usize>(),
    ) {
        let mut sequence: LinkedSequence<i32> = items.iter().copied().collect();
        let start = start % (items.len() + 1);
        let count = count % (items.len() - start + 1);
        prop_assume!(count > 0);
        let removed = sequence.view(start, count).unwrap();
        let views: Vec<LinkedSequence<i32>> = windows
            .iter()
            .map(|&(offset, size)| sequence.view(offset, size).unwrap())
            .collect();
        let relations: Vec<Relation> = views
            .iter()
            .map(|view| removed.relation_to(view).unwrap())
            .collect();
        drop(removed);

        sequence.remove_interval(start, count).unwrap();

        for ((view, relation), &(_, size)) in views.iter().zip(&relations).zip(&windows) {
            match relation {
                Relation::Overlapping => prop_assert!(!view.is_valid()),
                Relation::ContainedIn => {
                    prop_assert_eq!(view.len().unwrap(), 0);
                    prop_assert_eq!(view.offset().unwrap(), start);
                }
                Relation::Contains => prop_assert_eq!(view.len().unwrap(), size - count),
                Relation::Disjoint => prop_assert_eq!(view.len().unwrap(), size),
            }
        }
        prop_assert!(sequence.check_integrity());
    }

    #[test]
    fn prop_remove_where_keeps_survivors_in_views(
        (items, windows) in items_with_windows(),
        threshold in 0..10_i32,
    ) {
        let mut sequence: LinkedSequence<i32> = items.iter().copied().collect();
        let views: Vec<LinkedSequence<i32>> = windows
            .iter()
            .map(|&(start, count)| sequence.view(start, count).unwrap())
            .collect();
        sequence.remove_where(|item| *item < threshold).unwrap();
        for (view, &(start, count)) in views.iter().zip(&windows) {
            let survivors: Vec<i32> = items[start..start + count]
                .iter()
                .copied()
                .filter(|item| *item >= threshold)
                .collect();
            prop_assert_eq!(view.to_vec().unwrap(), survivors);
        }
        prop_assert!(sequence.check_integrity());
    }

    #[test]
    fn prop_span_of_two_views_covers_both((items, windows) in items_with_windows()) {
        let sequence: LinkedSequence<i32> = items.iter().copied().collect();
        prop_assume!(windows.len() >= 2);
        let (first, second) = (windows[0], windows[1]);
        let left = sequence.view(first.0, first.1).unwrap();
        let right = sequence.view(second.0, second.1).unwrap();
        let both = left.span(&right).unwrap();
        let offset = first.0.min(second.0);
        let end = (first.0 + first.1).max(second.0 + second.1);
        prop_assert_eq!(both.offset().unwrap(), offset);
        prop_assert_eq!(both.to_vec().unwrap(), items[offset..end].to_vec());
    }

    // =========================================================================
    // Reordering
    // =========================================================================

    #[test]
    fn prop_reverse_twice_restores_everything((items, windows) in items_with_windows()) {
        let mut sequence: LinkedSequence<i32> = items.iter().copied().collect();
        let views: Vec<LinkedSequence<i32>> = windows
            .iter()
            .map(|&(start, count)| sequence.view(start, count).unwrap())
            .collect();
        sequence.reverse().unwrap();
        prop_assert!(sequence.check_integrity());
        sequence.reverse().unwrap();
        prop_assert_eq!(sequence.to_vec().unwrap(), items.clone());
        for (view, &(start, count)) in views.iter().zip(&windows) {
            prop_assert_eq!(view.offset().unwrap(), start);
            prop_assert_eq!(view.to_vec().unwrap(), items[start..start + count].to_vec());
        }
    }

    #[test]
    fn prop_reverse_of_view_mirrors_contained_views(
        (items, windows) in items_with_windows(),
        (outer_start, outer_count) in (0..30_usize, 0..30_usize),
    ) {
        let root: LinkedSequence<i32> = items.iter().copied().collect();
        let length = items.len();
        let outer_start = outer_start % (length + 1);
        let outer_count = outer_count % (length - outer_start + 1);
        let mut outer = root.view(outer_start, outer_count).unwrap();
        let views: Vec<LinkedSequence<i32>> = windows
            .iter()
            .map(|&(start, count)| root.view(start, count).unwrap())
            .collect();
        let relations: Vec<Relation> = views
            .iter()
            .map(|view| outer.relation_to(view).unwrap())
            .collect();

        outer.reverse().unwrap();

        let mut expected = items.clone();
        expected[outer_start..outer_start + outer_count].reverse();
        prop_assert_eq!(root.to_vec().unwrap(), expected.clone());
        for ((view, relation), &(start, count)) in views.iter().zip(&relations).zip(&windows) {
            match relation {
                Relation::Overlapping if outer_count > 1 => prop_assert!(!view.is_valid()),
                Relation::ContainedIn if outer_count > 1 => {
                    let mirrored = 2 * outer_start + outer_count - start - count;
                    prop_assert_eq!(view.offset().unwrap(), mirrored);
                    let mut reversed = items[start..start + count].to_vec();
                    reversed.reverse();
                    prop_assert_eq!(view.to_vec().unwrap(), reversed);
                }
                _ => {
                    prop_assert_eq!(view.offset().unwrap(), start);
                    prop_assert_eq!(
                        view.to_vec().unwrap(),
                        expected[start..start + count].to_vec()
                    );
                }
            }
        }
        prop_assert!(root.check_integrity());
    }

    #[test]
    fn prop_sort_is_stable(pairs in prop::collection::vec((0..5_i32, any::<u16>()), 0..40)) {
        let mut sequence: LinkedSequence<(i32, u16)> = pairs.iter().copied().collect();
        sequence.sort_by(|left, right| left.0.cmp(&right.0)).unwrap();
        let mut model = pairs;
        model.sort_by_key(|pair| pair.0);
        prop_assert_eq!(sequence.to_vec().unwrap(), model);
        prop_assert!(sequence.check_integrity());
    }

    #[test]
    fn prop_sort_keeps_containing_and_disjoint_views(
        (items, windows) in items_with_windows(),
    ) {
        let mut sequence: LinkedSequence<i32> = items.iter().copied().collect();
        let views: Vec<LinkedSequence<i32>> = windows
            .iter()
            .map(|&(start, count)| sequence.view(start, count).unwrap())
            .collect();
        let mut sorted = items.clone();
        sorted.sort_unstable();
        let changed = sorted != items;

        sequence.sort().unwrap();

        prop_assert_eq!(sequence.to_vec().unwrap(), sorted.clone());
        for (view, &(start, count)) in views.iter().zip(&windows) {
            let covers_root = start == 0 && count == items.len();
            if changed && !covers_root && !(count == 0 && (start == 0 || start == items.len())) {
                prop_assert!(!view.is_valid());
            } else {
                prop_assert_eq!(view.to_vec().unwrap(), sorted[start..start + count].to_vec());
            }
        }
        prop_assert!(sequence.check_integrity());
    }

    // =========================================================================
    // Bag semantics
    // =========================================================================

    #[test]
    fn prop_remove_all_removes_one_per_listed_item(
        items in items_strategy(30),
        removed in items_strategy(10),
    ) {
        let mut sequence: LinkedSequence<i32> = items.iter().copied().collect();
        let original = items.len();
        let mut model = items;
        let mut budget = removed.clone();
        model.retain(|item| {
            budget
                .iter()
                .position(|candidate| candidate == item)
                .map(|position| budget.swap_remove(position))
                .is_none()
        });
        let count = sequence.remove_all(removed).unwrap();
        prop_assert_eq!(sequence.to_vec().unwrap(), model.clone());
        prop_assert_eq!(count, original - model.len());
    }

    #[test]
    fn prop_stamp_moves_only_on_change(items in items_strategy(20), threshold in 0..10_i32) {
        let mut sequence: LinkedSequence<i32> = items.iter().copied().collect();
        let stamp = sequence.stamp();
        let removed = sequence.remove_where(|item| *item > threshold).unwrap();
        prop_assert_eq!(sequence.stamp() == stamp, removed == 0);
    }
}
