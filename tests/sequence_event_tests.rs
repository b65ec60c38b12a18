//! Tests for change notifications raised by LinkedSequence edits.

use std::cell::RefCell;
use std::rc::Rc;

use rstest::{fixture, rstest};
use seqview::sequence::{LinkedSequence, SequenceEvent};

type Log = Rc<RefCell<Vec<SequenceEvent<i32>>>>;

#[fixture]
fn digits() -> LinkedSequence<i32> {
    (1..=4).collect()
}

fn record(sequence: &LinkedSequence<i32>) -> Log {
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    sequence.subscribe(move |event: &SequenceEvent<i32>| sink.borrow_mut().push(event.clone()));
    log
}

fn take(log: &Log) -> Vec<SequenceEvent<i32>> {
    std::mem::take(&mut *log.borrow_mut())
}

// =============================================================================
// Per-item events
// =============================================================================

#[rstest]
fn test_insert_raises_inserted_added_changed(mut digits: LinkedSequence<i32>) {
    let log = record(&digits);
    digits.insert(2, 9).unwrap();
    assert_eq!(
        take(&log),
        vec![
            SequenceEvent::Inserted { item: 9, index: 2 },
            SequenceEvent::Added { item: 9, count: 1 },
            SequenceEvent::Changed,
        ]
    );
}

#[rstest]
fn test_insert_all_raises_one_pair_per_item(mut digits: LinkedSequence<i32>) {
    let log = record(&digits);
    digits.insert_all(1, [7, 8]).unwrap();
    assert_eq!(
        take(&log),
        vec![
            SequenceEvent::Inserted { item: 7, index: 1 },
            SequenceEvent::Added { item: 7, count: 1 },
            SequenceEvent::Inserted { item: 8, index: 2 },
            SequenceEvent::Added { item: 8, count: 1 },
            SequenceEvent::Changed,
        ]
    );
}

#[rstest]
fn test_view_events_carry_absolute_indices(digits: LinkedSequence<i32>) {
    let log = record(&digits);
    let mut view = digits.view(2, 2).unwrap();
    view.remove_at(1).unwrap();
    assert_eq!(
        take(&log),
        vec![
            SequenceEvent::RemovedAt { item: 4, index: 3 },
            SequenceEvent::Removed { item: 4, count: 1 },
            SequenceEvent::Changed,
        ]
    );
}

#[rstest]
fn test_set_raises_removal_then_insertion(mut digits: LinkedSequence<i32>) {
    let log = record(&digits);
    digits.set(0, 10).unwrap();
    assert_eq!(
        take(&log),
        vec![
            SequenceEvent::RemovedAt { item: 1, index: 0 },
            SequenceEvent::Removed { item: 1, count: 1 },
            SequenceEvent::Inserted { item: 10, index: 0 },
            SequenceEvent::Added { item: 10, count: 1 },
            SequenceEvent::Changed,
        ]
    );
}

#[rstest]
fn test_remove_where_raises_removed_per_item(mut digits: LinkedSequence<i32>) {
    let log = record(&digits);
    digits.remove_where(|item| item % 2 == 1).unwrap();
    assert_eq!(
        take(&log),
        vec![
            SequenceEvent::Removed { item: 1, count: 1 },
            SequenceEvent::Removed { item: 3, count: 1 },
            SequenceEvent::Changed,
        ]
    );
}

// =============================================================================
// Clears
// =============================================================================

#[rstest]
fn test_clear_on_root_is_full(mut digits: LinkedSequence<i32>) {
    let log = record(&digits);
    digits.clear().unwrap();
    assert_eq!(
        take(&log),
        vec![
            SequenceEvent::Cleared {
                full: true,
                count: 4,
                start: 0
            },
            SequenceEvent::Changed,
        ]
    );
}

#[rstest]
fn test_clear_on_view_is_partial(digits: LinkedSequence<i32>) {
    let log = record(&digits);
    let mut view = digits.view(1, 2).unwrap();
    view.clear().unwrap();
    assert_eq!(
        take(&log),
        vec![
            SequenceEvent::Cleared {
                full: false,
                count: 2,
                start: 1
            },
            SequenceEvent::Changed,
        ]
    );
}

#[rstest]
fn test_remove_interval_is_partial(mut digits: LinkedSequence<i32>) {
    let log = record(&digits);
    digits.remove_interval(2, 2).unwrap();
    assert_eq!(
        take(&log),
        vec![
            SequenceEvent::Cleared {
                full: false,
                count: 2,
                start: 2
            },
            SequenceEvent::Changed,
        ]
    );
}

// =============================================================================
// Reordering and no-ops
// =============================================================================

#[rstest]
fn test_reorders_raise_only_changed(mut digits: LinkedSequence<i32>) {
    let log = record(&digits);
    digits.reverse().unwrap();
    assert_eq!(take(&log), vec![SequenceEvent::Changed]);
    digits.sort().unwrap();
    assert_eq!(take(&log), vec![SequenceEvent::Changed]);
}

#[rstest]
fn test_no_ops_and_failures_raise_nothing(mut digits: LinkedSequence<i32>) {
    let log = record(&digits);
    digits.sort().unwrap();
    digits.remove_where(|_| false).unwrap();
    digits.insert_all(0, Vec::new()).unwrap();
    digits.remove_interval(1, 0).unwrap();
    assert!(digits.insert(9, 0).is_err());
    assert!(digits.remove_at(9).is_err());
    assert!(take(&log).is_empty());
}

// =============================================================================
// Observer management
// =============================================================================

#[rstest]
fn test_unsubscribe_stops_delivery(mut digits: LinkedSequence<i32>) {
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    let id = digits.subscribe(move |event: &SequenceEvent<i32>| {
        sink.borrow_mut().push(event.clone());
    });
    assert!(digits.unsubscribe(id));
    assert!(!digits.unsubscribe(id));
    digits.insert_last(5).unwrap();
    assert!(take(&log).is_empty());
}

#[rstest]
fn test_every_observer_sees_every_event(mut digits: LinkedSequence<i32>) {
    let first = record(&digits);
    let view = digits.view(0, 1).unwrap();
    let second = record(&view);
    digits.remove_last().unwrap();
    let seen = take(&first);
    assert_eq!(seen.len(), 3);
    assert_eq!(seen, take(&second));
}

#[rstest]
fn test_edits_made_by_an_observer_raise_their_own_events(mut digits: LinkedSequence<i32>) {
    let log = record(&digits);
    let mut handle = digits.root();
    let watcher = digits.subscribe(move |event: &SequenceEvent<i32>| {
        if *event == SequenceEvent::Changed && handle.len().unwrap() < 6 {
            handle.insert_last(0).unwrap();
        }
    });

    digits.insert_last(5).unwrap();

    assert_eq!(digits.to_vec().unwrap(), vec![1, 2, 3, 4, 5, 0]);
    assert_eq!(
        take(&log),
        vec![
            SequenceEvent::Inserted { item: 5, index: 4 },
            SequenceEvent::Added { item: 5, count: 1 },
            SequenceEvent::Changed,
            SequenceEvent::Inserted { item: 0, index: 5 },
            SequenceEvent::Added { item: 0, count: 1 },
            SequenceEvent::Changed,
        ]
    );
    assert!(digits.unsubscribe(watcher));
}

#[rstest]
fn test_mirroring_observer_stays_in_sync_with_nested_edits(mut digits: LinkedSequence<i32>) {
    let mirror = Rc::new(RefCell::new(digits.to_vec().unwrap()));
    let copy = Rc::clone(&mirror);
    digits.subscribe(move |event: &SequenceEvent<i32>| match event {
        SequenceEvent::Inserted { item, index } => copy.borrow_mut().insert(*index, *item),
        SequenceEvent::RemovedAt { index, .. } => {
            copy.borrow_mut().remove(*index);
        }
        _ => {}
    });
    let mut handle = digits.root();
    digits.subscribe(move |event: &SequenceEvent<i32>| {
        if let SequenceEvent::Inserted { item: 7, .. } = event {
            handle.remove_first().unwrap();
        }
    });

    digits.insert(2, 7).unwrap();

    assert_eq!(digits.to_vec().unwrap(), vec![2, 7, 3, 4]);
    assert_eq!(*mirror.borrow(), digits.to_vec().unwrap());
}

#[rstest]
fn test_observer_may_unsubscribe_itself() {
    let mut sequence: LinkedSequence<i32> = LinkedSequence::new();
    let handle = Rc::new(RefCell::new(None));
    let calls = Rc::new(RefCell::new(0));
    let (own, counter) = (Rc::clone(&handle), Rc::clone(&calls));
    let root = sequence.root();
    let id = sequence.subscribe(move |_: &SequenceEvent<i32>| {
        *counter.borrow_mut() += 1;
        if let Some(id) = own.borrow_mut().take() {
            assert!(root.unsubscribe(id));
        }
    });
    *handle.borrow_mut() = Some(id);

    sequence.insert_last(1).unwrap();
    sequence.insert_last(2).unwrap();

    // detaching takes effect once the current mutation's events are delivered
    assert_eq!(*calls.borrow(), 3);
}

#[rstest]
fn test_subscribing_while_an_element_is_borrowed(digits: LinkedSequence<i32>) {
    let first = digits.get(0).unwrap();
    let id = digits.subscribe(|_: &SequenceEvent<i32>| {});
    assert!(digits.unsubscribe(id));
    assert_eq!(*first, 1);
}
