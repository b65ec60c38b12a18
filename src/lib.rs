//! # seqview
//!
//! A doubly linked sequence whose windows ("views") stay live and
//! consistent while the sequence is edited.
//!
//! ## Overview
//!
//! - **Linked sequence**: an arena-backed doubly linked list with indexed
//!   access, insertion, removal, search and batch removal.
//! - **Views**: any number of possibly overlapping windows onto the same
//!   nodes. Views can be read and edited like the sequence itself, slid,
//!   resized and spanned.
//! - **Fixups**: every edit repositions the other views, or disposes the ones
//!   it cannot express as a boundary move.
//! - **Stamp-checked iteration**: ranges and iterators fail loudly once the
//!   sequence changes underneath them.
//! - **Change notifications**: per-item events followed by one `Changed`.
//!
//! ## Feature Flags
//!
//! - `shuffle` (default): `shuffle` and `shuffle_with` through `rand`
//! - `fxhash`: `FxHashMap` for the multisets used by `remove_all` and
//!   `retain_all`
//!
//! ## Example
//!
//! ```rust
//! use seqview::prelude::*;
//!
//! let mut root: LinkedSequence<i32> = (1..=5).collect();
//! let mut middle = root.view(1, 3).unwrap();
//!
//! middle.reverse().unwrap();
//! assert_eq!(root.to_vec().unwrap(), vec![1, 4, 3, 2, 5]);
//!
//! root.remove_first().unwrap();
//! assert_eq!(middle.offset(), Ok(0));
//! assert_eq!(middle.to_vec().unwrap(), vec![4, 3, 2]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```rust
/// use seqview::prelude::*;
/// ```
pub mod prelude {
    pub use crate::sequence::{
        LinkedSequence, ObserverId, OrderedCollection, Range, Relation, SequenceError,
        SequenceEvent,
    };
}

pub mod sequence;
