//! Index-based access shared by ordered containers.
//!
//! [`OrderedCollection`] is the surface that containers built on top of a
//! sequence consume: positional reads and writes, insertion, removal and
//! search. It is implemented for [`LinkedSequence`] (roots and views alike)
//! and for `Vec`, so generic code can run against either.
//!
//! # Examples
//!
//! ```rust
//! use seqview::sequence::{LinkedSequence, OrderedCollection};
//!
//! fn move_to_front<C: OrderedCollection<i32>>(collection: &mut C, item: i32) {
//!     if let Ok(Some(index)) = collection.index_of(&item) {
//!         let item = collection.remove_at(index).unwrap();
//!         collection.insert(0, item).unwrap();
//!     }
//! }
//!
//! let mut vector = vec![1, 2, 3];
//! move_to_front(&mut vector, 3);
//! assert_eq!(vector, vec![3, 1, 2]);
//!
//! let mut sequence: LinkedSequence<i32> = vec![1, 2, 3].into_iter().collect();
//! move_to_front(&mut sequence, 3);
//! assert_eq!(sequence.items().unwrap(), vec![3, 1, 2]);
//! ```

use super::LinkedSequence;
use super::error::{Result, SequenceError};

/// A container of elements addressed by position.
///
/// # Required Methods
///
/// - `len`, `get_cloned`, `set`, `insert`, `remove_at`, `index_of`, `items`
///
/// # Provided Methods
///
/// - `is_empty`, `push`, `contains`
pub trait OrderedCollection<T> {
    /// Number of elements.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::Disposed`] if the container is no longer usable.
    fn len(&self) -> Result<usize>;

    /// Clone of the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::IndexOutOfRange`] for an index past the end.
    fn get_cloned(&self, index: usize) -> Result<T>;

    /// Replaces the element at `index`, returning the old one.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::IndexOutOfRange`] for an index past the end.
    fn set(&mut self, index: usize, item: T) -> Result<T>;

    /// Inserts `item` before position `index`.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::IndexOutOfRange`] if `index > len`.
    fn insert(&mut self, index: usize, item: T) -> Result<()>;

    /// Removes and returns the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::IndexOutOfRange`] for an index past the end.
    fn remove_at(&mut self, index: usize) -> Result<T>;

    /// Index of the first element equal to `item`.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::Disposed`] if the container is no longer usable.
    fn index_of(&self, item: &T) -> Result<Option<usize>>;

    /// Clones of every element, front to back.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::Disposed`] if the container is no longer usable.
    fn items(&self) -> Result<Vec<T>>;

    /// Returns `true` if there is no element.
    ///
    /// # Errors
    ///
    /// Same as [`OrderedCollection::len`].
    fn is_empty(&self) -> Result<bool> {
        self.len().map(|length| length == 0)
    }

    /// Appends `item`.
    ///
    /// # Errors
    ///
    /// Same as [`OrderedCollection::len`].
    fn push(&mut self, item: T) -> Result<()> {
        let length = self.len()?;
        self.insert(length, item)
    }

    /// Returns `true` if some element equals `item`.
    ///
    /// # Errors
    ///
    /// Same as [`OrderedCollection::index_of`].
    fn contains(&self, item: &T) -> Result<bool> {
        self.index_of(item).map(|index| index.is_some())
    }
}

impl<T: Clone + PartialEq> OrderedCollection<T> for LinkedSequence<T> {
    fn len(&self) -> Result<usize> {
        Self::len(self)
    }

    fn get_cloned(&self, index: usize) -> Result<T> {
        Self::get_cloned(self, index)
    }

    fn set(&mut self, index: usize, item: T) -> Result<T> {
        Self::set(self, index, item)
    }

    fn insert(&mut self, index: usize, item: T) -> Result<()> {
        Self::insert(self, index, item)
    }

    fn remove_at(&mut self, index: usize) -> Result<T> {
        Self::remove_at(self, index)
    }

    fn index_of(&self, item: &T) -> Result<Option<usize>> {
        Self::index_of(self, item)
    }

    fn items(&self) -> Result<Vec<T>> {
        self.to_vec()
    }
}

const fn out_of_range(index: usize, length: usize) -> SequenceError {
    SequenceError::IndexOutOfRange { index, length }
}

impl<T: Clone + PartialEq> OrderedCollection<T> for Vec<T> {
    fn len(&self) -> Result<usize> {
        Ok(<[T]>::len(self))
    }

    fn get_cloned(&self, index: usize) -> Result<T> {
        self.get(index)
            .cloned()
            .ok_or_else(|| out_of_range(index, <[T]>::len(self)))
    }

    fn set(&mut self, index: usize, item: T) -> Result<T> {
        let length = <[T]>::len(self);
        self.get_mut(index)
            .map(|slot| std::mem::replace(slot, item))
            .ok_or_else(|| out_of_range(index, length))
    }

    fn insert(&mut self, index: usize, item: T) -> Result<()> {
        if index > <[T]>::len(self) {
            return Err(out_of_range(index, <[T]>::len(self)));
        }
        Self::insert(self, index, item);
        Ok(())
    }

    fn remove_at(&mut self, index: usize) -> Result<T> {
        if index >= <[T]>::len(self) {
            return Err(out_of_range(index, <[T]>::len(self)));
        }
        Ok(self.remove(index))
    }

    fn index_of(&self, item: &T) -> Result<Option<usize>> {
        Ok(self.iter().position(|candidate| candidate == item))
    }

    fn items(&self) -> Result<Vec<T>> {
        Ok(self.clone())
    }
}
