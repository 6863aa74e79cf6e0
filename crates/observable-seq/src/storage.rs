#![forbid(unsafe_code)]

//! Backing sequences for observable containers.
//!
//! The container is generic over its storage so callers can pick the
//! access profile they need at compile time. Storage never notifies; it
//! only holds values.
//!
//! # Performance
//!
//! | Backing         | index read/write | push/pop | insert/remove at `i`  |
//! |-----------------|------------------|----------|-----------------------|
//! | `Vec<T>`        | O(1)             | O(1)*    | O(n - i)              |
//! | `VecDeque<T>`   | O(1)             | O(1)*    | O(min(i, n - i))      |
//! | `LinkedList<T>` | O(i)             | O(1)     | O(n) (split + append) |
//!
//! `*` amortized.

use std::collections::{LinkedList, VecDeque};

/// An ordered, growable sequence usable as container storage.
///
/// Index arguments to [`insert`](Self::insert) and [`remove`](Self::remove)
/// are validated by the container before the call; implementations may
/// panic on `insert` past `len` the way `Vec::insert` does.
pub trait SequenceStorage<T>: Default {
    /// Create empty storage with a capacity hint. Backings without a notion
    /// of capacity ignore it.
    fn with_capacity(capacity: usize) -> Self;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Option<&T>;

    fn get_mut(&mut self, index: usize) -> Option<&mut T>;

    fn push(&mut self, value: T);

    fn pop(&mut self) -> Option<T>;

    /// Insert `value` so that it ends up at `index`. Requires `index <= len`.
    fn insert(&mut self, index: usize, value: T);

    /// Remove and return the element at `index`, or `None` past the end.
    fn remove(&mut self, index: usize) -> Option<T>;

    fn clear(&mut self);

    fn iter<'a>(&'a self) -> impl Iterator<Item = &'a T>
    where
        T: 'a;

    /// Element-wise equality with another storage of the same kind.
    fn same_contents(&self, other: &Self) -> bool
    where
        T: PartialEq,
    {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T> SequenceStorage<T> for Vec<T> {
    fn with_capacity(capacity: usize) -> Self {
        Vec::with_capacity(capacity)
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn get(&self, index: usize) -> Option<&T> {
        <[T]>::get(self, index)
    }

    fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        <[T]>::get_mut(self, index)
    }

    fn push(&mut self, value: T) {
        Vec::push(self, value);
    }

    fn pop(&mut self) -> Option<T> {
        Vec::pop(self)
    }

    fn insert(&mut self, index: usize, value: T) {
        Vec::insert(self, index, value);
    }

    fn remove(&mut self, index: usize) -> Option<T> {
        (index < Vec::len(self)).then(|| Vec::remove(self, index))
    }

    fn clear(&mut self) {
        Vec::clear(self);
    }

    fn iter<'a>(&'a self) -> impl Iterator<Item = &'a T>
    where
        T: 'a,
    {
        <[T]>::iter(self)
    }
}

impl<T> SequenceStorage<T> for VecDeque<T> {
    fn with_capacity(capacity: usize) -> Self {
        VecDeque::with_capacity(capacity)
    }

    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    fn get(&self, index: usize) -> Option<&T> {
        VecDeque::get(self, index)
    }

    fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        VecDeque::get_mut(self, index)
    }

    fn push(&mut self, value: T) {
        self.push_back(value);
    }

    fn pop(&mut self) -> Option<T> {
        self.pop_back()
    }

    fn insert(&mut self, index: usize, value: T) {
        VecDeque::insert(self, index, value);
    }

    fn remove(&mut self, index: usize) -> Option<T> {
        VecDeque::remove(self, index)
    }

    fn clear(&mut self) {
        VecDeque::clear(self);
    }

    fn iter<'a>(&'a self) -> impl Iterator<Item = &'a T>
    where
        T: 'a,
    {
        VecDeque::iter(self)
    }
}

impl<T> SequenceStorage<T> for LinkedList<T> {
    fn with_capacity(_capacity: usize) -> Self {
        LinkedList::new()
    }

    fn len(&self) -> usize {
        LinkedList::len(self)
    }

    fn get(&self, index: usize) -> Option<&T> {
        LinkedList::iter(self).nth(index)
    }

    fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.iter_mut().nth(index)
    }

    fn push(&mut self, value: T) {
        self.push_back(value);
    }

    fn pop(&mut self) -> Option<T> {
        self.pop_back()
    }

    fn insert(&mut self, index: usize, value: T) {
        let mut tail = self.split_off(index);
        self.push_back(value);
        self.append(&mut tail);
    }

    fn remove(&mut self, index: usize) -> Option<T> {
        if index >= LinkedList::len(self) {
            return None;
        }
        let mut tail = self.split_off(index);
        let removed = tail.pop_front();
        self.append(&mut tail);
        removed
    }

    fn clear(&mut self) {
        LinkedList::clear(self);
    }

    fn iter<'a>(&'a self) -> impl Iterator<Item = &'a T>
    where
        T: 'a,
    {
        LinkedList::iter(self)
    }
}
