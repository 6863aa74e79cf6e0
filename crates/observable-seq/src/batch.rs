#![forbid(unsafe_code)]

//! Scoped batching.
//!
//! A [`BatchGuard`] opens a batch on creation and closes it on drop, so
//! early returns, `?` and panics all leave the defer depth balanced.
//!
//! ```ignore
//! let items: ObservableVec<u32> = ObservableVec::new();
//! {
//!     let batch = items.batch();
//!     batch.push(1);
//!     batch.push(2);
//! } // one BatchUpdate here
//! ```
//!
//! If the guard is dropped while the thread is unwinding, the closing
//! `BatchUpdate` is dispatched with subscriber panics isolated.

use std::fmt;
use std::ops::Deref;

use crate::container::ObservableVec;
use crate::storage::SequenceStorage;

/// RAII batch scope for an [`ObservableVec`].
///
/// Derefs to the container so mutations can go through the guard.
pub struct BatchGuard<'a, T, S>
where
    T: Clone + PartialEq + Send + 'static,
    S: SequenceStorage<T> + Send + 'static,
{
    container: &'a ObservableVec<T, S>,
}

impl<'a, T, S> BatchGuard<'a, T, S>
where
    T: Clone + PartialEq + Send + 'static,
    S: SequenceStorage<T> + Send + 'static,
{
    pub(crate) fn new(container: &'a ObservableVec<T, S>) -> Self {
        container.begin_batch();
        Self { container }
    }
}

impl<T, S> Deref for BatchGuard<'_, T, S>
where
    T: Clone + PartialEq + Send + 'static,
    S: SequenceStorage<T> + Send + 'static,
{
    type Target = ObservableVec<T, S>;

    fn deref(&self) -> &Self::Target {
        self.container
    }
}

impl<T, S> Drop for BatchGuard<'_, T, S>
where
    T: Clone + PartialEq + Send + 'static,
    S: SequenceStorage<T> + Send + 'static,
{
    fn drop(&mut self) {
        self.container.end_batch();
    }
}

impl<T, S> fmt::Debug for BatchGuard<'_, T, S>
where
    T: Clone + PartialEq + Send + 'static,
    S: SequenceStorage<T> + Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchGuard")
            .field("defer_depth", &self.container.defer_depth())
            .finish()
    }
}
