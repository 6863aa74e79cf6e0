#![forbid(unsafe_code)]

//! Observable sequence with batched change notification.
//!
//! # Design
//!
//! [`ObservableVec<T, S>`] keeps its elements, subscriber registry and
//! deferral counters in one `State` behind one `Mutex`. Every operation is
//! a single critical section that applies the change, computes the events
//! it produces and, if anything is to be delivered, snapshots the
//! subscriber list. The lock is released before any callback runs, so
//! callbacks may re-enter the container freely.
//!
//! Emission rules:
//!
//! - `BatchUpdate` is delivered immediately, whatever the defer depth.
//! - Any other event is delivered immediately at depth 0. Inside a batch it
//!   is dropped and the batch is marked dirty instead.
//! - Leaving the outermost batch of a dirty batch delivers exactly one
//!   `BatchUpdate`. Inner batches never produce events of their own.
//!
//! Only operations that would have produced an event mark a batch dirty.
//! A `replace` with an equal value, a `clear` of an empty sequence and a
//! rejected index all leave the batch clean.
//!
//! # Performance
//!
//! | Operation        | Complexity                                |
//! |------------------|-------------------------------------------|
//! | `len()`          | O(1)                                      |
//! | `push()`/`pop()` | O(1) amortized + O(S) dispatch            |
//! | `insert/remove`  | backing cost (see [`crate::storage`]) + O(S) |
//! | `subscribe()`    | O(1) amortized                            |
//! | `unsubscribe()`  | O(S)                                      |
//!
//! where S is the number of subscribers.
//!
//! # Failure Modes
//!
//! - **Out-of-range index**: the call returns
//!   [`ContainerError::OutOfRange`]; nothing changes and nothing fires.
//! - **Panicking subscriber**: see [`DispatchPolicy`]. State is committed
//!   before dispatch, so a panic never leaves the container half-updated.
//! - **Re-entry from `with_mut`/`with`/`with_storage`**: these closures run
//!   under the lock. Calling back into the same container from inside them
//!   deadlocks. Subscriber callbacks do not have this restriction.

use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use crate::batch::BatchGuard;
use crate::config::{ContainerConfig, DispatchPolicy};
use crate::error::{ContainerError, ContainerResult};
use crate::event::ChangeEvent;
use crate::registry::{CallbackArc, SubscriberRegistry, Subscription, SubscriptionId, dispatch};
use crate::storage::SequenceStorage;

struct State<T, S> {
    elements: S,
    subscribers: SubscriberRegistry<T>,
    defer_depth: usize,
    /// Set when an event was suppressed since the outermost batch opened.
    pending_change: bool,
}

/// Events ready for delivery plus the subscribers to deliver them to.
///
/// Built under the lock, delivered after it is released.
#[must_use]
struct Outbox<T> {
    events: Vec<ChangeEvent<T>>,
    callbacks: Vec<CallbackArc<T>>,
}

impl<T> Outbox<T> {
    fn empty() -> Self {
        Self {
            events: Vec::new(),
            callbacks: Vec::new(),
        }
    }

    fn deliver(self, policy: DispatchPolicy) {
        dispatch(&self.events, &self.callbacks, policy);
    }
}

impl<T, S> State<T, S> {
    fn new(elements: S) -> Self {
        Self {
            elements,
            subscribers: SubscriberRegistry::default(),
            defer_depth: 0,
            pending_change: false,
        }
    }

    /// Apply the deferral rules to `events`.
    fn emit(&mut self, events: Vec<ChangeEvent<T>>) -> Outbox<T> {
        let mut ready = Vec::with_capacity(events.len());
        for event in events {
            if event.is_batch_update() || self.defer_depth == 0 {
                trace!(kind = %event.kind, index = ?event.index, "emit");
                ready.push(event);
            } else {
                trace!(kind = %event.kind, depth = self.defer_depth, "suppressed inside batch");
                self.pending_change = true;
            }
        }
        if ready.is_empty() || self.subscribers.is_empty() {
            return Outbox::empty();
        }
        Outbox {
            events: ready,
            callbacks: self.subscribers.snapshot(),
        }
    }

    /// Forget subscribers and batch state, as assignment does. The removed
    /// callbacks are returned so they can be dropped after the lock is
    /// released.
    #[must_use]
    fn reset_observation(&mut self) -> Vec<CallbackArc<T>> {
        self.defer_depth = 0;
        self.pending_change = false;
        self.subscribers.take_all()
    }
}

fn lock_state<T, S>(state: &Mutex<State<T, S>>) -> MutexGuard<'_, State<T, S>> {
    // Subscriber callbacks run and drop outside the lock. A panic under it
    // can only come from a `with`/`with_mut`/`with_storage` closure or a
    // `PartialEq`/`Clone` impl, and none of those leave `State` half
    // updated, so a poisoned state is still valid.
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A thread-safe ordered sequence that notifies subscribers of changes.
///
/// All methods take `&self`; share the container across threads with
/// `Arc<ObservableVec<T>>`.
///
/// Cloning copies the elements only. The clone starts with no subscribers
/// and no open batch, and cloning never notifies anyone.
///
/// # Invariants
///
/// 1. Registration order is dispatch order.
/// 2. An unsubscribed id never receives an event initiated after
///    `unsubscribe` returned.
/// 3. `pending_change` implies `defer_depth > 0`.
/// 4. After a `SizeChanged` event, `new_size` equals the length the
///    mutation left behind.
/// 5. Dropping the container discards callbacks without invoking them.
pub struct ObservableVec<T, S = Vec<T>> {
    state: Arc<Mutex<State<T, S>>>,
    config: ContainerConfig,
}

/// Observable sequence backed by a ring buffer.
pub type ObservableDeque<T> = ObservableVec<T, std::collections::VecDeque<T>>;
/// Observable sequence backed by a doubly-linked list.
pub type ObservableList<T> = ObservableVec<T, std::collections::LinkedList<T>>;

impl<T, S> ObservableVec<T, S>
where
    T: Clone + PartialEq + Send + 'static,
    S: SequenceStorage<T> + Send + 'static,
{
    /// Create an empty container with the default config.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    #[must_use]
    pub fn with_config(config: ContainerConfig) -> Self {
        let elements = S::with_capacity(config.initial_capacity);
        Self::from_parts(elements, config)
    }

    /// Wrap existing storage. No events are sent.
    #[must_use]
    pub fn from_storage(elements: S) -> Self {
        Self::from_parts(elements, ContainerConfig::default())
    }

    fn from_parts(elements: S, config: ContainerConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::new(elements))),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, State<T, S>> {
        lock_state(&self.state)
    }

    fn deliver(&self, outbox: Outbox<T>) {
        outbox.deliver(self.config.dispatch_policy);
    }

    // ---------------------------------------------------------------------
    // Subscribers
    // ---------------------------------------------------------------------

    /// Register `callback` and return its handle.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ChangeEvent<T>) + Send + Sync + 'static,
    {
        let mut state = self.lock();
        let id = state.subscribers.insert(Arc::new(callback));
        debug!(%id, subscribers = state.subscribers.len(), "subscribed");
        id
    }

    /// Register `callback` and return a guard that unsubscribes on drop.
    pub fn subscribe_scoped<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ChangeEvent<T>) + Send + Sync + 'static,
    {
        let id = self.subscribe(callback);
        let weak = Arc::downgrade(&self.state);
        Subscription::new(
            id,
            Box::new(move |id| match weak.upgrade() {
                Some(state) => {
                    let removed = lock_state(&state).subscribers.remove(id);
                    debug!(%id, removed = removed.is_some(), "scoped subscription released");
                    removed.is_some()
                }
                None => false,
            }),
        )
    }

    /// Remove the subscriber `id`. Returns `false` for unknown, already
    /// removed or zero handles.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.lock().subscribers.remove(id);
        debug!(%id, removed = removed.is_some(), "unsubscribe");
        removed.is_some()
    }

    #[must_use]
    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.lock().subscribers.contains(id)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    // ---------------------------------------------------------------------
    // Batching
    // ---------------------------------------------------------------------

    /// Open a batch. Batches nest without limit.
    pub fn begin_batch(&self) {
        let mut state = self.lock();
        state.defer_depth += 1;
        trace!(depth = state.defer_depth, "begin batch");
    }

    /// Close a batch. Closing the outermost batch delivers one
    /// `BatchUpdate` if anything changed inside it. Without an open batch
    /// this does nothing.
    pub fn end_batch(&self) {
        let outbox = {
            let mut state = self.lock();
            if state.defer_depth == 0 {
                trace!("end batch without open batch ignored");
                return;
            }
            state.defer_depth -= 1;
            trace!(depth = state.defer_depth, "end batch");
            if state.defer_depth > 0 || !state.pending_change {
                return;
            }
            state.pending_change = false;
            debug!("flushing batch");
            state.emit(vec![ChangeEvent::batch_update()])
        };
        self.deliver(outbox);
    }

    /// Open a batch that closes when the returned guard is dropped.
    pub fn batch(&self) -> BatchGuard<'_, T, S> {
        BatchGuard::new(self)
    }

    /// Run `f` inside a batch.
    pub fn batched<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        let _batch = self.batch();
        f(self)
    }

    #[must_use]
    pub fn defer_depth(&self) -> usize {
        self.lock().defer_depth
    }

    #[must_use]
    pub fn is_deferred(&self) -> bool {
        self.defer_depth() > 0
    }

    /// Whether the open batch has swallowed at least one event.
    #[must_use]
    pub fn has_pending_change(&self) -> bool {
        self.lock().pending_change
    }

    // ---------------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------------

    /// Append `value`.
    ///
    /// Emits `ElementAdded(len)` then `SizeChanged(len + 1)`.
    pub fn push(&self, value: T) {
        let outbox = {
            let mut state = self.lock();
            let index = state.elements.len();
            let added = ChangeEvent::added(index, value.clone());
            state.elements.push(value);
            let len = state.elements.len();
            state.emit(vec![added, ChangeEvent::size_changed(len)])
        };
        self.deliver(outbox);
    }

    /// Remove the last element. An empty container returns `None` and
    /// emits nothing.
    ///
    /// Emits `ElementRemoved(len - 1)` then `SizeChanged(len - 1)`.
    pub fn pop(&self) -> Option<T> {
        let (removed, outbox) = {
            let mut state = self.lock();
            let removed = state.elements.pop()?;
            let len = state.elements.len();
            let outbox = state.emit(vec![
                ChangeEvent::removed(len, removed.clone()),
                ChangeEvent::size_changed(len),
            ]);
            (removed, outbox)
        };
        self.deliver(outbox);
        Some(removed)
    }

    /// Insert `value` at `index`, shifting later elements back.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::OutOfRange`] if `index > len`.
    pub fn insert(&self, index: usize, value: T) -> ContainerResult<()> {
        let outbox = {
            let mut state = self.lock();
            let len = state.elements.len();
            if index > len {
                return Err(ContainerError::OutOfRange { index, len });
            }
            let added = ChangeEvent::added(index, value.clone());
            state.elements.insert(index, value);
            state.emit(vec![added, ChangeEvent::size_changed(len + 1)])
        };
        self.deliver(outbox);
        Ok(())
    }

    /// Remove and return the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::OutOfRange`] if `index >= len`.
    pub fn remove(&self, index: usize) -> ContainerResult<T> {
        let (removed, outbox) = {
            let mut state = self.lock();
            let len = state.elements.len();
            let removed = state
                .elements
                .remove(index)
                .ok_or(ContainerError::OutOfRange { index, len })?;
            let outbox = state.emit(vec![
                ChangeEvent::removed(index, removed.clone()),
                ChangeEvent::size_changed(len - 1),
            ]);
            (removed, outbox)
        };
        self.deliver(outbox);
        Ok(removed)
    }

    /// Overwrite the element at `index` and notify.
    ///
    /// Returns `Ok(false)` without notifying when `value` equals the
    /// current element.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::OutOfRange`] if `index >= len`.
    pub fn replace(&self, index: usize, value: T) -> ContainerResult<bool> {
        let outbox = {
            let mut state = self.lock();
            let len = state.elements.len();
            let slot = state
                .elements
                .get_mut(index)
                .ok_or(ContainerError::OutOfRange { index, len })?;
            if *slot == value {
                return Ok(false);
            }
            let old = mem::replace(slot, value.clone());
            state.emit(vec![ChangeEvent::modified(index, old, value)])
        };
        self.deliver(outbox);
        Ok(true)
    }

    /// Remove every element. Emits `SizeChanged(0)` unless already empty.
    pub fn clear(&self) {
        let outbox = {
            let mut state = self.lock();
            if state.elements.is_empty() {
                return;
            }
            state.elements.clear();
            state.emit(vec![ChangeEvent::size_changed(0)])
        };
        self.deliver(outbox);
    }

    /// Append every value from `iter` inside one batch.
    ///
    /// Outside a batch, subscribers see a single `BatchUpdate` (or nothing
    /// for an empty iterator).
    pub fn extend<I: IntoIterator<Item = T>>(&self, iter: I) {
        let _batch = self.batch();
        for value in iter {
            self.push(value);
        }
    }

    /// Mutate the element at `index` in place **without** notifying.
    ///
    /// Use [`replace`](Self::replace) when subscribers should see the
    /// change. `f` runs under the container lock and must not call back
    /// into this container.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::OutOfRange`] if `index >= len`.
    pub fn with_mut<R>(&self, index: usize, f: impl FnOnce(&mut T) -> R) -> ContainerResult<R> {
        let mut state = self.lock();
        let len = state.elements.len();
        state
            .elements
            .get_mut(index)
            .map(f)
            .ok_or(ContainerError::OutOfRange { index, len })
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().elements.is_empty()
    }

    /// Clone of the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::OutOfRange`] if `index >= len`.
    pub fn get(&self, index: usize) -> ContainerResult<T> {
        self.with(index, T::clone)
    }

    /// Borrow the element at `index` for the duration of `f`, which runs
    /// under the container lock.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::OutOfRange`] if `index >= len`.
    pub fn with<R>(&self, index: usize, f: impl FnOnce(&T) -> R) -> ContainerResult<R> {
        let state = self.lock();
        let len = state.elements.len();
        state
            .elements
            .get(index)
            .map(f)
            .ok_or(ContainerError::OutOfRange { index, len })
    }

    #[must_use]
    pub fn first(&self) -> Option<T> {
        self.lock().elements.get(0).cloned()
    }

    #[must_use]
    pub fn last(&self) -> Option<T> {
        let state = self.lock();
        let len = state.elements.len();
        len.checked_sub(1)
            .and_then(|i| state.elements.get(i))
            .cloned()
    }

    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        self.lock().elements.iter().any(|v| v == value)
    }

    /// Snapshot of the current contents.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.lock().elements.iter().cloned().collect()
    }

    /// Iterate over a snapshot. The lock is not held while iterating.
    #[must_use]
    pub fn iter(&self) -> std::vec::IntoIter<T> {
        self.to_vec().into_iter()
    }

    /// Visit a snapshot of the elements in order.
    pub fn for_each(&self, f: impl FnMut(&T)) {
        self.to_vec().iter().for_each(f);
    }

    /// Borrow the backing storage for the duration of `f`, which runs
    /// under the container lock.
    pub fn with_storage<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.lock().elements)
    }

    // ---------------------------------------------------------------------
    // Copy / move
    // ---------------------------------------------------------------------

    /// Copy `source`'s elements into `self`.
    ///
    /// Subscribers and batch state of `self` are always dropped. If the
    /// contents differed, a `BatchUpdate` is dispatched to the (now empty)
    /// subscriber set. Assigning a container to itself does nothing.
    /// Returns whether the contents changed.
    pub fn assign_from(&self, source: &Self) -> bool
    where
        S: Clone,
    {
        if std::ptr::eq(self, source) {
            return false;
        }
        let incoming = source.lock().elements.clone();
        let (changed, outbox, _released) = {
            let mut state = self.lock();
            let changed = !state.elements.same_contents(&incoming);
            if changed {
                state.elements = incoming;
            }
            let released = state.reset_observation();
            debug!(changed, len = state.elements.len(), "copy-assigned");
            let outbox = if changed {
                state.emit(vec![ChangeEvent::batch_update()])
            } else {
                Outbox::empty()
            };
            (changed, outbox, released)
        };
        self.deliver(outbox);
        changed
    }

    /// Build a new container that owns `source`'s elements, leaving
    /// `source` empty.
    ///
    /// No subscribers are transferred and neither container notifies.
    /// `source` keeps its own subscribers and batch state.
    #[must_use]
    pub fn take_from(source: &Self) -> Self {
        let elements = mem::take(&mut source.lock().elements);
        debug!(len = elements.len(), "move-constructed");
        Self::from_parts(elements, source.config.clone())
    }

    /// Move `source`'s elements into `self`, leaving `source` empty.
    ///
    /// Subscribers and batch state of `self` are dropped, then a
    /// `BatchUpdate` is dispatched on `self` (to the now empty subscriber
    /// set). `source` does not notify. Moving a container into itself does
    /// nothing.
    pub fn move_from(&self, source: &Self) {
        if std::ptr::eq(self, source) {
            return;
        }
        let incoming = mem::take(&mut source.lock().elements);
        let (outbox, _released) = {
            let mut state = self.lock();
            state.elements = incoming;
            let released = state.reset_observation();
            debug!(len = state.elements.len(), "move-assigned");
            (state.emit(vec![ChangeEvent::batch_update()]), released)
        };
        self.deliver(outbox);
    }

    /// Consume the container and return its storage. Subscriber callbacks
    /// are dropped without being invoked.
    #[must_use]
    pub fn into_storage(self) -> S {
        match Arc::try_unwrap(self.state) {
            Ok(state) => {
                state
                    .into_inner()
                    .unwrap_or_else(PoisonError::into_inner)
                    .elements
            }
            // A subscription guard is releasing concurrently and holds a
            // temporary strong reference.
            Err(shared) => {
                let mut state = lock_state(&shared);
                mem::take(&mut state.elements)
            }
        }
    }
}

impl<T, S> Default for ObservableVec<T, S>
where
    T: Clone + PartialEq + Send + 'static,
    S: SequenceStorage<T> + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S> Clone for ObservableVec<T, S>
where
    T: Clone + PartialEq + Send + 'static,
    S: SequenceStorage<T> + Clone + Send + 'static,
{
    fn clone(&self) -> Self {
        let elements = self.lock().elements.clone();
        Self::from_parts(elements, self.config.clone())
    }
}

impl<T> From<Vec<T>> for ObservableVec<T, Vec<T>>
where
    T: Clone + PartialEq + Send + 'static,
{
    fn from(elements: Vec<T>) -> Self {
        Self::from_storage(elements)
    }
}

impl<T, S> FromIterator<T> for ObservableVec<T, S>
where
    T: Clone + PartialEq + Send + 'static,
    S: SequenceStorage<T> + Send + 'static,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut elements = S::default();
        for value in iter {
            elements.push(value);
        }
        Self::from_storage(elements)
    }
}

impl<T: fmt::Debug, S: SequenceStorage<T>> fmt::Debug for ObservableVec<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock_state(&self.state);
        f.debug_struct("ObservableVec")
            .field("elements", &DebugElements(&state.elements, PhantomData))
            .field("defer_depth", &state.defer_depth)
            .field("pending_change", &state.pending_change)
            .field("subscriber_count", &state.subscribers.len())
            .finish()
    }
}

struct DebugElements<'a, T, S>(&'a S, PhantomData<&'a T>);

impl<T: fmt::Debug, S: SequenceStorage<T>> fmt::Debug for DebugElements<'_, T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ChangeKind;
    use std::collections::{LinkedList, VecDeque};

    type Log<T> = Arc<Mutex<Vec<ChangeEvent<T>>>>;

    fn record<T, S>(c: &ObservableVec<T, S>) -> (SubscriptionId, Log<T>)
    where
        T: Clone + PartialEq + Send + 'static,
        S: SequenceStorage<T> + Send + 'static,
    {
        let log: Log<T> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let id = c.subscribe(move |ev| sink.lock().unwrap().push(ev.clone()));
        (id, log)
    }

    fn kinds<T>(log: &Log<T>) -> Vec<ChangeKind> {
        log.lock().unwrap().iter().map(|e| e.kind).collect()
    }

    #[test]
    fn new_is_empty() {
        let c: ObservableVec<i32> = ObservableVec::new();
        assert!(c.is_empty());
        assert_eq!(c.len(), 0);
        assert_eq!(c.subscriber_count(), 0);
        assert_eq!(c.defer_depth(), 0);
    }

    #[test]
    fn push_emits_added_then_size() {
        let c: ObservableVec<i32> = ObservableVec::new();
        let (_, log) = record(&c);
        c.push(10);
        c.push(20);
        let events = log.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                ChangeEvent::added(0, 10),
                ChangeEvent::size_changed(1),
                ChangeEvent::added(1, 20),
                ChangeEvent::size_changed(2),
            ]
        );
    }

    #[test]
    fn pop_on_empty_is_silent() {
        let c: ObservableVec<i32> = ObservableVec::new();
        let (_, log) = record(&c);
        assert_eq!(c.pop(), None);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn pop_emits_removed_then_size() {
        let c = ObservableVec::from(vec![1, 2]);
        let (_, log) = record(&c);
        assert_eq!(c.pop(), Some(2));
        assert_eq!(
            *log.lock().unwrap(),
            vec![ChangeEvent::removed(1, 2), ChangeEvent::size_changed(1)]
        );
    }

    #[test]
    fn insert_out_of_range_is_error_without_events() {
        let c = ObservableVec::from(vec![1]);
        let (_, log) = record(&c);
        assert_eq!(
            c.insert(3, 9),
            Err(ContainerError::OutOfRange { index: 3, len: 1 })
        );
        assert_eq!(c.to_vec(), vec![1]);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn replace_equal_value_is_silent() {
        let c = ObservableVec::from(vec![5]);
        let (_, log) = record(&c);
        assert_eq!(c.replace(0, 5), Ok(false));
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(c.replace(0, 6), Ok(true));
        assert_eq!(
            *log.lock().unwrap(),
            vec![ChangeEvent::modified(0, 5, 6)]
        );
    }

    #[test]
    fn with_mut_bypasses_notification() {
        let c = ObservableVec::from(vec![1, 2]);
        let (_, log) = record(&c);
        c.with_mut(1, |v| *v = 42).unwrap();
        assert_eq!(c.get(1), Ok(42));
        assert!(log.lock().unwrap().is_empty());
        assert!(c.with_mut(2, |v| *v = 0).is_err());
    }

    #[test]
    fn clear_only_notifies_when_non_empty() {
        let c: ObservableVec<i32> = ObservableVec::new();
        let (_, log) = record(&c);
        c.clear();
        assert!(log.lock().unwrap().is_empty());
        c.push(1);
        c.clear();
        assert_eq!(
            kinds(&log),
            vec![
                ChangeKind::ElementAdded,
                ChangeKind::SizeChanged,
                ChangeKind::SizeChanged
            ]
        );
        assert_eq!(log.lock().unwrap()[2].new_size, Some(0));
    }

    #[test]
    fn pending_change_tracks_batch() {
        let c: ObservableVec<i32> = ObservableVec::new();
        assert!(!c.has_pending_change());
        c.begin_batch();
        c.clear();
        assert!(!c.has_pending_change());
        c.push(1);
        assert!(c.has_pending_change());
        c.end_batch();
        assert!(!c.has_pending_change());
        assert!(!c.is_deferred());
    }

    #[test]
    fn no_op_replace_inside_batch_does_not_dirty_it() {
        let c = ObservableVec::from(vec![1]);
        let (_, log) = record(&c);
        c.begin_batch();
        c.replace(0, 1).unwrap();
        assert!(c.insert(5, 0).is_err());
        c.end_batch();
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn extend_coalesces() {
        let c: ObservableVec<i32> = ObservableVec::new();
        let (_, log) = record(&c);
        c.extend([1, 2, 3]);
        c.extend(std::iter::empty());
        assert_eq!(kinds(&log), vec![ChangeKind::BatchUpdate]);
        assert_eq!(c.to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn reads() {
        let c = ObservableVec::from(vec!['a', 'b', 'c']);
        assert_eq!(c.first(), Some('a'));
        assert_eq!(c.last(), Some('c'));
        assert!(c.contains(&'b'));
        assert!(!c.contains(&'z'));
        assert_eq!(c.get(3), Err(ContainerError::OutOfRange { index: 3, len: 3 }));
        assert_eq!(c.with(1, |v| v.to_ascii_uppercase()), Ok('B'));
        assert_eq!(c.iter().collect::<String>(), "abc");
        let mut seen = Vec::new();
        c.for_each(|v| seen.push(*v));
        assert_eq!(seen, vec!['a', 'b', 'c']);
        assert_eq!(c.with_storage(|s| s.len()), 3);

        let empty: ObservableVec<char> = ObservableVec::default();
        assert_eq!(empty.first(), None);
        assert_eq!(empty.last(), None);
    }

    #[test]
    fn scoped_subscription_drop_unsubscribes() {
        let c: ObservableVec<i32> = ObservableVec::new();
        let hits = Arc::new(Mutex::new(0));
        let h = Arc::clone(&hits);
        let sub = c.subscribe_scoped(move |_| *h.lock().unwrap() += 1);
        assert!(c.is_subscribed(sub.id()));
        c.push(1);
        drop(sub);
        c.push(2);
        assert_eq!(*hits.lock().unwrap(), 2);
        assert_eq!(c.subscriber_count(), 0);
    }

    #[test]
    fn scoped_subscription_explicit_unsubscribe() {
        let c: ObservableVec<i32> = ObservableVec::new();
        let sub = c.subscribe_scoped(|_| {});
        let id = sub.id();
        assert!(sub.unsubscribe());
        assert!(!c.unsubscribe(id));
    }

    #[test]
    fn scoped_subscription_outliving_container() {
        let c: ObservableVec<i32> = ObservableVec::new();
        let sub = c.subscribe_scoped(|_| {});
        drop(c);
        assert!(!sub.unsubscribe());
    }

    #[test]
    fn detached_subscription_stays() {
        let c: ObservableVec<i32> = ObservableVec::new();
        let id = c.subscribe_scoped(|_| {}).detach();
        assert!(c.is_subscribed(id));
        assert!(c.unsubscribe(id));
    }

    #[test]
    fn into_storage_returns_elements() {
        let c = ObservableVec::from(vec![3, 4]);
        let _id = c.subscribe(|_| panic!("must not be invoked"));
        assert_eq!(c.into_storage(), vec![3, 4]);
    }

    #[test]
    fn config_capacity_and_policy_kept_by_clone() {
        let config = ContainerConfig::isolated().with_initial_capacity(16);
        let c: ObservableVec<u8> = ObservableVec::with_config(config.clone());
        assert!(c.with_storage(|v| v.capacity()) >= 16);
        assert_eq!(c.clone().config(), &config);
    }

    #[test]
    fn isolated_policy_survives_panicking_subscriber() {
        let c: ObservableVec<i32> = ObservableVec::with_config(ContainerConfig::isolated());
        c.subscribe(|_| panic!("bad subscriber"));
        let (_, log) = record(&c);
        c.push(1);
        assert_eq!(log.lock().unwrap().len(), 2);
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn propagated_panic_leaves_state_consistent() {
        let c: ObservableVec<i32> = ObservableVec::new();
        c.subscribe(|ev| {
            if ev.kind == ChangeKind::SizeChanged {
                panic!("size listener failed");
            }
        });
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| c.push(7)));
        assert!(result.is_err());
        assert_eq!(c.to_vec(), vec![7]);
        c.begin_batch();
        c.end_batch();
        assert_eq!(c.defer_depth(), 0);
    }

    #[test]
    fn deque_and_list_backings_emit_same_events() {
        let d: ObservableDeque<i32> = ObservableVec::new();
        let l: ObservableList<i32> = ObservableVec::new();
        let (_, dlog) = record(&d);
        let (_, llog) = record(&l);
        d.push(1);
        d.insert(0, 0).unwrap();
        d.remove(1).unwrap();
        l.push(1);
        l.insert(0, 0).unwrap();
        l.remove(1).unwrap();
        assert_eq!(*dlog.lock().unwrap(), *llog.lock().unwrap());
        assert_eq!(d.to_vec(), l.to_vec());
        assert_eq!(l.with_storage(LinkedList::len), 1);
        assert_eq!(d.with_storage(VecDeque::len), 1);
    }

    #[test]
    fn debug_format() {
        let c = ObservableVec::from(vec![1, 2]);
        c.subscribe(|_| {});
        let dbg = format!("{c:?}");
        assert!(dbg.contains("ObservableVec"));
        assert!(dbg.contains("[1, 2]"));
        assert!(dbg.contains("subscriber_count: 1"));
    }
}
