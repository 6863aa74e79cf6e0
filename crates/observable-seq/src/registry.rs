#![forbid(unsafe_code)]

//! Subscriber registry and subscription handles.
//!
//! # Design
//!
//! Subscribers are stored as `(SubscriptionId, Arc<callback>)` pairs in
//! registration order. Dispatch never runs against the registry itself:
//! the container clones the `Arc`s into a snapshot under its lock, drops
//! the lock, then calls the snapshot. A callback may therefore subscribe,
//! unsubscribe or mutate the container without deadlocking.
//!
//! # Invariants
//!
//! 1. Ids come from one process-wide atomic counter starting at 1 and are
//!    never reused, across every container in the process.
//! 2. The zero id ([`SubscriptionId::default`]) is never issued.
//! 3. Snapshot order is registration order.
//! 4. An id removed before a snapshot is taken never appears in it.
//! 5. Removed callbacks are handed back to the container and dropped only
//!    after its lock is released, so captures may lock the container.

use std::any::Any;
use std::fmt;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;

use crate::config::DispatchPolicy;
use crate::event::ChangeEvent;

static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque handle identifying one subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    fn next() -> Self {
        Self(NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Whether this is the zero handle, which no subscriber ever holds.
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// Subscriber callback signature.
pub type Callback<T> = dyn Fn(&ChangeEvent<T>) + Send + Sync;
pub(crate) type CallbackArc<T> = Arc<Callback<T>>;

/// Ordered set of subscribers for one container.
pub(crate) struct SubscriberRegistry<T> {
    entries: Vec<(SubscriptionId, CallbackArc<T>)>,
}

impl<T> Default for SubscriberRegistry<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> SubscriberRegistry<T> {
    pub(crate) fn insert(&mut self, callback: CallbackArc<T>) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.entries.push((id, callback));
        id
    }

    /// Remove `id`, preserving the order of the rest.
    ///
    /// The callback is handed back so the caller can drop it once the
    /// container lock is released; its captures may lock the container.
    #[must_use]
    pub(crate) fn remove(&mut self, id: SubscriptionId) -> Option<CallbackArc<T>> {
        let pos = self.entries.iter().position(|(sid, _)| *sid == id)?;
        Some(self.entries.remove(pos).1)
    }

    pub(crate) fn contains(&self, id: SubscriptionId) -> bool {
        self.entries.iter().any(|(sid, _)| *sid == id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every callback without invoking it. Same drop rule as
    /// [`remove`](Self::remove).
    #[must_use]
    pub(crate) fn take_all(&mut self) -> Vec<CallbackArc<T>> {
        mem::take(&mut self.entries)
            .into_iter()
            .map(|(_, cb)| cb)
            .collect()
    }

    pub(crate) fn snapshot(&self) -> Vec<CallbackArc<T>> {
        self.entries.iter().map(|(_, cb)| Arc::clone(cb)).collect()
    }
}

/// Deliver `events` in order to every callback in `callbacks`.
///
/// Each event goes to all subscribers before the next event is sent.
/// While the thread is already panicking, callbacks are always isolated so
/// a second panic cannot abort the process.
pub(crate) fn dispatch<T>(
    events: &[ChangeEvent<T>],
    callbacks: &[CallbackArc<T>],
    policy: DispatchPolicy,
) {
    if callbacks.is_empty() {
        return;
    }
    let isolate = policy == DispatchPolicy::Isolate || std::thread::panicking();
    for event in events {
        for cb in callbacks {
            if isolate {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| cb(event))) {
                    warn!(
                        kind = %event.kind,
                        message = panic_message(payload.as_ref()),
                        "subscriber panicked during dispatch"
                    );
                }
            } else {
                cb(event);
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

type Release = Box<dyn FnOnce(SubscriptionId) -> bool + Send>;

/// RAII guard for a subscriber callback.
///
/// Dropping the guard unsubscribes the callback. A dispatch that already
/// took its snapshot may still deliver one in-flight event; nothing
/// initiated after the drop reaches the callback. Dropping the guard after
/// the container itself is gone is a no-op.
pub struct Subscription {
    id: SubscriptionId,
    release: Option<Release>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, release: Release) -> Self {
        Self {
            id,
            release: Some(release),
        }
    }

    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Unsubscribe now. Returns whether the callback was still registered.
    pub fn unsubscribe(mut self) -> bool {
        self.release.take().is_some_and(|release| release(self.id))
    }

    /// Keep the callback registered for the container's lifetime and
    /// return its id for manual removal.
    #[must_use]
    pub fn detach(mut self) -> SubscriptionId {
        self.release = None;
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
