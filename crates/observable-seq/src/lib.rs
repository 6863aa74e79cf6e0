#![forbid(unsafe_code)]

//! Observable sequences with batched change notification.
//!
//! This crate provides a thread-safe ordered container that tells its
//! subscribers what changed:
//!
//! - [`ObservableVec`]: the container. Mutations (`push`, `pop`, `insert`,
//!   `remove`, `replace`, `clear`) emit [`ChangeEvent`]s.
//! - [`SubscriptionId`] / [`Subscription`]: handle-based subscriptions, with
//!   an RAII guard that unsubscribes on drop.
//! - [`BatchGuard`]: defers notifications until the outermost batch closes,
//!   then sends a single `BatchUpdate`.
//! - [`SequenceStorage`]: the backing sequence, chosen by type parameter
//!   (`Vec`, `VecDeque` or `LinkedList`).
//!
//! # Architecture
//!
//! Each container keeps its elements, subscribers and batch counters in one
//! `Arc<Mutex<..>>`. Events are computed under the lock and dispatched to a
//! snapshot of the subscribers after the lock is released, so a callback may
//! subscribe, unsubscribe or mutate the container it is observing.
//!
//! # Invariants
//!
//! 1. Subscribers are notified in registration order.
//! 2. Subscription ids are process-wide, monotonically increasing and never
//!    reused.
//! 3. Inside a batch no individual event is delivered; closing the outermost
//!    batch delivers exactly one `BatchUpdate` if anything changed.
//! 4. A batch with no effective change produces no event at any depth.
//! 5. Copying or moving a container never carries subscribers along.
//!
//! # Example
//!
//! ```
//! use observable_seq::{ChangeKind, ObservableVec};
//! use std::sync::{Arc, Mutex};
//!
//! let items: ObservableVec<&str> = ObservableVec::new();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! let id = items.subscribe(move |ev| sink.lock().unwrap().push(ev.kind));
//!
//! items.push("a");
//! items.batched(|items| {
//!     items.push("b");
//!     items.push("c");
//! });
//! assert!(items.unsubscribe(id));
//! items.push("d");
//!
//! assert_eq!(
//!     *seen.lock().unwrap(),
//!     vec![ChangeKind::ElementAdded, ChangeKind::SizeChanged, ChangeKind::BatchUpdate]
//! );
//! assert_eq!(items.to_vec(), vec!["a", "b", "c", "d"]);
//! ```

pub mod batch;
pub mod config;
pub mod container;
pub mod error;
pub mod event;
pub mod registry;
pub mod storage;

pub use batch::BatchGuard;
pub use config::{ContainerConfig, DispatchPolicy};
pub use container::{ObservableDeque, ObservableList, ObservableVec};
pub use error::{ContainerError, ContainerResult};
pub use event::{ChangeEvent, ChangeKind};
pub use registry::{Callback, Subscription, SubscriptionId};
pub use storage::SequenceStorage;

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<X: Send + Sync>() {}

    #[test]
    fn container_is_send_sync() {
        assert_send_sync::<ObservableVec<String>>();
        assert_send_sync::<ObservableDeque<u64>>();
        assert_send_sync::<ObservableList<u64>>();
    }

    #[test]
    fn subscription_is_send() {
        fn assert_send<X: Send>() {}
        assert_send::<Subscription>();
    }
}
