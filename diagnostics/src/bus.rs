//! Observer list that fans result snapshots out to subscribers.
//!
//! Every store mutation produces one synchronous, unbatched notification.
//! Callbacks always receive a fresh copy of the full result set, never a
//! reference into the store.

use crate::types::TestResult;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tracing::debug;

pub type ResultCallback = Arc<dyn Fn(&[TestResult]) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    entries: Vec<(u64, ResultCallback)>,
}

impl Subscribers {
    fn contains(&self, id: u64) -> bool {
        self.entries.iter().any(|(entry_id, _)| *entry_id == id)
    }
}

#[derive(Clone, Default)]
pub struct ResultBus {
    inner: Arc<Mutex<Subscribers>>,
}

impl ResultBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback. Dropping the returned handle keeps the callback
    /// subscribed; call [`Subscription::unsubscribe`] to remove it.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[TestResult]) + Send + Sync + 'static,
    {
        let mut subscribers = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let id = subscribers.next_id;
        subscribers.next_id += 1;
        subscribers.entries.push((id, Arc::new(callback)));
        debug!("Subscriber {} registered", id);

        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
            active: AtomicBool::new(true),
        }
    }

    /// Call every subscriber in subscription order.
    ///
    /// No lock is held while a callback runs, so callbacks may subscribe,
    /// unsubscribe or read runner state. A callback removed during this
    /// fan-out is not called.
    pub fn notify(&self, snapshot: &[TestResult]) {
        let callbacks: Vec<(u64, ResultCallback)> = {
            let subscribers = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            subscribers.entries.clone()
        };

        for (id, callback) in callbacks {
            let still_subscribed = self
                .inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(id);
            if still_subscribed {
                callback(snapshot);
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }
}

/// Handle returned by [`ResultBus::subscribe`].
pub struct Subscription {
    id: u64,
    bus: Weak<Mutex<Subscribers>>,
    active: AtomicBool,
}

impl Subscription {
    /// Remove the callback. Calling this more than once has no further effect.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(inner) = self.bus.upgrade() {
            let mut subscribers = inner.lock().unwrap_or_else(PoisonError::into_inner);
            subscribers.entries.retain(|(id, _)| *id != self.id);
            debug!("Subscriber {} removed", self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TestCategory;
    use std::sync::atomic::AtomicUsize;

    fn snapshot() -> Vec<TestResult> {
        vec![TestResult::idle("a", "A", TestCategory::Auth, false)]
    }

    #[test]
    fn test_notify_in_subscription_order() {
        let bus = ResultBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let order = order.clone();
            bus.subscribe(move |results| {
                assert_eq!(results.len(), 1);
                order.lock().unwrap().push(label);
            });
        }

        bus.notify(&snapshot());
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
        assert_eq!(bus.subscriber_count(), 3);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let bus = ResultBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let other_calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let subscription = bus.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = other_calls.clone();
        let _other = bus.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.notify(&snapshot());
        subscription.unsubscribe();
        subscription.unsubscribe();
        assert!(!subscription.is_active());
        bus.notify(&snapshot());
        bus.notify(&snapshot());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(other_calls.load(Ordering::SeqCst), 3);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_dropping_handle_keeps_subscription() {
        let bus = ResultBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        drop(bus.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        bus.notify(&snapshot());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_callback_removed_mid_fanout_is_skipped() {
        let bus = ResultBus::new();
        let late_calls = Arc::new(AtomicUsize::new(0));
        let late_handle: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let handle = late_handle.clone();
        bus.subscribe(move |_| {
            if let Some(subscription) = handle.lock().unwrap().as_ref() {
                subscription.unsubscribe();
            }
        });
        let counter = late_calls.clone();
        let late = bus.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        *late_handle.lock().unwrap() = Some(late);

        bus.notify(&snapshot());
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_unsubscribe_after_bus_dropped() {
        let bus = ResultBus::new();
        let subscription = bus.subscribe(|_| {});
        drop(bus);
        subscription.unsubscribe();
        assert!(!subscription.is_active());
    }
}
