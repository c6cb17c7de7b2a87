//! Listener registry for landing events.
//!
//! Listeners are called synchronously, in registration order. A listener
//! that returns an error or panics is logged and skipped; the others still
//! receive the event.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::{trace, warn};

use crate::error::Error;
use crate::event::LandingEvent;

/// A consumer of landing events.
pub trait LandingListener: Send + Sync {
    /// Handle one landing event.
    ///
    /// # Errors
    ///
    /// Errors are logged by the bus and never reach the engine.
    fn on_landing_event(&self, event: &LandingEvent) -> anyhow::Result<()>;
}

impl<F> LandingListener for F
where
    F: Fn(&LandingEvent) -> anyhow::Result<()> + Send + Sync,
{
    fn on_landing_event(&self, event: &LandingEvent) -> anyhow::Result<()> {
        self(event)
    }
}

type Registry = BTreeMap<u64, Arc<dyn LandingListener>>;

#[derive(Default)]
struct Inner {
    next_id: u64,
    listeners: Registry,
}

/// Outcome of delivering one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitReport {
    /// Listeners that handled the event.
    pub delivered: usize,
    /// Listeners that failed or panicked.
    pub failed: usize,
}

/// Fan-out of landing events to registered listeners.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<Inner>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.len())
            .finish()
    }
}

impl EventBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener.
    ///
    /// The listener stays registered until the returned [`Subscription`] is
    /// dropped or [`Subscription::unsubscribe`] is called.
    #[must_use = "dropping the subscription unregisters the listener"]
    pub fn subscribe(&self, listener: impl LandingListener + 'static) -> Subscription {
        self.subscribe_arc(Arc::new(listener))
    }

    /// Register a shared listener.
    #[must_use = "dropping the subscription unregisters the listener"]
    pub fn subscribe_arc(&self, listener: Arc<dyn LandingListener>) -> Subscription {
        let mut inner = lock(&self.inner);
        inner.next_id += 1;
        let id = inner.next_id;
        inner.listeners.insert(id, listener);
        trace!(listener_id = id, "Listener subscribed");

        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver an event to every listener in registration order.
    pub fn emit(&self, event: &LandingEvent) -> EmitReport {
        // Snapshot so listeners may (un)subscribe while being called
        let listeners: Vec<(u64, Arc<dyn LandingListener>)> = lock(&self.inner)
            .listeners
            .iter()
            .map(|(id, l)| (*id, Arc::clone(l)))
            .collect();

        let mut report = EmitReport::default();
        for (id, listener) in listeners {
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| listener.on_landing_event(event)));
            let failure = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(Error::listener(id, format!("{e:#}"))),
                Err(payload) => Some(Error::listener(id, panic_message(payload.as_ref()))),
            };
            match failure {
                None => report.delivered += 1,
                Some(err) => {
                    warn!(hex = %event.hex, error = %err, "Landing listener failed");
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Unregister every listener.
    pub fn clear(&self) {
        let removed = std::mem::take(&mut lock(&self.inner).listeners);
        drop(removed);
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.inner).listeners.len()
    }

    /// Check if no listeners are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle to a registered listener. Dropping it unregisters the listener.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Inner>>,
}

impl Subscription {
    /// Registry id of the listener.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Unregister the listener now.
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Keep the listener registered for the lifetime of the bus.
    pub fn detach(self) {
        std::mem::forget(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.registry.upgrade() {
            // Released before the listener itself is dropped
            let removed = lock(&inner).listeners.remove(&self.id);
            if removed.is_some() {
                trace!(listener_id = self.id, "Listener unsubscribed");
            }
        }
    }
}

// Listeners never run under the lock, so a poisoned registry is still consistent.
fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aircraft::{AircraftSnapshot, Altitude};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn event() -> LandingEvent {
        let aircraft =
            AircraftSnapshot::new("a1b2c3", Altitude::Feet(500.0)).with_flight("DAL1234");
        LandingEvent::enrich(&aircraft, None)
    }

    fn counter() -> (Arc<AtomicUsize>, impl LandingListener + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        let listener = move |_: &LandingEvent| -> anyhow::Result<()> {
            inner.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };
        (count, listener)
    }

    #[test]
    fn test_emit_reaches_subscribers() {
        let bus = EventBus::new();
        let (count, listener) = counter();
        let _sub = bus.subscribe(listener);

        let report = bus.emit(&event());
        assert_eq!((report.delivered, report.failed), (1, 0));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_registration_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let subs: Vec<_> = (0..3)
            .map(|i| {
                let order = Arc::clone(&order);
                bus.subscribe(move |_: &LandingEvent| -> anyhow::Result<()> {
                    order.lock().unwrap().push(i);
                    Ok(())
                })
            })
            .collect();

        bus.emit(&event());
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
        drop(subs);
    }

    #[test]
    fn test_drop_subscription_unsubscribes() {
        let bus = EventBus::new();
        let (count, listener) = counter();
        let sub = bus.subscribe(listener);
        assert_eq!(bus.len(), 1);

        drop(sub);
        assert!(bus.is_empty());
        bus.emit(&event());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsubscribe_explicitly() {
        let bus = EventBus::new();
        let (_, listener) = counter();
        bus.subscribe(listener).unsubscribe();
        assert!(bus.is_empty());
    }

    #[test]
    fn test_detach_keeps_listener() {
        let bus = EventBus::new();
        let (count, listener) = counter();
        bus.subscribe(listener).detach();

        bus.emit(&event());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failing_listener_is_isolated() {
        let bus = EventBus::new();
        let _bad = bus.subscribe(|_: &LandingEvent| -> anyhow::Result<()> {
            anyhow::bail!("render failed")
        });
        let (count, listener) = counter();
        let _good = bus.subscribe(listener);

        let report = bus.emit(&event());
        assert_eq!((report.delivered, report.failed), (1, 1));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let bus = EventBus::new();
        let _bad = bus.subscribe(|_: &LandingEvent| -> anyhow::Result<()> {
            panic!("listener exploded")
        });
        let (count, listener) = counter();
        let _good = bus.subscribe(listener);

        let report = bus.emit(&event());
        assert_eq!(report.failed, 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear_and_late_drop() {
        let bus = EventBus::new();
        let (_, listener) = counter();
        let sub = bus.subscribe(listener);
        bus.clear();
        assert!(bus.is_empty());
        // Dropping after clear is a no-op
        drop(sub);
    }

    #[test]
    fn test_subscription_outlives_bus() {
        let (_, listener) = counter();
        let sub = {
            let bus = EventBus::new();
            bus.subscribe(listener)
        };
        drop(sub);
    }

    #[test]
    fn test_listener_may_unsubscribe_during_emit() {
        let bus = EventBus::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let inner = Arc::clone(&slot);
        let sub = bus.subscribe(move |_: &LandingEvent| -> anyhow::Result<()> {
            inner.lock().unwrap().take();
            Ok(())
        });
        *slot.lock().unwrap() = Some(sub);

        assert_eq!(bus.emit(&event()).delivered, 1);
        assert!(bus.is_empty());
    }

    #[test]
    fn test_ids_are_unique() {
        let bus = EventBus::new();
        let (_, a) = counter();
        let (_, b) = counter();
        let first = bus.subscribe(a);
        let second = bus.subscribe(b);
        assert_ne!(first.id(), second.id());
    }
}
