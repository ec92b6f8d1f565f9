//! Publish/subscribe fan-out for session events.
//!
//! Listeners register per event kind and get back an explicit unsubscribe
//! handle. Delivery snapshots the listener list first, so removing a
//! listener during delivery neither panics nor skips its siblings.

use crate::domain::events::{LiveEvent, LiveEventKind};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

type Listener = Arc<dyn Fn(&LiveEvent) + Send + Sync>;

#[derive(Default)]
pub struct EventEmitter {
    inner: Mutex<Registry>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: HashMap<LiveEventKind, Vec<(u64, Listener)>>,
}

impl EventEmitter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn subscribe<F>(self: &Arc<Self>, kind: LiveEventKind, listener: F) -> Subscription
    where
        F: Fn(&LiveEvent) + Send + Sync + 'static,
    {
        let mut registry = self.inner.lock().expect("event registry lock");
        let id = registry.next_id;
        registry.next_id += 1;
        registry
            .listeners
            .entry(kind)
            .or_default()
            .push((id, Arc::new(listener)));
        Subscription {
            kind,
            id,
            emitter: Arc::downgrade(self),
        }
    }

    /// Delivers an event to every listener registered for its kind.
    ///
    /// The listener set is snapshotted before the first call.
    pub fn emit(&self, event: &LiveEvent) {
        let snapshot: Vec<Listener> = {
            let registry = self.inner.lock().expect("event registry lock");
            registry
                .listeners
                .get(&event.kind())
                .map(|entries| entries.iter().map(|(_, l)| l.clone()).collect())
                .unwrap_or_default()
        };
        for listener in snapshot {
            listener(event);
        }
    }

    fn unsubscribe(&self, kind: LiveEventKind, id: u64) {
        let mut registry = self.inner.lock().expect("event registry lock");
        if let Some(entries) = registry.listeners.get_mut(&kind) {
            entries.retain(|(entry_id, _)| *entry_id != id);
        }
    }
}

/// Handle returned at subscribe time; consumed to deregister the listener.
pub struct Subscription {
    kind: LiveEventKind,
    id: u64,
    emitter: Weak<EventEmitter>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(emitter) = self.emitter.upgrade() {
            emitter.unsubscribe(self.kind, self.id);
        }
    }
}
