//! Synchronous change notification.
//!
//! Listeners are invoked on the writing thread, after the write commits, with
//! the full post-write snapshot of the affected collection.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// The store's collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Users,
    Messages,
    Notices,
    Events,
    Jobs,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Messages => "messages",
            Self::Notices => "notices",
            Self::Events => "events",
            Self::Jobs => "jobs",
        }
    }
}

/// Payload handed to listeners on every write.
#[derive(Debug, Clone, Serialize)]
pub struct StoreChange {
    pub collection: Collection,
    /// The whole collection after the write, as a JSON array.
    pub snapshot: serde_json::Value,
}

/// Handle returned by [`ChangeNotifier::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&StoreChange) + Send + Sync>;

/// Registry of change listeners. Cheap to clone; clones share listeners.
#[derive(Clone, Default)]
pub struct ChangeNotifier {
    listeners: Arc<RwLock<Vec<(ListenerId, Listener)>>>,
    next_id: Arc<AtomicU64>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&StoreChange) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        listeners.push((id, Arc::new(listener)));
        id
    }

    /// Removes a listener. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn has_listeners(&self) -> bool {
        !self
            .listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_empty()
    }

    /// Invokes every listener. The lock is released before calling out, so
    /// listeners may subscribe or unsubscribe without deadlocking.
    pub fn notify(&self, change: &StoreChange) {
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(_, f)| Arc::clone(f))
            .collect();
        for listener in listeners {
            listener(change);
        }
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self
            .listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len();
        f.debug_struct("ChangeNotifier")
            .field("listeners", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn change() -> StoreChange {
        StoreChange {
            collection: Collection::Notices,
            snapshot: serde_json::json!([]),
        }
    }

    #[test]
    fn listeners_receive_changes_until_unsubscribed() {
        let notifier = ChangeNotifier::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let id = notifier.subscribe(move |c| sink.lock().unwrap().push(c.collection));

        notifier.notify(&change());
        assert!(notifier.unsubscribe(id));
        assert!(!notifier.unsubscribe(id));
        notifier.notify(&change());

        assert_eq!(*seen.lock().unwrap(), vec![Collection::Notices]);
        assert!(!notifier.has_listeners());
    }

    #[test]
    fn listener_may_unsubscribe_itself() {
        let notifier = ChangeNotifier::new();
        let slot: Arc<Mutex<Option<ListenerId>>> = Arc::new(Mutex::new(None));
        let inner = notifier.clone();
        let slot_clone = slot.clone();
        let id = notifier.subscribe(move |_| {
            if let Some(id) = *slot_clone.lock().unwrap() {
                inner.unsubscribe(id);
            }
        });
        *slot.lock().unwrap() = Some(id);

        notifier.notify(&change());
        assert!(!notifier.has_listeners());
    }

    #[test]
    fn poisoned_registry_still_notifies() {
        let notifier = ChangeNotifier::new();
        let seen = Arc::new(Mutex::new(0usize));
        let sink = seen.clone();
        notifier.subscribe(move |_| *sink.lock().unwrap() += 1);

        let registry = Arc::clone(&notifier.listeners);
        let poisoner = std::thread::spawn(move || {
            let _guard = registry.write().unwrap();
            panic!("poison the listener registry");
        });
        assert!(poisoner.join().is_err());
        assert!(notifier.listeners.is_poisoned());

        assert!(notifier.has_listeners());
        notifier.notify(&change());
        assert_eq!(*seen.lock().unwrap(), 1);
    }
}
