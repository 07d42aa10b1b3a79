use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::core::{
    Subscription, WriteError, subscription,
    subscription::SnapshotPublisher,
    tree::{is_related, set_at, value_at},
};
use crate::port::RemoteStore;

/// Process-local store with the same push semantics as the remote one.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    root: Value,
    publishers: Vec<SnapshotPublisher>,
    failing: bool,
    writes: usize,
}

impl MemoryStore {
    pub fn fail_writes(&self, failing: bool) {
        self.state().failing = failing;
    }

    pub fn value(&self, path: &str) -> Value {
        value_at(&self.state().root, path).cloned().unwrap_or(Value::Null)
    }

    pub fn write_count(&self) -> usize {
        self.state().writes
    }

    pub fn subscriber_count(&self) -> usize {
        let mut state = self.state();
        state.publishers.retain(|p| !p.is_closed());
        state.publishers.len()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RemoteStore for MemoryStore {
    fn subscribe(&self, path: &str) -> Subscription {
        let (publisher, subscription) = subscription::open(path, 32);

        let mut state = self.state();
        publisher.try_publish(value_at(&state.root, path).cloned().unwrap_or(Value::Null));
        state.publishers.push(publisher);

        subscription
    }

    async fn write(&self, path: &str, value: Value) -> Result<(), WriteError> {
        let mut state = self.state();
        if state.failing {
            return Err(WriteError::new(path, "store unavailable"));
        }

        state.writes += 1;
        set_at(&mut state.root, path, value);

        let state = &mut *state;
        state.publishers.retain(|p| !p.is_closed());
        for publisher in state.publishers.iter().filter(|p| is_related(p.path(), path)) {
            publisher.try_publish(value_at(&state.root, publisher.path()).cloned().unwrap_or(Value::Null));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn subscriber_gets_current_value_then_updates() {
        let store = MemoryStore::default();
        store.write("status", json!({"pump": "OFF", "buzzer": "OFF"})).await.unwrap();

        let mut subscription = store.subscribe("status");
        store.write("status/pump", json!("ON")).await.unwrap();

        assert_eq!(subscription.recv().await, Some(json!({"pump": "OFF", "buzzer": "OFF"})));
        assert_eq!(subscription.recv().await, Some(json!({"pump": "ON", "buzzer": "OFF"})));
    }

    #[tokio::test]
    async fn unrelated_writes_are_not_pushed() {
        let store = MemoryStore::default();
        let mut subscription = store.subscribe("control");

        store.write("status/pump", json!("ON")).await.unwrap();
        store.write("control", json!({"temperature": 25})).await.unwrap();

        assert_eq!(subscription.recv().await, Some(Value::Null));
        assert_eq!(subscription.recv().await, Some(json!({"temperature": 25})));
    }

    #[tokio::test]
    async fn failing_store_rejects_writes() {
        let store = MemoryStore::default();
        store.fail_writes(true);

        let result = store.write("status/buzzer", json!("ON")).await;

        assert_eq!(result, Err(WriteError::new("status/buzzer", "store unavailable")));
        assert_eq!(store.value("status"), Value::Null);
        assert_eq!(store.write_count(), 0);
    }
}
