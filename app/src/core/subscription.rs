use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

pub type Snapshot = Value;

/// Receiving end of a remote path subscription.
///
/// Snapshots always carry the full value at the subscribed path. Dropping the
/// subscription (or calling [`Subscription::cancel`]) stops the producer.
pub struct Subscription {
    path: String,
    rx: mpsc::Receiver<Snapshot>,
    _guard: DropGuard,
}

/// Producing end, held by the store implementation.
#[derive(Clone)]
pub struct SnapshotPublisher {
    path: String,
    tx: mpsc::Sender<Snapshot>,
    cancel: CancellationToken,
}

pub fn open(path: &str, buffer_size: usize) -> (SnapshotPublisher, Subscription) {
    let (tx, rx) = mpsc::channel(buffer_size);
    let cancel = CancellationToken::new();

    let publisher = SnapshotPublisher {
        path: path.to_owned(),
        tx,
        cancel: cancel.clone(),
    };

    let subscription = Subscription {
        path: path.to_owned(),
        rx,
        _guard: cancel.drop_guard(),
    };

    (publisher, subscription)
}

impl Subscription {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub async fn recv(&mut self) -> Option<Snapshot> {
        self.rx.recv().await
    }

    pub fn cancel(self) {
        tracing::debug!("Cancelling subscription for {}", self.path);
    }
}

impl SnapshotPublisher {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.tx.is_closed()
    }

    pub async fn closed(&self) {
        tokio::select! {
            _ = self.cancel.cancelled() => {},
            _ = self.tx.closed() => {},
        }
    }

    pub async fn publish(&self, snapshot: Snapshot) -> bool {
        self.tx.send(snapshot).await.is_ok()
    }

    #[cfg(test)]
    pub fn try_publish(&self, snapshot: Snapshot) -> bool {
        match self.tx.try_send(snapshot) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("Subscriber for {} is not keeping up, dropping snapshot", self.path);
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn snapshots_are_delivered_in_order() {
        let (publisher, mut subscription) = open("status", 4);

        assert!(publisher.publish(json!({"pump": "ON"})).await);
        assert!(publisher.try_publish(json!({"pump": "OFF"})));

        assert_eq!(subscription.recv().await, Some(json!({"pump": "ON"})));
        assert_eq!(subscription.recv().await, Some(json!({"pump": "OFF"})));
        assert_eq!(subscription.path(), "status");
    }

    #[tokio::test]
    async fn cancelling_subscription_closes_publisher() {
        let (publisher, subscription) = open("sensorData", 4);
        assert!(!publisher.is_closed());

        subscription.cancel();

        publisher.closed().await;
        assert!(publisher.is_closed());
        assert!(!publisher.publish(json!(null)).await);
    }
}
