mod domain;

pub use domain::*;

use infrastructure::{EventBus, EventEmitter, EventListener, meter};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{Snapshot, Subscription},
    port::RemoteStore,
};

pub struct TelemetryRunner {
    snapshots: Subscription,
    latest: watch::Sender<Option<SensorReading>>,
    event_bus: EventBus<SensorReading>,
    emitter: EventEmitter<SensorReading>,
}

#[derive(Clone)]
pub struct TelemetryClient {
    latest: watch::Receiver<Option<SensorReading>>,
}

impl TelemetryRunner {
    pub fn new(store: &impl RemoteStore, path: &str) -> Self {
        let event_bus = EventBus::new(64);
        let emitter = event_bus.emitter();

        Self {
            snapshots: store.subscribe(path),
            latest: watch::channel(None).0,
            event_bus,
            emitter,
        }
    }

    pub fn client(&self) -> TelemetryClient {
        TelemetryClient {
            latest: self.latest.subscribe(),
        }
    }

    //one event per decoded snapshot
    pub fn subscribe(&self) -> EventListener<SensorReading> {
        self.event_bus.subscribe()
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            let snapshot = tokio::select! {
                _ = cancel.cancelled() => break,
                snapshot = self.snapshots.recv() => snapshot,
            };

            match snapshot {
                Some(snapshot) => self.handle_snapshot(&snapshot),
                None => {
                    tracing::warn!("Subscription for {} closed by the store", self.snapshots.path());
                    break;
                }
            }
        }

        tracing::info!("Telemetry stream for {} stopped", self.snapshots.path());
        self.snapshots.cancel();
    }

    fn handle_snapshot(&self, snapshot: &Snapshot) {
        match SensorReading::decode(snapshot) {
            Some(reading) => {
                tracing::debug!("Sensor reading received: {:?}", reading);
                self.latest.send_replace(Some(reading));
                self.emitter.send(reading);
            }
            None => {
                tracing::debug!("Skipping incomplete sensor snapshot: {}", snapshot);
                meter::increment("snapshot_skipped", &[("path", self.snapshots.path())]);
            }
        }
    }
}

impl TelemetryClient {
    pub fn current(&self) -> Option<SensorReading> {
        *self.latest.borrow()
    }

    #[cfg(test)]
    pub fn updates(&self) -> watch::Receiver<Option<SensorReading>> {
        self.latest.clone()
    }
}
