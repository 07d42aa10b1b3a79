mod command;
mod domain;
mod tracker;

pub use command::CommandIssuer;
pub use domain::*;

use infrastructure::{EventBus, EventEmitter, EventListener, meter};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracker::StatusTracker;

use crate::{
    core::{Snapshot, Subscription},
    notification::{Notification, NotificationLog},
    port::RemoteStore,
};

pub struct StatusRunner {
    snapshots: Subscription,
    tracker: StatusTracker,
    notifications: NotificationLog,
    status: watch::Sender<ActuatorStatus>,
    event_bus: EventBus<Transition>,
    emitter: EventEmitter<Transition>,
}

#[derive(Clone)]
pub struct StatusClient {
    status: watch::Receiver<ActuatorStatus>,
}

impl StatusRunner {
    pub fn new(store: &impl RemoteStore, path: &str, policy: ColdStartPolicy, notifications: NotificationLog) -> Self {
        let tracker = StatusTracker::new(policy);
        let event_bus = EventBus::new(64);
        let emitter = event_bus.emitter();

        Self {
            snapshots: store.subscribe(path),
            status: watch::channel(tracker.last_known()).0,
            tracker,
            notifications,
            event_bus,
            emitter,
        }
    }

    pub fn client(&self) -> StatusClient {
        StatusClient {
            status: self.status.subscribe(),
        }
    }

    pub fn subscribe(&self) -> EventListener<Transition> {
        self.event_bus.subscribe()
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            let snapshot = tokio::select! {
                _ = cancel.cancelled() => break,
                snapshot = self.snapshots.recv() => snapshot,
            };

            match snapshot {
                Some(snapshot) => self.handle_snapshot(&snapshot).await,
                None => {
                    tracing::warn!("Subscription for {} closed by the store", self.snapshots.path());
                    break;
                }
            }
        }

        tracing::info!("Status stream for {} stopped", self.snapshots.path());
        self.snapshots.cancel();
    }

    //notifications of a snapshot are recorded before its status becomes visible
    async fn handle_snapshot(&mut self, snapshot: &Snapshot) {
        let observed = ActuatorStatus::decode(snapshot);
        let transitions = self.tracker.apply(&observed);

        for transition in transitions {
            self.notifications.append(Notification::new(transition.to_string())).await;
            meter::increment(
                "actuator_transition",
                &[("actuator", transition.actuator.field()), ("state", transition.state.as_str())],
            );
            self.emitter.send(transition);
        }

        self.status.send_replace(self.tracker.last_known());
    }
}

impl StatusClient {
    pub fn current(&self) -> ActuatorStatus {
        *self.status.borrow()
    }

    #[cfg(test)]
    pub fn updates(&self) -> watch::Receiver<ActuatorStatus> {
        self.status.clone()
    }
}
