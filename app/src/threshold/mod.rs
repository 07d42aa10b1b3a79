mod domain;

pub use domain::*;

use std::sync::Arc;

use anyhow::Context;
use infrastructure::meter;
use tokio::sync::watch;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::{
    core::{Snapshot, Subscription, WriteError},
    port::RemoteStore,
};

pub struct ThresholdRunner {
    snapshots: Subscription,
    latest: Arc<watch::Sender<Option<ThresholdConfig>>>,
    stopped: CancellationToken,
    _stop_on_drop: DropGuard,
}

/// Whole-object access to the threshold config. Assumes a single writer, a
/// concurrent writer's config is silently overwritten.
#[derive(Clone)]
pub struct ThresholdClient<S> {
    store: S,
    path: String,
    latest: Arc<watch::Sender<Option<ThresholdConfig>>>,
    stopped: CancellationToken,
}

impl ThresholdRunner {
    pub fn new(store: &impl RemoteStore, path: &str) -> Self {
        let stopped = CancellationToken::new();

        Self {
            snapshots: store.subscribe(path),
            latest: Arc::new(watch::channel(None).0),
            _stop_on_drop: stopped.clone().drop_guard(),
            stopped,
        }
    }

    pub fn client<S: RemoteStore>(&self, store: S) -> ThresholdClient<S> {
        ThresholdClient {
            store,
            path: self.snapshots.path().to_owned(),
            latest: self.latest.clone(),
            stopped: self.stopped.clone(),
        }
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

        tracing::info!("Threshold stream for {} stopped", self.snapshots.path());
        self.snapshots.cancel();
    }

    fn handle_snapshot(&self, snapshot: &Snapshot) {
        match ThresholdConfig::decode(snapshot) {
            Some(config) => {
                tracing::debug!("Threshold config received: {:?}", config);
                self.latest.send_if_modified(|latest| {
                    let modified = *latest != Some(config);
                    *latest = Some(config);
                    modified
                });
            }
            None => meter::increment("snapshot_skipped", &[("path", self.snapshots.path())]),
        }
    }
}

impl<S: RemoteStore> ThresholdClient<S> {
    #[cfg(test)]
    pub fn current(&self) -> Option<ThresholdConfig> {
        *self.latest.borrow()
    }

    //waits for the first config if none was observed yet, fails once the runner is gone
    pub async fn load(&self) -> anyhow::Result<ThresholdConfig> {
        let mut updates = self.latest.subscribe();

        tokio::select! {
            biased;
            latest = updates.wait_for(Option::is_some) => {
                let latest = latest.context("Threshold updates closed")?;
                (*latest).context("Threshold config missing")
            }
            _ = self.stopped.cancelled() => {
                anyhow::bail!("Threshold stream stopped before a config was received")
            }
        }
    }

    pub async fn save(&self, config: &ThresholdConfig) -> Result<(), WriteError> {
        let value = serde_json::to_value(config).map_err(|e| WriteError::new(&self.path, e))?;

        if let Err(e) = self.store.write(&self.path, value).await {
            tracing::error!("Error saving threshold config {:?}: {}", config, e);
            meter::increment("threshold_save_failed", &[]);
            return Err(e);
        }

        tracing::info!("Threshold config saved: {:?}", config);

        //the store echo carries the same value, publish it right away
        self.latest.send_if_modified(|latest| {
            let modified = *latest != Some(*config);
            *latest = Some(*config);
            modified
        });
        Ok(())
    }
}
