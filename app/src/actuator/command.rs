use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use infrastructure::meter;
use serde_json::Value;
use tokio::{sync::watch, task::JoinHandle, time::Instant};

use super::{Actuator, PowerState};
use crate::{
    core::{WriteError, tree::join},
    port::RemoteStore,
};

/// Writes single-field actuator commands to the status path.
///
/// Local status is never touched here, it only changes when the store echoes the
/// write back. A successful pump ON opens the irrigation activity window.
pub struct CommandIssuer<S> {
    store: S,
    status_path: String,
    activity: Arc<ActivityWindow>,
}

struct ActivityWindow {
    duration: Duration,
    signal: watch::Sender<bool>,
    timer: Mutex<WindowTimer>,
}

#[derive(Default)]
struct WindowTimer {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl<S: RemoteStore> CommandIssuer<S> {
    pub fn new(store: S, status_path: &str, activity_window: Duration) -> Self {
        Self {
            store,
            status_path: status_path.to_owned(),
            activity: Arc::new(ActivityWindow {
                duration: activity_window,
                signal: watch::channel(false).0,
                timer: Mutex::new(WindowTimer::default()),
            }),
        }
    }

    pub fn is_irrigating(&self) -> bool {
        *self.activity.signal.borrow()
    }

    pub async fn set_pump(&self, state: PowerState) -> Result<(), WriteError> {
        self.write_field(Actuator::Pump, state).await?;

        if state.is_on() {
            self.activity.open();
        }

        Ok(())
    }

    pub async fn set_buzzer(&self, state: PowerState) -> Result<(), WriteError> {
        self.write_field(Actuator::Buzzer, state).await
    }

    //unknown counts as OFF
    pub async fn toggle_buzzer(&self, current: Option<PowerState>) -> Result<PowerState, WriteError> {
        let target = current.unwrap_or(PowerState::Off).toggled();
        self.set_buzzer(target).await?;
        Ok(target)
    }

    pub fn end_activity(&self) {
        self.activity.close();
    }

    async fn write_field(&self, actuator: Actuator, state: PowerState) -> Result<(), WriteError> {
        let path = join(&self.status_path, actuator.field());
        tracing::info!("Setting {} to {}", actuator, state);

        match self.store.write(&path, Value::String(state.as_str().to_owned())).await {
            Ok(()) => {
                meter::increment("command_sent", &[("actuator", actuator.field()), ("state", state.as_str())]);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Error setting {} to {}: {}", actuator, state, e);
                meter::increment("command_failed", &[("actuator", actuator.field())]);
                Err(e)
            }
        }
    }
}

impl<S> Drop for CommandIssuer<S> {
    fn drop(&mut self) {
        self.activity.close();
    }
}

impl ActivityWindow {
    //a new window preempts the running one
    fn open(self: &Arc<Self>) {
        let deadline = Instant::now() + self.duration;
        let mut timer = self.timer();

        if let Some(stale) = timer.handle.take() {
            stale.abort();
        }
        timer.generation += 1;
        let generation = timer.generation;

        self.signal.send_replace(true);

        let window = Arc::clone(self);
        timer.handle = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            window.expire(generation);
        }));
    }

    fn expire(&self, generation: u64) {
        let mut timer = self.timer();

        //preempted or closed in the meantime
        if timer.generation != generation {
            return;
        }

        timer.handle = None;
        self.signal.send_replace(false);
    }

    fn close(&self) {
        let mut timer = self.timer();

        timer.generation += 1;
        if let Some(handle) = timer.handle.take() {
            handle.abort();
        }

        self.signal.send_replace(false);
    }

    fn timer(&self) -> MutexGuard<'_, WindowTimer> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
