use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::{
    actuator::{ActuatorStatus, ColdStartPolicy, CommandIssuer, PowerState, StatusClient, StatusRunner},
    core::WriteError,
    notification::{Notification, NotificationLog},
    observability::ObservabilityModule,
    port::RemoteStore,
    telemetry::{SensorReading, TelemetryClient, TelemetryRunner},
    threshold::{ThresholdClient, ThresholdConfig, ThresholdRunner},
};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub sensor_data_path: String,
    pub status_path: String,
    pub control_path: String,
    pub cold_start: ColdStartPolicy,
    pub activity_window: Duration,
}

/// All streams of one signed-in operator, bound to a single store.
pub struct GreenhouseSession<S> {
    telemetry: TelemetryRunner,
    status: StatusRunner,
    thresholds: ThresholdRunner,
    observability: ObservabilityModule,
    client: SessionClient<S>,
}

#[derive(Clone)]
pub struct SessionClient<S> {
    telemetry: TelemetryClient,
    status: StatusClient,
    thresholds: ThresholdClient<S>,
    commands: Arc<CommandIssuer<S>>,
    notifications: NotificationLog,
    cancel: CancellationToken,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sensor_data_path: "sensorData".to_owned(),
            status_path: "status".to_owned(),
            control_path: "control".to_owned(),
            cold_start: ColdStartPolicy::default(),
            activity_window: Duration::from_millis(3000),
        }
    }
}

impl<S: RemoteStore> GreenhouseSession<S> {
    pub fn start(store: S, config: &SessionConfig) -> Self {
        let notifications = NotificationLog::default();

        let telemetry = TelemetryRunner::new(&store, &config.sensor_data_path);
        let status = StatusRunner::new(&store, &config.status_path, config.cold_start, notifications.clone());
        let thresholds = ThresholdRunner::new(&store, &config.control_path);
        let observability = ObservabilityModule::new(telemetry.subscribe(), status.subscribe());

        let client = SessionClient {
            telemetry: telemetry.client(),
            status: status.client(),
            thresholds: thresholds.client(store.clone()),
            commands: Arc::new(CommandIssuer::new(store, &config.status_path, config.activity_window)),
            notifications,
            cancel: CancellationToken::new(),
        };

        tracing::info!("Greenhouse session started");

        Self {
            telemetry,
            status,
            thresholds,
            observability,
            client,
        }
    }

    pub fn client(&self) -> SessionClient<S> {
        self.client.clone()
    }

    //returns once the session is ended, all subscriptions are released by then
    pub async fn run(self) {
        let cancel = self.client.cancel.clone();

        tokio::join!(
            self.telemetry.run(cancel.clone()),
            self.status.run(cancel.clone()),
            self.thresholds.run(cancel.clone()),
            self.observability.run(cancel.clone()),
        );

        //all runners have returned, mark the session ended
        cancel.cancel();
        self.client.commands.end_activity();

        tracing::info!("Greenhouse session ended");
    }
}

impl<S: RemoteStore> SessionClient<S> {
    pub fn reading(&self) -> Option<SensorReading> {
        self.telemetry.current()
    }

    #[cfg(test)]
    pub fn readings(&self) -> tokio::sync::watch::Receiver<Option<SensorReading>> {
        self.telemetry.updates()
    }

    pub fn status(&self) -> ActuatorStatus {
        self.status.current()
    }

    #[cfg(test)]
    pub fn statuses(&self) -> tokio::sync::watch::Receiver<ActuatorStatus> {
        self.status.updates()
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.notifications.list().await
    }

    pub async fn load_thresholds(&self) -> anyhow::Result<ThresholdConfig> {
        self.thresholds.load().await
    }

    pub async fn save_thresholds(&self, config: &ThresholdConfig) -> Result<(), WriteError> {
        self.thresholds.save(config).await
    }

    pub async fn set_pump(&self, state: PowerState) -> Result<(), WriteError> {
        self.commands.set_pump(state).await
    }

    pub async fn set_buzzer(&self, state: PowerState) -> Result<(), WriteError> {
        self.commands.set_buzzer(state).await
    }

    pub async fn toggle_buzzer(&self) -> Result<PowerState, WriteError> {
        self.commands.toggle_buzzer(self.status().buzzer).await
    }

    pub fn is_irrigating(&self) -> bool {
        self.commands.is_irrigating()
    }

    pub fn end(&self) {
        tracing::info!("Ending greenhouse session");
        self.cancel.cancel();
        self.commands.end_activity();
    }

    pub fn is_ended(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::adapter::memory::MemoryStore;
    use crate::core::unit::DegreeCelsius;

    async fn seeded_store() -> MemoryStore {
        let store = MemoryStore::default();
        store
            .write(
                "",
                json!({
                    "sensorData": {"temperature": 24.5, "humidity": 61, "soilMoisture": 38, "waterLevel": 72},
                    "status": {"pump": "OFF", "buzzer": "OFF"},
                    "control": {"soilThreshold": 40, "temperature": 25, "waterThreshold": 30, "airHumidity": 60}
                }),
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn session_exposes_remote_state() {
        let store = seeded_store().await;
        let session = GreenhouseSession::start(store.clone(), &SessionConfig::default());
        let client = session.client();
        let handle = tokio::spawn(session.run());

        assert_eq!(client.load_thresholds().await.unwrap(), ThresholdConfig::default());

        let mut readings = client.readings();
        let reading = *readings.wait_for(Option::is_some).await.unwrap();
        assert_eq!(reading.map(|r| r.temperature), Some(DegreeCelsius(24.5)));

        let mut statuses = client.statuses();
        statuses.wait_for(|s| s.pump.is_some()).await.unwrap();
        assert_eq!(client.status(), ActuatorStatus::off());
        assert!(client.notifications().await.is_empty());

        client.end();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn buzzer_toggle_is_notified_after_the_echo() {
        let store = seeded_store().await;
        let session = GreenhouseSession::start(store.clone(), &SessionConfig::default());
        let client = session.client();
        let handle = tokio::spawn(session.run());

        let mut statuses = client.statuses();
        statuses.wait_for(|s| s.buzzer.is_some()).await.unwrap();

        assert_eq!(client.toggle_buzzer().await, Ok(PowerState::On));
        statuses.wait_for(|s| s.buzzer == Some(PowerState::On)).await.unwrap();

        let messages: Vec<String> = client.notifications().await.into_iter().map(|n| n.message).collect();
        assert_eq!(messages, vec!["Buzzer turned ON"]);

        client.end();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn ending_the_session_releases_everything() {
        let store = seeded_store().await;
        let session = GreenhouseSession::start(store.clone(), &SessionConfig::default());
        let client = session.client();
        let handle = tokio::spawn(session.run());

        client.set_pump(PowerState::On).await.unwrap();
        assert!(client.is_irrigating());
        assert_eq!(store.subscriber_count(), 3);

        client.end();
        handle.await.unwrap();

        assert!(client.is_ended());
        assert!(!client.is_irrigating());
        assert_eq!(store.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn threshold_load_gives_up_after_the_session_ended() {
        let store = MemoryStore::default();
        let session = GreenhouseSession::start(store.clone(), &SessionConfig::default());
        let client = session.client();
        let handle = tokio::spawn(session.run());

        client.end();
        handle.await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(2), client.load_thresholds()).await;
        assert!(result.expect("load should not wait past teardown").is_err());
    }
}
