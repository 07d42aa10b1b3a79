use infrastructure::{EventListener, meter};
use tokio_util::sync::CancellationToken;

use crate::{actuator::Transition, telemetry::SensorReading};

/// Mirrors the latest greenhouse state into gauges.
pub struct ObservabilityModule {
    readings: EventListener<SensorReading>,
    transitions: EventListener<Transition>,
}

impl ObservabilityModule {
    pub fn new(readings: EventListener<SensorReading>, transitions: EventListener<Transition>) -> Self {
        Self { readings, transitions }
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,

                reading = self.readings.recv() => match reading {
                    Some(reading) => record_reading(&reading),
                    None => break,
                },

                transition = self.transitions.recv() => match transition {
                    Some(transition) => record_transition(&transition),
                    None => break,
                },
            }
        }

        tracing::debug!("Observability module stopped");
    }
}

fn record_reading(reading: &SensorReading) {
    meter::set("greenhouse_temperature", reading.temperature.into(), &[]);
    meter::set("greenhouse_humidity", reading.humidity.into(), &[]);
    meter::set("greenhouse_soil_moisture", reading.soil_moisture.into(), &[]);
    meter::set("greenhouse_water_level", reading.water_level.into(), &[]);
}

fn record_transition(transition: &Transition) {
    meter::set(
        "actuator_state",
        transition.state.into(),
        &[("actuator", transition.actuator.field())],
    );
}
