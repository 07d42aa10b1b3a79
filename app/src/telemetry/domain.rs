use serde::{Deserialize, Serialize};

use crate::core::{
    Snapshot,
    unit::{DegreeCelsius, Percent},
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    pub temperature: DegreeCelsius,
    pub humidity: Percent,
    pub soil_moisture: Percent,
    pub water_level: Percent,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SensorDataPayload {
    temperature: f64,
    humidity: f64,
    soil_moisture: f64,
    water_level: f64,
}

impl SensorReading {
    //partial or malformed snapshots are not an error, there is just nothing to publish
    pub fn decode(snapshot: &Snapshot) -> Option<Self> {
        let payload = SensorDataPayload::deserialize(snapshot).ok()?;

        Some(Self {
            temperature: DegreeCelsius(payload.temperature),
            humidity: Percent(payload.humidity),
            soil_moisture: Percent(payload.soil_moisture),
            water_level: Percent(payload.water_level),
        })
    }
}
