use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

use crate::core::Snapshot;

/// Advisory thresholds enforced by the greenhouse controller. Always written as a
/// whole object, values are stored as given without range checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdConfig {
    pub soil_threshold: i64,
    pub temperature: i64,
    pub water_threshold: i64,
    pub air_humidity: i64,
}

/// Free-text form of [`ThresholdConfig`] as entered by an operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdInput {
    pub soil_threshold: String,
    pub temperature: String,
    pub water_threshold: String,
    pub air_humidity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("{field} must be a whole number, got '{value}'")]
pub struct ValidationError {
    pub field: &'static str,
    pub value: String,
}

impl ThresholdConfig {
    pub fn decode(snapshot: &Snapshot) -> Option<Self> {
        if snapshot.is_null() {
            return None;
        }

        match ThresholdConfig::deserialize(snapshot) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::debug!("Skipping invalid threshold snapshot {}: {}", snapshot, e);
                None
            }
        }
    }
}

//values shown before the first remote config arrives
impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            soil_threshold: 40,
            temperature: 25,
            water_threshold: 30,
            air_humidity: 60,
        }
    }
}

impl ThresholdInput {
    pub fn parse(&self) -> Result<ThresholdConfig, ValidationError> {
        Ok(ThresholdConfig {
            soil_threshold: parse_field("soilThreshold", &self.soil_threshold)?,
            temperature: parse_field("temperature", &self.temperature)?,
            water_threshold: parse_field("waterThreshold", &self.water_threshold)?,
            air_humidity: parse_field("airHumidity", &self.air_humidity)?,
        })
    }
}

impl From<&ThresholdConfig> for ThresholdInput {
    fn from(config: &ThresholdConfig) -> Self {
        Self {
            soil_threshold: config.soil_threshold.to_string(),
            temperature: config.temperature.to_string(),
            water_threshold: config.water_threshold.to_string(),
            air_humidity: config.air_humidity.to_string(),
        }
    }
}

fn parse_field(field: &'static str, value: &str) -> Result<i64, ValidationError> {
    value.trim().parse().map_err(|_| ValidationError {
        field,
        value: value.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use assert_json_diff::assert_json_eq;
    use serde_json::json;

    use super::*;

    fn input(soil: &str, temperature: &str, water: &str, air: &str) -> ThresholdInput {
        ThresholdInput {
            soil_threshold: soil.to_owned(),
            temperature: temperature.to_owned(),
            water_threshold: water.to_owned(),
            air_humidity: air.to_owned(),
        }
    }

    #[test]
    fn parses_display_values() {
        let config = input("35", " 28 ", "20", "65").parse().unwrap();

        assert_json_eq!(
            serde_json::to_value(config).unwrap(),
            json!({"soilThreshold": 35, "temperature": 28, "waterThreshold": 20, "airHumidity": 65})
        );
    }

    #[test]
    fn negative_values_are_accepted() {
        let config = input("-5", "120", "0", "-1").parse().unwrap();

        assert_eq!(config.soil_threshold, -5);
        assert_eq!(config.temperature, 120);
        assert_eq!(config.air_humidity, -1);
    }

    #[test]
    fn non_numeric_value_is_rejected() {
        let result = input("40", "warm", "30", "60").parse();

        assert_eq!(
            result,
            Err(ValidationError {
                field: "temperature",
                value: "warm".to_owned()
            })
        );
        assert_eq!(
            result.unwrap_err().to_string(),
            "temperature must be a whole number, got 'warm'"
        );
    }

    #[test]
    fn partial_config_is_not_decoded() {
        assert_eq!(ThresholdConfig::decode(&json!({"temperature": 25})), None);
        assert_eq!(ThresholdConfig::decode(&Snapshot::Null), None);
    }

    #[test]
    fn input_roundtrips_through_display_form() {
        let config = ThresholdConfig::default();

        assert_eq!(ThresholdInput::from(&config).parse(), Ok(config));
    }
}
