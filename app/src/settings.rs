use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use infrastructure::{HttpServerConfig, MonitoringConfig};
use serde::Deserialize;

use crate::{actuator::ColdStartPolicy, adapter::firebase::FirebaseSettings, session::SessionConfig};

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub firebase: FirebaseSettings,
    #[serde(default)]
    pub paths: PathSettings,
    #[serde(default)]
    pub status: StatusSettings,
    #[serde(default)]
    pub irrigation: IrrigationSettings,
    pub http_server: HttpServerConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PathSettings {
    pub sensor_data: String,
    pub status: String,
    pub control: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct StatusSettings {
    pub cold_start: ColdStartPolicy,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IrrigationSettings {
    pub activity_window_ms: u64,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_config(
            Config::builder()
                .add_source(File::with_name("config.toml"))
                .add_source(Environment::with_prefix("GREENGUARD").separator("__"))
                .build()?,
        )
    }

    fn from_config(config: Config) -> Result<Self, ConfigError> {
        config.try_deserialize()
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            sensor_data_path: self.paths.sensor_data.clone(),
            status_path: self.paths.status.clone(),
            control_path: self.paths.control.clone(),
            cold_start: self.status.cold_start,
            activity_window: Duration::from_millis(self.irrigation.activity_window_ms),
        }
    }
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            sensor_data: "sensorData".to_owned(),
            status: "status".to_owned(),
            control: "control".to_owned(),
        }
    }
}

impl Default for IrrigationSettings {
    fn default() -> Self {
        Self {
            activity_window_ms: 3000,
        }
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    const MINIMAL: &str = r#"
        [firebase]
        database_url = "https://greenhouse.firebaseio.com"
        api_key = "api-key"

        [http_server]
        port = 8080

        [monitoring]
        service_name = "greenguard"
        app_name = "greenguard"

        [monitoring.logs]
        default_level = "info"

        [monitoring.traces]
        default_level = "info"
    "#;

    fn parse(toml: &str) -> Settings {
        Settings::from_config(
            Config::builder()
                .add_source(File::from_str(toml, FileFormat::Toml))
                .build()
                .unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn defaults_match_the_greenhouse_layout() {
        let settings = parse(MINIMAL);
        let session = settings.session_config();

        assert_eq!(session.sensor_data_path, "sensorData");
        assert_eq!(session.status_path, "status");
        assert_eq!(session.control_path, "control");
        assert_eq!(session.cold_start, ColdStartPolicy::Suppress);
        assert_eq!(session.activity_window, Duration::from_millis(3000));
        assert_eq!(settings.firebase.identity_url, "https://identitytoolkit.googleapis.com/v1");
        assert_eq!(settings.firebase.email, None);
    }

    #[test]
    fn cold_start_and_window_are_configurable() {
        let toml = format!(
            "{}\n[status]\ncold_start = \"assume_off\"\n[irrigation]\nactivity_window_ms = 1500\n",
            MINIMAL
        );

        let session = parse(&toml).session_config();

        assert_eq!(session.cold_start, ColdStartPolicy::AssumeOff);
        assert_eq!(session.activity_window, Duration::from_millis(1500));
    }
}
