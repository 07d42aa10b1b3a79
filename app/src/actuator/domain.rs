use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::core::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Actuator {
    Pump,
    Buzzer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerState {
    #[serde(rename = "ON")]
    On,
    #[serde(rename = "OFF")]
    Off,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActuatorStatus {
    pub pump: Option<PowerState>,
    pub buzzer: Option<PowerState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub actuator: Actuator,
    pub state: PowerState,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColdStartPolicy {
    /// First observation of a field is adopted without a transition.
    #[default]
    Suppress,
    /// Both fields start as OFF, a differing first observation is a transition.
    AssumeOff,
}

impl Actuator {
    //decode order of a status snapshot
    pub fn variants() -> [Actuator; 2] {
        [Actuator::Buzzer, Actuator::Pump]
    }

    pub fn field(&self) -> &'static str {
        match self {
            Actuator::Pump => "pump",
            Actuator::Buzzer => "buzzer",
        }
    }
}

impl Display for Actuator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actuator::Pump => write!(f, "Pump"),
            Actuator::Buzzer => write!(f, "Buzzer"),
        }
    }
}

impl PowerState {
    pub fn is_on(self) -> bool {
        Self::On == self
    }

    pub fn toggled(self) -> Self {
        match self {
            PowerState::On => PowerState::Off,
            PowerState::Off => PowerState::On,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PowerState::On => "ON",
            PowerState::Off => "OFF",
        }
    }
}

impl From<PowerState> for f64 {
    fn from(value: PowerState) -> Self {
        match value {
            PowerState::On => 1.0,
            PowerState::Off => 0.0,
        }
    }
}

impl Display for PowerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ActuatorStatus {
    pub fn off() -> Self {
        Self {
            pump: Some(PowerState::Off),
            buzzer: Some(PowerState::Off),
        }
    }

    //fields that are missing or hold anything but "ON"/"OFF" decode to None
    pub fn decode(snapshot: &Snapshot) -> Self {
        let field = |actuator: Actuator| {
            let value = snapshot.get(actuator.field())?;
            match PowerState::deserialize(value) {
                Ok(state) => Some(state),
                Err(_) => {
                    tracing::debug!("Skipping invalid {} state in status snapshot: {}", actuator, value);
                    None
                }
            }
        };

        Self {
            pump: field(Actuator::Pump),
            buzzer: field(Actuator::Buzzer),
        }
    }

    pub fn get(&self, actuator: Actuator) -> Option<PowerState> {
        match actuator {
            Actuator::Pump => self.pump,
            Actuator::Buzzer => self.buzzer,
        }
    }

    pub fn set(&mut self, actuator: Actuator, state: PowerState) {
        match actuator {
            Actuator::Pump => self.pump = Some(state),
            Actuator::Buzzer => self.buzzer = Some(state),
        }
    }
}

impl ColdStartPolicy {
    pub fn baseline(&self) -> ActuatorStatus {
        match self {
            ColdStartPolicy::Suppress => ActuatorStatus::default(),
            ColdStartPolicy::AssumeOff => ActuatorStatus::off(),
        }
    }
}

impl Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} turned {}", self.actuator, self.state)
    }
}
