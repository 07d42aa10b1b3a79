use super::{Actuator, ActuatorStatus, ColdStartPolicy, Transition};

/// Per-field diff of consecutive status snapshots.
pub struct StatusTracker {
    last_known: ActuatorStatus,
}

impl StatusTracker {
    pub fn new(policy: ColdStartPolicy) -> Self {
        Self {
            last_known: policy.baseline(),
        }
    }

    pub fn last_known(&self) -> ActuatorStatus {
        self.last_known
    }

    pub fn apply(&mut self, observed: &ActuatorStatus) -> Vec<Transition> {
        let mut transitions = vec![];

        for actuator in Actuator::variants() {
            //undecodable fields keep their last known value
            let Some(state) = observed.get(actuator) else {
                continue;
            };

            match self.last_known.get(actuator) {
                Some(known) if known == state => continue,
                Some(_) => transitions.push(Transition { actuator, state }),
                None => tracing::debug!("Initial {} state observed: {}", actuator, state),
            }

            self.last_known.set(actuator, state);
        }

        transitions
    }
}
