use crate::{RampProfile, Stage, DEFAULT_GRACEFUL_STOP};
use std::time::Duration;

#[doc(hidden)]
#[derive(Clone, Debug)]
pub struct ScenarioConfig {
    pub name: String,
    pub profile: RampProfile,
    pub graceful_stop: Duration,
}

impl ScenarioConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            profile: RampProfile::default(),
            graceful_stop: DEFAULT_GRACEFUL_STOP,
        }
    }

    pub fn push_stage(&mut self, stage: Stage) {
        self.profile.stages.push(stage);
    }

    pub fn total_duration(&self) -> Duration {
        self.profile.total_duration()
    }
}
