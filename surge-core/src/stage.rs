use crate::DEFAULT_START_VUS;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// One segment of a load ramp: move to `target` VUs over `duration`.
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub duration: Duration,
    pub target: usize,
}

impl Stage {
    pub const fn new(duration: Duration, target: usize) -> Self {
        Self { duration, target }
    }
}

#[derive(Debug, Error)]
pub enum StageParseError {
    #[error("stage \"{0}\" is not of the form <duration>:<target>")]
    MissingSeparator(String),

    #[error("stage \"{input}\" has an invalid duration: {source}")]
    Duration {
        input: String,
        #[source]
        source: humantime::DurationError,
    },

    #[error("stage \"{input}\" has an invalid target: {source}")]
    Target {
        input: String,
        #[source]
        source: ParseIntError,
    },
}

/// Parses `"<duration>:<target>"`, e.g. `"30s:20"` or `"2m:50"`.
impl FromStr for Stage {
    type Err = StageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (duration, target) = s
            .rsplit_once(':')
            .ok_or_else(|| StageParseError::MissingSeparator(s.to_string()))?;

        let duration = humantime::parse_duration(duration.trim()).map_err(|source| {
            StageParseError::Duration {
                input: s.to_string(),
                source,
            }
        })?;

        let target = target
            .trim()
            .parse()
            .map_err(|source| StageParseError::Target {
                input: s.to_string(),
                source,
            })?;

        Ok(Stage { duration, target })
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            humantime::format_duration(self.duration),
            self.target
        )
    }
}

/// Ordered stages forming a piecewise-linear VU-over-time profile.
///
/// The first stage ramps from `start_vus`; every following stage ramps from the target of the
/// stage before it. A zero-length stage jumps straight to its target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RampProfile {
    pub start_vus: usize,
    pub stages: Vec<Stage>,
}

impl Default for RampProfile {
    fn default() -> Self {
        Self {
            start_vus: DEFAULT_START_VUS,
            stages: vec![],
        }
    }
}

impl RampProfile {
    pub fn new(start_vus: usize, stages: Vec<Stage>) -> Self {
        Self { start_vus, stages }
    }

    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    pub fn max_target(&self) -> usize {
        self.stages
            .iter()
            .map(|s| s.target)
            .fold(self.start_vus, usize::max)
    }

    /// Number of VUs which should be running `elapsed` into the run, or `None` once the profile
    /// has finished.
    pub fn target_at(&self, elapsed: Duration) -> Option<usize> {
        let mut from = self.start_vus;
        let mut offset = elapsed;

        for stage in &self.stages {
            if offset < stage.duration {
                let progress = offset.as_secs_f64() / stage.duration.as_secs_f64();
                let vus = from as f64 + (stage.target as f64 - from as f64) * progress;
                return Some(vus.round() as usize);
            }
            offset -= stage.duration;
            from = stage.target;
        }

        None
    }
}
