#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod check;
pub mod scenario;

pub(crate) mod measurement;
pub(crate) mod task_atomics;
pub(crate) mod timer;
pub(crate) mod vu_pool;

pub use check::{check, request, Recorder};
pub use scenario::{ConfigurableScenario, Scenario};
pub use surge_core as core;

pub mod prelude {
    pub use crate::check::{check, request, Recorder};
    pub use crate::scenario::{ConfigurableScenario, Scenario};
    pub use surge_core::{CheckSummary, RampProfile, RunStatistics, Stage};
}
