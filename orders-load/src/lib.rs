//! Staged load test for the orders and user-auth API.
//!
//! Each iteration lists the caller's orders, fetches the first order's detail when there is
//! one, then fetches the authenticated user, checking for `200 OK` at every step.
pub mod config;
pub mod driver;
pub mod orders;

pub use config::{ConfigError, RunConfig};
pub use driver::{IterationDriver, IterationReport};

use std::time::Duration;
use surge::core::Stage;

/// Ramp up to 10 VUs, hold around 20, peak at 50, then ramp down.
pub const DEFAULT_STAGES: [Stage; 4] = [
    Stage::new(Duration::from_secs(10), 10),
    Stage::new(Duration::from_secs(30), 20),
    Stage::new(Duration::from_secs(120), 50),
    Stage::new(Duration::from_secs(10), 0),
];
