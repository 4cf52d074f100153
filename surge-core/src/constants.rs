use std::time::Duration;

/// How often the scenario runner re-evaluates the ramp and resizes the VU pool.
pub const CONTROL_INTERVAL: Duration = Duration::from_millis(100);

/// How often window counters are folded into the run measurement and progress is logged.
pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// Time in-flight iterations are given to finish once the final stage ends.
pub const DEFAULT_GRACEFUL_STOP: Duration = Duration::from_secs(30);

/// VU count the first stage ramps from.
pub const DEFAULT_START_VUS: usize = 1;
