mod config;
mod constants;
mod metrics;
mod stage;
mod stats;

pub use config::*;
pub use constants::*;
pub use metrics::*;
pub use stage::*;
pub use stats::*;
