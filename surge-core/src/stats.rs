use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds, DurationMilliSecondsWithFrac};
use std::fmt;
use std::time::Duration;

/// Pass/fail tally for a single check label.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSummary {
    pub label: String,
    pub passes: u64,
    pub fails: u64,
}

impl CheckSummary {
    pub fn total(&self) -> u64 {
        self.passes + self.fails
    }

    pub fn pass_rate(&self) -> f64 {
        rate(self.passes, self.total())
    }
}

/// Statistics for a completed staged run.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunStatistics {
    pub name: String,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub duration: Duration,
    pub iterations: u64,
    pub interrupted_iterations: u64,
    /// Peak VUs running at once, including VUs finishing their last iteration after a scale-down.
    pub max_vus: usize,
    pub http_reqs: u64,
    pub http_req_failed: u64,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub latency_p50: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub latency_p90: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub latency_p95: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub latency_p99: Duration,
    pub checks: Vec<CheckSummary>,
}

impl RunStatistics {
    pub fn check(&self, label: &str) -> Option<&CheckSummary> {
        self.checks.iter().find(|c| c.label == label)
    }

    pub fn checks_passed(&self) -> u64 {
        self.checks.iter().map(|c| c.passes).sum()
    }

    pub fn checks_total(&self) -> u64 {
        self.checks.iter().map(CheckSummary::total).sum()
    }

    pub fn checks_pass_rate(&self) -> f64 {
        rate(self.checks_passed(), self.checks_total())
    }

    pub fn http_req_failed_rate(&self) -> f64 {
        rate(self.http_req_failed, self.http_reqs)
    }

    pub fn iteration_rate(&self) -> f64 {
        per_second(self.iterations, self.duration)
    }

    pub fn http_req_rate(&self) -> f64 {
        per_second(self.http_reqs, self.duration)
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "scenario: {}", self.name)?;
        writeln!(
            f,
            "  duration..........: {} (max {} VUs)",
            humantime::format_duration(Duration::from_millis(self.duration.as_millis() as u64)),
            self.max_vus
        )?;
        writeln!(
            f,
            "  iterations........: {} ({:.2}/s), {} interrupted",
            self.iterations,
            self.iteration_rate(),
            self.interrupted_iterations
        )?;
        writeln!(
            f,
            "  http_reqs.........: {} ({:.2}/s), {:.2}% failed",
            self.http_reqs,
            self.http_req_rate(),
            self.http_req_failed_rate() * 100.
        )?;
        writeln!(
            f,
            "  http_req_duration.: p50={:?} p90={:?} p95={:?} p99={:?}",
            self.latency_p50, self.latency_p90, self.latency_p95, self.latency_p99
        )?;
        write!(
            f,
            "  checks............: {:.2}% ({} of {})",
            self.checks_pass_rate() * 100.,
            self.checks_passed(),
            self.checks_total()
        )?;
        for check in &self.checks {
            let mark = if check.fails == 0 { '✓' } else { '✗' };
            write!(
                f,
                "\n    {mark} {} ({} passed, {} failed)",
                check.label, check.passes, check.fails
            )?;
        }
        Ok(())
    }
}

fn rate(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.
    } else {
        part as f64 / total as f64
    }
}

fn per_second(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0. {
        count as f64 / secs
    } else {
        0.
    }
}
