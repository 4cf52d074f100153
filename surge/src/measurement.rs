use pdatastructs::tdigest::{TDigest, K1};
use std::fmt;
use std::time::Duration;
use tracing::error;

const TDIGEST_BACKLOG_SIZE: usize = 100;

/// Counters drained from the VUs over one progress interval.
#[derive(Debug, Clone)]
pub(crate) struct Window {
    pub requests: u64,
    pub failed: u64,
    pub iterations: u64,
    pub elapsed: Duration,
    pub latency: Vec<Duration>,
}

impl Window {
    pub fn request_rate(&self) -> f64 {
        per_second(self.requests, self.elapsed)
    }

    pub fn iteration_rate(&self) -> f64 {
        per_second(self.iterations, self.elapsed)
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "iterations/s={:.2}, reqs/s={:.2}, failed={}",
            self.iteration_rate(),
            self.request_rate(),
            self.failed,
        )
    }
}

/// Run-wide totals built up from successive windows.
#[derive(Debug, Clone)]
pub(crate) struct Measurement {
    pub requests: u64,
    pub failed: u64,
    pub iterations: u64,
    samples: usize,
    latency: TDigest<K1>,
}

impl Measurement {
    pub fn new() -> Self {
        Self {
            requests: 0,
            failed: 0,
            iterations: 0,
            samples: 0,
            latency: default_tdigest(),
        }
    }

    pub fn push(&mut self, window: &Window) {
        self.requests += window.requests;
        self.failed += window.failed;
        self.iterations += window.iterations;
        self.samples += window.latency.len();
        for latency in &window.latency {
            self.latency.insert(latency.as_secs_f64());
        }
    }

    pub fn latency(&self, quantile: f64) -> Duration {
        if self.samples == 0 {
            return Duration::ZERO;
        }

        let secs = self.latency.quantile(quantile);

        // NOTE: TDigest can return NaN for sparse digests.
        let secs = if secs.is_finite() && secs >= 0. {
            secs
        } else {
            error!("Non-finite latency quantile {quantile}; reporting zero.");
            0.
        };

        Duration::from_secs_f64(secs)
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "requests={}, failed={}, iterations={}, p50={:?}, p90={:?}, p99={:?}",
            self.requests,
            self.failed,
            self.iterations,
            self.latency(0.5),
            self.latency(0.90),
            self.latency(0.99),
        )
    }
}

fn default_tdigest() -> TDigest<K1> {
    TDigest::new(K1::new(10.), TDIGEST_BACKLOG_SIZE)
}

fn per_second(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0. {
        count as f64 / secs
    } else {
        0.
    }
}
