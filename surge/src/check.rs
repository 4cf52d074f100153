//! Checks and request timing recorded against the running VU.
use metrics_util::AtomicBucket;
use std::future::Future;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, PoisonError, RwLock,
};
use std::time::{Duration, Instant};
use surge_core::CheckSummary;
#[allow(unused_imports)]
use tracing::{error, trace, warn};

/// Record a named check for the current iteration and return `passed`.
///
/// A failed check never aborts the iteration; it is only tallied for the run summary.
///
/// # Example
/// ```ignore
/// let res = surge::request(client.get(url).send()).await;
/// surge::check("status 200", matches!(&res, Ok(r) if r.status() == 200));
/// ```
pub fn check(label: &'static str, passed: bool) -> bool {
    if ITERATION_HOOK
        .try_with(|hook| hook.checks.record(label, passed))
        .is_err()
    {
        warn!("No hook available, check \"{label}\" not recorded.");
    }

    #[cfg(feature = "metrics")]
    metrics::counter!(
        surge_core::CHECKS,
        "check" => label,
        "outcome" => surge_core::check_outcome(passed)
    )
    .increment(1);

    passed
}

/// Await a request, recording its latency and whether it failed at the transport level.
pub async fn request<T, R, E>(fut: T) -> T::Output
where
    T: Future<Output = Result<R, E>>,
{
    let hook = ITERATION_HOOK.try_with(|v| v.clone());

    let start = Instant::now();
    let res = fut.await;
    let elapsed = start.elapsed();

    #[cfg(feature = "metrics")]
    {
        metrics::counter!(surge_core::HTTP_REQS).increment(1);
        metrics::histogram!(surge_core::HTTP_REQ_DURATION).record(elapsed.as_secs_f64());
        if res.is_err() {
            metrics::counter!(surge_core::HTTP_REQ_FAILED).increment(1);
        }
    }

    match hook {
        Ok(hook) => hook.record_request(elapsed, res.is_ok()),
        Err(_) => warn!("No hook available, request not recorded."),
    }

    res
}

/// Collects checks and requests for futures run inside [`Recorder::scope`].
///
/// The scenario runner uses one per run; it is also handy for exercising a single iteration.
#[derive(Clone)]
pub struct Recorder {
    data: HookData,
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            data: HookData::new(),
        }
    }

    pub async fn scope<F: Future>(&self, fut: F) -> F::Output {
        ITERATION_HOOK.scope(self.data.clone(), fut).await
    }

    pub fn checks(&self) -> Vec<CheckSummary> {
        self.data.checks.snapshot()
    }

    pub fn requests(&self) -> u64 {
        self.data.requests.load(Ordering::Relaxed)
    }

    pub fn failed_requests(&self) -> u64 {
        self.data.failed.load(Ordering::Relaxed)
    }

    pub(crate) fn hook_data(&self) -> &HookData {
        &self.data
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub(crate) struct HookData {
    pub checks: Arc<CheckRegistry>,
    pub requests: Arc<AtomicU64>,
    pub failed: Arc<AtomicU64>,
    pub latency: Arc<AtomicBucket<Duration>>,
}

impl HookData {
    fn new() -> Self {
        Self {
            checks: Arc::new(CheckRegistry::default()),
            requests: Arc::new(AtomicU64::new(0)),
            failed: Arc::new(AtomicU64::new(0)),
            latency: Arc::new(AtomicBucket::new()),
        }
    }

    fn record_request(&self, elapsed: Duration, ok: bool) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.latency.push(elapsed);
    }
}

tokio::task_local! {
    pub(crate) static ITERATION_HOOK: HookData;
}

/// Per-label check tallies, kept in first-seen order.
#[derive(Default)]
pub(crate) struct CheckRegistry {
    entries: RwLock<Vec<CheckEntry>>,
}

struct CheckEntry {
    label: &'static str,
    passes: AtomicU64,
    fails: AtomicU64,
}

impl CheckEntry {
    fn record(&self, passed: bool) {
        if passed {
            self.passes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.fails.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl CheckRegistry {
    pub fn record(&self, label: &'static str, passed: bool) {
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = entries.iter().find(|e| e.label == label) {
                entry.record(passed);
                return;
            }
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        // NOTE: Another VU may have registered the label between the two locks.
        if let Some(entry) = entries.iter().find(|e| e.label == label) {
            entry.record(passed);
        } else {
            trace!("Registering check \"{label}\"");
            let entry = CheckEntry {
                label,
                passes: AtomicU64::new(0),
                fails: AtomicU64::new(0),
            };
            entry.record(passed);
            entries.push(entry);
        }
    }

    pub fn snapshot(&self) -> Vec<CheckSummary> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|e| CheckSummary {
                label: e.label.to_string(),
                passes: e.passes.load(Ordering::Relaxed),
                fails: e.fails.load(Ordering::Relaxed),
            })
            .collect()
    }
}
