use crate::check::{HookData, Recorder};
use crate::measurement::Window;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use surge_core::CheckSummary;

/// Counters shared between the scenario runner and every VU task.
pub(crate) struct TaskAtomics {
    recorder: Recorder,
    iterations: Arc<AtomicU64>,
}

impl TaskAtomics {
    pub fn new() -> Self {
        Self {
            recorder: Recorder::new(),
            iterations: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn clone_to_hook_data(&self) -> HookData {
        self.recorder.hook_data().clone()
    }

    pub fn iterations(&self) -> Arc<AtomicU64> {
        self.iterations.clone()
    }

    /// Drain the request and iteration counters accumulated since the previous call.
    pub fn collect(&self, elapsed: Duration) -> Window {
        let hook = self.recorder.hook_data();
        let requests = hook.requests.swap(0, Ordering::Relaxed);
        let failed = hook.failed.swap(0, Ordering::Relaxed);
        let iterations = self.iterations.swap(0, Ordering::Relaxed);
        let mut latency = vec![];
        hook.latency.clear_with(|dur| latency.extend_from_slice(dur));

        Window {
            requests,
            failed,
            iterations,
            elapsed,
            latency,
        }
    }

    /// Check tallies are cumulative over the whole run.
    pub fn checks(&self) -> Vec<CheckSummary> {
        self.recorder.checks()
    }
}
