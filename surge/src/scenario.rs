//! Staged scenario runner
use crate::measurement::Measurement;
use crate::task_atomics::TaskAtomics;
use crate::timer::Timer;
use crate::vu_pool::VuPool;
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::{Duration, Instant},
};
use surge_core::{RunStatistics, ScenarioConfig, Stage, CONTROL_INTERVAL, PROGRESS_INTERVAL};
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn};

/// Load test scenario structure
///
/// Runs an iteration function on a ramping number of virtual users. Awaiting the scenario runs
/// every stage and resolves to the [`RunStatistics`] of the run.
#[pin_project::pin_project]
pub struct Scenario<T> {
    func: T,
    runner_fut: Option<Pin<Box<dyn Future<Output = RunStatistics> + Send>>>,
    config: ScenarioConfig,
}

impl<T> Scenario<T> {
    pub fn new(name: &str, func: T) -> Self {
        Self {
            func,
            runner_fut: None,
            config: ScenarioConfig::new(name),
        }
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }
}

impl<T, F> Future for Scenario<T>
where
    T: Fn() -> F + Send + 'static + Clone + Sync,
    F: Future<Output = ()> + Send,
{
    type Output = RunStatistics;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.runner_fut.is_none() {
            let func = self.func.clone();
            let config = self.config.clone();
            self.runner_fut = Some(Box::pin(async move { run_scenario(func, config).await }));
        }

        if let Some(runner) = &mut self.runner_fut {
            runner.as_mut().poll(cx)
        } else {
            unreachable!()
        }
    }
}

pub trait ConfigurableScenario<T: Send>: Future<Output = T> + Sized + Send {
    fn stages<I: IntoIterator<Item = Stage>>(self, stages: I) -> Self;
    fn stage(self, duration: Duration, target: usize) -> Self;
    fn start_vus(self, vus: usize) -> Self;
    fn graceful_stop(self, graceful_stop: Duration) -> Self;
}

impl<T, F> ConfigurableScenario<RunStatistics> for Scenario<T>
where
    T: Fn() -> F + Send + 'static + Clone + Sync,
    F: Future<Output = ()> + Send,
{
    /// Replace the ramp with the given stages, run in order.
    ///
    /// # Example
    /// ```ignore
    /// use surge::prelude::*;
    /// use std::time::Duration;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     Scenario::new("ramp", my_iteration)
    ///         .stages([
    ///             Stage::new(Duration::from_secs(10), 10),
    ///             Stage::new(Duration::from_secs(10), 0),
    ///         ])
    ///         .await;
    /// }
    ///
    /// async fn my_iteration() {
    /// }
    /// ```
    fn stages<I: IntoIterator<Item = Stage>>(mut self, stages: I) -> Self {
        self.config.profile.stages = stages.into_iter().collect();
        self
    }

    /// Append a single stage to the ramp.
    fn stage(mut self, duration: Duration, target: usize) -> Self {
        self.config.push_stage(Stage::new(duration, target));
        self
    }

    /// VU count the first stage ramps from.
    fn start_vus(mut self, vus: usize) -> Self {
        self.config.profile.start_vus = vus;
        self
    }

    /// How long in-flight iterations may run once the last stage has ended.
    fn graceful_stop(mut self, graceful_stop: Duration) -> Self {
        self.config.graceful_stop = graceful_stop;
        self
    }
}

#[instrument(name = "scenario", skip_all, fields(name = config.name))]
pub(crate) async fn run_scenario<T, F>(scenario: T, config: ScenarioConfig) -> RunStatistics
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = ()> + Send,
{
    info!("Running {} with config {:?}", config.name, &config);

    let atomics = Arc::new(TaskAtomics::new());
    let mut pool = VuPool::new(scenario, atomics.clone());
    let mut measurement = Measurement::new();
    let mut max_vus = 0;

    let start = Instant::now();
    let mut timer = Timer::new(CONTROL_INTERVAL).await;
    let mut since_progress = Duration::ZERO;

    while let Some(target) = config.profile.target_at(start.elapsed()) {
        if target != pool.concurrency() {
            debug!("Scaling VUs from {} to {target}", pool.concurrency());
        }
        pool.set_concurrency(target);
        // Retiring VUs are still mid-iteration and count towards the peak.
        max_vus = max_vus.max(pool.concurrency() + pool.retiring());

        #[cfg(feature = "metrics")]
        metrics::gauge!(surge_core::VUS).set(pool.concurrency() as f64);

        since_progress += timer.tick().await;
        if since_progress >= PROGRESS_INTERVAL {
            let window = atomics.collect(since_progress);
            info!("vus={} {window}", pool.concurrency());
            measurement.push(&window);
            since_progress = Duration::ZERO;
        }
    }

    debug!(
        "Final stage complete, stopping VUs (graceful stop {})",
        humantime::format_duration(config.graceful_stop)
    );
    let interrupted_iterations = pool.shutdown(config.graceful_stop).await;
    measurement.push(&atomics.collect(since_progress));

    #[cfg(feature = "metrics")]
    metrics::gauge!(surge_core::VUS).set(0.);

    let duration = start.elapsed();
    info!("Scenario complete: {measurement}");

    RunStatistics {
        name: config.name.clone(),
        duration,
        iterations: measurement.iterations,
        interrupted_iterations,
        max_vus,
        http_reqs: measurement.requests,
        http_req_failed: measurement.failed,
        latency_p50: measurement.latency(0.50),
        latency_p90: measurement.latency(0.90),
        latency_p95: measurement.latency(0.95),
        latency_p99: measurement.latency(0.99),
        checks: atomics.checks(),
    }
}
