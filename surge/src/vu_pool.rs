use crate::check::ITERATION_HOOK;
use crate::task_atomics::TaskAtomics;
use std::future::Future;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

struct Vu {
    handle: JoinHandle<()>,
    stop: Arc<AtomicBool>,
}

/// A resizable set of virtual users, each looping over the iteration function.
///
/// Shrinking the pool never cuts an iteration short: surplus VUs finish the iteration they are
/// in and then exit. Only [`VuPool::shutdown`] aborts, once the graceful stop has run out.
pub(crate) struct VuPool<T> {
    iteration: T,
    atomics: Arc<TaskAtomics>,
    active: Vec<Vu>,
    retiring: Vec<JoinHandle<()>>,
}

impl<T, F> VuPool<T>
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = ()> + Send,
{
    pub fn new(iteration: T, atomics: Arc<TaskAtomics>) -> Self {
        Self {
            iteration,
            atomics,
            active: vec![],
            retiring: vec![],
        }
    }

    pub fn set_concurrency(&mut self, concurrency: usize) {
        self.retiring.retain(|handle| !handle.is_finished());

        let before = self.active.len();
        self.active.retain(|vu| !vu.handle.is_finished());
        if self.active.len() < before {
            warn!("{} VU(s) exited unexpectedly; respawning.", before - self.active.len());
        }

        if self.active.len() > concurrency {
            for vu in self.active.drain(concurrency..) {
                vu.stop.store(true, Ordering::Relaxed);
                self.retiring.push(vu.handle);
            }
        } else {
            while self.active.len() < concurrency {
                let vu = self.spawn_vu();
                self.active.push(vu);
            }
        }
    }

    pub fn concurrency(&self) -> usize {
        self.active.len()
    }

    pub fn retiring(&self) -> usize {
        self.retiring.len()
    }

    /// Stop every VU, waiting up to `graceful_stop` for in-flight iterations. Returns the number
    /// of iterations which had to be aborted.
    pub async fn shutdown(mut self, graceful_stop: Duration) -> u64 {
        self.set_concurrency(0);

        let deadline = Instant::now() + graceful_stop;
        let mut interrupted = 0;
        for mut handle in self.retiring.drain(..) {
            match timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => error!("VU task failed: {err}"),
                Err(_) => {
                    handle.abort();
                    interrupted += 1;
                }
            }
        }

        if interrupted > 0 {
            warn!("Graceful stop elapsed; interrupted {interrupted} iteration(s).");
        }
        interrupted
    }

    fn spawn_vu(&self) -> Vu {
        let iteration = self.iteration.clone();
        let iterations = self.atomics.iterations();
        let stop = Arc::new(AtomicBool::new(false));
        let vu_stop = stop.clone();

        let handle = tokio::spawn(ITERATION_HOOK.scope(
            self.atomics.clone_to_hook_data(),
            async move {
                while !vu_stop.load(Ordering::Relaxed) {
                    iteration().await;
                    iterations.fetch_add(1, Ordering::Relaxed);

                    #[cfg(feature = "metrics")]
                    metrics::counter!(surge_core::ITERATIONS).increment(1);
                }
            },
        ));

        Vu { handle, stop }
    }
}
