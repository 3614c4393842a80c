//! Bounded fan-out / fan-in over a fixed set of work items.
//!
//! Every item runs as its own tokio task (so items execute in parallel on the
//! multi-threaded runtime), gated by a per-run semaphore and optionally by a
//! process-wide one shared across runs. Results come back in input order, not
//! completion order. A panicking item is reported as [`TaskAborted`] in its
//! own slot and never disturbs its siblings. Dropping the returned future
//! aborts all outstanding items.

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

use super::worker::GridWorker;
use crate::config::defaults::GRID_CONCURRENCY;
use crate::types::{GridResult, GridTask, TileFailure, TileOutcome};

/// An item whose task panicked or was cancelled before producing a result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("task aborted: {0}")]
pub struct TaskAborted(pub String);

/// Order-preserving, semaphore-gated task pool.
#[derive(Debug, Clone)]
pub struct FanOut {
    limit: usize,
    shared_permits: Option<Arc<Semaphore>>,
}

impl FanOut {
    /// At most `limit` items of one run are in flight at a time (minimum 1).
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            shared_permits: None,
        }
    }

    /// Additionally hold a permit from `permits` while each item runs.
    pub fn with_shared_permits(mut self, permits: Arc<Semaphore>) -> Self {
        self.shared_permits = Some(permits);
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Run `work` over every item and wait for all of them.
    pub async fn run<T, R, F, Fut>(&self, items: Vec<T>, work: F) -> Vec<Result<R, TaskAborted>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let count = items.len();
        let work = Arc::new(work);
        let local_permits = Arc::new(Semaphore::new(self.limit));
        let mut set = JoinSet::new();

        for (idx, item) in items.into_iter().enumerate() {
            let work = Arc::clone(&work);
            let local_permits = Arc::clone(&local_permits);
            let shared_permits = self.shared_permits.clone();

            set.spawn(async move {
                let _local = local_permits.acquire_owned().await.ok();
                let _shared = match shared_permits {
                    Some(permits) => permits.acquire_owned().await.ok(),
                    None => None,
                };
                let outcome = AssertUnwindSafe((*work)(item))
                    .catch_unwind()
                    .await
                    .map_err(|panic| TaskAborted(panic_message(panic.as_ref())));
                (idx, outcome)
            });
        }

        let mut slots: Vec<Option<Result<R, TaskAborted>>> = (0..count).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, outcome)) => slots[idx] = Some(outcome),
                Err(e) => warn!(error = %e, "Fan-out task did not complete"),
            }
        }

        slots
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| Err(TaskAborted("task did not complete".to_string()))))
            .collect()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

// ============================================================================
// Grid Scheduler
// ============================================================================

/// Runs one grid worker per task with the grid's concurrency bound.
#[derive(Clone)]
pub struct GridScheduler {
    worker: Arc<GridWorker>,
    fan_out: FanOut,
}

impl GridScheduler {
    pub fn new(worker: GridWorker) -> Self {
        Self {
            worker: Arc::new(worker),
            fan_out: FanOut::new(GRID_CONCURRENCY),
        }
    }

    /// Share a process-wide tile permit pool with every other scheduler
    /// holding the same semaphore.
    pub fn with_shared_permits(mut self, permits: Arc<Semaphore>) -> Self {
        self.fan_out = self.fan_out.with_shared_permits(permits);
        self
    }

    pub fn worker(&self) -> &GridWorker {
        &self.worker
    }

    /// One result per task, in task order. Never returns early.
    pub async fn run_grid(&self, tasks: &[GridTask]) -> Vec<GridResult> {
        let worker = Arc::clone(&self.worker);
        let outcomes = self
            .fan_out
            .run(tasks.to_vec(), move |task| {
                let worker = Arc::clone(&worker);
                async move { worker.run(task).await }
            })
            .await;

        tasks
            .iter()
            .zip(outcomes)
            .map(|(task, outcome)| {
                outcome.unwrap_or_else(|aborted| {
                    warn!(label = %task.label, error = %aborted, "Tile worker aborted");
                    GridResult::from_outcome(
                        task,
                        TileOutcome::Failed {
                            reason: TileFailure::Aborted(aborted.0),
                        },
                    )
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_results_follow_input_order() {
        // Later items finish first.
        let items: Vec<u64> = (0..9).collect();
        let results = FanOut::new(9)
            .run(items, |i| async move {
                tokio::time::sleep(Duration::from_millis((9 - i) * 10)).await;
                i * 2
            })
            .await;

        let values: Vec<u64> = results.into_iter().map(Result::unwrap).collect();
        assert_eq!(values, (0..9).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_panic_is_isolated() {
        let results = FanOut::new(3)
            .run(vec![1, 2, 3], |i| async move {
                assert!(i != 2, "boom on two");
                i
            })
            .await;

        assert_eq!(results[0], Ok(1));
        assert!(matches!(&results[1], Err(TaskAborted(msg)) if msg.contains("boom on two")));
        assert_eq!(results[2], Ok(3));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_limit_bounds_in_flight() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (f, p) = (Arc::clone(&in_flight), Arc::clone(&peak));
        FanOut::new(2)
            .run((0..8).collect::<Vec<u32>>(), move |_| {
                let (in_flight, peak) = (Arc::clone(&f), Arc::clone(&p));
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                }
            })
            .await;

        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_shared_permits_bound_across_runs() {
        let shared = Arc::new(Semaphore::new(3));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let make_run = || {
            let fan_out = FanOut::new(9).with_shared_permits(Arc::clone(&shared));
            let (f, p) = (Arc::clone(&in_flight), Arc::clone(&peak));
            async move {
                fan_out
                    .run((0..6).collect::<Vec<u32>>(), move |_| {
                        let (in_flight, peak) = (Arc::clone(&f), Arc::clone(&p));
                        async move {
                            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            in_flight.fetch_sub(1, Ordering::SeqCst);
                        }
                    })
                    .await
            }
        };

        let (a, b) = tokio::join!(make_run(), make_run());
        assert_eq!(a.len() + b.len(), 12);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_zero_limit_still_makes_progress() {
        let results = FanOut::new(0).run(vec![7], |i| async move { i }).await;
        assert_eq!(results, vec![Ok(7)]);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let results: Vec<Result<u8, TaskAborted>> =
            FanOut::new(4).run(Vec::<u8>::new(), |i| async move { i }).await;
        assert!(results.is_empty());
    }
}
