//! Deferred callback scheduling
//!
//! The panel schedules its transition-window boundaries as one-shot
//! tasks to run at an absolute point in time. [`TokioScheduler`] runs
//! them on spawned tokio tasks; [`ManualScheduler`] queues them for
//! tests to release explicitly. Staleness is handled by the panel
//! itself (generation counters), so neither implementation needs a
//! cancellation API: superseded tasks fire and do nothing.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use std::sync::Mutex;
use tracing::trace;

/// A one-shot deferred task
pub type ScheduledTask = BoxFuture<'static, ()>;

/// Schedules a task to run at or after an absolute point in time
pub trait Scheduler: Send + Sync {
    /// Schedule `task` to run at or after `at`
    ///
    /// A time in the past means "run as soon as possible".
    fn schedule(&self, at: DateTime<Utc>, task: ScheduledTask);
}

/// Scheduler that spawns a sleeping tokio task per callback
///
/// Must be used from within a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule(&self, at: DateTime<Utc>, task: ScheduledTask) {
        tokio::spawn(async move {
            let delay = (at - Utc::now()).to_std().unwrap_or_default();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            task.await;
        });
    }
}

/// Test scheduler that holds tasks until released
///
/// Tasks accumulate in arrival order; [`ManualScheduler::run_due`]
/// executes everything scheduled at or before the given time, in
/// scheduled order. Tasks may schedule further tasks while running.
#[derive(Default)]
pub struct ManualScheduler {
    queue: Mutex<Vec<(DateTime<Utc>, ScheduledTask)>>,
}

impl ManualScheduler {
    /// Create an empty scheduler
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting to run
    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    /// Run every task due at or before `now`, in scheduled order
    pub async fn run_due(&self, now: DateTime<Utc>) {
        loop {
            let next = {
                let mut queue = self.queue.lock().unwrap();
                // Earliest due task first; stable for equal times
                let due_idx = queue
                    .iter()
                    .enumerate()
                    .filter(|(_, (at, _))| *at <= now)
                    .min_by_key(|(idx, (at, _))| (*at, *idx))
                    .map(|(idx, _)| idx);
                due_idx.map(|idx| queue.remove(idx))
            };

            match next {
                Some((at, task)) => {
                    trace!(%at, "releasing scheduled task");
                    task.await;
                }
                None => break,
            }
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, at: DateTime<Utc>, task: ScheduledTask) {
        self.queue.lock().unwrap().push((at, task));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_manual_scheduler_releases_in_time_order() {
        let scheduler = ManualScheduler::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let t0 = Utc::now();

        for (label, offset) in [("b", 20), ("a", 10), ("c", 30)] {
            let order = order.clone();
            scheduler.schedule(
                t0 + Duration::seconds(offset),
                Box::pin(async move {
                    order.lock().unwrap().push(label);
                }),
            );
        }

        scheduler.run_due(t0 + Duration::seconds(25)).await;
        assert_eq!(*order.lock().unwrap(), vec!["a", "b"]);
        assert_eq!(scheduler.pending(), 1);

        scheduler.run_due(t0 + Duration::seconds(30)).await;
        assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_tasks_can_schedule_tasks() {
        let scheduler = Arc::new(ManualScheduler::new());
        let fired = Arc::new(AtomicUsize::new(0));
        let t0 = Utc::now();

        let inner_sched = scheduler.clone();
        let inner_fired = fired.clone();
        scheduler.schedule(
            t0,
            Box::pin(async move {
                inner_fired.fetch_add(1, Ordering::SeqCst);
                let fired = inner_fired.clone();
                inner_sched.schedule(
                    t0 + Duration::seconds(1),
                    Box::pin(async move {
                        fired.fetch_add(1, Ordering::SeqCst);
                    }),
                );
            }),
        );

        scheduler.run_due(t0 + Duration::seconds(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }
}
