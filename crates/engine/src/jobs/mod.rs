//! Background month rebuilds.
//!
//! Triggers go through [`RebuildScheduler`], which turns a month or a month
//! range into one [`RebuildTask`] per month and hands them to a [`JobQueue`].
//! [`RebuildWorker`]s drain the persistent [`DatabaseQueue`] and run
//! [`Engine::rebuild_for_month`](crate::Engine::rebuild_for_month) for each
//! task.
//!
//! Delivery is at-least-once. The same month may be queued more than once;
//! every rebuild recomputes from the ledger, so duplicates are harmless.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{MonthRange, ResultEngine, YearMonth};

mod queue;
mod worker;

pub use queue::{DatabaseQueue, JobFailure, QueueStats, QueuedJob};
pub use worker::{RebuildWorker, WorkerConfig, spawn_workers};

/// A request to rebuild one month.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RebuildTask {
    pub year: i32,
    pub month: u32,
}

impl RebuildTask {
    /// The month to rebuild; fails for a task that was stored with a bad month.
    pub fn target(&self) -> ResultEngine<YearMonth> {
        YearMonth::new(self.year, self.month)
    }
}

impl From<YearMonth> for RebuildTask {
    fn from(value: YearMonth) -> Self {
        Self {
            year: value.year(),
            month: value.month(),
        }
    }
}

/// Where rebuild tasks are sent.
pub trait JobQueue: Send + Sync {
    fn enqueue(&self, task: RebuildTask) -> impl Future<Output = ResultEngine<()>> + Send;
}

/// Turns rebuild triggers into queued tasks. Never runs a rebuild itself.
#[derive(Clone, Debug)]
pub struct RebuildScheduler<Q> {
    queue: Q,
}

impl<Q: JobQueue> RebuildScheduler<Q> {
    pub fn new(queue: Q) -> Self {
        Self { queue }
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    /// Queue a rebuild of `month`.
    pub async fn rebuild_month(&self, month: YearMonth) -> ResultEngine<()> {
        self.queue.enqueue(month.into()).await?;
        tracing::info!(%month, "queued month rebuild");
        Ok(())
    }

    /// Queue one rebuild per month of `range`, oldest first. Returns the
    /// number of queued tasks.
    ///
    /// An error from the queue stops the walk; months already queued stay
    /// queued.
    pub async fn rebuild_range(&self, range: MonthRange) -> ResultEngine<usize> {
        let mut queued = 0;
        for month in range.iter() {
            self.queue.enqueue(month.into()).await?;
            queued += 1;
        }
        tracing::info!(
            from = %range.from(),
            to = %range.to(),
            queued,
            "queued range rebuild"
        );
        Ok(queued)
    }
}
