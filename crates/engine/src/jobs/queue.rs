use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use sea_orm::{
    ActiveValue, Condition, DatabaseConnection, QueryFilter, QueryOrder, QuerySelect, prelude::*,
    sea_query::Expr,
};

use crate::{ResultEngine, rebuild_jobs};

use super::{JobQueue, RebuildTask};

const STATUS_PENDING: &str = "pending";
const STATUS_RUNNING: &str = "running";
const STATUS_FAILED: &str = "failed";

/// How many contended candidates `claim` walks past before giving up.
const CLAIM_ROUNDS: usize = 8;

/// A job handed out by [`DatabaseQueue::claim`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueuedJob {
    pub id: i32,
    pub task: RebuildTask,
    /// Number of times the job has been claimed, this claim included.
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl QueuedJob {
    fn from_model(model: rebuild_jobs::Model) -> Self {
        Self {
            id: model.id,
            task: RebuildTask {
                year: model.year,
                month: u32::try_from(model.month).unwrap_or(0),
            },
            attempts: u32::try_from(model.attempts).unwrap_or(0),
            last_error: model.last_error,
            created_at: model.created_at,
        }
    }
}

/// What happened to a job after a failed run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobFailure {
    /// Back in the queue, claimable again at `available_at`.
    Retrying { available_at: DateTime<Utc> },
    /// Out of attempts; kept with status `failed` until retried or pruned.
    Failed,
    /// The reservation expired and another worker claimed the job since;
    /// nothing was changed.
    Reclaimed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: u64,
    pub running: u64,
    pub failed: u64,
}

/// Rebuild queue persisted in the `rebuild_jobs` table.
///
/// A claimed job is marked `running` with a reservation time. If its worker
/// dies, the reservation expires after `retry_after` and another worker may
/// claim the job again.
#[derive(Clone, Debug)]
pub struct DatabaseQueue {
    database: DatabaseConnection,
    retry_after: TimeDelta,
}

impl DatabaseQueue {
    pub fn new(database: DatabaseConnection) -> Self {
        Self {
            database,
            retry_after: TimeDelta::seconds(90),
        }
    }

    /// How long a reservation lasts before the job is handed out again.
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = TimeDelta::from_std(retry_after).unwrap_or(TimeDelta::MAX);
        self
    }

    /// Reserve the oldest available job, if any.
    pub async fn claim(&self) -> ResultEngine<Option<QueuedJob>> {
        let now = Utc::now();
        let stale_before = now - self.retry_after;

        for _ in 0..CLAIM_ROUNDS {
            let Some(candidate) = rebuild_jobs::Entity::find()
                .filter(
                    Condition::any()
                        .add(
                            Condition::all()
                                .add(rebuild_jobs::Column::Status.eq(STATUS_PENDING))
                                .add(rebuild_jobs::Column::AvailableAt.lte(now)),
                        )
                        .add(
                            Condition::all()
                                .add(rebuild_jobs::Column::Status.eq(STATUS_RUNNING))
                                .add(rebuild_jobs::Column::ReservedAt.lte(stale_before)),
                        ),
                )
                .order_by_asc(rebuild_jobs::Column::AvailableAt)
                .order_by_asc(rebuild_jobs::Column::Id)
                .one(&self.database)
                .await?
            else {
                return Ok(None);
            };

            // Compare-and-set on (status, attempts): a concurrent claim bumps
            // `attempts`, so only one worker wins the row.
            let attempts = candidate.attempts + 1;
            let result = rebuild_jobs::Entity::update_many()
                .col_expr(rebuild_jobs::Column::Status, Expr::value(STATUS_RUNNING))
                .col_expr(rebuild_jobs::Column::Attempts, Expr::value(attempts))
                .col_expr(rebuild_jobs::Column::ReservedAt, Expr::value(Some(now)))
                .filter(rebuild_jobs::Column::Id.eq(candidate.id))
                .filter(rebuild_jobs::Column::Status.eq(candidate.status.as_str()))
                .filter(rebuild_jobs::Column::Attempts.eq(candidate.attempts))
                .exec(&self.database)
                .await?;
            if result.rows_affected == 1 {
                let mut job = QueuedJob::from_model(candidate);
                job.attempts = u32::try_from(attempts).unwrap_or(u32::MAX);
                return Ok(Some(job));
            }
            tracing::debug!(job = candidate.id, "lost claim race");
        }
        Ok(None)
    }

    /// Remove a finished job.
    pub async fn complete(&self, job: &QueuedJob) -> ResultEngine<()> {
        rebuild_jobs::Entity::delete_by_id(job.id)
            .exec(&self.database)
            .await?;
        Ok(())
    }

    /// Record a failed run. The job is retried after `backoff` unless it has
    /// already been attempted `max_attempts` times.
    pub async fn fail(
        &self,
        job: &QueuedJob,
        error: &str,
        max_attempts: u32,
        backoff: Duration,
    ) -> ResultEngine<JobFailure> {
        if job.attempts >= max_attempts {
            return Ok(if self.bury(job, error).await? {
                JobFailure::Failed
            } else {
                JobFailure::Reclaimed
            });
        }

        let available_at = Utc::now() + TimeDelta::from_std(backoff).unwrap_or(TimeDelta::zero());
        let result = rebuild_jobs::Entity::update_many()
            .col_expr(rebuild_jobs::Column::Status, Expr::value(STATUS_PENDING))
            .col_expr(rebuild_jobs::Column::AvailableAt, Expr::value(available_at))
            .col_expr(
                rebuild_jobs::Column::ReservedAt,
                Expr::value(Option::<DateTime<Utc>>::None),
            )
            .col_expr(rebuild_jobs::Column::LastError, Expr::value(error))
            .filter(Self::held_by(job))
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Ok(JobFailure::Reclaimed);
        }
        Ok(JobFailure::Retrying { available_at })
    }

    /// Mark a job as permanently failed. Returns `false` when `job` is no
    /// longer held by its caller.
    pub async fn bury(&self, job: &QueuedJob, error: &str) -> ResultEngine<bool> {
        let result = rebuild_jobs::Entity::update_many()
            .col_expr(rebuild_jobs::Column::Status, Expr::value(STATUS_FAILED))
            .col_expr(
                rebuild_jobs::Column::ReservedAt,
                Expr::value(Option::<DateTime<Utc>>::None),
            )
            .col_expr(rebuild_jobs::Column::LastError, Expr::value(error))
            .filter(Self::held_by(job))
            .exec(&self.database)
            .await?;
        Ok(result.rows_affected == 1)
    }

    /// Matches the row only while it is still the reservation `job` came from.
    fn held_by(job: &QueuedJob) -> Condition {
        Condition::all()
            .add(rebuild_jobs::Column::Id.eq(job.id))
            .add(rebuild_jobs::Column::Status.eq(STATUS_RUNNING))
            .add(rebuild_jobs::Column::Attempts.eq(i32::try_from(job.attempts).unwrap_or(i32::MAX)))
    }

    pub async fn stats(&self) -> ResultEngine<QueueStats> {
        let rows: Vec<(String, i64)> = rebuild_jobs::Entity::find()
            .select_only()
            .column(rebuild_jobs::Column::Status)
            .column_as(Expr::col(rebuild_jobs::Column::Id).count(), "count")
            .group_by(rebuild_jobs::Column::Status)
            .into_tuple()
            .all(&self.database)
            .await?;

        let mut stats = QueueStats::default();
        for (status, count) in rows {
            let count = u64::try_from(count).unwrap_or(0);
            match status.as_str() {
                STATUS_PENDING => stats.pending = count,
                STATUS_RUNNING => stats.running = count,
                STATUS_FAILED => stats.failed = count,
                other => tracing::warn!(status = other, "unknown rebuild job status"),
            }
        }
        Ok(stats)
    }

    /// Jobs that ran out of attempts, oldest first.
    pub async fn failed_jobs(&self) -> ResultEngine<Vec<QueuedJob>> {
        Ok(rebuild_jobs::Entity::find()
            .filter(rebuild_jobs::Column::Status.eq(STATUS_FAILED))
            .order_by_asc(rebuild_jobs::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(QueuedJob::from_model)
            .collect())
    }

    /// Put every failed job back in the queue with a fresh attempt count.
    pub async fn retry_failed(&self) -> ResultEngine<u64> {
        let result = rebuild_jobs::Entity::update_many()
            .col_expr(rebuild_jobs::Column::Status, Expr::value(STATUS_PENDING))
            .col_expr(rebuild_jobs::Column::Attempts, Expr::value(0))
            .col_expr(rebuild_jobs::Column::AvailableAt, Expr::value(Utc::now()))
            .filter(rebuild_jobs::Column::Status.eq(STATUS_FAILED))
            .exec(&self.database)
            .await?;
        Ok(result.rows_affected)
    }

    /// Delete every failed job.
    pub async fn prune_failed(&self) -> ResultEngine<u64> {
        let result = rebuild_jobs::Entity::delete_many()
            .filter(rebuild_jobs::Column::Status.eq(STATUS_FAILED))
            .exec(&self.database)
            .await?;
        Ok(result.rows_affected)
    }
}

impl JobQueue for DatabaseQueue {
    async fn enqueue(&self, task: RebuildTask) -> ResultEngine<()> {
        let now = Utc::now();
        rebuild_jobs::ActiveModel {
            year: ActiveValue::Set(task.year),
            month: ActiveValue::Set(i32::try_from(task.month).unwrap_or(0)),
            status: ActiveValue::Set(STATUS_PENDING.to_string()),
            attempts: ActiveValue::Set(0),
            available_at: ActiveValue::Set(now),
            reserved_at: ActiveValue::Set(None),
            last_error: ActiveValue::Set(None),
            created_at: ActiveValue::Set(now),
            ..Default::default()
        }
        .insert(&self.database)
        .await?;
        Ok(())
    }
}
