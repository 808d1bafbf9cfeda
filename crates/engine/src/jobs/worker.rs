use std::{sync::Arc, time::Duration};

use tokio::{sync::watch, task::JoinSet};

use crate::{Engine, ResultEngine};

use super::{DatabaseQueue, JobFailure};

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    /// Number of workers started by [`spawn_workers`].
    pub concurrency: usize,
    /// Runs allowed per job before it is marked failed.
    pub max_attempts: u32,
    /// Delay before a failed job becomes claimable again.
    pub backoff: Duration,
    /// Sleep between polls when the queue is empty.
    pub poll_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            max_attempts: 3,
            backoff: Duration::from_secs(30),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Pulls rebuild jobs off the queue and runs them one at a time.
pub struct RebuildWorker {
    id: usize,
    engine: Arc<Engine>,
    queue: DatabaseQueue,
    config: WorkerConfig,
}

impl RebuildWorker {
    pub fn new(id: usize, engine: Arc<Engine>, queue: DatabaseQueue, config: WorkerConfig) -> Self {
        Self {
            id,
            engine,
            queue,
            config,
        }
    }

    /// Claim and run at most one job. Returns `false` when nothing was
    /// available.
    pub async fn run_once(&self) -> ResultEngine<bool> {
        let Some(job) = self.queue.claim().await? else {
            return Ok(false);
        };

        // A job reclaimed after its worker died may already be over budget.
        if job.attempts > self.config.max_attempts {
            tracing::error!(worker = self.id, job = job.id, "rebuild job exceeded its attempts");
            self.queue
                .bury(&job, "job attempted too many times")
                .await?;
            return Ok(true);
        }

        let month = match job.task.target() {
            Ok(month) => month,
            Err(err) => {
                tracing::error!(worker = self.id, job = job.id, "invalid rebuild job: {err}");
                self.queue.bury(&job, &err.to_string()).await?;
                return Ok(true);
            }
        };

        match self.engine.rebuild_for_month(month).await {
            Ok(_) => self.queue.complete(&job).await?,
            Err(err) => {
                let outcome = self
                    .queue
                    .fail(
                        &job,
                        &err.to_string(),
                        self.config.max_attempts,
                        self.config.backoff,
                    )
                    .await?;
                match outcome {
                    JobFailure::Retrying { available_at } => tracing::warn!(
                        worker = self.id,
                        job = job.id,
                        %month,
                        attempt = job.attempts,
                        %available_at,
                        "month rebuild failed, will retry: {err}"
                    ),
                    JobFailure::Failed => tracing::error!(
                        worker = self.id,
                        job = job.id,
                        %month,
                        attempt = job.attempts,
                        "month rebuild failed permanently: {err}"
                    ),
                    JobFailure::Reclaimed => tracing::warn!(
                        worker = self.id,
                        job = job.id,
                        %month,
                        "month rebuild failed after the job was reclaimed: {err}"
                    ),
                }
            }
        }
        Ok(true)
    }

    /// Run jobs until nothing is claimable. Returns how many were processed.
    pub async fn drain(&self) -> ResultEngine<usize> {
        let mut processed = 0;
        while self.run_once().await? {
            processed += 1;
        }
        Ok(processed)
    }

    /// Poll the queue until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(worker = self.id, "rebuild worker started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            match self.run_once().await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(err) => tracing::error!(worker = self.id, "rebuild queue error: {err}"),
            }
            tokio::select! {
                () = tokio::time::sleep(self.config.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        tracing::info!(worker = self.id, "rebuild worker stopped");
    }
}

/// Start `config.concurrency` workers (at least one) sharing `queue`.
pub fn spawn_workers(
    engine: Arc<Engine>,
    queue: DatabaseQueue,
    config: WorkerConfig,
    shutdown: watch::Receiver<bool>,
) -> JoinSet<()> {
    let mut workers = JoinSet::new();
    for id in 0..config.concurrency.max(1) {
        let worker = RebuildWorker::new(id, engine.clone(), queue.clone(), config.clone());
        workers.spawn(worker.run(shutdown.clone()));
    }
    workers
}
