use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    DatabaseQueue, Engine, EngineError, EntryKind, JobFailure, JobQueue, Money, MonthRange,
    NewEntry, RebuildScheduler, RebuildTask, RebuildWorker, ResultEngine, SummaryFilter,
    WorkerConfig, YearMonth,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Arc<Engine>, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (Arc::new(engine), db)
}

fn ym(y: i32, m: u32) -> YearMonth {
    YearMonth::new(y, m).unwrap()
}

fn test_config() -> WorkerConfig {
    WorkerConfig {
        concurrency: 1,
        max_attempts: 2,
        backoff: Duration::ZERO,
        poll_interval: Duration::from_millis(10),
    }
}

#[derive(Default)]
struct RecordingQueue {
    tasks: Mutex<Vec<RebuildTask>>,
}

impl RecordingQueue {
    fn months(&self) -> Vec<(i32, u32)> {
        self.tasks
            .lock()
            .unwrap()
            .iter()
            .map(|t| (t.year, t.month))
            .collect()
    }
}

impl JobQueue for RecordingQueue {
    async fn enqueue(&self, task: RebuildTask) -> ResultEngine<()> {
        self.tasks.lock().unwrap().push(task);
        Ok(())
    }
}

#[tokio::test]
async fn single_month_queues_one_task() {
    let scheduler = RebuildScheduler::new(RecordingQueue::default());
    scheduler.rebuild_month(ym(2025, 3)).await.unwrap();
    assert_eq!(scheduler.queue().months(), vec![(2025, 3)]);
}

#[tokio::test]
async fn range_queues_every_month_in_order() {
    let scheduler = RebuildScheduler::new(RecordingQueue::default());
    let range = MonthRange::new(ym(2024, 11), ym(2025, 2)).unwrap();

    let queued = scheduler.rebuild_range(range).await.unwrap();

    assert_eq!(queued, 4);
    assert_eq!(
        scheduler.queue().months(),
        vec![(2024, 11), (2024, 12), (2025, 1), (2025, 2)]
    );
}

#[tokio::test]
async fn reversed_range_queues_nothing() {
    let scheduler = RebuildScheduler::new(RecordingQueue::default());
    let err = MonthRange::new(ym(2025, 3), ym(2025, 1)).unwrap_err();
    assert!(matches!(err, EngineError::InvalidRange(_)));
    assert!(scheduler.queue().months().is_empty());
}

#[tokio::test]
async fn worker_drains_queued_range() {
    let (engine, db) = engine_with_db().await;
    engine
        .add_entry(
            EntryKind::Revenue,
            NewEntry {
                amount: Money::new(250_00),
                occurred_on: NaiveDate::from_ymd_opt(2025, 2, 14).unwrap(),
                category: "Sales".to_string(),
                description: None,
            },
        )
        .await
        .unwrap();

    let queue = DatabaseQueue::new(db.clone());
    let scheduler = RebuildScheduler::new(queue.clone());
    scheduler
        .rebuild_range(MonthRange::new(ym(2025, 1), ym(2025, 3)).unwrap())
        .await
        .unwrap();
    assert_eq!(queue.stats().await.unwrap().pending, 3);

    let worker = RebuildWorker::new(0, engine.clone(), queue.clone(), test_config());
    assert_eq!(worker.drain().await.unwrap(), 3);

    let stats = queue.stats().await.unwrap();
    assert_eq!((stats.pending, stats.running, stats.failed), (0, 0, 0));

    let summaries = engine
        .finance_summaries(&SummaryFilter {
            from: Some(ym(2025, 1)),
            to: Some(ym(2025, 3)),
            order: engine::Order::Asc,
        })
        .await
        .unwrap();
    let revenue: Vec<Money> = summaries.iter().map(|s| s.revenue_total).collect();
    assert_eq!(revenue, vec![Money::ZERO, Money::new(250_00), Money::ZERO]);
}

#[tokio::test]
async fn duplicate_tasks_converge() {
    let (engine, db) = engine_with_db().await;
    let queue = DatabaseQueue::new(db.clone());
    let scheduler = RebuildScheduler::new(queue.clone());
    scheduler.rebuild_month(ym(2025, 6)).await.unwrap();
    scheduler.rebuild_month(ym(2025, 6)).await.unwrap();

    let worker = RebuildWorker::new(0, engine.clone(), queue, test_config());
    assert_eq!(worker.drain().await.unwrap(), 2);

    let rows = engine
        .finance_summaries(&SummaryFilter::single(ym(2025, 6)))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

async fn break_summaries(db: &DatabaseConnection) {
    db.execute(Statement::from_string(
        db.get_database_backend(),
        "DROP TABLE finance_monthly_summaries;",
    ))
    .await
    .unwrap();
}

#[tokio::test]
async fn failed_job_backs_off() {
    let (_engine, db) = engine_with_db().await;
    let queue = DatabaseQueue::new(db.clone());
    queue.enqueue(ym(2025, 1).into()).await.unwrap();

    let job = queue.claim().await.unwrap().unwrap();
    assert_eq!(job.attempts, 1);
    let outcome = queue
        .fail(&job, "boom", 3, Duration::from_secs(3600))
        .await
        .unwrap();

    assert!(matches!(outcome, JobFailure::Retrying { .. }));
    assert!(queue.claim().await.unwrap().is_none());
    assert_eq!(queue.stats().await.unwrap().pending, 1);
}

#[tokio::test]
async fn worker_marks_job_failed_after_max_attempts() {
    let (engine, db) = engine_with_db().await;
    break_summaries(&db).await;
    let queue = DatabaseQueue::new(db.clone());
    queue.enqueue(ym(2025, 1).into()).await.unwrap();

    let worker = RebuildWorker::new(0, engine.clone(), queue.clone(), test_config());
    // Two failing runs, then nothing left to claim.
    assert_eq!(worker.drain().await.unwrap(), 2);

    let stats = queue.stats().await.unwrap();
    assert_eq!((stats.pending, stats.running, stats.failed), (0, 0, 1));
    let failed = queue.failed_jobs().await.unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].attempts, 2);
    assert!(
        failed[0]
            .last_error
            .as_deref()
            .is_some_and(|e| e.contains("finance_monthly_summaries"))
    );

    assert_eq!(queue.retry_failed().await.unwrap(), 1);
    let job = queue.claim().await.unwrap().unwrap();
    assert_eq!(job.attempts, 1);
    assert!(queue.bury(&job, "manual").await.unwrap());
    assert_eq!(queue.prune_failed().await.unwrap(), 1);
    assert_eq!(queue.stats().await.unwrap(), Default::default());
}

#[tokio::test]
async fn stale_reservation_is_reclaimed() {
    let (_engine, db) = engine_with_db().await;
    let queue = DatabaseQueue::new(db.clone()).with_retry_after(Duration::ZERO);
    queue.enqueue(ym(2025, 5).into()).await.unwrap();

    let first = queue.claim().await.unwrap().unwrap();
    let second = queue.claim().await.unwrap().unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(second.attempts, 2);

    queue.complete(&second).await.unwrap();
    assert!(queue.claim().await.unwrap().is_none());
}

#[tokio::test]
async fn fresh_reservation_is_not_reclaimed() {
    let (_engine, db) = engine_with_db().await;
    let queue = DatabaseQueue::new(db.clone());
    queue.enqueue(ym(2025, 5).into()).await.unwrap();

    let job = queue.claim().await.unwrap().unwrap();
    assert!(queue.claim().await.unwrap().is_none());
    assert_eq!(queue.stats().await.unwrap().running, 1);
    queue.complete(&job).await.unwrap();
}

#[tokio::test]
async fn stale_worker_cannot_touch_a_reclaimed_job() {
    let (_engine, db) = engine_with_db().await;
    let queue = DatabaseQueue::new(db.clone()).with_retry_after(Duration::ZERO);
    queue.enqueue(ym(2025, 6).into()).await.unwrap();

    let stale = queue.claim().await.unwrap().unwrap();
    let live = queue.claim().await.unwrap().unwrap();
    assert_eq!(live.attempts, 2);

    let outcome = queue
        .fail(&stale, "late failure", 5, Duration::from_secs(3600))
        .await
        .unwrap();
    assert_eq!(outcome, JobFailure::Reclaimed);
    assert!(!queue.bury(&stale, "late failure").await.unwrap());
    let outcome = queue.fail(&stale, "late failure", 1, Duration::ZERO).await.unwrap();
    assert_eq!(outcome, JobFailure::Reclaimed);

    let stats = queue.stats().await.unwrap();
    assert_eq!((stats.pending, stats.running, stats.failed), (0, 1, 0));

    // The live reservation still fails normally.
    let outcome = queue
        .fail(&live, "boom", 5, Duration::from_secs(3600))
        .await
        .unwrap();
    assert!(matches!(outcome, JobFailure::Retrying { .. }));
    assert_eq!(queue.stats().await.unwrap().pending, 1);
}
