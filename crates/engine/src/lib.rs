pub use error::EngineError;
pub use jobs::{
    DatabaseQueue, JobFailure, JobQueue, QueueStats, QueuedJob, RebuildScheduler, RebuildTask,
    RebuildWorker, WorkerConfig, spawn_workers,
};
pub use ledger::{
    BudgetEntry, EntryKind, LedgerEntry, NewEntry, NewProject, Project, ProjectStatus,
};
pub use money::Money;
pub use month::{MonthRange, YearMonth};
pub use ops::{
    CategoryPlanFact, Engine, EngineBuilder, OperationFilter, Order, RebuildReport, Role,
    SummaryFilter, User, hash_password,
};
pub use percent::Percent;
pub use summaries::{BudgetSummary, ExpenseCategorySummary, FinanceSummary};

mod budget_monthly_summaries;
mod budgets;
mod error;
mod expense_category_monthly_summaries;
mod expenses;
mod finance_monthly_summaries;
mod jobs;
mod ledger;
mod money;
mod month;
mod ops;
mod percent;
mod projects;
mod rebuild_jobs;
mod revenues;
mod summaries;
mod users;

pub type ResultEngine<T> = Result<T, EngineError>;
