use std::{error::Error, io::Write, process::ExitCode, sync::Arc};

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{
    DatabaseQueue, Engine, EngineError, EntryKind, JobQueue, Money, MonthRange, NewEntry,
    RebuildScheduler, Role, YearMonth,
};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

#[derive(Parser, Debug)]
#[command(name = "finboard_admin")]
#[command(about = "Admin utilities for Finboard (users, metric rebuilds, job queue)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./finboard.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Ledger(Ledger),
    Metrics(Metrics),
    Queue(Queue),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
    List,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RoleArg {
    Admin,
    User,
}

impl From<RoleArg> for Role {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::Admin => Role::Admin,
            RoleArg::User => Role::User,
        }
    }
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    username: String,
    #[arg(long, value_enum, default_value = "user")]
    role: RoleArg,
}

#[derive(Args, Debug)]
struct Ledger {
    #[command(subcommand)]
    command: LedgerCommand,
}

/// Ledger edits queue a rebuild of the month they touch.
#[derive(Subcommand, Debug)]
enum LedgerCommand {
    /// Record a revenue or an expense.
    Add(LedgerAddArgs),
    /// Set the planned and actual amount of a budget category.
    Budget(LedgerBudgetArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Revenue,
    Expense,
}

impl From<KindArg> for EntryKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Revenue => EntryKind::Revenue,
            KindArg::Expense => EntryKind::Expense,
        }
    }
}

fn parse_amount(raw: &str) -> Result<Money, EngineError> {
    raw.parse()
}

fn parse_month(raw: &str) -> Result<YearMonth, EngineError> {
    raw.parse()
}

#[derive(Args, Debug)]
struct LedgerAddArgs {
    #[arg(long, value_enum)]
    kind: KindArg,
    /// Amount with up to two decimals, `.` or `,` as separator.
    #[arg(long, value_parser = parse_amount, allow_hyphen_values = true)]
    amount: Money,
    /// Date as `YYYY-MM-DD`.
    #[arg(long)]
    date: NaiveDate,
    #[arg(long)]
    category: String,
    #[arg(long)]
    description: Option<String>,
}

#[derive(Args, Debug)]
struct LedgerBudgetArgs {
    #[arg(long, value_parser = parse_month)]
    month: YearMonth,
    #[arg(long)]
    category: String,
    #[arg(long, value_parser = parse_amount, allow_hyphen_values = true)]
    planned: Money,
    #[arg(long, value_parser = parse_amount, allow_hyphen_values = true)]
    actual: Money,
}

#[derive(Args, Debug)]
struct Metrics {
    #[command(subcommand)]
    command: MetricsCommand,
}

#[derive(Subcommand, Debug)]
enum MetricsCommand {
    /// Queue rebuilds for the worker pool.
    Rebuild(MonthSelection),
    /// Rebuild right away, bypassing the queue.
    Run(MonthSelection),
}

/// Either `--month YYYY-MM` or `--from YYYY-MM --to YYYY-MM`.
#[derive(Args, Debug)]
struct MonthSelection {
    #[arg(long, conflicts_with_all = ["from", "to"])]
    month: Option<String>,
    #[arg(long, requires = "to")]
    from: Option<String>,
    #[arg(long, requires = "from")]
    to: Option<String>,
}

impl MonthSelection {
    fn range(&self) -> Result<MonthRange, EngineError> {
        match (&self.month, &self.from, &self.to) {
            (Some(month), None, None) => {
                let month: YearMonth = month.parse()?;
                MonthRange::new(month, month)
            }
            (None, Some(from), Some(to)) => MonthRange::new(from.parse()?, to.parse()?),
            _ => Err(EngineError::InvalidInput(
                "provide either --month or both --from and --to".to_string(),
            )),
        }
    }
}

#[derive(Args, Debug)]
struct Queue {
    #[command(subcommand)]
    command: QueueCommand,
}

#[derive(Subcommand, Debug)]
enum QueueCommand {
    /// Pending, running and failed job counts, plus the failed jobs.
    Status,
    /// Put failed jobs back in the queue with a fresh attempt count.
    RetryFailed,
    /// Drop failed jobs.
    PruneFailed,
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn prompt_password(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;
    out.flush()?;

    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                break;
            }
            KeyCode::Backspace => {
                if buf.pop().is_some() {
                    execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
                    out.flush()?;
                }
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                buf.push(ch);
                execute!(out, Print("*"))?;
                out.flush()?;
            }
            _ => {}
        }
    }

    Ok(buf)
}

fn prompt_password_twice() -> Result<String, Box<dyn Error + Send + Sync>> {
    let mut out = std::io::stderr();
    for _ in 0..3 {
        let first = prompt_password("Password: ")?;
        if first.is_empty() {
            execute!(
                out,
                cursor::MoveToColumn(0),
                terminal::Clear(ClearType::CurrentLine),
                Print("Password must not be empty.\r\n")
            )?;
            continue;
        }

        if prompt_password("Confirm password: ")? == first {
            return Ok(first);
        }

        execute!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            Print("Passwords do not match. Try again.\r\n")
        )?;
    }

    Err("too many attempts".into())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error + Send + Sync>> {
    let db = connect_db(&cli.database_url).await?;
    let engine = Arc::new(Engine::builder().database(db.clone()).build().await?);
    let queue = DatabaseQueue::new(db);

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let password = prompt_password_twice()?;
            let user = engine
                .create_user(&args.username, &password, args.role.into())
                .await?;
            println!("created user: {} ({})", user.username, user.role.as_str());
        }
        Command::User(User {
            command: UserCommand::List,
        }) => {
            for user in engine.list_users().await? {
                println!("{}\t{}", user.username, user.role.as_str());
            }
        }
        Command::Ledger(Ledger {
            command: LedgerCommand::Add(args),
        }) => {
            let entry = engine
                .add_entry(
                    args.kind.into(),
                    NewEntry {
                        amount: args.amount,
                        occurred_on: args.date,
                        category: args.category,
                        description: args.description,
                    },
                )
                .await?;
            let month = YearMonth::from_date(entry.occurred_on);
            queue.enqueue(month.into()).await?;
            println!(
                "added {} #{}: {} {} ({}), rebuild of {month} queued",
                entry.kind.as_str(),
                entry.id,
                entry.amount,
                entry.category,
                entry.occurred_on
            );
        }
        Command::Ledger(Ledger {
            command: LedgerCommand::Budget(args),
        }) => {
            let budget = engine
                .upsert_budget(args.month, &args.category, args.planned, args.actual)
                .await?;
            queue.enqueue(args.month.into()).await?;
            println!(
                "budget {} {}: planned {} actual {}, rebuild queued",
                args.month, budget.category, budget.planned, budget.actual
            );
        }
        Command::Metrics(Metrics {
            command: MetricsCommand::Rebuild(selection),
        }) => {
            let range = selection.range()?;
            let queued = RebuildScheduler::new(queue)
                .rebuild_range(range)
                .await?;
            println!(
                "queued {queued} rebuild job(s) for {} .. {}",
                range.from(),
                range.to()
            );
        }
        Command::Metrics(Metrics {
            command: MetricsCommand::Run(selection),
        }) => {
            let range = selection.range()?;
            for month in range.iter() {
                let report = engine.rebuild_for_month(month).await?;
                println!(
                    "{month}: {} expense categories, {} budget categories, {} pruned",
                    report.expense_categories.len(),
                    report.budget_categories.len(),
                    report.pruned
                );
            }
        }
        Command::Queue(Queue {
            command: QueueCommand::Status,
        }) => {
            let stats = queue.stats().await?;
            println!(
                "pending: {}\nrunning: {}\nfailed: {}",
                stats.pending, stats.running, stats.failed
            );
            for job in queue.failed_jobs().await? {
                println!(
                    "  #{} {:04}-{:02} attempts={} error={}",
                    job.id,
                    job.task.year,
                    job.task.month,
                    job.attempts,
                    job.last_error.as_deref().unwrap_or("-")
                );
            }
        }
        Command::Queue(Queue {
            command: QueueCommand::RetryFailed,
        }) => {
            let retried = queue.retry_failed().await?;
            println!("requeued {retried} failed job(s)");
        }
        Command::Queue(Queue {
            command: QueueCommand::PruneFailed,
        }) => {
            let pruned = queue.prune_failed().await?;
            println!("pruned {pruned} failed job(s)");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
