use chrono::NaiveDate;
use sea_orm::{Database, DatabaseConnection};

use engine::{
    Engine, EngineError, EntryKind, Money, NewEntry, NewProject, OperationFilter, Order,
    ProjectStatus, Role, SummaryFilter, YearMonth,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn ym(y: i32, m: u32) -> YearMonth {
    YearMonth::new(y, m).unwrap()
}

async fn add(engine: &Engine, kind: EntryKind, minor: i64, on: NaiveDate, category: &str) {
    engine
        .add_entry(
            kind,
            NewEntry {
                amount: Money::new(minor),
                occurred_on: on,
                category: category.to_string(),
                description: None,
            },
        )
        .await
        .unwrap();
}

/// Three months of ledger data, rebuilt.
async fn seeded_engine() -> Engine {
    let (engine, _db) = engine_with_db().await;
    add(&engine, EntryKind::Revenue, 1000_00, date(2024, 12, 5), "Sales").await;
    add(&engine, EntryKind::Expense, 200_00, date(2024, 12, 6), "Rent").await;
    add(&engine, EntryKind::Revenue, 800_00, date(2025, 1, 5), "Sales").await;
    add(&engine, EntryKind::Expense, 200_00, date(2025, 1, 6), "Rent").await;
    add(&engine, EntryKind::Expense, 50_00, date(2025, 1, 7), "Food").await;
    add(&engine, EntryKind::Revenue, 900_00, date(2025, 2, 5), "Sales").await;
    add(&engine, EntryKind::Expense, 200_00, date(2025, 2, 6), "Rent").await;
    for month in [ym(2024, 12), ym(2025, 1)] {
        engine
            .upsert_budget(month, "Rent", Money::new(180_00), Money::new(200_00))
            .await
            .unwrap();
    }
    for month in [ym(2024, 12), ym(2025, 1), ym(2025, 2)] {
        engine.rebuild_for_month(month).await.unwrap();
    }
    engine
}

#[tokio::test]
async fn finance_summaries_respect_window_and_order() {
    let engine = seeded_engine().await;

    let all = engine
        .finance_summaries(&SummaryFilter::default())
        .await
        .unwrap();
    let months: Vec<String> = all.iter().map(|s| s.month.to_string()).collect();
    assert_eq!(months, vec!["2025-02", "2025-01", "2024-12"]);

    let window = engine
        .finance_summaries(&SummaryFilter {
            from: Some(ym(2024, 12)),
            to: Some(ym(2025, 1)),
            order: Order::Asc,
        })
        .await
        .unwrap();
    let profits: Vec<Money> = window.iter().map(|s| s.profit_total).collect();
    assert_eq!(profits, vec![Money::new(800_00), Money::new(550_00)]);
}

#[tokio::test]
async fn reversed_summary_window_is_rejected() {
    let engine = seeded_engine().await;
    let err = engine
        .finance_summaries(&SummaryFilter {
            from: Some(ym(2025, 2)),
            to: Some(ym(2025, 1)),
            order: Order::Desc,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidRange(_)));
}

#[tokio::test]
async fn expenses_by_category_since_month() {
    let engine = seeded_engine().await;

    let all = engine.expenses_by_category(ym(2024, 1)).await.unwrap();
    assert_eq!(
        all,
        vec![
            ("Food".to_string(), Money::new(50_00)),
            ("Rent".to_string(), Money::new(600_00)),
        ]
    );

    let recent = engine.expenses_by_category(ym(2025, 2)).await.unwrap();
    assert_eq!(recent, vec![("Rent".to_string(), Money::new(200_00))]);
}

#[tokio::test]
async fn budget_charts() {
    let engine = seeded_engine().await;

    let months = engine.available_budget_months().await.unwrap();
    assert_eq!(months, vec![ym(2025, 1), ym(2024, 12)]);

    let totals = engine.budget_totals_by_category(ym(2024, 12)).await.unwrap();
    assert_eq!(totals.len(), 1);
    assert_eq!(totals[0].category, "Rent");
    assert_eq!(totals[0].planned, Money::new(360_00));
    assert_eq!(totals[0].actual, Money::new(400_00));
}

#[tokio::test]
async fn projects_are_ranked_by_roi() {
    let (engine, _db) = engine_with_db().await;
    for (name, investment, ret) in [
        ("Shop", 1000_00, 1100_00),
        ("Idle", 0, 0),
        ("Site", 500_00, 1000_00),
    ] {
        engine
            .add_project(NewProject {
                name: name.to_string(),
                investment: Money::new(investment),
                return_amount: Money::new(ret),
                start_date: date(2025, 1, 1),
                end_date: None,
                status: ProjectStatus::Active,
            })
            .await
            .unwrap();
    }

    let projects = engine.projects_by_roi().await.unwrap();
    let names: Vec<&str> = projects.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Site", "Shop", "Idle"]);
    assert_eq!(projects[0].roi.unwrap().to_string(), "100.00");
    assert_eq!(projects[2].roi, None);
}

#[tokio::test]
async fn operations_are_listed_newest_first_within_dates() {
    let engine = seeded_engine().await;

    let expenses = engine
        .list_operations(
            EntryKind::Expense,
            &OperationFilter {
                from: Some(date(2025, 1, 1)),
                to: Some(date(2025, 1, 31)),
            },
        )
        .await
        .unwrap();
    let dates: Vec<NaiveDate> = expenses.iter().map(|e| e.occurred_on).collect();
    assert_eq!(dates, vec![date(2025, 1, 7), date(2025, 1, 6)]);

    let revenues = engine
        .list_operations(EntryKind::Revenue, &OperationFilter::default())
        .await
        .unwrap();
    assert_eq!(revenues.len(), 3);
    assert!(revenues.iter().all(|r| r.kind == EntryKind::Revenue));
}

#[tokio::test]
async fn users_authenticate_with_salted_passwords() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_user("alice", "s3cret", Role::Admin)
        .await
        .unwrap();

    let user = engine.authenticate("alice", "s3cret").await.unwrap();
    assert_eq!(user.role, Role::Admin);

    assert_eq!(
        engine.authenticate("alice", "wrong").await.unwrap_err(),
        EngineError::InvalidCredentials
    );
    assert_eq!(
        engine.authenticate("bob", "s3cret").await.unwrap_err(),
        EngineError::InvalidCredentials
    );
    assert!(matches!(
        engine.create_user("alice", "x", Role::User).await.unwrap_err(),
        EngineError::ExistingKey(_)
    ));
}
