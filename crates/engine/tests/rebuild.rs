use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    BudgetSummary, Engine, EngineError, EntryKind, ExpenseCategorySummary, FinanceSummary, Money,
    NewEntry, SummaryFilter, YearMonth,
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

#[tokio::test]
async fn finance_summary_covers_only_the_month() {
    let (engine, _db) = engine_with_db().await;
    add(&engine, EntryKind::Revenue, 1000_00, date(2025, 7, 1), "Sales").await;
    add(&engine, EntryKind::Revenue, 500_00, date(2025, 7, 31), "Sales").await;
    add(&engine, EntryKind::Expense, 300_00, date(2025, 7, 10), "Rent").await;
    // Outside July.
    add(&engine, EntryKind::Revenue, 9_999_00, date(2025, 6, 30), "Sales").await;
    add(&engine, EntryKind::Expense, 7_777_00, date(2025, 8, 1), "Rent").await;

    let report = engine.rebuild_for_month(ym(2025, 7)).await.unwrap();
    assert_eq!(report.finance.revenue_total, Money::new(1500_00));
    assert_eq!(report.finance.expense_total, Money::new(300_00));

    let stored = engine.finance_summary(ym(2025, 7)).await.unwrap().unwrap();
    assert_eq!(stored.revenue_total, Money::new(1500_00));
    assert_eq!(stored.expense_total, Money::new(300_00));
    assert_eq!(stored.profit_total, Money::new(1200_00));
    assert_eq!(stored.profit_margin.unwrap().to_string(), "80.00");
}

#[tokio::test]
async fn empty_month_gets_a_zero_row_without_margin() {
    let (engine, _db) = engine_with_db().await;

    engine.rebuild_for_month(ym(2025, 2)).await.unwrap();

    let stored = engine.finance_summary(ym(2025, 2)).await.unwrap().unwrap();
    assert_eq!(stored.revenue_total, Money::ZERO);
    assert_eq!(stored.expense_total, Money::ZERO);
    assert_eq!(stored.profit_total, Money::ZERO);
    assert_eq!(stored.profit_margin, None);

    let categories = engine
        .expense_category_summaries(&SummaryFilter::single(ym(2025, 2)))
        .await
        .unwrap();
    assert!(categories.is_empty());
}

#[tokio::test]
async fn budget_summary_over_plan() {
    let (engine, _db) = engine_with_db().await;
    engine
        .upsert_budget(ym(2025, 3), "Rent", Money::new(1000_00), Money::new(1100_00))
        .await
        .unwrap();
    engine
        .upsert_budget(ym(2025, 3), "Ads", Money::ZERO, Money::new(50_00))
        .await
        .unwrap();

    engine.rebuild_for_month(ym(2025, 3)).await.unwrap();

    let rows = engine
        .budget_summaries(&SummaryFilter::single(ym(2025, 3)))
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);

    let ads = &rows[0];
    assert_eq!(ads.category, "Ads");
    assert_eq!(ads.delta, Money::new(50_00));
    assert_eq!(ads.delta_pct, None);

    let rent = &rows[1];
    assert_eq!(rent.category, "Rent");
    assert_eq!(rent.planned, Money::new(1000_00));
    assert_eq!(rent.actual, Money::new(1100_00));
    assert_eq!(rent.delta, Money::new(100_00));
    assert_eq!(rent.delta_pct.unwrap().to_string(), "10.00");
}

#[tokio::test]
async fn expense_categories_are_summed_per_category() {
    let (engine, _db) = engine_with_db().await;
    add(&engine, EntryKind::Expense, 100_00, date(2025, 5, 2), "Food").await;
    add(&engine, EntryKind::Expense, 50_50, date(2025, 5, 20), "Food").await;
    add(&engine, EntryKind::Expense, 700_00, date(2025, 5, 1), "Rent").await;

    let report = engine.rebuild_for_month(ym(2025, 5)).await.unwrap();
    assert_eq!(report.expense_categories, vec!["Food", "Rent"]);

    let rows = engine
        .expense_category_summaries(&SummaryFilter::single(ym(2025, 5)))
        .await
        .unwrap();
    let totals: Vec<(&str, Money)> = rows
        .iter()
        .map(|r| (r.category.as_str(), r.expense_total))
        .collect();
    assert_eq!(
        totals,
        vec![("Food", Money::new(150_50)), ("Rent", Money::new(700_00))]
    );
}

#[tokio::test]
async fn stale_categories_are_pruned() {
    let (engine, _db) = engine_with_db().await;
    add(&engine, EntryKind::Expense, 10_00, date(2025, 4, 3), "A").await;
    add(&engine, EntryKind::Expense, 20_00, date(2025, 4, 4), "B").await;
    let stale = engine
        .add_entry(
            EntryKind::Expense,
            NewEntry {
                amount: Money::new(30_00),
                occurred_on: date(2025, 4, 5),
                category: "C".to_string(),
                description: Some("one-off".to_string()),
            },
        )
        .await
        .unwrap();
    engine
        .upsert_budget(ym(2025, 4), "C", Money::new(30_00), Money::new(30_00))
        .await
        .unwrap();

    engine.rebuild_for_month(ym(2025, 4)).await.unwrap();
    let filter = SummaryFilter::single(ym(2025, 4));
    assert_eq!(engine.expense_category_summaries(&filter).await.unwrap().len(), 3);
    assert_eq!(engine.budget_summaries(&filter).await.unwrap().len(), 1);

    engine.delete_entry(EntryKind::Expense, stale.id).await.unwrap();
    engine.delete_budget(ym(2025, 4), "C").await.unwrap();
    let report = engine.rebuild_for_month(ym(2025, 4)).await.unwrap();
    assert_eq!(report.pruned, 2);

    let categories: Vec<String> = engine
        .expense_category_summaries(&filter)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.category)
        .collect();
    assert_eq!(categories, vec!["A", "B"]);
    assert!(engine.budget_summaries(&filter).await.unwrap().is_empty());
}

async fn summary_ids(db: &DatabaseConnection, table: &str) -> Vec<i32> {
    db.query_all(Statement::from_string(
        db.get_database_backend(),
        format!("SELECT id FROM {table} ORDER BY id"),
    ))
    .await
    .unwrap()
    .iter()
    .map(|row| row.try_get::<i32>("", "id").unwrap())
    .collect()
}

#[tokio::test]
async fn rebuild_is_idempotent() {
    let (engine, db) = engine_with_db().await;
    add(&engine, EntryKind::Revenue, 400_00, date(2025, 9, 9), "Sales").await;
    add(&engine, EntryKind::Expense, 100_00, date(2025, 9, 9), "Food").await;
    add(&engine, EntryKind::Expense, 30_00, date(2025, 9, 12), "Travel").await;
    engine
        .upsert_budget(ym(2025, 9), "Food", Money::new(80_00), Money::new(100_00))
        .await
        .unwrap();
    let filter = SummaryFilter::single(ym(2025, 9));

    engine.rebuild_for_month(ym(2025, 9)).await.unwrap();
    let finance_before = engine.finance_summary(ym(2025, 9)).await.unwrap().unwrap();
    let categories_before = engine.expense_category_summaries(&filter).await.unwrap();
    let budgets_before = engine.budget_summaries(&filter).await.unwrap();
    let ids_before = (
        summary_ids(&db, "finance_monthly_summaries").await,
        summary_ids(&db, "expense_category_monthly_summaries").await,
        summary_ids(&db, "budget_monthly_summaries").await,
    );

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = engine.rebuild_for_month(ym(2025, 9)).await.unwrap();
    assert_eq!(second.pruned, 0);

    let finance_after = engine.finance_summary(ym(2025, 9)).await.unwrap().unwrap();
    let categories_after = engine.expense_category_summaries(&filter).await.unwrap();
    let budgets_after = engine.budget_summaries(&filter).await.unwrap();

    // Only the calculation time moves, and it moves forward.
    assert!(finance_after.calculated_at > finance_before.calculated_at);
    assert_eq!(
        FinanceSummary {
            calculated_at: finance_before.calculated_at,
            ..finance_after.clone()
        },
        finance_before
    );

    assert_eq!(categories_after.len(), 2);
    for (before, after) in categories_before.iter().zip(&categories_after) {
        assert!(after.calculated_at > before.calculated_at);
        assert_eq!(
            ExpenseCategorySummary {
                calculated_at: before.calculated_at,
                ..after.clone()
            },
            *before
        );
    }

    assert_eq!(budgets_after.len(), 1);
    assert!(budgets_after[0].calculated_at > budgets_before[0].calculated_at);
    assert_eq!(
        BudgetSummary {
            calculated_at: budgets_before[0].calculated_at,
            ..budgets_after[0].clone()
        },
        budgets_before[0]
    );
    assert_eq!(budgets_after[0].delta, Money::new(20_00));
    assert_eq!(budgets_after[0].delta_pct.unwrap().to_string(), "25.00");

    // Upserts update in place: same rows, same ids.
    let ids_after = (
        summary_ids(&db, "finance_monthly_summaries").await,
        summary_ids(&db, "expense_category_monthly_summaries").await,
        summary_ids(&db, "budget_monthly_summaries").await,
    );
    assert_eq!(ids_after, ids_before);
}

#[tokio::test]
async fn rebuild_picks_up_ledger_changes() {
    let (engine, _db) = engine_with_db().await;
    add(&engine, EntryKind::Revenue, 100_00, date(2025, 1, 15), "Sales").await;
    engine.rebuild_for_month(ym(2025, 1)).await.unwrap();

    add(&engine, EntryKind::Revenue, 50_00, date(2025, 1, 16), "Sales").await;
    engine.rebuild_for_month(ym(2025, 1)).await.unwrap();

    let stored = engine.finance_summary(ym(2025, 1)).await.unwrap().unwrap();
    assert_eq!(stored.revenue_total, Money::new(150_00));
}

#[tokio::test]
async fn failed_rebuild_commits_nothing() {
    let (engine, db) = engine_with_db().await;
    add(&engine, EntryKind::Revenue, 100_00, date(2025, 10, 1), "Sales").await;
    engine
        .upsert_budget(ym(2025, 10), "Rent", Money::new(10_00), Money::new(10_00))
        .await
        .unwrap();

    let backend = db.get_database_backend();
    db.execute(Statement::from_string(
        backend,
        "DROP TABLE budget_monthly_summaries;",
    ))
    .await
    .unwrap();

    let err = engine.rebuild_for_month(ym(2025, 10)).await.unwrap_err();
    assert!(matches!(err, EngineError::Database(_)), "unexpected error: {err}");

    // Finance and expense rows were written before the failure and must be
    // rolled back with it.
    assert_eq!(engine.finance_summary(ym(2025, 10)).await.unwrap(), None);
}

#[tokio::test]
async fn negative_amounts_are_rejected() {
    let (engine, _db) = engine_with_db().await;
    let err = engine
        .add_entry(
            EntryKind::Expense,
            NewEntry {
                amount: Money::new(-1),
                occurred_on: date(2025, 1, 1),
                category: "Food".to_string(),
                description: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let err = engine
        .upsert_budget(ym(2025, 1), "  ", Money::ZERO, Money::ZERO)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}
