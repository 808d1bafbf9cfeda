//! Month rebuild: recomputes every summary of one calendar month from the raw
//! ledger inside a single DB transaction.
//!
//! The three summary families are written in a fixed order (finance, expense
//! categories, budgets). Any failure rolls the whole month back, so readers
//! never observe a half-rebuilt month.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*,
    sea_query::{Expr, OnConflict},
};

use crate::{
    BudgetEntry, BudgetSummary, FinanceSummary, Money, ResultEngine, YearMonth,
    budget_monthly_summaries, budgets, expense_category_monthly_summaries, expenses,
    finance_monthly_summaries, revenues,
};

use super::{Engine, month_columns, with_tx};

/// What a single month rebuild wrote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RebuildReport {
    pub finance: FinanceSummary,
    /// Categories with at least one expense in the month.
    pub expense_categories: Vec<String>,
    /// Categories with a budget entry in the month.
    pub budget_categories: Vec<String>,
    /// Stale per-category rows deleted across both category tables.
    pub pruned: u64,
}

impl Engine {
    /// Recompute the finance, expense-category and budget summaries of `month`.
    ///
    /// Idempotent: running it twice over an unchanged ledger leaves the same
    /// rows behind (only `calculated_at` moves). Errors are returned unchanged
    /// and nothing is committed.
    pub async fn rebuild_for_month(&self, month: YearMonth) -> ResultEngine<RebuildReport> {
        let report = self.rebuild_month_in_tx(month).await?;
        tracing::info!(
            %month,
            revenue = %report.finance.revenue_total,
            expense = %report.finance.expense_total,
            expense_categories = report.expense_categories.len(),
            budget_categories = report.budget_categories.len(),
            pruned = report.pruned,
            "rebuilt monthly summaries"
        );
        Ok(report)
    }

    async fn rebuild_month_in_tx(&self, month: YearMonth) -> ResultEngine<RebuildReport> {
        let calculated_at = Utc::now();
        with_tx!(self, |db_tx| {
            let finance = rebuild_finance(&db_tx, month, calculated_at).await?;
            let (expense_categories, pruned_expenses) =
                rebuild_expense_categories(&db_tx, month, calculated_at).await?;
            let (budget_categories, pruned_budgets) =
                rebuild_budgets(&db_tx, month, calculated_at).await?;
            Ok(RebuildReport {
                finance,
                expense_categories,
                budget_categories,
                pruned: pruned_expenses + pruned_budgets,
            })
        })
    }
}

async fn rebuild_finance(
    db_tx: &DatabaseTransaction,
    month: YearMonth,
    calculated_at: DateTime<Utc>,
) -> ResultEngine<FinanceSummary> {
    let revenue_total = sum_in_month::<revenues::Entity>(
        db_tx,
        revenues::Column::AmountMinor,
        revenues::Column::OccurredOn,
        month,
    )
    .await?;
    let expense_total = sum_in_month::<expenses::Entity>(
        db_tx,
        expenses::Column::AmountMinor,
        expenses::Column::OccurredOn,
        month,
    )
    .await?;

    let summary = FinanceSummary::compute(month, revenue_total, expense_total, calculated_at);
    let (year, month_no) = month_columns(month);

    let model = finance_monthly_summaries::ActiveModel {
        year: ActiveValue::Set(year),
        month: ActiveValue::Set(month_no),
        revenue_total_minor: ActiveValue::Set(summary.revenue_total.minor()),
        expense_total_minor: ActiveValue::Set(summary.expense_total.minor()),
        profit_total_minor: ActiveValue::Set(summary.profit_total.minor()),
        profit_margin_bp: ActiveValue::Set(summary.profit_margin.map(|p| p.basis_points())),
        calculated_at: ActiveValue::Set(calculated_at),
        ..Default::default()
    };
    finance_monthly_summaries::Entity::insert(model)
        .on_conflict(
            OnConflict::columns([
                finance_monthly_summaries::Column::Year,
                finance_monthly_summaries::Column::Month,
            ])
            .update_columns([
                finance_monthly_summaries::Column::RevenueTotalMinor,
                finance_monthly_summaries::Column::ExpenseTotalMinor,
                finance_monthly_summaries::Column::ProfitTotalMinor,
                finance_monthly_summaries::Column::ProfitMarginBp,
                finance_monthly_summaries::Column::CalculatedAt,
            ])
            .to_owned(),
        )
        .exec_without_returning(db_tx)
        .await?;

    Ok(summary)
}

async fn rebuild_expense_categories(
    db_tx: &DatabaseTransaction,
    month: YearMonth,
    calculated_at: DateTime<Utc>,
) -> ResultEngine<(Vec<String>, u64)> {
    let (start, end) = month.date_bounds();
    let totals: Vec<(String, i64)> = expenses::Entity::find()
        .select_only()
        .column(expenses::Column::Category)
        .column_as(Expr::col(expenses::Column::AmountMinor).sum(), "total")
        .filter(expenses::Column::OccurredOn.gte(start))
        .filter(expenses::Column::OccurredOn.lt(end))
        .group_by(expenses::Column::Category)
        .order_by_asc(expenses::Column::Category)
        .into_tuple()
        .all(db_tx)
        .await?;

    let (year, month_no) = month_columns(month);
    for (category, total) in &totals {
        let model = expense_category_monthly_summaries::ActiveModel {
            year: ActiveValue::Set(year),
            month: ActiveValue::Set(month_no),
            category: ActiveValue::Set(category.clone()),
            expense_total_minor: ActiveValue::Set(*total),
            calculated_at: ActiveValue::Set(calculated_at),
            ..Default::default()
        };
        expense_category_monthly_summaries::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    expense_category_monthly_summaries::Column::Year,
                    expense_category_monthly_summaries::Column::Month,
                    expense_category_monthly_summaries::Column::Category,
                ])
                .update_columns([
                    expense_category_monthly_summaries::Column::ExpenseTotalMinor,
                    expense_category_monthly_summaries::Column::CalculatedAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(db_tx)
            .await?;
    }

    let categories: Vec<String> = totals.into_iter().map(|(category, _)| category).collect();
    let pruned =
        prune_stale_categories::<expense_category_monthly_summaries::Entity>(db_tx, month, &categories)
            .await?;
    Ok((categories, pruned))
}

async fn rebuild_budgets(
    db_tx: &DatabaseTransaction,
    month: YearMonth,
    calculated_at: DateTime<Utc>,
) -> ResultEngine<(Vec<String>, u64)> {
    let (year, month_no) = month_columns(month);
    let entries = budgets::Entity::find()
        .filter(budgets::Column::Year.eq(year))
        .filter(budgets::Column::Month.eq(month_no))
        .order_by_asc(budgets::Column::Category)
        .all(db_tx)
        .await?
        .into_iter()
        .map(BudgetEntry::try_from)
        .collect::<ResultEngine<Vec<_>>>()?;

    let mut categories = Vec::with_capacity(entries.len());
    for entry in &entries {
        let summary = BudgetSummary::compute(entry, calculated_at);
        let model = budget_monthly_summaries::ActiveModel {
            year: ActiveValue::Set(year),
            month: ActiveValue::Set(month_no),
            category: ActiveValue::Set(summary.category.clone()),
            planned_minor: ActiveValue::Set(summary.planned.minor()),
            actual_minor: ActiveValue::Set(summary.actual.minor()),
            delta_minor: ActiveValue::Set(summary.delta.minor()),
            delta_bp: ActiveValue::Set(summary.delta_pct.map(|p| p.basis_points())),
            calculated_at: ActiveValue::Set(calculated_at),
            ..Default::default()
        };
        budget_monthly_summaries::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    budget_monthly_summaries::Column::Year,
                    budget_monthly_summaries::Column::Month,
                    budget_monthly_summaries::Column::Category,
                ])
                .update_columns([
                    budget_monthly_summaries::Column::PlannedMinor,
                    budget_monthly_summaries::Column::ActualMinor,
                    budget_monthly_summaries::Column::DeltaMinor,
                    budget_monthly_summaries::Column::DeltaBp,
                    budget_monthly_summaries::Column::CalculatedAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(db_tx)
            .await?;
        categories.push(summary.category);
    }

    let pruned =
        prune_stale_categories::<budget_monthly_summaries::Entity>(db_tx, month, &categories)
            .await?;
    Ok((categories, pruned))
}

/// Sum of `amount` over rows whose `date` falls inside `month`; zero when
/// there are none.
async fn sum_in_month<E: EntityTrait>(
    db_tx: &DatabaseTransaction,
    amount: E::Column,
    date: E::Column,
    month: YearMonth,
) -> ResultEngine<Money> {
    let (start, end) = month.date_bounds();
    let total: Option<Option<i64>> = E::find()
        .select_only()
        .column_as(Expr::col(amount).sum(), "total")
        .filter(date.gte(start))
        .filter(date.lt(end))
        .into_tuple()
        .one(db_tx)
        .await?;
    Ok(Money::new(total.flatten().unwrap_or(0)))
}

/// Summary tables holding one row per `(year, month, category)`.
trait MonthlyCategoryTable: EntityTrait {
    fn year_column() -> Self::Column;
    fn month_column() -> Self::Column;
    fn category_column() -> Self::Column;
}

impl MonthlyCategoryTable for expense_category_monthly_summaries::Entity {
    fn year_column() -> Self::Column {
        expense_category_monthly_summaries::Column::Year
    }

    fn month_column() -> Self::Column {
        expense_category_monthly_summaries::Column::Month
    }

    fn category_column() -> Self::Column {
        expense_category_monthly_summaries::Column::Category
    }
}

impl MonthlyCategoryTable for budget_monthly_summaries::Entity {
    fn year_column() -> Self::Column {
        budget_monthly_summaries::Column::Year
    }

    fn month_column() -> Self::Column {
        budget_monthly_summaries::Column::Month
    }

    fn category_column() -> Self::Column {
        budget_monthly_summaries::Column::Category
    }
}

/// Delete the rows of `month` whose category is not in `keep`. An empty
/// `keep` clears the month.
async fn prune_stale_categories<E: MonthlyCategoryTable>(
    db_tx: &DatabaseTransaction,
    month: YearMonth,
    keep: &[String],
) -> ResultEngine<u64> {
    let (year, month_no) = month_columns(month);
    let mut delete = E::delete_many()
        .filter(E::year_column().eq(year))
        .filter(E::month_column().eq(month_no));
    if !keep.is_empty() {
        delete = delete.filter(E::category_column().is_not_in(keep.iter().map(String::as_str)));
    }
    let result = delete.exec(db_tx).await?;
    Ok(result.rows_affected)
}
