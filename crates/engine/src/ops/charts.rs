//! Aggregations behind the dashboard charts. Everything here reads the
//! summary tables only, never the raw ledger.

use sea_orm::{Condition, QueryFilter, QueryOrder, QuerySelect, prelude::*, sea_query::Expr};
use serde::Serialize;

use crate::{
    Money, Project, ResultEngine, YearMonth, budget_monthly_summaries,
    expense_category_monthly_summaries, ledger::month_from_columns, projects,
};

use super::{Engine, month_columns};

/// Planned vs actual totals of one budget category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CategoryPlanFact {
    pub category: String,
    pub planned: Money,
    pub actual: Money,
}

impl Engine {
    /// Expense totals per category over every month since `since`, by category.
    pub async fn expenses_by_category(
        &self,
        since: YearMonth,
    ) -> ResultEngine<Vec<(String, Money)>> {
        let (year, month) = month_columns(since);
        let rows: Vec<(String, Option<i64>)> = expense_category_monthly_summaries::Entity::find()
            .select_only()
            .column(expense_category_monthly_summaries::Column::Category)
            .column_as(
                Expr::col(expense_category_monthly_summaries::Column::ExpenseTotalMinor).sum(),
                "total",
            )
            .filter(
                Condition::any()
                    .add(expense_category_monthly_summaries::Column::Year.gt(year))
                    .add(
                        Condition::all()
                            .add(expense_category_monthly_summaries::Column::Year.eq(year))
                            .add(expense_category_monthly_summaries::Column::Month.gte(month)),
                    ),
            )
            .group_by(expense_category_monthly_summaries::Column::Category)
            .order_by_asc(expense_category_monthly_summaries::Column::Category)
            .into_tuple()
            .all(&self.database)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(category, total)| (category, Money::new(total.unwrap_or(0))))
            .collect())
    }

    /// Planned vs actual per category, summed over every month since `since`.
    pub async fn budget_totals_by_category(
        &self,
        since: YearMonth,
    ) -> ResultEngine<Vec<CategoryPlanFact>> {
        let (year, month) = month_columns(since);
        let rows: Vec<(String, Option<i64>, Option<i64>)> =
            budget_monthly_summaries::Entity::find()
                .select_only()
                .column(budget_monthly_summaries::Column::Category)
                .column_as(
                    Expr::col(budget_monthly_summaries::Column::PlannedMinor).sum(),
                    "planned",
                )
                .column_as(
                    Expr::col(budget_monthly_summaries::Column::ActualMinor).sum(),
                    "actual",
                )
                .filter(
                    Condition::any()
                        .add(budget_monthly_summaries::Column::Year.gt(year))
                        .add(
                            Condition::all()
                                .add(budget_monthly_summaries::Column::Year.eq(year))
                                .add(budget_monthly_summaries::Column::Month.gte(month)),
                        ),
                )
                .group_by(budget_monthly_summaries::Column::Category)
                .order_by_asc(budget_monthly_summaries::Column::Category)
                .into_tuple()
                .all(&self.database)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(category, planned, actual)| CategoryPlanFact {
                category,
                planned: Money::new(planned.unwrap_or(0)),
                actual: Money::new(actual.unwrap_or(0)),
            })
            .collect())
    }

    /// Months that have budget summaries, newest first.
    pub async fn available_budget_months(&self) -> ResultEngine<Vec<YearMonth>> {
        let rows: Vec<(i32, i32)> = budget_monthly_summaries::Entity::find()
            .select_only()
            .column(budget_monthly_summaries::Column::Year)
            .column(budget_monthly_summaries::Column::Month)
            .distinct()
            .order_by_desc(budget_monthly_summaries::Column::Year)
            .order_by_desc(budget_monthly_summaries::Column::Month)
            .into_tuple()
            .all(&self.database)
            .await?;
        rows.into_iter()
            .map(|(year, month)| month_from_columns(year, month))
            .collect()
    }

    /// Projects ordered by ROI, best first; projects without ROI come last.
    pub async fn projects_by_roi(&self) -> ResultEngine<Vec<Project>> {
        projects::Entity::find()
            .order_by_desc(projects::Column::RoiBp)
            .order_by_asc(projects::Column::Name)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Project::try_from)
            .collect()
    }
}
