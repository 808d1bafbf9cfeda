//! Monthly summary rows.
//!
//! Each summary is a pure projection of the raw ledger for one month. The
//! `compute` constructors hold the arithmetic; the rebuild only feeds them
//! totals and persists the result.

use chrono::{DateTime, Utc};

use crate::{
    BudgetEntry, EngineError, Money, Percent, ResultEngine, YearMonth, budget_monthly_summaries,
    expense_category_monthly_summaries, finance_monthly_summaries, ledger::month_from_columns,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinanceSummary {
    pub month: YearMonth,
    pub revenue_total: Money,
    pub expense_total: Money,
    pub profit_total: Money,
    /// `None` when `revenue_total <= 0`.
    pub profit_margin: Option<Percent>,
    pub calculated_at: DateTime<Utc>,
}

impl FinanceSummary {
    pub fn compute(
        month: YearMonth,
        revenue_total: Money,
        expense_total: Money,
        calculated_at: DateTime<Utc>,
    ) -> Self {
        let profit_total = revenue_total - expense_total;
        let profit_margin = if revenue_total.is_positive() {
            Percent::ratio(profit_total, revenue_total)
        } else {
            None
        };
        Self {
            month,
            revenue_total,
            expense_total,
            profit_total,
            profit_margin,
            calculated_at,
        }
    }
}

impl TryFrom<finance_monthly_summaries::Model> for FinanceSummary {
    type Error = EngineError;

    fn try_from(model: finance_monthly_summaries::Model) -> ResultEngine<Self> {
        Ok(Self {
            month: month_from_columns(model.year, model.month)?,
            revenue_total: Money::new(model.revenue_total_minor),
            expense_total: Money::new(model.expense_total_minor),
            profit_total: Money::new(model.profit_total_minor),
            profit_margin: model.profit_margin_bp.map(Percent::from_basis_points),
            calculated_at: model.calculated_at,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpenseCategorySummary {
    pub month: YearMonth,
    pub category: String,
    pub expense_total: Money,
    pub calculated_at: DateTime<Utc>,
}

impl TryFrom<expense_category_monthly_summaries::Model> for ExpenseCategorySummary {
    type Error = EngineError;

    fn try_from(model: expense_category_monthly_summaries::Model) -> ResultEngine<Self> {
        Ok(Self {
            month: month_from_columns(model.year, model.month)?,
            category: model.category,
            expense_total: Money::new(model.expense_total_minor),
            calculated_at: model.calculated_at,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BudgetSummary {
    pub month: YearMonth,
    pub category: String,
    pub planned: Money,
    pub actual: Money,
    /// `actual - planned`.
    pub delta: Money,
    /// `None` when `planned == 0`.
    pub delta_pct: Option<Percent>,
    pub calculated_at: DateTime<Utc>,
}

impl BudgetSummary {
    pub fn compute(entry: &BudgetEntry, calculated_at: DateTime<Utc>) -> Self {
        let delta = entry.actual - entry.planned;
        Self {
            month: entry.month,
            category: entry.category.clone(),
            planned: entry.planned,
            actual: entry.actual,
            delta,
            delta_pct: Percent::ratio(delta, entry.planned),
            calculated_at,
        }
    }
}

impl TryFrom<budget_monthly_summaries::Model> for BudgetSummary {
    type Error = EngineError;

    fn try_from(model: budget_monthly_summaries::Model) -> ResultEngine<Self> {
        Ok(Self {
            month: month_from_columns(model.year, model.month)?,
            category: model.category,
            planned: Money::new(model.planned_minor),
            actual: Money::new(model.actual_minor),
            delta: Money::new(model.delta_minor),
            delta_pct: model.delta_bp.map(Percent::from_basis_points),
            calculated_at: model.calculated_at,
        })
    }
}
