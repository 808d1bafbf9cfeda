//! Raw ledger primitives: revenue/expense entries, budget lines and projects.
//!
//! The ledger is the source of truth; summaries are derived from it by the
//! month rebuild.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    EngineError, Money, Percent, ResultEngine, YearMonth, budgets, expenses, projects, revenues,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Revenue,
    Expense,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Revenue => "revenue",
            Self::Expense => "expense",
        }
    }
}

impl TryFrom<&str> for EntryKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "revenue" | "revenues" => Ok(Self::Revenue),
            "expense" | "expenses" => Ok(Self::Expense),
            other => Err(EngineError::InvalidInput(format!(
                "invalid entry kind: {other}"
            ))),
        }
    }
}

/// A revenue or expense line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i32,
    pub kind: EntryKind,
    pub amount: Money,
    pub occurred_on: NaiveDate,
    pub category: String,
    pub description: Option<String>,
}

impl From<revenues::Model> for LedgerEntry {
    fn from(model: revenues::Model) -> Self {
        Self {
            id: model.id,
            kind: EntryKind::Revenue,
            amount: Money::new(model.amount_minor),
            occurred_on: model.occurred_on,
            category: model.category,
            description: model.description,
        }
    }
}

impl From<expenses::Model> for LedgerEntry {
    fn from(model: expenses::Model) -> Self {
        Self {
            id: model.id,
            kind: EntryKind::Expense,
            amount: Money::new(model.amount_minor),
            occurred_on: model.occurred_on,
            category: model.category,
            description: model.description,
        }
    }
}

/// Input for a new revenue or expense line.
#[derive(Clone, Debug)]
pub struct NewEntry {
    pub amount: Money,
    pub occurred_on: NaiveDate,
    pub category: String,
    pub description: Option<String>,
}

/// Planned vs actual amount for one category in one month.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BudgetEntry {
    pub id: i32,
    pub month: YearMonth,
    pub category: String,
    pub planned: Money,
    pub actual: Money,
}

impl TryFrom<budgets::Model> for BudgetEntry {
    type Error = EngineError;

    fn try_from(model: budgets::Model) -> ResultEngine<Self> {
        Ok(Self {
            id: model.id,
            month: month_from_columns(model.year, model.month)?,
            category: model.category,
            planned: Money::new(model.planned_minor),
            actual: Money::new(model.actual_minor),
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Active,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl TryFrom<&str> for ProjectStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::InvalidInput(format!(
                "invalid project status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Project {
    pub id: i32,
    pub name: String,
    pub investment: Money,
    pub return_amount: Money,
    /// `100 * (return - investment) / investment`; `None` without investment.
    pub roi: Option<Percent>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: ProjectStatus,
}

impl Project {
    pub fn roi_for(investment: Money, return_amount: Money) -> Option<Percent> {
        Percent::ratio(return_amount - investment, investment)
    }
}

impl TryFrom<projects::Model> for Project {
    type Error = EngineError;

    fn try_from(model: projects::Model) -> ResultEngine<Self> {
        Ok(Self {
            id: model.id,
            name: model.name,
            investment: Money::new(model.investment_minor),
            return_amount: Money::new(model.return_minor),
            roi: model.roi_bp.map(Percent::from_basis_points),
            start_date: model.start_date,
            end_date: model.end_date,
            status: ProjectStatus::try_from(model.status.as_str())?,
        })
    }
}

/// Input for a new project.
#[derive(Clone, Debug)]
pub struct NewProject {
    pub name: String,
    pub investment: Money,
    pub return_amount: Money,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: ProjectStatus,
}

pub(crate) fn month_from_columns(year: i32, month: i32) -> ResultEngine<YearMonth> {
    let month = u32::try_from(month)
        .map_err(|_| EngineError::InvalidMonth(format!("invalid stored month: {month}")))?;
    YearMonth::new(year, month)
}
