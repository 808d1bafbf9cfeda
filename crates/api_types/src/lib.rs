//! JSON types exchanged over the HTTP API.
//!
//! Money travels as integer minor units (`*_minor`), percentages as decimal
//! strings with two fractional digits (`"10.00"`).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub mod user {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Me {
        pub username: String,
        pub role: String,
    }
}

pub mod charts {
    use super::*;

    /// Query string of the chart endpoints.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ChartQuery {
        /// Window size in months, counted back from the current month.
        pub months: Option<u32>,
        pub year: Option<i32>,
        pub month: Option<u32>,
    }

    /// One value per label, plus their sum.
    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Series {
        pub labels: Vec<String>,
        pub values_minor: Vec<i64>,
        pub total_minor: i64,
    }

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct BudgetVsFact {
        pub labels: Vec<String>,
        pub planned_minor: Vec<i64>,
        pub actual_minor: Vec<i64>,
    }

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct BudgetMonth {
        pub year: i32,
        pub month: u32,
        pub label: String,
    }

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ProjectRoi {
        pub name: String,
        pub investment_minor: i64,
        pub return_minor: i64,
        pub roi: Option<String>,
        pub status: String,
    }
}

pub mod reports {
    use super::*;

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum ExportFormat {
        #[default]
        Csv,
        Xlsx,
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum SortOrder {
        Asc,
        #[default]
        Desc,
    }

    /// `from` / `to` accept `YYYY-MM` or `YYYY-MM-DD`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ReportQuery {
        pub from: Option<String>,
        pub to: Option<String>,
        pub order: Option<SortOrder>,
        pub format: Option<ExportFormat>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OperationsQuery {
        #[serde(rename = "type")]
        pub kind: String,
        pub from: Option<NaiveDate>,
        pub to: Option<NaiveDate>,
        pub format: Option<ExportFormat>,
    }

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct MonthlySummaryRow {
        pub month: String,
        pub revenue_total_minor: i64,
        pub expense_total_minor: i64,
        pub profit_total_minor: i64,
        pub profit_margin: Option<String>,
        pub calculated_at: DateTime<Utc>,
    }

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct BudgetPlanFactRow {
        pub month: String,
        pub category: String,
        pub planned_minor: i64,
        pub actual_minor: i64,
        pub delta_minor: i64,
        pub delta_pct: Option<String>,
        pub calculated_at: DateTime<Utc>,
    }
}

pub mod metrics {
    use super::*;

    /// Either `month`, or both `from` and `to`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct RebuildRequest {
        pub month: Option<String>,
        pub from: Option<String>,
        pub to: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RebuildAccepted {
        pub queued: usize,
    }
}
