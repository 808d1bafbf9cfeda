//! Dashboard chart endpoints.
//!
//! Windows are counted back from the current month: `months=12` starts
//! twelve months before the current one and includes it.

use api_types::charts::{BudgetMonth, BudgetVsFact, ChartQuery, ProjectRoi, Series};
use axum::{
    Json,
    extract::{Query, State},
};
use engine::{Money, Order, SummaryFilter, YearMonth};

use crate::{ServerError, server::ServerState};

const MAX_WINDOW_MONTHS: u32 = 120;

fn window_start(query: &ChartQuery, default_months: u32) -> Result<YearMonth, ServerError> {
    let months = query.months.unwrap_or(default_months);
    if months == 0 || months > MAX_WINDOW_MONTHS {
        return Err(ServerError::Generic(format!(
            "months must be between 1 and {MAX_WINDOW_MONTHS}"
        )));
    }
    Ok(YearMonth::current().minus_months(months))
}

fn series(points: impl IntoIterator<Item = (String, Money)>) -> Series {
    let (labels, values): (Vec<String>, Vec<Money>) = points.into_iter().unzip();
    Series {
        labels,
        total_minor: values.iter().copied().sum::<Money>().minor(),
        values_minor: values.into_iter().map(Money::minor).collect(),
    }
}

/// Revenue per month over the window (default 12 months).
pub async fn revenue(
    State(state): State<ServerState>,
    Query(query): Query<ChartQuery>,
) -> Result<Json<Series>, ServerError> {
    let since = window_start(&query, 12)?;
    let rows = state
        .engine
        .finance_summaries(&SummaryFilter::since(since, Order::Asc))
        .await?;
    Ok(Json(series(
        rows.into_iter()
            .map(|row| (row.month.short_label(), row.revenue_total)),
    )))
}

/// Expense totals per category over the window (default 12 months).
pub async fn expenses(
    State(state): State<ServerState>,
    Query(query): Query<ChartQuery>,
) -> Result<Json<Series>, ServerError> {
    let since = window_start(&query, 12)?;
    let rows = state.engine.expenses_by_category(since).await?;
    Ok(Json(series(rows)))
}

/// Profit per month over the window (default 6 months).
pub async fn profit(
    State(state): State<ServerState>,
    Query(query): Query<ChartQuery>,
) -> Result<Json<Series>, ServerError> {
    let since = window_start(&query, 6)?;
    let rows = state
        .engine
        .finance_summaries(&SummaryFilter::since(since, Order::Asc))
        .await?;
    Ok(Json(series(
        rows.into_iter()
            .map(|row| (row.month.short_label(), row.profit_total)),
    )))
}

/// Planned vs actual per category: for one month when both `year` and
/// `month` are given, otherwise summed over the window (default 6 months).
pub async fn budget_vs_fact(
    State(state): State<ServerState>,
    Query(query): Query<ChartQuery>,
) -> Result<Json<BudgetVsFact>, ServerError> {
    let rows: Vec<(String, Money, Money)> = match (query.year, query.month) {
        (Some(year), Some(month)) => {
            let month = YearMonth::new(year, month)?;
            state
                .engine
                .budget_summaries(&SummaryFilter::single(month))
                .await?
                .into_iter()
                .map(|row| (row.category, row.planned, row.actual))
                .collect()
        }
        _ => {
            let since = window_start(&query, 6)?;
            state
                .engine
                .budget_totals_by_category(since)
                .await?
                .into_iter()
                .map(|row| (row.category, row.planned, row.actual))
                .collect()
        }
    };

    let mut chart = BudgetVsFact {
        labels: Vec::with_capacity(rows.len()),
        planned_minor: Vec::with_capacity(rows.len()),
        actual_minor: Vec::with_capacity(rows.len()),
    };
    for (category, planned, actual) in rows {
        chart.labels.push(category);
        chart.planned_minor.push(planned.minor());
        chart.actual_minor.push(actual.minor());
    }
    Ok(Json(chart))
}

pub async fn available_budget_months(
    State(state): State<ServerState>,
) -> Result<Json<Vec<BudgetMonth>>, ServerError> {
    let months = state.engine.available_budget_months().await?;
    Ok(Json(
        months
            .into_iter()
            .map(|month| BudgetMonth {
                year: month.year(),
                month: month.month(),
                label: month.long_label(),
            })
            .collect(),
    ))
}

/// Projects by ROI, best first.
pub async fn roi(State(state): State<ServerState>) -> Result<Json<Vec<ProjectRoi>>, ServerError> {
    let projects = state.engine.projects_by_roi().await?;
    Ok(Json(
        projects
            .into_iter()
            .map(|project| ProjectRoi {
                name: project.name,
                investment_minor: project.investment.minor(),
                return_minor: project.return_amount.minor(),
                roi: project.roi.map(|roi| roi.to_string()),
                status: project.status.as_str().to_string(),
            })
            .collect(),
    ))
}
