//! Admin reports over the monthly summaries, as JSON or as downloads.

use api_types::reports::{
    BudgetPlanFactRow, ExportFormat, MonthlySummaryRow, OperationsQuery, ReportQuery, SortOrder,
};
use axum::{
    Json,
    extract::{Query, State},
    response::Response,
};
use engine::{
    BudgetSummary, EntryKind, FinanceSummary, OperationFilter, Order, SummaryFilter, YearMonth,
};

use crate::{
    ServerError,
    export::{Cell, Table, attachment, filename},
    server::ServerState,
};

const SUMMARY_HEADERS: &[&str] = &[
    "Month",
    "Revenue",
    "Expenses",
    "Profit",
    "Margin %",
    "Calculated at",
];
const BUDGET_HEADERS: &[&str] = &[
    "Month",
    "Category",
    "Planned",
    "Actual",
    "Delta",
    "Delta %",
    "Calculated at",
];
const OPERATION_HEADERS: &[&str] = &["Date", "Category", "Amount", "Description"];

fn summary_filter(query: &ReportQuery) -> Result<SummaryFilter, ServerError> {
    let parse = |raw: &Option<String>| -> Result<Option<YearMonth>, ServerError> {
        raw.as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(str::parse::<YearMonth>)
            .transpose()
            .map_err(ServerError::from)
    };
    Ok(SummaryFilter {
        from: parse(&query.from)?,
        to: parse(&query.to)?,
        order: match query.order.unwrap_or_default() {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        },
    })
}

fn download(
    table: Table,
    report: &str,
    from: Option<String>,
    to: Option<String>,
    format: ExportFormat,
) -> Result<Response, ServerError> {
    let bytes = table.render(format)?;
    let name = filename(report, from.as_deref(), to.as_deref(), format);
    tracing::info!(report, file = %name, "report exported");
    Ok(attachment(bytes, &name, format))
}

fn summary_row(row: FinanceSummary) -> MonthlySummaryRow {
    MonthlySummaryRow {
        month: row.month.to_string(),
        revenue_total_minor: row.revenue_total.minor(),
        expense_total_minor: row.expense_total.minor(),
        profit_total_minor: row.profit_total.minor(),
        profit_margin: row.profit_margin.map(|p| p.to_string()),
        calculated_at: row.calculated_at,
    }
}

fn budget_row(row: BudgetSummary) -> BudgetPlanFactRow {
    BudgetPlanFactRow {
        month: row.month.to_string(),
        category: row.category,
        planned_minor: row.planned.minor(),
        actual_minor: row.actual.minor(),
        delta_minor: row.delta.minor(),
        delta_pct: row.delta_pct.map(|p| p.to_string()),
        calculated_at: row.calculated_at,
    }
}

pub async fn monthly_summary(
    State(state): State<ServerState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Vec<MonthlySummaryRow>>, ServerError> {
    let filter = summary_filter(&query)?;
    let rows = state.engine.finance_summaries(&filter).await?;
    Ok(Json(rows.into_iter().map(summary_row).collect()))
}

pub async fn monthly_summary_export(
    State(state): State<ServerState>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, ServerError> {
    let filter = summary_filter(&query)?;
    let rows = state.engine.finance_summaries(&filter).await?;
    let table = Table {
        sheet: "Monthly summary",
        headers: SUMMARY_HEADERS,
        rows: rows
            .into_iter()
            .map(|row| {
                vec![
                    Cell::Text(row.month.to_string()),
                    Cell::Money(row.revenue_total),
                    Cell::Money(row.expense_total),
                    Cell::Money(row.profit_total),
                    Cell::Percent(row.profit_margin),
                    Cell::Text(row.calculated_at.format("%Y-%m-%d %H:%M:%S").to_string()),
                ]
            })
            .collect(),
    };
    download(
        table,
        "monthly-summary",
        filter.from.map(|m| m.to_string()),
        filter.to.map(|m| m.to_string()),
        query.format.unwrap_or_default(),
    )
}

pub async fn budget_plan_fact(
    State(state): State<ServerState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Vec<BudgetPlanFactRow>>, ServerError> {
    let filter = summary_filter(&query)?;
    let rows = state.engine.budget_summaries(&filter).await?;
    Ok(Json(rows.into_iter().map(budget_row).collect()))
}

pub async fn budget_plan_fact_export(
    State(state): State<ServerState>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, ServerError> {
    let filter = summary_filter(&query)?;
    let rows = state.engine.budget_summaries(&filter).await?;
    let table = Table {
        sheet: "Budget plan-fact",
        headers: BUDGET_HEADERS,
        rows: rows
            .into_iter()
            .map(|row| {
                vec![
                    Cell::Text(row.month.to_string()),
                    Cell::Text(row.category),
                    Cell::Money(row.planned),
                    Cell::Money(row.actual),
                    Cell::Money(row.delta),
                    Cell::Percent(row.delta_pct),
                    Cell::Text(row.calculated_at.format("%Y-%m-%d %H:%M:%S").to_string()),
                ]
            })
            .collect(),
    };
    download(
        table,
        "budget-plan-fact",
        filter.from.map(|m| m.to_string()),
        filter.to.map(|m| m.to_string()),
        query.format.unwrap_or_default(),
    )
}

/// Raw revenue or expense lines (`type=revenue|expense`) between two dates.
pub async fn operations_export(
    State(state): State<ServerState>,
    Query(query): Query<OperationsQuery>,
) -> Result<Response, ServerError> {
    let kind = EntryKind::try_from(query.kind.as_str())?;
    let entries = state
        .engine
        .list_operations(
            kind,
            &OperationFilter {
                from: query.from,
                to: query.to,
            },
        )
        .await?;
    let table = Table {
        sheet: "Operations",
        headers: OPERATION_HEADERS,
        rows: entries
            .into_iter()
            .map(|entry| {
                vec![
                    Cell::Text(entry.occurred_on.to_string()),
                    Cell::Text(entry.category),
                    Cell::Money(entry.amount),
                    Cell::Text(entry.description.unwrap_or_default()),
                ]
            })
            .collect(),
    };
    download(
        table,
        &format!("operations_{}", kind.as_str()),
        query.from.map(|d| d.to_string()),
        query.to.map(|d| d.to_string()),
        query.format.unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_query_accepts_months_and_dates() {
        let query = ReportQuery {
            from: Some("2025-01-15".to_string()),
            to: Some("2025-03".to_string()),
            order: Some(SortOrder::Asc),
            format: None,
        };
        let filter = summary_filter(&query).unwrap_or_else(|_| panic!("valid query"));
        assert_eq!(filter.from.map(|m| m.to_string()).as_deref(), Some("2025-01"));
        assert_eq!(filter.to.map(|m| m.to_string()).as_deref(), Some("2025-03"));
        assert_eq!(filter.order, Order::Asc);
    }

    #[test]
    fn report_query_rejects_bad_month() {
        let query = ReportQuery {
            from: Some("2025-13".to_string()),
            ..Default::default()
        };
        assert!(summary_filter(&query).is_err());
    }
}
