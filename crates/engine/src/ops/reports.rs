use sea_orm::{Condition, QueryFilter, QueryOrder, Select, prelude::*, sea_query::Order as SqlOrder};

use crate::{
    BudgetSummary, EngineError, ExpenseCategorySummary, FinanceSummary, ResultEngine, YearMonth,
    budget_monthly_summaries, expense_category_monthly_summaries, finance_monthly_summaries,
};

use super::{Engine, month_columns};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Order {
    Asc,
    #[default]
    Desc,
}

impl From<Order> for SqlOrder {
    fn from(value: Order) -> Self {
        match value {
            Order::Asc => SqlOrder::Asc,
            Order::Desc => SqlOrder::Desc,
        }
    }
}

/// Month window for summary listings. Both ends are inclusive; `order`
/// applies to the month, categories are always ascending within a month.
#[derive(Clone, Copy, Debug, Default)]
pub struct SummaryFilter {
    pub from: Option<YearMonth>,
    pub to: Option<YearMonth>,
    pub order: Order,
}

impl SummaryFilter {
    pub fn since(from: YearMonth, order: Order) -> Self {
        Self {
            from: Some(from),
            to: None,
            order,
        }
    }

    pub fn single(month: YearMonth) -> Self {
        Self {
            from: Some(month),
            to: Some(month),
            order: Order::Asc,
        }
    }

    fn validate(&self) -> ResultEngine<()> {
        if let (Some(from), Some(to)) = (self.from, self.to)
            && from > to
        {
            return Err(EngineError::InvalidRange(format!(
                "'from' ({from}) must be before or equal to 'to' ({to})"
            )));
        }
        Ok(())
    }
}

/// Applies a [`SummaryFilter`] to any query over a `(year, month)` keyed
/// summary table.
trait ApplyMonthWindow: Sized {
    fn month_window<C: ColumnTrait>(self, year: C, month: C, filter: &SummaryFilter) -> Self;
}

impl<E: EntityTrait> ApplyMonthWindow for Select<E> {
    fn month_window<C: ColumnTrait>(self, year: C, month: C, filter: &SummaryFilter) -> Self {
        let mut condition = Condition::all();
        if let Some(from) = filter.from {
            let (from_year, from_month) = month_columns(from);
            condition = condition.add(
                Condition::any().add(year.gt(from_year)).add(
                    Condition::all()
                        .add(year.eq(from_year))
                        .add(month.gte(from_month)),
                ),
            );
        }
        if let Some(to) = filter.to {
            let (to_year, to_month) = month_columns(to);
            condition = condition.add(
                Condition::any().add(year.lt(to_year)).add(
                    Condition::all()
                        .add(year.eq(to_year))
                        .add(month.lte(to_month)),
                ),
            );
        }
        self.filter(condition)
            .order_by(year, filter.order.into())
            .order_by(month, filter.order.into())
    }
}

impl Engine {
    /// Finance summaries inside the window.
    pub async fn finance_summaries(
        &self,
        filter: &SummaryFilter,
    ) -> ResultEngine<Vec<FinanceSummary>> {
        filter.validate()?;
        finance_monthly_summaries::Entity::find()
            .month_window(
                finance_monthly_summaries::Column::Year,
                finance_monthly_summaries::Column::Month,
                filter,
            )
            .all(&self.database)
            .await?
            .into_iter()
            .map(FinanceSummary::try_from)
            .collect()
    }

    /// The finance summary of one month, if it has been built.
    pub async fn finance_summary(&self, month: YearMonth) -> ResultEngine<Option<FinanceSummary>> {
        let (year, month_no) = month_columns(month);
        finance_monthly_summaries::Entity::find()
            .filter(finance_monthly_summaries::Column::Year.eq(year))
            .filter(finance_monthly_summaries::Column::Month.eq(month_no))
            .one(&self.database)
            .await?
            .map(FinanceSummary::try_from)
            .transpose()
    }

    pub async fn expense_category_summaries(
        &self,
        filter: &SummaryFilter,
    ) -> ResultEngine<Vec<ExpenseCategorySummary>> {
        filter.validate()?;
        expense_category_monthly_summaries::Entity::find()
            .month_window(
                expense_category_monthly_summaries::Column::Year,
                expense_category_monthly_summaries::Column::Month,
                filter,
            )
            .order_by_asc(expense_category_monthly_summaries::Column::Category)
            .all(&self.database)
            .await?
            .into_iter()
            .map(ExpenseCategorySummary::try_from)
            .collect()
    }

    pub async fn budget_summaries(
        &self,
        filter: &SummaryFilter,
    ) -> ResultEngine<Vec<BudgetSummary>> {
        filter.validate()?;
        budget_monthly_summaries::Entity::find()
            .month_window(
                budget_monthly_summaries::Column::Year,
                budget_monthly_summaries::Column::Month,
                filter,
            )
            .order_by_asc(budget_monthly_summaries::Column::Category)
            .all(&self.database)
            .await?
            .into_iter()
            .map(BudgetSummary::try_from)
            .collect()
    }
}
