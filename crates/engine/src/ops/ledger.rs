use chrono::NaiveDate;
use sea_orm::{
    ActiveValue, Condition, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::OnConflict,
};

use crate::{
    BudgetEntry, EngineError, EntryKind, LedgerEntry, Money, NewEntry, NewProject, Project,
    ResultEngine, YearMonth, budgets, expenses, projects, revenues,
};

use super::{Engine, month_columns, normalize_optional_text, normalize_required_name, with_tx};

/// Filters for listing revenue or expense lines.
///
/// Both bounds are inclusive calendar dates.
#[derive(Clone, Debug, Default)]
pub struct OperationFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

fn validate_amount(amount: Money, label: &str) -> ResultEngine<()> {
    if amount.is_negative() {
        return Err(EngineError::InvalidAmount(format!(
            "{label} must not be negative"
        )));
    }
    Ok(())
}

fn date_condition<C: ColumnTrait>(column: C, filter: &OperationFilter) -> Condition {
    let mut condition = Condition::all();
    if let Some(from) = filter.from {
        condition = condition.add(column.gte(from));
    }
    if let Some(to) = filter.to {
        condition = condition.add(column.lte(to));
    }
    condition
}

impl Engine {
    /// Record a revenue or expense line.
    pub async fn add_entry(&self, kind: EntryKind, entry: NewEntry) -> ResultEngine<LedgerEntry> {
        validate_amount(entry.amount, "amount")?;
        let category = normalize_required_name(&entry.category, "category")?;
        let description = normalize_optional_text(entry.description.as_deref());

        with_tx!(self, |db_tx| {
            let created: LedgerEntry = match kind {
                EntryKind::Revenue => revenues::ActiveModel {
                    amount_minor: ActiveValue::Set(entry.amount.minor()),
                    occurred_on: ActiveValue::Set(entry.occurred_on),
                    category: ActiveValue::Set(category),
                    description: ActiveValue::Set(description),
                    ..Default::default()
                }
                .insert(&db_tx)
                .await?
                .into(),
                EntryKind::Expense => expenses::ActiveModel {
                    amount_minor: ActiveValue::Set(entry.amount.minor()),
                    occurred_on: ActiveValue::Set(entry.occurred_on),
                    category: ActiveValue::Set(category),
                    description: ActiveValue::Set(description),
                    ..Default::default()
                }
                .insert(&db_tx)
                .await?
                .into(),
            };
            Ok(created)
        })
    }

    /// Delete a revenue or expense line by id.
    pub async fn delete_entry(&self, kind: EntryKind, id: i32) -> ResultEngine<()> {
        let result = match kind {
            EntryKind::Revenue => revenues::Entity::delete_by_id(id).exec(&self.database).await?,
            EntryKind::Expense => expenses::Entity::delete_by_id(id).exec(&self.database).await?,
        };
        if result.rows_affected == 0 {
            return Err(EngineError::KeyNotFound(format!("{} {id}", kind.as_str())));
        }
        Ok(())
    }

    /// List revenue or expense lines, newest first.
    pub async fn list_operations(
        &self,
        kind: EntryKind,
        filter: &OperationFilter,
    ) -> ResultEngine<Vec<LedgerEntry>> {
        if let (Some(from), Some(to)) = (filter.from, filter.to)
            && from > to
        {
            return Err(EngineError::InvalidRange(format!(
                "'from' ({from}) must be before or equal to 'to' ({to})"
            )));
        }

        let entries = match kind {
            EntryKind::Revenue => revenues::Entity::find()
                .filter(date_condition(revenues::Column::OccurredOn, filter))
                .order_by_desc(revenues::Column::OccurredOn)
                .order_by_desc(revenues::Column::Id)
                .all(&self.database)
                .await?
                .into_iter()
                .map(LedgerEntry::from)
                .collect(),
            EntryKind::Expense => expenses::Entity::find()
                .filter(date_condition(expenses::Column::OccurredOn, filter))
                .order_by_desc(expenses::Column::OccurredOn)
                .order_by_desc(expenses::Column::Id)
                .all(&self.database)
                .await?
                .into_iter()
                .map(LedgerEntry::from)
                .collect(),
        };
        Ok(entries)
    }

    /// Create or replace the budget line of `category` in `month`.
    pub async fn upsert_budget(
        &self,
        month: YearMonth,
        category: &str,
        planned: Money,
        actual: Money,
    ) -> ResultEngine<BudgetEntry> {
        validate_amount(planned, "planned amount")?;
        validate_amount(actual, "actual amount")?;
        let category = normalize_required_name(category, "category")?;
        let (year, month_no) = month_columns(month);

        with_tx!(self, |db_tx| {
            let model = budgets::ActiveModel {
                year: ActiveValue::Set(year),
                month: ActiveValue::Set(month_no),
                category: ActiveValue::Set(category.clone()),
                planned_minor: ActiveValue::Set(planned.minor()),
                actual_minor: ActiveValue::Set(actual.minor()),
                ..Default::default()
            };
            budgets::Entity::insert(model)
                .on_conflict(
                    OnConflict::columns([
                        budgets::Column::Year,
                        budgets::Column::Month,
                        budgets::Column::Category,
                    ])
                    .update_columns([budgets::Column::PlannedMinor, budgets::Column::ActualMinor])
                    .to_owned(),
                )
                .exec_without_returning(&db_tx)
                .await?;

            let stored = budgets::Entity::find()
                .filter(budgets::Column::Year.eq(year))
                .filter(budgets::Column::Month.eq(month_no))
                .filter(budgets::Column::Category.eq(category.as_str()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(format!("budget {month} {category}")))?;
            BudgetEntry::try_from(stored)
        })
    }

    /// Remove the budget line of `category` in `month`.
    pub async fn delete_budget(&self, month: YearMonth, category: &str) -> ResultEngine<()> {
        let (year, month_no) = month_columns(month);
        let result = budgets::Entity::delete_many()
            .filter(budgets::Column::Year.eq(year))
            .filter(budgets::Column::Month.eq(month_no))
            .filter(budgets::Column::Category.eq(category.trim()))
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::KeyNotFound(format!(
                "budget {month} {}",
                category.trim()
            )));
        }
        Ok(())
    }

    /// Budget lines of one month, by category.
    pub async fn budget_entries(&self, month: YearMonth) -> ResultEngine<Vec<BudgetEntry>> {
        let (year, month_no) = month_columns(month);
        budgets::Entity::find()
            .filter(budgets::Column::Year.eq(year))
            .filter(budgets::Column::Month.eq(month_no))
            .order_by_asc(budgets::Column::Category)
            .all(&self.database)
            .await?
            .into_iter()
            .map(BudgetEntry::try_from)
            .collect()
    }

    /// Record a project; its ROI is derived from investment and return.
    pub async fn add_project(&self, project: NewProject) -> ResultEngine<Project> {
        let name = normalize_required_name(&project.name, "project name")?;
        validate_amount(project.investment, "investment")?;
        if let Some(end) = project.end_date
            && end < project.start_date
        {
            return Err(EngineError::InvalidInput(
                "project end date must not precede its start date".to_string(),
            ));
        }
        let roi = Project::roi_for(project.investment, project.return_amount);

        let model = projects::ActiveModel {
            name: ActiveValue::Set(name),
            investment_minor: ActiveValue::Set(project.investment.minor()),
            return_minor: ActiveValue::Set(project.return_amount.minor()),
            roi_bp: ActiveValue::Set(roi.map(|r| r.basis_points())),
            start_date: ActiveValue::Set(project.start_date),
            end_date: ActiveValue::Set(project.end_date),
            status: ActiveValue::Set(project.status.as_str().to_string()),
            ..Default::default()
        }
        .insert(&self.database)
        .await?;
        Project::try_from(model)
    }
}
