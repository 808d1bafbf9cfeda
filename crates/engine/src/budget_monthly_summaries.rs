//! Derived budget plan-vs-actual deltas. Unique on `(year, month, category)`,
//! mirrored 1:1 from `budgets`.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "budget_monthly_summaries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub year: i32,
    pub month: i32,
    pub category: String,
    pub planned_minor: i64,
    pub actual_minor: i64,
    pub delta_minor: i64,
    pub delta_bp: Option<i64>,
    pub calculated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
