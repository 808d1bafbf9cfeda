//! Derived monthly finance totals. Unique on `(year, month)`.
//!
//! Written only by the month rebuild.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "finance_monthly_summaries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub year: i32,
    pub month: i32,
    pub revenue_total_minor: i64,
    pub expense_total_minor: i64,
    pub profit_total_minor: i64,
    pub profit_margin_bp: Option<i64>,
    pub calculated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
