//! Derived monthly summary tables, rewritten by the month rebuild.
//!
//! Each table carries a unique index on its natural key so the rebuild can
//! upsert instead of delete-and-insert.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum FinanceMonthlySummaries {
    Table,
    Id,
    Year,
    Month,
    RevenueTotalMinor,
    ExpenseTotalMinor,
    ProfitTotalMinor,
    ProfitMarginBp,
    CalculatedAt,
}

#[derive(Iden)]
enum ExpenseCategoryMonthlySummaries {
    Table,
    Id,
    Year,
    Month,
    Category,
    ExpenseTotalMinor,
    CalculatedAt,
}

#[derive(Iden)]
enum BudgetMonthlySummaries {
    Table,
    Id,
    Year,
    Month,
    Category,
    PlannedMinor,
    ActualMinor,
    DeltaMinor,
    DeltaBp,
    CalculatedAt,
}

fn id_column<T: IntoIden>(iden: T) -> ColumnDef {
    ColumnDef::new(iden)
        .integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

fn money_column<T: IntoIden>(iden: T) -> ColumnDef {
    ColumnDef::new(iden)
        .big_integer()
        .not_null()
        .default(0)
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FinanceMonthlySummaries::Table)
                    .if_not_exists()
                    .col(id_column(FinanceMonthlySummaries::Id))
                    .col(
                        ColumnDef::new(FinanceMonthlySummaries::Year)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FinanceMonthlySummaries::Month)
                            .integer()
                            .not_null(),
                    )
                    .col(money_column(FinanceMonthlySummaries::RevenueTotalMinor))
                    .col(money_column(FinanceMonthlySummaries::ExpenseTotalMinor))
                    .col(money_column(FinanceMonthlySummaries::ProfitTotalMinor))
                    .col(ColumnDef::new(FinanceMonthlySummaries::ProfitMarginBp).big_integer())
                    .col(
                        ColumnDef::new(FinanceMonthlySummaries::CalculatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-finance_monthly_summaries-year-month-unique")
                    .table(FinanceMonthlySummaries::Table)
                    .col(FinanceMonthlySummaries::Year)
                    .col(FinanceMonthlySummaries::Month)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ExpenseCategoryMonthlySummaries::Table)
                    .if_not_exists()
                    .col(id_column(ExpenseCategoryMonthlySummaries::Id))
                    .col(
                        ColumnDef::new(ExpenseCategoryMonthlySummaries::Year)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExpenseCategoryMonthlySummaries::Month)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExpenseCategoryMonthlySummaries::Category)
                            .string()
                            .not_null(),
                    )
                    .col(money_column(
                        ExpenseCategoryMonthlySummaries::ExpenseTotalMinor,
                    ))
                    .col(
                        ColumnDef::new(ExpenseCategoryMonthlySummaries::CalculatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expense_category_monthly_summaries-year-month-category-unique")
                    .table(ExpenseCategoryMonthlySummaries::Table)
                    .col(ExpenseCategoryMonthlySummaries::Year)
                    .col(ExpenseCategoryMonthlySummaries::Month)
                    .col(ExpenseCategoryMonthlySummaries::Category)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BudgetMonthlySummaries::Table)
                    .if_not_exists()
                    .col(id_column(BudgetMonthlySummaries::Id))
                    .col(
                        ColumnDef::new(BudgetMonthlySummaries::Year)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BudgetMonthlySummaries::Month)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BudgetMonthlySummaries::Category)
                            .string()
                            .not_null(),
                    )
                    .col(money_column(BudgetMonthlySummaries::PlannedMinor))
                    .col(money_column(BudgetMonthlySummaries::ActualMinor))
                    .col(money_column(BudgetMonthlySummaries::DeltaMinor))
                    .col(ColumnDef::new(BudgetMonthlySummaries::DeltaBp).big_integer())
                    .col(
                        ColumnDef::new(BudgetMonthlySummaries::CalculatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-budget_monthly_summaries-year-month-category-unique")
                    .table(BudgetMonthlySummaries::Table)
                    .col(BudgetMonthlySummaries::Year)
                    .col(BudgetMonthlySummaries::Month)
                    .col(BudgetMonthlySummaries::Category)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BudgetMonthlySummaries::Table).to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(ExpenseCategoryMonthlySummaries::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(FinanceMonthlySummaries::Table).to_owned())
            .await?;
        Ok(())
    }
}
