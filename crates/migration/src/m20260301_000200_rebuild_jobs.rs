use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum RebuildJobs {
    Table,
    Id,
    Year,
    Month,
    Status,
    Attempts,
    AvailableAt,
    ReservedAt,
    LastError,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RebuildJobs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RebuildJobs::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RebuildJobs::Year).integer().not_null())
                    .col(ColumnDef::new(RebuildJobs::Month).integer().not_null())
                    .col(
                        ColumnDef::new(RebuildJobs::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(RebuildJobs::Attempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(RebuildJobs::AvailableAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RebuildJobs::ReservedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(RebuildJobs::LastError).text())
                    .col(
                        ColumnDef::new(RebuildJobs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-rebuild_jobs-status-available_at")
                    .table(RebuildJobs::Table)
                    .col(RebuildJobs::Status)
                    .col(RebuildJobs::AvailableAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RebuildJobs::Table).to_owned())
            .await?;
        Ok(())
    }
}
