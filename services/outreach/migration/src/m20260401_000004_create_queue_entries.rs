use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(QueueEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(QueueEntries::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(QueueEntries::ScheduleId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(QueueEntries::Priority)
                            .integer()
                            .not_null()
                            .default(100),
                    )
                    .col(
                        ColumnDef::new(QueueEntries::Attempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(QueueEntries::MaxAttempts)
                            .integer()
                            .not_null()
                            .default(3),
                    )
                    .col(
                        ColumnDef::new(QueueEntries::NextAttemptAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(QueueEntries::LastError).text())
                    .col(
                        ColumnDef::new(QueueEntries::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(QueueEntries::ClaimedBy).string())
                    .col(ColumnDef::new(QueueEntries::ClaimedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(QueueEntries::ProcessedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(QueueEntries::EnqueuedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(QueueEntries::Table, QueueEntries::ScheduleId)
                            .to(Schedules::Table, Schedules::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Worker poll queries filter on status and next_attempt_at.
        manager
            .create_index(
                Index::create()
                    .table(QueueEntries::Table)
                    .col(QueueEntries::Status)
                    .col(QueueEntries::NextAttemptAt)
                    .name("idx_queue_entries_status_next_attempt_at")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(QueueEntries::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum QueueEntries {
    Table,
    Id,
    ScheduleId,
    Priority,
    Attempts,
    MaxAttempts,
    NextAttemptAt,
    LastError,
    Status,
    ClaimedBy,
    ClaimedAt,
    ProcessedAt,
    EnqueuedAt,
}

#[derive(Iden)]
enum Schedules {
    Table,
    Id,
}
