use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DeliveryLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeliveryLogs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DeliveryLogs::ScheduleId).uuid().not_null())
                    .col(
                        ColumnDef::new(DeliveryLogs::AttemptNumber)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(DeliveryLogs::Status).string().not_null())
                    .col(
                        ColumnDef::new(DeliveryLogs::AttemptedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DeliveryLogs::DeliveredAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(DeliveryLogs::ErrorMessage).text())
                    .foreign_key(
                        ForeignKey::create()
                            .from(DeliveryLogs::Table, DeliveryLogs::ScheduleId)
                            .to(Schedules::Table, Schedules::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(DeliveryLogs::Table)
                    .col(DeliveryLogs::ScheduleId)
                    .name("idx_delivery_logs_schedule_id")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DeliveryLogs::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum DeliveryLogs {
    Table,
    Id,
    ScheduleId,
    AttemptNumber,
    Status,
    AttemptedAt,
    DeliveredAt,
    ErrorMessage,
}

#[derive(Iden)]
enum Schedules {
    Table,
    Id,
}
