use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Schedules::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Schedules::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Schedules::CampaignId).uuid().not_null())
                    .col(ColumnDef::new(Schedules::RecipientId).uuid().not_null())
                    .col(
                        ColumnDef::new(Schedules::ScheduledAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Schedules::CadenceKind).string().not_null())
                    .col(
                        ColumnDef::new(Schedules::CadenceData)
                            .json_binary()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Schedules::Subject).text().not_null())
                    .col(ColumnDef::new(Schedules::Content).text().not_null())
                    .col(
                        ColumnDef::new(Schedules::RecipientEmail)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Schedules::Status)
                            .string()
                            .not_null()
                            .default("scheduled"),
                    )
                    .col(ColumnDef::new(Schedules::ErrorMessage).text())
                    .col(ColumnDef::new(Schedules::SentAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Schedules::CreatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(Schedules::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Schedules::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Schedules::Table, Schedules::CampaignId)
                            .to(Campaigns::Table, Campaigns::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Schedules::Table, Schedules::RecipientId)
                            .to(Recipients::Table, Recipients::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Owner-scoped list queries order by scheduled_at.
        manager
            .create_index(
                Index::create()
                    .table(Schedules::Table)
                    .col(Schedules::CreatedBy)
                    .col(Schedules::ScheduledAt)
                    .name("idx_schedules_created_by_scheduled_at")
                    .to_owned(),
            )
            .await?;

        // Reconciliation sweep scans scheduled rows.
        manager
            .create_index(
                Index::create()
                    .table(Schedules::Table)
                    .col(Schedules::Status)
                    .name("idx_schedules_status")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Schedules::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Schedules {
    Table,
    Id,
    CampaignId,
    RecipientId,
    ScheduledAt,
    CadenceKind,
    CadenceData,
    Subject,
    Content,
    RecipientEmail,
    Status,
    ErrorMessage,
    SentAt,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Campaigns {
    Table,
    Id,
}

#[derive(Iden)]
enum Recipients {
    Table,
    Id,
}
