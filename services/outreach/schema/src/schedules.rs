use sea_orm::entity::prelude::*;

/// One committed send instant. `cadence_data` carries the originating rule
/// as JSON for audit and regeneration; `status` is derived from the most
/// recent delivery-log entry.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "schedules")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub recipient_id: Uuid,
    pub scheduled_at: chrono::DateTime<chrono::Utc>,
    pub cadence_kind: String,
    pub cadence_data: Json,
    pub subject: String,
    pub content: String,
    pub recipient_email: String,
    pub status: String,
    pub error_message: Option<String>,
    pub sent_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_by: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::campaigns::Entity",
        from = "Column::CampaignId",
        to = "super::campaigns::Column::Id"
    )]
    Campaign,
    #[sea_orm(
        belongs_to = "super::recipients::Entity",
        from = "Column::RecipientId",
        to = "super::recipients::Column::Id"
    )]
    Recipient,
    #[sea_orm(has_many = "super::queue_entries::Entity")]
    QueueEntries,
    #[sea_orm(has_many = "super::delivery_logs::Entity")]
    DeliveryLogs,
}

impl Related<super::campaigns::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Campaign.def()
    }
}

impl Related<super::recipients::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recipient.def()
    }
}

impl Related<super::queue_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::QueueEntries.def()
    }
}

impl Related<super::delivery_logs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeliveryLogs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
