use sea_orm::DatabaseConnection;

use crate::infra::db::{
    DbCampaignRepository, DbDeliveryLogRepository, DbQueueRepository, DbRecipientRepository,
    DbScheduleRepository,
};

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub hard_cap: u32,
}

impl AppState {
    pub fn campaign_repo(&self) -> DbCampaignRepository {
        DbCampaignRepository {
            db: self.db.clone(),
        }
    }

    pub fn recipient_repo(&self) -> DbRecipientRepository {
        DbRecipientRepository {
            db: self.db.clone(),
        }
    }

    pub fn schedule_repo(&self) -> DbScheduleRepository {
        DbScheduleRepository {
            db: self.db.clone(),
        }
    }

    pub fn queue_repo(&self) -> DbQueueRepository {
        DbQueueRepository {
            db: self.db.clone(),
        }
    }

    pub fn delivery_log_repo(&self) -> DbDeliveryLogRepository {
        DbDeliveryLogRepository {
            db: self.db.clone(),
        }
    }
}
