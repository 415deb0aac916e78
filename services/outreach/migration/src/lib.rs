use sea_orm_migration::prelude::*;

mod m20260401_000001_create_campaigns;
mod m20260401_000002_create_recipients;
mod m20260401_000003_create_schedules;
mod m20260401_000004_create_queue_entries;
mod m20260401_000005_create_delivery_logs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260401_000001_create_campaigns::Migration),
            Box::new(m20260401_000002_create_recipients::Migration),
            Box::new(m20260401_000003_create_schedules::Migration),
            Box::new(m20260401_000004_create_queue_entries::Migration),
            Box::new(m20260401_000005_create_delivery_logs::Migration),
        ]
    }
}
