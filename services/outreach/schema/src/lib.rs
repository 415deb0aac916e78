//! SeaORM entities for the outreach service's tables.

pub mod campaigns;
pub mod delivery_logs;
pub mod queue_entries;
pub mod recipients;
pub mod schedules;
