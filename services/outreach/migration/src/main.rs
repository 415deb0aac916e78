use sea_orm_migration::prelude::*;

use touchbase_outreach_migration::Migrator;

#[tokio::main]
async fn main() {
    cli::run_cli(Migrator).await;
}
