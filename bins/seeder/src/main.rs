//! Database seeder for Tally development and testing.
//!
//! Creates the demo account owners that the account API looks users up by.
//! Owners that already exist by name are left alone, so the seeder can be
//! re-run.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use tally_db::{UserRepository, connect_with};
use tally_shared::AppConfig;

/// Demo account owners.
const DEMO_USERS: [&str; 3] = ["Pororo", "Lupi", "Eddy"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;

    println!("Connecting to database...");
    let db = connect_with(&config.database)
        .await
        .context("failed to connect to database")?;
    let users = UserRepository::new(db);

    println!("Seeding users...");
    let existing = users.list().await?;
    for name in DEMO_USERS {
        if let Some(user) = existing.iter().find(|u| u.name == name) {
            println!("  {name} already exists (id {})", user.id);
            continue;
        }
        let user = users.create(name).await?;
        println!("  created {name} (id {})", user.id);
    }

    println!("Seeding complete!");
    Ok(())
}
