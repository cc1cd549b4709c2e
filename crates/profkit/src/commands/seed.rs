use crate::config::CheckerConfig;
use crate::credentials::{SqliteStore, seed_demo_users};
use crate::error::Result;

/// Create the credential store and write the demo users into it
pub fn run(config: &CheckerConfig, force: bool) -> Result<()> {
    if force && config.db_path.exists() {
        std::fs::remove_file(&config.db_path)?;
        tracing::info!(db = %config.db_path.display(), "removed existing store");
    }

    let store = SqliteStore::create(&config.db_path)?;
    let seeded = seed_demo_users(&store, &config.encoder())?;

    println!(
        "Seeded {} user(s) into {} ({}, salt {})",
        seeded,
        config.db_path.display(),
        config.scheme,
        config.salt
    );
    Ok(())
}
