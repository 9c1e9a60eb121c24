use std::sync::Arc;

use anyhow::{Context, bail};
use hanzi_srs::{Coordinator, DatabaseConfig, EngineConfig, SqliteStore, UserId};

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let user_id: UserId = match std::env::args().nth(1) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("Invalid user id: {}", raw))?,
        None => bail!("Usage: srs-stats <user_id>"),
    };

    let db_config = DatabaseConfig::from_env()?;
    let engine_config = EngineConfig::from_env()?;

    let store = Arc::new(
        SqliteStore::open(&db_config.url, db_config.pool_size)
            .with_context(|| format!("Failed to open database {}", db_config.url))?,
    );
    log::info!("Opened {} (pool size {})", db_config.url, db_config.pool_size);

    let coordinator = Coordinator::new(Arc::clone(&store), store, engine_config);
    let stats = coordinator.get_stats(user_id)?;

    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
