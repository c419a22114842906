use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

mod discord;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "owl_bot=info,owl_scheduler=info,owl_reminders=info".into()),
        )
        .init();

    // load config: OWL_CONFIG env > ~/.owl/owl.toml > defaults
    let config_path = std::env::var("OWL_CONFIG").ok();
    let config = owl_core::OwlConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({e}), using defaults");
        owl_core::OwlConfig::default()
    });

    let db_path = &config.database.path;
    info!(path = %db_path, "opening SQLite database");
    let conn = rusqlite::Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

    let store = Arc::new(owl_reminders::ReminderStore::new(conn)?);

    let token = config.discord.token.clone().ok_or_else(|| {
        anyhow::anyhow!("discord.token missing — set OWL_DISCORD_TOKEN or [discord] in owl.toml")
    })?;
    let notifier: Arc<dyn owl_scheduler::Notifier> =
        Arc::new(discord::DiscordNotifier::new(token));

    let scheduler = owl_scheduler::ReminderScheduler::new(
        Arc::clone(&store),
        notifier,
        owl_scheduler::SchedulerConfig {
            tick_interval: Duration::from_secs(config.scheduler.tick_secs),
            dispatch_timeout: Duration::from_secs(config.scheduler.dispatch_timeout_secs),
        },
    );
    scheduler.start();

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    scheduler.stop().await;
    Ok(())
}
