/// Photo moderation service
///
/// Routes uploaded photos through content analysis into a moderator review
/// queue, and serves the moderator and uploader APIs.
use anyhow::Context;
use photo_moderation::{config::ServerConfig, context::AppContext, jobs, server};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first so the log format can follow it
    let config = ServerConfig::from_env().context("Failed to load configuration")?;

    init_tracing(config.logging.json);

    info_banner(&config);

    let ctx = AppContext::new(config)
        .await
        .context("Failed to initialise application context")?;
    let ctx = Arc::new(ctx);

    // Start background jobs
    let scheduler = Arc::new(jobs::JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    server::serve((*ctx).clone()).await?;

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "photo_moderation=debug,tower_http=debug".into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn info_banner(config: &ServerConfig) {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        database = %config.storage.database.display(),
        queue_alert_threshold = config.escalation.queue_threshold,
        "Starting photo moderation service"
    );
}
