use chrono::Utc;
use tracing_subscriber::EnvFilter;

use moviepilot_export::config::Config;
use moviepilot_export::crawler::service::ExportService;
use moviepilot_export::prompt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let started_at = Utc::now();

    let cfg = Config::from_env()?;
    let credentials = prompt::resolve_credentials(&cfg.username, &cfg.password)?;
    let user = prompt::resolve_target_user(&cfg.target_user)?;

    let summary = ExportService::new(cfg, credentials, user).run().await?;

    let elapsed = Utc::now() - started_at;
    tracing::info!(
        records = summary.records,
        elapsed_ms = elapsed.num_milliseconds(),
        "Time consumption"
    );

    Ok(())
}
