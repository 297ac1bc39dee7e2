use anyhow::{Context, Result};
use binance_relay::config::{LoggingSettings, Settings};
use binance_relay::Application;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::new().context("Failed to load configuration")?;
    init_tracing(&settings.logging);

    info!("Starting Binance relay application");

    let app = Application::build(settings)
        .await
        .context("Failed to start relay")?;
    app.run().await?;

    Ok(())
}

fn init_tracing(logging: &LoggingSettings) {
    // RUST_LOG wins over the configured level
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.pretty().init();
    }
}
