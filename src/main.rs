//! frank - IRC bot binary.

use anyhow::Context;
use frank::config::{Config, validate};
use frank::network::Connection;
use frank::telemetry::init_tracing;
use frank::{Bot, Services};
use tokio::sync::broadcast;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "frank.toml".to_string());

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {config_path}"))?;

    init_tracing(&config.logging.format);

    if let Err(problems) = validate(&config) {
        for problem in &problems {
            error!(error = %problem, "Invalid configuration");
        }
        anyhow::bail!("{} configuration problem(s) in {config_path}", problems.len());
    }

    info!(
        server = %config.irc.server,
        nick = %config.irc.nick,
        channels = config.irc.channels.len(),
        feeds = config.rss.len(),
        "Starting frank"
    );

    let services = Services::from_config(&config).await?;
    let server = config.irc.server.clone();
    let (bot, outbound) = Bot::new(config, services)?;

    spawn_signal_handler(bot.shutdown_handle());

    let connection = Connection::connect(&server).await?;
    match bot.run(connection, outbound).await {
        Ok(()) => {
            info!("Shut down cleanly");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Connection lost");
            Err(e.into())
        }
    }
}

/// Turn SIGINT/SIGTERM into a shutdown broadcast.
fn spawn_signal_handler(shutdown_tx: broadcast::Sender<()>) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => info!("Received SIGINT, shutting down"),
                        _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                    }
                }
                Err(e) => {
                    error!(error = %e, "Cannot install SIGTERM handler");
                    let _ = tokio::signal::ctrl_c().await;
                    info!("Received SIGINT, shutting down");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received Ctrl+C, shutting down");
        }

        let _ = shutdown_tx.send(());
    });
}
