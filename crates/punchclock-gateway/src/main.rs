use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use punchclock_attendance::{BackendConnector, JsonRpcConnector};
use punchclock_bot::{BotSettings, CommandDispatcher, Poller};
use punchclock_channels::MessageTransport;
use punchclock_core::config::PunchclockConfig;
use punchclock_core::time::LocalClock;
use punchclock_scheduler::{ScheduledDispatcher, SchedulerEngine};
use punchclock_telegram::TelegramTransport;
use punchclock_users::UserRegistry;
use tracing::{error, info};

mod app;
mod http;
mod keepalive;

#[derive(Debug, Parser)]
#[command(name = "punchclock", version, about = "Telegram attendance bot")]
struct Cli {
    /// Path to punchclock.toml (falls back to PUNCHCLOCK_CONFIG, then
    /// ~/.punchclock/punchclock.toml).
    #[arg(long, short)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "punchclock=info,punchclock_gateway=info,tower_http=debug".into()
            }),
        )
        .init();

    let cli = Cli::parse();

    // config: --config > PUNCHCLOCK_CONFIG env > ~/.punchclock/punchclock.toml
    let config_path = cli
        .config
        .or_else(|| std::env::var("PUNCHCLOCK_CONFIG").ok());
    let config = PunchclockConfig::load(config_path.as_deref())?;
    if let Err(e) = config.validate() {
        error!(code = e.code(), error = %e, "invalid configuration");
        return Err(e.into());
    }

    let tz = config.attendance.tz()?;
    let clock = LocalClock::new(tz);
    info!(timezone = %tz, "attendance timezone");

    let http_client = reqwest::Client::new();
    let registry = Arc::new(UserRegistry::new());
    let connector: Arc<dyn BackendConnector> =
        Arc::new(JsonRpcConnector::new(http_client.clone()));

    let telegram = TelegramTransport::new(&config.telegram)?;
    telegram.identify().await?;
    let transport: Arc<dyn MessageTransport> = Arc::new(telegram);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    // Fired-trigger channel: SchedulerEngine → ScheduledDispatcher
    let (fired_tx, fired_rx) = tokio::sync::mpsc::channel(16);
    let engine = SchedulerEngine::from_config(&config.schedule, tz, fired_tx)?;
    let scheduled = Arc::new(ScheduledDispatcher::new(
        Arc::clone(&registry),
        Arc::clone(&connector),
        clock,
    ));
    let engine_shutdown = shutdown_rx.clone();
    tokio::spawn(async move { engine.run(engine_shutdown).await });
    tokio::spawn(scheduled.consume(fired_rx));

    let dispatcher = Arc::new(CommandDispatcher::new(
        Arc::clone(&registry),
        Arc::clone(&connector),
        Arc::clone(&transport),
        BotSettings {
            admins: config.telegram.admins.clone(),
            schedule: config.schedule.clone(),
            clock,
        },
    ));
    let poller = Poller::new(
        transport,
        dispatcher,
        Duration::from_secs(config.telegram.error_backoff_secs),
    );
    tokio::spawn(poller.run(shutdown_rx.clone()));
    info!("Telegram bot started");

    if let Some(pinger) = keepalive::KeepAlive::from_config(http_client, &config.keep_alive) {
        tokio::spawn(pinger.run(shutdown_rx.clone()));
    }

    let state = Arc::new(app::AppState::new(Arc::clone(&registry)));
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    info!("punchclock listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await?;

    // stop the background loops
    let _ = shutdown_tx.send(true);
    Ok(())
}
