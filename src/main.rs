use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use tickerboard::baseline::BaselineLoader;
use tickerboard::board::Board;
use tickerboard::config::{Config, LoggingConfig};
use tickerboard::event::ConnectionNotice;
use tickerboard::metrics::MetricsRestClient;
use tickerboard::relay::{LiveFeed, RelayWsClient};
use tickerboard::session::BoardSession;

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (required by rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            eprintln!("Check config/default.toml or set TICKERBOARD_CONFIG");
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging)?;

    let relay_url = config.relay.url().context("relay url")?;
    let rest_client =
        MetricsRestClient::from_config(&config.metrics).context("metrics client setup")?;
    tracing::info!(
        metrics_url = %rest_client.base_url(),
        relay_url = %relay_url,
        instruments = config.instruments.len(),
        "Starting tickerboard"
    );

    let mut session = BoardSession::new(BaselineLoader::new(rest_client), &config.instruments);
    let logger = spawn_board_logger(session.subscribe(), session.notices());

    // The feed connects right away; ticks queue up while baselines load.
    let client = RelayWsClient::tungstenite(relay_url, config.relay.reconnect.clone());
    let (feed, mut events) = LiveFeed::spawn(client, config.relay.channel_capacity);

    tokio::select! {
        _ = async {
            if session.load_all().await == 0 {
                tracing::warn!("no instrument loaded a baseline; changes stay at zero until a reload");
            }
            session.run(&mut events).await;
        } => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Ctrl+C received");
        }
    }

    drop(events);
    feed.shutdown().await.context("relay shutdown")?;
    let stats = session.stats();
    tracing::info!(
        ticks_merged = stats.ticks_merged,
        ticks_unchanged = stats.ticks_unchanged,
        ticks_unknown = stats.ticks_unknown,
        discarded = stats.discarded,
        reconnects = stats.reconnects,
        load_failures = stats.load_failures,
        "tickerboard stopped"
    );
    drop(session);
    logger.await.ok();
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        logging
            .level
            .parse()
            .unwrap_or_else(|_| EnvFilter::new("info"))
    });
    let (writer, ansi) = match &logging.file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn spawn_board_logger(
    mut boards: watch::Receiver<Arc<Board>>,
    mut notices: watch::Receiver<ConnectionNotice>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut previous = boards.borrow_and_update().clone();
        loop {
            tokio::select! {
                changed = boards.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = boards.borrow_and_update().clone();
                    for inst in current.changed_since(&previous) {
                        tracing::info!(
                            symbol = %inst.symbol,
                            price = inst.price,
                            change = inst.change,
                            change_percent = inst.change_percent,
                            error = inst.error.as_deref().unwrap_or(""),
                            "instrument updated"
                        );
                    }
                    previous = current;
                }
                changed = notices.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let notice = notices.borrow_and_update().clone();
                    match notice.message() {
                        Some(message) => tracing::warn!(notice = message, "connection notice"),
                        None => tracing::info!("connection notice cleared"),
                    }
                }
            }
        }
    })
}
