use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Local, Utc};

use tickerboard::config::Config;
use tickerboard::metrics::{ChartInterval, ChartWindow, MetricsRestClient, TimeRange};
use tickerboard::model::asset::{AssetType, MarketSession};

const USAGE: &str = "usage: chart-probe <SYMBOL> <ASSET_TYPE> [INTERVAL] [RANGE]";

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 || args.iter().any(|a| a == "-h" || a == "--help") {
        bail!(USAGE);
    }
    let symbol = args[0].as_str();
    let asset_type: AssetType = args[1].parse().map_err(|e: String| anyhow!(e))?;
    let interval: ChartInterval = match args.get(2) {
        Some(raw) => raw.parse().map_err(|e: String| anyhow!(e))?,
        None => ChartInterval::default(),
    };
    let range: TimeRange = match args.get(3) {
        Some(raw) => raw.parse().map_err(|e: String| anyhow!(e))?,
        None => TimeRange::default(),
    };

    let config = Config::load().context("failed to load config")?;
    let client = MetricsRestClient::from_config(&config.metrics)?;

    let now = Local::now().fixed_offset();
    let window = ChartWindow::compute(range, asset_type, now);
    println!(
        "{} {} {} {}: {} .. {}",
        symbol,
        asset_type,
        interval.label(),
        range.label(),
        window.start_iso(),
        window.end_iso()
    );

    let candles = client
        .candles(symbol, asset_type, interval, &window)
        .await
        .with_context(|| format!("chart request for {} failed", symbol))?;

    for candle in &candles {
        let open_time = DateTime::<Utc>::from_timestamp_millis(candle.open_time as i64);
        let session = match open_time {
            Some(t) if asset_type.has_market_hours() => {
                MarketSession::classify(t, *now.offset()).label()
            }
            _ => "",
        };
        println!(
            "{:<30} {} o={:<12.4} h={:<12.4} l={:<12.4} c={:<12.4} {:>7.2}% {}",
            open_time
                .map(|t| t.with_timezone(now.offset()).to_rfc3339())
                .unwrap_or_default(),
            if candle.is_bullish() { "+" } else { "-" },
            candle.open,
            candle.high,
            candle.low,
            candle.close,
            candle.range_pct(),
            session
        );
    }
    println!("{} candles", candles.len());
    Ok(())
}
