use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use tickerboard::baseline::{BaselineLoader, ComparisonSource};
use tickerboard::error::AppError;
use tickerboard::event::{ConnectionNotice, ConnectionState, FeedEvent, RECONNECTING_NOTICE};
use tickerboard::metrics::{ComparisonResponse, PriceBar};
use tickerboard::model::asset::AssetType;
use tickerboard::model::instrument::default_instruments;
use tickerboard::model::tick::Tick;
use tickerboard::session::BoardSession;

fn bar(symbol: &str, ts: &str, close: f64) -> PriceBar {
    PriceBar {
        symbol: symbol.to_string(),
        timestamp: ts.to_string(),
        open_price: close,
        high_price: close,
        low_price: close,
        close_price: close,
    }
}

/// AAPL loads 190/185 on the first request and 195/188 afterwards; QQQ always fails.
#[derive(Default)]
struct CountingSource {
    aapl_requests: Mutex<u32>,
}

impl ComparisonSource for CountingSource {
    async fn fetch_comparison(
        &self,
        symbol: &str,
        _asset_type: AssetType,
    ) -> Result<ComparisonResponse, AppError> {
        match symbol {
            "AAPL" => {
                let mut n = self.aapl_requests.lock().unwrap();
                *n += 1;
                let (current, previous) = if *n == 1 { (190.0, 185.0) } else { (195.0, 188.0) };
                Ok(ComparisonResponse {
                    current: bar(symbol, "2024-06-10T20:00:00Z", current),
                    previous: bar(symbol, "2024-06-07T20:00:00Z", previous),
                })
            }
            "QQQ" => Err(AppError::HttpStatus {
                status: 500,
                url: "http://metrics.test/carousel/instrument_card_comparison".to_string(),
            }),
            _ => Ok(ComparisonResponse {
                current: bar(symbol, "2024-06-10T20:00:00Z", 10.0),
                previous: bar(symbol, "2024-06-07T20:00:00Z", 8.0),
            }),
        }
    }
}

fn session() -> BoardSession<CountingSource> {
    BoardSession::new(
        BaselineLoader::new(CountingSource::default()),
        &default_instruments(),
    )
}

fn tick(symbol: &str, price: f64) -> FeedEvent {
    FeedEvent::Tick(
        Tick::from_json(&format!(
            r#"{{"symbol":"{symbol}","price":{price},"timestamp":1718049600}}"#
        ))
        .unwrap(),
    )
}

#[tokio::test]
/// Verifies subscribers observe the loaded snapshot and then the ticked one, with
/// the 190/185 baseline driving both change values.
async fn subscribers_see_loaded_then_ticked_board() {
    let mut s = session();
    let mut boards = s.subscribe();
    s.load_all().await;

    assert!(boards.has_changed().unwrap());
    let loaded = boards.borrow_and_update().clone();
    let aapl = loaded.get("AAPL").unwrap();
    assert!((aapl.change - 5.0).abs() < 1e-9);
    assert!(loaded.get("QQQ").unwrap().has_error());
    assert!(!s.baselines().contains("QQQ"));

    assert!(s.apply(tick("AAPL", 192.5)));
    let ticked = boards.borrow_and_update().clone();
    let aapl = ticked.get("AAPL").unwrap();
    assert!((aapl.change - 7.5).abs() < 1e-9);
    assert!((aapl.change_percent - 4.054).abs() < 0.001);
    assert!(Arc::ptr_eq(
        loaded.entry("IXIC").unwrap(),
        ticked.entry("IXIC").unwrap()
    ));
}

#[tokio::test]
/// Verifies a tick for an instrument without a baseline merges its price, keeps
/// zero change, and clears the load error.
async fn tick_without_baseline_merges_raw_price() {
    let mut s = session();
    s.load_all().await;
    assert!(s.apply(tick("QQQ", 480.0)));
    let board = s.board();
    let qqq = board.get("QQQ").unwrap();
    assert!((qqq.price - 480.0).abs() < 1e-9);
    assert_eq!(qqq.change, 0.0);
    assert!(!qqq.has_error());
}

#[tokio::test]
/// Verifies reselecting an instrument overwrites its baseline with the fresh previous close.
async fn reselection_overwrites_baseline() {
    let mut s = session();
    s.load_all().await;
    assert_eq!(s.selected(), Some("BTC/USD"));
    assert_eq!(s.baselines().price("AAPL"), Some(185.0));

    assert!(s.select("AAPL").await.unwrap());
    assert_eq!(s.baselines().price("AAPL"), Some(188.0));
    assert!(s.apply(tick("AAPL", 190.0)));
    assert!((s.board().get("AAPL").unwrap().change - 2.0).abs() < 1e-9);
}

#[tokio::test]
/// Verifies relay status and notices flow through the session and the banner can be dismissed.
async fn connection_events_drive_status_and_notice() {
    let mut s = session();
    let status = s.status();
    s.apply(FeedEvent::Status(ConnectionState::Connected));
    assert_eq!(*status.borrow(), ConnectionState::Connected);

    s.apply(FeedEvent::Notice(ConnectionNotice::retrying()));
    s.apply(FeedEvent::Reconnecting {
        attempt: 1,
        delay_ms: 5000,
    });
    assert_eq!(s.notice().message(), Some(RECONNECTING_NOTICE));
    assert_eq!(s.stats().reconnects, 1);

    s.dismiss_notice();
    assert!(!s.notice().is_visible());

    s.apply(FeedEvent::Notice(ConnectionNotice::None));
    s.apply(FeedEvent::Discarded {
        reason: "bad frame".to_string(),
    });
    assert_eq!(s.stats().discarded, 1);
}

#[tokio::test]
/// Verifies `run` drains the feed channel in order until it closes.
async fn run_applies_events_until_channel_closes() {
    let mut s = session();
    s.load_all().await;
    let (tx, mut rx) = tokio::sync::mpsc::channel(8);
    tx.send(tick("AAPL", 191.0)).await.unwrap();
    tx.send(tick("AAPL", 192.5)).await.unwrap();
    tx.send(tick("AAPL", 192.5)).await.unwrap();
    tx.send(tick("TSLA", 1.0)).await.unwrap();
    drop(tx);

    s.run(&mut rx).await;
    let stats = s.stats();
    assert_eq!(stats.ticks_merged, 2);
    assert_eq!(stats.ticks_unchanged, 1);
    assert_eq!(stats.ticks_unknown, 1);
    assert!((s.board().get("AAPL").unwrap().price - 192.5).abs() < 1e-9);
}

/// AAPL answers from a queue of `(current, previous)` closes; `None` is a 500.
struct QueuedSource {
    aapl: Mutex<VecDeque<Option<(f64, f64)>>>,
}

impl ComparisonSource for QueuedSource {
    async fn fetch_comparison(
        &self,
        symbol: &str,
        _asset_type: AssetType,
    ) -> Result<ComparisonResponse, AppError> {
        let next = if symbol == "AAPL" {
            self.aapl.lock().unwrap().pop_front().flatten()
        } else {
            Some((10.0, 8.0))
        };
        match next {
            Some((current, previous)) => Ok(ComparisonResponse {
                current: bar(symbol, "2024-06-10T20:00:00Z", current),
                previous: bar(symbol, "2024-06-07T20:00:00Z", previous),
            }),
            None => Err(AppError::HttpStatus {
                status: 500,
                url: "http://metrics.test/carousel/instrument_card_comparison".to_string(),
            }),
        }
    }
}

fn queued_session(aapl: Vec<Option<(f64, f64)>>) -> BoardSession<QueuedSource> {
    BoardSession::new(
        BaselineLoader::new(QueuedSource {
            aapl: Mutex::new(aapl.into()),
        }),
        &default_instruments(),
    )
}

#[tokio::test]
/// Verifies a failed reselection clears the old baseline, so later ticks do not
/// derive a change the error-tagged record cannot explain.
async fn failed_reselection_clears_baseline() {
    let mut s = queued_session(vec![Some((190.0, 185.0)), None]);
    s.load_all().await;
    assert_eq!(s.baselines().price("AAPL"), Some(185.0));

    assert!(s.select("AAPL").await.unwrap());
    assert!(s.board().get("AAPL").unwrap().has_error());
    assert!(!s.baselines().contains("AAPL"));

    assert!(s.apply(tick("AAPL", 192.5)));
    let board = s.board();
    let aapl = board.get("AAPL").unwrap();
    assert!((aapl.price - 192.5).abs() < 1e-9);
    assert_eq!(aapl.change, 0.0);
    assert_eq!(aapl.comparison_price, 0.0);
}

#[tokio::test]
/// Verifies a reselection reporting a zero previous close clears the old baseline.
async fn zero_baseline_reselection_clears_baseline() {
    let mut s = queued_session(vec![Some((190.0, 185.0)), Some((200.0, 0.0))]);
    s.load_all().await;
    assert!(s.select("AAPL").await.unwrap());
    assert!(!s.baselines().contains("AAPL"));

    assert!(s.apply(tick("AAPL", 210.0)));
    let aapl = s.board().get("AAPL").unwrap().clone();
    assert!((aapl.price - 210.0).abs() < 1e-9);
    assert_eq!(aapl.change, 0.0);
}
