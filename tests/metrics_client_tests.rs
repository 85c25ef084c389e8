use std::collections::HashMap;
use std::time::Duration;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::DateTime;
use serde_json::json;
use url::Url;

use tickerboard::baseline::BaselineLoader;
use tickerboard::error::AppError;
use tickerboard::metrics::{ChartInterval, ChartWindow, MetricsRestClient, TimeRange};
use tickerboard::model::asset::AssetType;
use tickerboard::model::instrument::InstrumentSpec;

fn bar(symbol: &str, ts: &str, close: f64) -> serde_json::Value {
    json!({
        "symbol": symbol,
        "timestamp": ts,
        "open_price": close - 1.0,
        "high_price": close + 2.0,
        "low_price": close - 2.0,
        "close_price": close,
    })
}

async fn comparison(Query(q): Query<HashMap<String, String>>) -> Response {
    let symbol = q.get("symbol").map(String::as_str).unwrap_or_default();
    let asset_type = q.get("asset_type").map(String::as_str).unwrap_or_default();
    match (symbol, asset_type) {
        ("AAPL", "STOCK") => Json(json!({
            "current": bar("AAPL", "2024-06-10T20:00:00Z", 190.0),
            "previous": bar("AAPL", "2024-06-07T20:00:00Z", 185.0),
        }))
        .into_response(),
        ("BTC/USD", "CRYPTOCURRENCY") => Json(json!({
            "current": bar("BTC/USD", "2024-06-10T20:00:00", 69000.0),
            "previous": bar("BTC/USD", "2024-06-09T20:00:00", 70000.0),
        }))
        .into_response(),
        ("QQQ", _) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn price_data(Query(q): Query<HashMap<String, String>>) -> Response {
    for key in ["interval", "start_time", "end_time"] {
        if !q.contains_key(key) {
            return StatusCode::BAD_REQUEST.into_response();
        }
    }
    match q.get("symbol").map(String::as_str) {
        Some("AAPL") => Json(json!({
            "data": [
                bar("AAPL", "2024-06-07T14:30:00Z", 188.0),
                bar("AAPL", "2024-06-07T13:30:00Z", 186.0),
            ]
        }))
        .into_response(),
        _ => Json(json!({ "data": [] })).into_response(),
    }
}

async fn spawn_metrics_server() -> MetricsRestClient {
    let app = Router::new()
        .route("/carousel/instrument_card_comparison", get(comparison))
        .route("/chart/price_data", get(price_data));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let base = Url::parse(&format!("http://{addr}/")).unwrap();
    MetricsRestClient::new(base, Duration::from_secs(5)).unwrap()
}

fn window() -> ChartWindow {
    let now = DateTime::parse_from_rfc3339("2024-06-07T15:00:00-04:00").unwrap();
    ChartWindow::compute(TimeRange::Last24Hours, AssetType::Stock, now)
}

#[tokio::test]
/// Verifies the comparison contract: one GET with symbol and asset_type, decoded
/// into current/previous closes.
async fn comparison_decodes_current_and_previous() {
    let client = spawn_metrics_server().await;
    let resp = client
        .instrument_card_comparison("AAPL", AssetType::Stock)
        .await
        .expect("comparison should succeed");
    assert!((resp.current.close_price - 190.0).abs() < 1e-9);
    assert!((resp.previous.close_price - 185.0).abs() < 1e-9);
}

#[tokio::test]
/// Verifies symbols containing '/' survive query encoding and naive timestamps load as UTC.
async fn crypto_symbol_round_trips_through_query() {
    let client = spawn_metrics_server().await;
    let loader = BaselineLoader::new(client);
    let spec = InstrumentSpec::new("BTC/USD", "Bitcoin", AssetType::Cryptocurrency);
    let loaded = loader.load(&spec).await;
    assert!(!loaded.is_error());
    assert!((loaded.instrument.change + 1000.0).abs() < 1e-9);
    assert!(loaded.baseline.is_some());
}

#[tokio::test]
/// Verifies a 500 for QQQ yields an error-tagged record with zero prices and no baseline.
async fn server_error_tags_instrument_without_baseline() {
    let client = spawn_metrics_server().await;
    match client.instrument_card_comparison("QQQ", AssetType::Etf).await {
        Err(AppError::HttpStatus { status, .. }) => assert_eq!(status, 500),
        other => panic!("expected HttpStatus error, got {other:?}"),
    }

    let loader = BaselineLoader::new(client);
    let spec = InstrumentSpec::new("QQQ", "Invesco QQQ Trust", AssetType::Etf);
    let loaded = loader.load(&spec).await;
    assert!(loaded.instrument.has_error());
    assert_eq!(loaded.instrument.price, 0.0);
    assert_eq!(loaded.instrument.change, 0.0);
    assert!(loaded.baseline.is_none());
}

#[tokio::test]
/// Verifies an unreachable metrics host is reported per instrument, not as a panic.
async fn unreachable_host_is_a_load_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let base = Url::parse(&format!("http://{addr}/")).unwrap();
    let client = MetricsRestClient::new(base, Duration::from_millis(500)).unwrap();
    let loaded = BaselineLoader::new(client)
        .load(&InstrumentSpec::new("AAPL", "Apple Inc.", AssetType::Stock))
        .await;
    assert!(loaded.is_error());
}

#[tokio::test]
/// Verifies chart bars come back as candles sorted oldest first.
async fn candles_are_sorted_by_open_time() {
    let client = spawn_metrics_server().await;
    let candles = client
        .candles("AAPL", AssetType::Stock, ChartInterval::OneHour, &window())
        .await
        .expect("price data should load");
    assert_eq!(candles.len(), 2);
    assert!(candles[0].open_time < candles[1].open_time);
    assert!((candles[0].close - 186.0).abs() < 1e-9);
    assert_eq!(candles[0].close_time - candles[0].open_time, 3_600_000);
}

#[tokio::test]
/// Verifies an empty data array is surfaced as a no-data error.
async fn empty_price_data_is_no_data() {
    let client = spawn_metrics_server().await;
    let err = client
        .price_data("IXIC", AssetType::MarketIndex, ChartInterval::OneDay, &window())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NoData));
}
