use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::error::AppError;
use crate::model::candle::Candle;

/// One OHLC bar as served by the metrics service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PriceBar {
    pub symbol: String,
    /// ISO 8601; a missing offset is read as UTC.
    pub timestamp: String,
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub close_price: f64,
}

impl PriceBar {
    pub fn time(&self) -> Result<DateTime<Utc>, AppError> {
        parse_iso_timestamp(&self.timestamp)
    }

    pub fn to_candle(&self, interval_ms: u64) -> Result<Candle, AppError> {
        let open_time = u64::try_from(self.time()?.timestamp_millis()).map_err(|_| {
            AppError::Timestamp(format!("bar before epoch: {}", self.timestamp))
        })?;
        Ok(Candle {
            open: self.open_price,
            high: self.high_price,
            low: self.low_price,
            close: self.close_price,
            open_time,
            close_time: open_time.saturating_add(interval_ms),
        })
    }
}

/// `GET /carousel/instrument_card_comparison`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ComparisonResponse {
    pub current: PriceBar,
    pub previous: PriceBar,
}

/// `GET /chart/price_data`
#[derive(Debug, Clone, Deserialize)]
pub struct PriceDataResponse {
    #[serde(default)]
    pub data: Vec<PriceBar>,
}

pub fn parse_iso_timestamp(raw: &str) -> Result<DateTime<Utc>, AppError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(naive.and_utc());
        }
    }
    Err(AppError::Timestamp(format!("'{}' is not ISO 8601", raw)))
}
