use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::asset::AssetType;

/// Static description of a tracked instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentSpec {
    pub symbol: String,
    pub name: String,
    pub asset_type: AssetType,
}

impl InstrumentSpec {
    pub fn new(symbol: &str, name: &str, asset_type: AssetType) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
            asset_type,
        }
    }
}

/// The instrument set shown when config does not list any.
pub fn default_instruments() -> Vec<InstrumentSpec> {
    vec![
        InstrumentSpec::new("BTC/USD", "Bitcoin", AssetType::Cryptocurrency),
        InstrumentSpec::new("EUR/USD", "Euro/US Dollar", AssetType::Currency),
        InstrumentSpec::new("AAPL", "Apple Inc.", AssetType::Stock),
        InstrumentSpec::new("QQQ", "Invesco QQQ Trust", AssetType::Etf),
        InstrumentSpec::new("IXIC", "NASDAQ Composite", AssetType::MarketIndex),
    ]
}

/// Absolute and percent move of a price against its baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceChange {
    pub change: f64,
    pub change_percent: f64,
}

impl PriceChange {
    /// `None` when the baseline cannot be divided by.
    pub fn against(price: f64, baseline: f64) -> Option<Self> {
        if baseline == 0.0 || !baseline.is_finite() {
            return None;
        }
        let change = price - baseline;
        Some(Self {
            change,
            change_percent: change / baseline * 100.0,
        })
    }
}

/// Live view of one instrument on the board.
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    pub symbol: String,
    pub name: String,
    pub asset_type: AssetType,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    /// Timestamp of the bar the board was loaded from.
    pub timestamp: Option<DateTime<Utc>>,
    pub comparison_price: f64,
    pub comparison_timestamp: Option<DateTime<Utc>>,
    /// Timestamp of the most recent price, loaded or streamed.
    pub recent_timestamp: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl Instrument {
    /// Zero-valued entry created before any data arrives.
    pub fn placeholder(spec: &InstrumentSpec) -> Self {
        Self {
            symbol: spec.symbol.clone(),
            name: spec.name.clone(),
            asset_type: spec.asset_type,
            price: 0.0,
            change: 0.0,
            change_percent: 0.0,
            timestamp: None,
            comparison_price: 0.0,
            comparison_timestamp: None,
            recent_timestamp: None,
            error: None,
        }
    }

    pub fn spec(&self) -> InstrumentSpec {
        InstrumentSpec {
            symbol: self.symbol.clone(),
            name: self.name.clone(),
            asset_type: self.asset_type,
        }
    }

    /// Placeholder with the load error attached; prices stay zero.
    pub fn failed(spec: &InstrumentSpec, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::placeholder(spec)
        }
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_loaded(&self) -> bool {
        self.error.is_none() && self.timestamp.is_some()
    }

    pub fn apply_change(&mut self, change: PriceChange) {
        self.change = change.change;
        self.change_percent = change.change_percent;
    }
}
