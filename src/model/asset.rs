use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Asset class of a tracked instrument, as used on the wire and in config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetType {
    Cryptocurrency,
    Currency,
    Stock,
    Etf,
    MarketIndex,
}

impl AssetType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cryptocurrency => "CRYPTOCURRENCY",
            Self::Currency => "CURRENCY",
            Self::Stock => "STOCK",
            Self::Etf => "ETF",
            Self::MarketIndex => "MARKET_INDEX",
        }
    }

    /// Exchange-listed instruments trade in sessions; crypto and FX do not.
    pub fn has_market_hours(self) -> bool {
        matches!(self, Self::Stock | Self::Etf | Self::MarketIndex)
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "CRYPTOCURRENCY" | "CRYPTO" => Ok(Self::Cryptocurrency),
            "CURRENCY" | "FX" => Ok(Self::Currency),
            "STOCK" => Ok(Self::Stock),
            "ETF" => Ok(Self::Etf),
            "MARKET_INDEX" | "INDEX" => Ok(Self::MarketIndex),
            other => Err(format!("unknown asset type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketSession {
    PreMarket,
    Regular,
    AfterMarket,
}

impl MarketSession {
    /// Classify `timestamp` against US-style session boundaries in the given offset:
    /// before 09:30 is pre-market, from 16:00 on is after-market.
    pub fn classify(timestamp: DateTime<Utc>, offset: FixedOffset) -> Self {
        let local = timestamp.with_timezone(&offset);
        let minutes = local.hour() * 60 + local.minute();
        if minutes < 9 * 60 + 30 {
            Self::PreMarket
        } else if minutes >= 16 * 60 {
            Self::AfterMarket
        } else {
            Self::Regular
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::PreMarket => "Pre-Market",
            Self::Regular => "Regular",
            Self::AfterMarket => "After-Market",
        }
    }
}
