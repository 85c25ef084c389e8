use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use super::asset::AssetType;
use crate::error::AppError;

/// A single real-time price update pushed by the relay.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Tick {
    pub symbol: String,
    pub price: f64,
    #[serde(deserialize_with = "epoch_seconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type", default, deserialize_with = "lenient_asset_type")]
    pub asset_type: Option<AssetType>,
    #[serde(default)]
    pub bid: Option<f64>,
    #[serde(default)]
    pub ask: Option<f64>,
    #[serde(default)]
    pub currency_base: Option<String>,
    #[serde(default)]
    pub currency_quote: Option<String>,
}

impl Tick {
    pub fn from_json(text: &str) -> Result<Self, AppError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Convert epoch seconds (integer, fractional, or numeric string) to a UTC timestamp.
pub fn epoch_seconds_to_utc(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let millis = (secs * 1000.0).round() as i64;
    DateTime::from_timestamp_millis(millis)
}

fn epoch_seconds<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    let secs = match v {
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| serde::de::Error::custom("invalid timestamp"))?,
        serde_json::Value::String(s) => s.trim().parse::<f64>().map_err(serde::de::Error::custom)?,
        _ => return Err(serde::de::Error::custom("timestamp must be epoch seconds")),
    };
    epoch_seconds_to_utc(secs).ok_or_else(|| serde::de::Error::custom("timestamp out of range"))
}

// The relay tags ticks with a free-form type; an unrecognised tag must not drop the price.
fn lenient_asset_type<'de, D>(deserializer: D) -> Result<Option<AssetType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}
