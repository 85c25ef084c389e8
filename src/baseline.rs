//! Baseline loading: one comparison fetch per instrument seeds the reference
//! price that streamed ticks are measured against.

use std::collections::HashMap;
use std::future::Future;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;

use crate::error::AppError;
use crate::metrics::rest::MetricsRestClient;
use crate::metrics::types::ComparisonResponse;
use crate::model::asset::AssetType;
use crate::model::instrument::{Instrument, InstrumentSpec, PriceChange};

pub const LOAD_FAILED_MESSAGE: &str = "Failed to load data";

/// Previous reference close for one symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline {
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

/// Per-symbol baselines. Written only by comparison loads, never by ticks.
#[derive(Debug, Clone, Default)]
pub struct BaselineStore {
    by_symbol: HashMap<String, Baseline>,
}

impl BaselineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, symbol: &str) -> Option<&Baseline> {
        self.by_symbol.get(symbol)
    }

    pub fn price(&self, symbol: &str) -> Option<f64> {
        self.get(symbol).map(|b| b.price)
    }

    /// Overwrites any previous baseline for `symbol`.
    pub fn set(&mut self, symbol: &str, baseline: Baseline) {
        self.by_symbol.insert(symbol.to_string(), baseline);
    }

    /// Drop the baseline for `symbol`, e.g. after a reload that produced none.
    pub fn remove(&mut self, symbol: &str) -> Option<Baseline> {
        self.by_symbol.remove(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.by_symbol.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}

/// Source of current-vs-previous comparison bars.
pub trait ComparisonSource: Send + Sync {
    fn fetch_comparison(
        &self,
        symbol: &str,
        asset_type: AssetType,
    ) -> impl Future<Output = Result<ComparisonResponse, AppError>> + Send;
}

impl ComparisonSource for MetricsRestClient {
    async fn fetch_comparison(
        &self,
        symbol: &str,
        asset_type: AssetType,
    ) -> Result<ComparisonResponse, AppError> {
        self.instrument_card_comparison(symbol, asset_type).await
    }
}

/// Outcome of loading one instrument.
#[derive(Debug, Clone)]
pub struct LoadedInstrument {
    pub instrument: Instrument,
    /// `None` when the load failed or the previous close cannot serve as a baseline.
    pub baseline: Option<Baseline>,
}

impl LoadedInstrument {
    pub fn is_error(&self) -> bool {
        self.instrument.has_error()
    }
}

pub struct BaselineLoader<S> {
    source: S,
}

impl<S: ComparisonSource> BaselineLoader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch and derive one instrument. Failures are folded into an error-tagged record.
    pub async fn load(&self, spec: &InstrumentSpec) -> LoadedInstrument {
        match self.try_load(spec).await {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::error!(symbol = %spec.symbol, error = %e, "failed to load comparison prices");
                LoadedInstrument {
                    instrument: Instrument::failed(spec, LOAD_FAILED_MESSAGE),
                    baseline: None,
                }
            }
        }
    }

    /// Load every instrument concurrently; results keep the input order.
    pub async fn load_all(&self, specs: &[InstrumentSpec]) -> Vec<LoadedInstrument> {
        join_all(specs.iter().map(|spec| self.load(spec))).await
    }

    async fn try_load(&self, spec: &InstrumentSpec) -> Result<LoadedInstrument, AppError> {
        let resp = self
            .source
            .fetch_comparison(&spec.symbol, spec.asset_type)
            .await?;
        derive_loaded(spec, &resp)
    }
}

/// Build the board record and baseline from a comparison response.
pub fn derive_loaded(
    spec: &InstrumentSpec,
    resp: &ComparisonResponse,
) -> Result<LoadedInstrument, AppError> {
    let current_time = resp.current.time()?;
    let previous_time = resp.previous.time()?;
    let price = resp.current.close_price;
    let previous_close = resp.previous.close_price;

    let mut instrument = Instrument {
        price,
        timestamp: Some(current_time),
        comparison_price: previous_close,
        comparison_timestamp: Some(previous_time),
        recent_timestamp: Some(current_time),
        ..Instrument::placeholder(spec)
    };

    let baseline = match PriceChange::against(price, previous_close) {
        Some(change) => {
            instrument.apply_change(change);
            Some(Baseline {
                price: previous_close,
                timestamp: previous_time,
            })
        }
        None => {
            tracing::warn!(
                symbol = %spec.symbol,
                previous_close,
                "previous close unusable as baseline"
            );
            None
        }
    };

    tracing::info!(
        symbol = %spec.symbol,
        price,
        baseline = previous_close,
        change = instrument.change,
        change_percent = instrument.change_percent,
        "baseline loaded"
    );
    Ok(LoadedInstrument {
        instrument,
        baseline,
    })
}
