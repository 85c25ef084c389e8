use std::time::Duration;

use url::Url;

use super::chart::{ChartInterval, ChartWindow};
use super::types::{ComparisonResponse, PriceBar, PriceDataResponse};
use crate::config::MetricsConfig;
use crate::error::AppError;
use crate::model::asset::AssetType;
use crate::model::candle::Candle;

/// HTTP client for the metrics service.
#[derive(Debug, Clone)]
pub struct MetricsRestClient {
    http: reqwest::Client,
    base_url: Url,
}

impl MetricsRestClient {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    pub fn from_config(config: &MetricsConfig) -> Result<Self, AppError> {
        Self::new(config.base_url()?, config.timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        Ok(self.base_url.join(path)?)
    }

    async fn get_json<T>(&self, url: Url) -> Result<T, AppError>
    where
        T: serde::de::DeserializeOwned,
    {
        let resp = self.http.get(url.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(url = %url, status = status.as_u16(), "metrics request failed");
            return Err(AppError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Current vs previous close for one instrument.
    pub async fn instrument_card_comparison(
        &self,
        symbol: &str,
        asset_type: AssetType,
    ) -> Result<ComparisonResponse, AppError> {
        let mut url = self.endpoint("carousel/instrument_card_comparison")?;
        url.query_pairs_mut()
            .append_pair("symbol", symbol)
            .append_pair("asset_type", asset_type.as_str());

        tracing::debug!(symbol, %asset_type, "fetching comparison prices");
        self.get_json(url).await
    }

    /// Historical bars for the chart window. An empty result is an error.
    pub async fn price_data(
        &self,
        symbol: &str,
        asset_type: AssetType,
        interval: ChartInterval,
        window: &ChartWindow,
    ) -> Result<Vec<PriceBar>, AppError> {
        let mut url = self.endpoint("chart/price_data")?;
        url.query_pairs_mut()
            .append_pair("symbol", symbol)
            .append_pair("asset_type", asset_type.as_str())
            .append_pair("interval", interval.as_str())
            .append_pair("start_time", &window.start_iso())
            .append_pair("end_time", &window.end_iso());

        tracing::debug!(
            symbol,
            %asset_type,
            %interval,
            start = %window.start_iso(),
            end = %window.end_iso(),
            "fetching chart price data"
        );
        let resp: PriceDataResponse = self.get_json(url).await?;
        if resp.data.is_empty() {
            return Err(AppError::NoData);
        }
        Ok(resp.data)
    }

    /// `price_data` converted to candles, oldest first.
    pub async fn candles(
        &self,
        symbol: &str,
        asset_type: AssetType,
        interval: ChartInterval,
        window: &ChartWindow,
    ) -> Result<Vec<Candle>, AppError> {
        let bars = self.price_data(symbol, asset_type, interval, window).await?;
        let mut candles = bars
            .iter()
            .map(|bar| bar.to_candle(interval.duration_ms()))
            .collect::<Result<Vec<_>, _>>()?;
        candles.sort_by_key(|c| c.open_time);
        Ok(candles)
    }
}
