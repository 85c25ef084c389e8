//! Client side of the metrics HTTP service: comparison prices for the board
//! and historical bars for charts.

pub mod chart;
pub mod rest;
pub mod types;

pub use chart::{ChartInterval, ChartWindow, TimeRange};
pub use rest::MetricsRestClient;
pub use types::{ComparisonResponse, PriceBar, PriceDataResponse};
