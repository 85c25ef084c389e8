/// One OHLC bar of historical price data, times in epoch milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub open_time: u64,
    pub close_time: u64,
}

impl Candle {
    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }

    /// High-low spread as a percentage of the open.
    pub fn range_pct(&self) -> f64 {
        if self.open == 0.0 {
            return 0.0;
        }
        (self.high - self.low) / self.open * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(open: f64, close: f64) -> Candle {
        Candle {
            open,
            high: open.max(close) + 1.0,
            low: open.min(close) - 1.0,
            close,
            open_time: 60_000,
            close_time: 120_000,
        }
    }

    #[test]
    fn bullish_and_bearish() {
        assert!(candle(100.0, 102.0).is_bullish());
        assert!(candle(100.0, 100.0).is_bullish());
        assert!(!candle(100.0, 95.0).is_bullish());
    }

    #[test]
    fn range_pct_against_open() {
        let c = candle(100.0, 102.0);
        assert!((c.range_pct() - 4.0).abs() < 1e-9);
        assert_eq!(candle(0.0, 1.0).range_pct(), 0.0);
    }
}
