pub mod asset;
pub mod candle;
pub mod instrument;
pub mod tick;
