pub mod baseline;
pub mod board;
pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod model;
pub mod relay;
pub mod session;
