pub mod bar_series;

// Re-export the bar types for convenient access (e.g. `use crate::market_data::PriceBar`).
pub use bar_series::{BarSeries, PriceBar, RawBar};
