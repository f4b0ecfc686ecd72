//! Data models for the rate indicator
//!
//! Rates as fetched, the chart's drawing commands, and the state the
//! indicator shows.

pub mod chart;
pub mod indicator;
pub mod rate;

pub use chart::{ChartGeometry, DrawCommand, Padding, Point, Rgba, TextAnchor};
pub use indicator::{DeltaDirection, DeltaIndicator, IndicatorState};
pub use rate::{CurrencyPair, RateSample, RateSeries, RateSnapshot};
