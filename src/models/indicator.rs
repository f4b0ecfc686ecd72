//! Indicator display models

use super::chart::DrawCommand;
use super::rate::RateSeries;

pub const LOADING_LABEL: &str = "Loading...";

/// Changes smaller than this (in either direction) count as unchanged
pub const DELTA_THRESHOLD: f64 = 0.00001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaDirection {
    Up,
    Down,
    Neutral,
}

impl DeltaDirection {
    /// Classify `current - previous`; exactly ±threshold is neutral
    pub fn classify(diff: f64) -> Self {
        if diff > DELTA_THRESHOLD {
            DeltaDirection::Up
        } else if diff < -DELTA_THRESHOLD {
            DeltaDirection::Down
        } else {
            DeltaDirection::Neutral
        }
    }

    /// Symbolic icon name for the panel
    pub fn icon_name(&self) -> &'static str {
        match self {
            DeltaDirection::Up => "go-up-symbolic",
            DeltaDirection::Down => "go-down-symbolic",
            DeltaDirection::Neutral => "go-next-symbolic",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            DeltaDirection::Up => "#26A269",
            DeltaDirection::Down => "#E01B24",
            DeltaDirection::Neutral => "#888",
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            DeltaDirection::Up => "▲",
            DeltaDirection::Down => "▼",
            DeltaDirection::Neutral => "▶",
        }
    }
}

/// Day-over-day change shown next to the rate
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaIndicator {
    pub direction: DeltaDirection,
    /// `|diff|` to 4 decimal places
    pub magnitude: String,
}

impl DeltaIndicator {
    pub fn from_rates(current: f64, previous: f64) -> Self {
        let diff = current - previous;
        Self {
            direction: DeltaDirection::classify(diff),
            magnitude: format!("{:.4}", diff.abs()),
        }
    }
}

/// Everything the display shows, committed as one value
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorState {
    pub label: String,
    pub delta: Option<DeltaIndicator>,
    pub series: RateSeries,
    pub chart: Vec<DrawCommand>,
}

impl IndicatorState {
    pub fn loading() -> Self {
        Self {
            label: LOADING_LABEL.to_string(),
            delta: None,
            series: RateSeries::empty(),
            chart: Vec::new(),
        }
    }
}
