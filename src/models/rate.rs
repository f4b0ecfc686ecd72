//! Exchange rate models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Base/target currency selection, normalized to lowercase codes
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CurrencyPair {
    pub base: String,
    pub target: String,
}

impl CurrencyPair {
    pub fn new(base: &str, target: &str) -> Self {
        Self {
            base: base.trim().to_lowercase(),
            target: target.trim().to_lowercase(),
        }
    }

    /// Both codes are set
    pub fn is_complete(&self) -> bool {
        !self.base.is_empty() && !self.target.is_empty()
    }

    /// `BASE/TARGET`, as shown in the indicator label
    pub fn display(&self) -> String {
        format!("{}/{}", self.base.to_uppercase(), self.target.to_uppercase())
    }
}

/// Rate for one calendar day; `None` when the pair was not published that day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateSample {
    pub date: NaiveDate,
    pub rate: Option<f64>,
}

impl RateSample {
    pub fn new(date: NaiveDate, rate: Option<f64>) -> Self {
        Self { date, rate }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeriesError {
    #[error("Sample dates must be strictly increasing ({previous} then {next})")]
    OutOfOrder { previous: NaiveDate, next: NaiveDate },
}

/// Rate samples ordered oldest first, one per day
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RateSeries {
    samples: Vec<RateSample>,
}

impl RateSeries {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_samples(samples: Vec<RateSample>) -> Result<Self, SeriesError> {
        for pair in samples.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(SeriesError::OutOfOrder {
                    previous: pair[0].date,
                    next: pair[1].date,
                });
            }
        }
        Ok(Self { samples })
    }

    pub fn samples(&self) -> &[RateSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples that carry a rate, paired with that rate
    pub fn valid(&self) -> Vec<(NaiveDate, f64)> {
        self.samples
            .iter()
            .filter_map(|s| s.rate.map(|rate| (s.date, rate)))
            .collect()
    }
}

/// Successful outcome of one refresh cycle
#[derive(Debug, Clone, PartialEq)]
pub struct RateSnapshot {
    pub current_rate: f64,
    pub previous_rate: Option<f64>,
    pub series: RateSeries,
}
