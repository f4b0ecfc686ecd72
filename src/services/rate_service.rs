use std::sync::Arc;

use chrono::{Local, NaiveDate};
use futures::future::try_join_all;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::api::currency_api::endpoints;
use crate::api::currency_api::{ApiError, JsonFetcher};
use crate::models::{CurrencyPair, RateSample, RateSeries, RateSnapshot};
use crate::utils::dates;

/// Days fetched before today
pub const HISTORY_DAYS: u64 = 10;

/// Samples handed to the chart (the trailing window minus today)
pub const CHART_SAMPLES: usize = 10;

/// Why a refresh cycle produced no data. None of these are retried.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("Base and target currencies must both be set")]
    Config,
    #[error("No rate published for {base}/{target}")]
    NotSupported { base: String, target: String },
    #[error("Network error: {0}")]
    Network(#[from] ApiError),
}

impl RefreshError {
    /// Text shown in the indicator label for this failure
    pub fn status_text(&self) -> &'static str {
        match self {
            RefreshError::Config => "Config Error",
            RefreshError::NotSupported { .. } => "Not supported yet",
            RefreshError::Network(_) => "Error",
        }
    }
}

/// Fetches the trailing window of daily rates for a currency pair
pub struct RatePipeline {
    fetcher: Arc<dyn JsonFetcher>,
    api_base: String,
}

impl RatePipeline {
    pub fn new(fetcher: Arc<dyn JsonFetcher>, api_base: &str) -> Self {
        Self {
            fetcher,
            api_base: api_base.to_string(),
        }
    }

    /// Refresh against the local calendar day
    pub async fn refresh(&self, pair: &CurrencyPair) -> Result<RateSnapshot, RefreshError> {
        self.refresh_at(pair, Local::now().date_naive()).await
    }

    /// Fetch `today` and the [`HISTORY_DAYS`] before it concurrently.
    ///
    /// The first failed request fails the whole cycle. The returned series is
    /// oldest first and stops the day before `today`.
    pub async fn refresh_at(
        &self,
        pair: &CurrencyPair,
        today: NaiveDate,
    ) -> Result<RateSnapshot, RefreshError> {
        if !pair.is_complete() {
            return Err(RefreshError::Config);
        }

        let days = dates::trailing_days(today, HISTORY_DAYS);
        let urls: Vec<String> = days
            .iter()
            .map(|day| {
                endpoints::historical_rates_url(&self.api_base, &dates::iso_day(*day), &pair.base)
            })
            .collect();

        debug!("Fetching {} daily snapshots for {}", urls.len(), pair.display());

        // All requests are created up front and polled together
        let results = try_join_all(urls.iter().map(|url| self.fetcher.fetch_json(url))).await?;

        let current_rate = results
            .first()
            .and_then(|payload| extract_rate(payload, pair))
            .ok_or_else(|| RefreshError::NotSupported {
                base: pair.base.clone(),
                target: pair.target.clone(),
            })?;

        let previous_rate = results.get(1).and_then(|payload| extract_rate(payload, pair));

        let mut samples: Vec<RateSample> = days
            .iter()
            .zip(results.iter())
            .map(|(day, payload)| RateSample::new(*day, extract_rate(payload, pair)))
            .collect();
        samples.reverse();
        samples.truncate(CHART_SAMPLES);

        // trailing_days yields strictly decreasing days, so reversed they are increasing
        let series = RateSeries::from_samples(samples)
            .map_err(|e| ApiError::UnexpectedShape(e.to_string()))?;

        info!(
            "{}: {:.4} (previous {:?}, {} samples)",
            pair.display(),
            current_rate,
            previous_rate,
            series.len()
        );

        Ok(RateSnapshot {
            current_rate,
            previous_rate,
            series,
        })
    }
}

/// `payload[base][target]` as a number
fn extract_rate(payload: &Value, pair: &CurrencyPair) -> Option<f64> {
    payload
        .get(&pair.base)
        .and_then(|rates| rates.get(&pair.target))
        .and_then(Value::as_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    const API: &str = "https://cdn.test";

    /// Serves canned payloads by date and records every requested URL
    #[derive(Default)]
    struct FakeFetcher {
        payloads: HashMap<String, Value>,
        failing: Option<String>,
        requested: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        fn with_day(mut self, day: NaiveDate, base: &str, target: &str, rate: f64) -> Self {
            let url = endpoints::historical_rates_url(API, &dates::iso_day(day), base);
            self.payloads.insert(url, json!({ base: { target: rate } }));
            self
        }

        fn failing_on(mut self, day: NaiveDate, base: &str) -> Self {
            self.failing = Some(endpoints::historical_rates_url(API, &dates::iso_day(day), base));
            self
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl JsonFetcher for FakeFetcher {
        async fn fetch_json(&self, url: &str) -> Result<Value, ApiError> {
            self.requested.lock().unwrap().push(url.to_string());
            if self.failing.as_deref() == Some(url) {
                return Err(ApiError::Status {
                    status: 404,
                    url: url.to_string(),
                });
            }
            // Days without a snapshot for the pair still answer with the base object
            Ok(self
                .payloads
                .get(url)
                .cloned()
                .unwrap_or_else(|| json!({ "usd": { "gbp": 0.79 } })))
        }
    }

    /// Holds every request open briefly and tracks how many overlap
    #[derive(Default)]
    struct SlowFetcher {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl JsonFetcher for SlowFetcher {
        async fn fetch_json(&self, _url: &str) -> Result<Value, ApiError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(json!({ "usd": { "eur": 0.92 } }))
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 11).unwrap()
    }

    fn days_ago(n: u64) -> NaiveDate {
        today() - chrono::Days::new(n)
    }

    fn full_window() -> FakeFetcher {
        (0..=HISTORY_DAYS).fold(FakeFetcher::default(), |fetcher, n| {
            fetcher.with_day(days_ago(n), "usd", "eur", 0.90 + n as f64 * 0.01)
        })
    }

    #[tokio::test]
    async fn test_empty_base_is_config_error_without_fetching() {
        let fetcher = Arc::new(full_window());
        let pipeline = RatePipeline::new(fetcher.clone(), API);

        let err = pipeline
            .refresh_at(&CurrencyPair::new("", "eur"), today())
            .await
            .unwrap_err();

        assert!(matches!(err, RefreshError::Config));
        assert_eq!(err.status_text(), "Config Error");
        assert!(fetcher.requested().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_fans_out_one_request_per_day() {
        let fetcher = Arc::new(full_window());
        let pipeline = RatePipeline::new(fetcher.clone(), API);

        pipeline
            .refresh_at(&CurrencyPair::new("USD", "EUR"), today())
            .await
            .unwrap();

        let requested = fetcher.requested();
        assert_eq!(requested.len(), 11);
        assert!(requested[0].contains("currency-api@2024-03-11/v1/currencies/usd.min.json"));
        assert!(requested[10].contains("currency-api@2024-03-01/"));
    }

    #[tokio::test]
    async fn test_series_is_ascending_and_excludes_today() {
        let pipeline = RatePipeline::new(Arc::new(full_window()), API);

        let snapshot = pipeline
            .refresh_at(&CurrencyPair::new("usd", "eur"), today())
            .await
            .unwrap();

        assert!((snapshot.current_rate - 0.90).abs() < 1e-9);
        assert!((snapshot.previous_rate.unwrap() - 0.91).abs() < 1e-9);

        let samples = snapshot.series.samples();
        assert_eq!(samples.len(), CHART_SAMPLES);
        assert_eq!(samples[0].date, days_ago(10));
        assert_eq!(samples[9].date, days_ago(1));
        assert!(samples.iter().all(|s| s.date != today()));
        assert!(samples.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[tokio::test]
    async fn test_missing_today_is_not_supported() {
        let fetcher = (1..=HISTORY_DAYS).fold(FakeFetcher::default(), |fetcher, n| {
            fetcher.with_day(days_ago(n), "usd", "eur", 0.9)
        });
        let pipeline = RatePipeline::new(Arc::new(fetcher), API);

        let err = pipeline
            .refresh_at(&CurrencyPair::new("usd", "eur"), today())
            .await
            .unwrap_err();

        assert!(matches!(err, RefreshError::NotSupported { .. }));
        assert_eq!(err.status_text(), "Not supported yet");
    }

    #[tokio::test]
    async fn test_missing_yesterday_leaves_gap() {
        let fetcher = FakeFetcher::default()
            .with_day(days_ago(0), "usd", "eur", 0.92)
            .with_day(days_ago(2), "usd", "eur", 0.93);
        let pipeline = RatePipeline::new(Arc::new(fetcher), API);

        let snapshot = pipeline
            .refresh_at(&CurrencyPair::new("usd", "eur"), today())
            .await
            .unwrap();

        assert_eq!(snapshot.previous_rate, None);
        assert_eq!(snapshot.series.len(), CHART_SAMPLES);
        assert_eq!(snapshot.series.valid(), vec![(days_ago(2), 0.93)]);
    }

    #[tokio::test]
    async fn test_single_failure_fails_the_cycle() {
        let fetcher = full_window().failing_on(days_ago(4), "usd");
        let pipeline = RatePipeline::new(Arc::new(fetcher), API);

        let err = pipeline
            .refresh_at(&CurrencyPair::new("usd", "eur"), today())
            .await
            .unwrap_err();

        assert!(matches!(err, RefreshError::Network(ApiError::Status { status: 404, .. })));
        assert_eq!(err.status_text(), "Error");
    }

    #[tokio::test]
    async fn test_all_days_are_in_flight_together() {
        let fetcher = Arc::new(SlowFetcher::default());
        let pipeline = RatePipeline::new(fetcher.clone(), API);

        pipeline
            .refresh_at(&CurrencyPair::new("usd", "eur"), today())
            .await
            .unwrap();

        assert_eq!(fetcher.peak.load(Ordering::SeqCst), HISTORY_DAYS as usize + 1);
        assert_eq!(fetcher.in_flight.load(Ordering::SeqCst), 0);
    }
}
