use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::models::{
    CurrencyPair, DeltaIndicator, DrawCommand, IndicatorState, RateSeries, RateSnapshot,
};
use crate::services::chart_service;
use crate::services::rate_service::{RatePipeline, RefreshError};
use crate::settings::SettingsStore;

/// What asked for a refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    Startup,
    Timer,
    SettingsChanged,
    Manual,
}

impl fmt::Display for RefreshTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RefreshTrigger::Startup => "startup",
            RefreshTrigger::Timer => "timer",
            RefreshTrigger::SettingsChanged => "settings",
            RefreshTrigger::Manual => "manual",
        };
        f.write_str(name)
    }
}

/// Receives every state the indicator commits
pub trait IndicatorView: Send + Sync {
    fn show(&self, state: &IndicatorState) -> Result<(), String>;
}

/// Canvas size the chart is rendered for
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartSize {
    pub width: u32,
    pub height: u32,
}

/// Drives refreshes and commits their results to the view.
///
/// Refreshes may overlap. Each one takes a generation number when it starts
/// and may only commit while that number is still the newest, so a slow
/// older refresh never replaces the result of a newer one.
pub struct Indicator {
    pipeline: RatePipeline,
    settings: Arc<dyn SettingsStore>,
    view: Arc<dyn IndicatorView>,
    chart_size: ChartSize,
    generation: AtomicU64,
    state: Mutex<IndicatorState>,
}

impl Indicator {
    pub fn new(
        pipeline: RatePipeline,
        settings: Arc<dyn SettingsStore>,
        view: Arc<dyn IndicatorView>,
        chart_size: ChartSize,
    ) -> Self {
        Self {
            pipeline,
            settings,
            view,
            chart_size,
            generation: AtomicU64::new(0),
            state: Mutex::new(IndicatorState::loading()),
        }
    }

    /// Run one refresh cycle. Returns `true` if its result was committed.
    pub async fn refresh(&self, trigger: RefreshTrigger) -> bool {
        let generation = self.begin();
        let pair = self.settings.get_config();
        info!("Refresh #{} ({}) for {}", generation, trigger, pair.display());

        let next = match self.pipeline.refresh(&pair).await {
            Ok(snapshot) => self.success_state(&pair, snapshot),
            Err(e) => {
                warn!("Refresh #{} failed: {}", generation, e);
                self.error_state(&e)
            }
        };

        self.commit(generation, next).await
    }

    /// Run a refresh on its own task so triggers never wait on the network
    pub fn spawn_refresh(self: &Arc<Self>, trigger: RefreshTrigger) -> JoinHandle<bool> {
        let indicator = Arc::clone(self);
        tokio::spawn(async move { indicator.refresh(trigger).await })
    }

    /// Last committed state
    pub async fn current(&self) -> IndicatorState {
        self.state.lock().await.clone()
    }

    fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn commit(&self, generation: u64, next: IndicatorState) -> bool {
        let mut state = self.state.lock().await;

        let latest = self.generation.load(Ordering::SeqCst);
        if generation != latest {
            debug!("Discarding refresh #{}; #{} is newer", generation, latest);
            return false;
        }

        *state = next;
        if let Err(e) = self.view.show(&state) {
            warn!("Failed to update display: {}", e);
        }
        true
    }

    fn success_state(&self, pair: &CurrencyPair, snapshot: RateSnapshot) -> IndicatorState {
        let label = format!("{}: {:.4}", pair.display(), snapshot.current_rate);
        let delta = snapshot
            .previous_rate
            .map(|previous| DeltaIndicator::from_rates(snapshot.current_rate, previous));
        let chart = self.render(&snapshot.series);

        IndicatorState {
            label,
            delta,
            series: snapshot.series,
            chart,
        }
    }

    fn error_state(&self, error: &RefreshError) -> IndicatorState {
        let series = RateSeries::empty();
        let chart = self.render(&series);

        IndicatorState {
            label: error.status_text().to_string(),
            delta: None,
            series,
            chart,
        }
    }

    fn render(&self, series: &RateSeries) -> Vec<DrawCommand> {
        chart_service::render(
            series,
            f64::from(self.chart_size.width),
            f64::from(self.chart_size.height),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::currency_api::{ApiError, JsonFetcher};
    use crate::models::DeltaDirection;
    use crate::settings::{SettingKey, WatchSettings};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex as StdMutex;

    /// Every day answers with the same payload
    struct StaticFetcher {
        payload: Option<Value>,
    }

    #[async_trait]
    impl JsonFetcher for StaticFetcher {
        async fn fetch_json(&self, url: &str) -> Result<Value, ApiError> {
            self.payload
                .clone()
                .ok_or_else(|| ApiError::Transport(format!("{}: connection refused", url)))
        }
    }

    #[derive(Default)]
    struct RecordingView {
        shown: StdMutex<Vec<IndicatorState>>,
    }

    impl IndicatorView for RecordingView {
        fn show(&self, state: &IndicatorState) -> Result<(), String> {
            self.shown.lock().unwrap().push(state.clone());
            Ok(())
        }
    }

    fn indicator(
        payload: Option<Value>,
        base: &str,
        target: &str,
    ) -> (Indicator, Arc<RecordingView>) {
        let view = Arc::new(RecordingView::default());
        let settings = Arc::new(WatchSettings::new(base, target));
        let pipeline = RatePipeline::new(Arc::new(StaticFetcher { payload }), "https://cdn.test");
        let indicator = Indicator::new(
            pipeline,
            settings,
            view.clone(),
            ChartSize { width: 500, height: 250 },
        );
        (indicator, view)
    }

    #[tokio::test]
    async fn test_initial_state_is_loading() {
        let (indicator, _) = indicator(None, "usd", "eur");
        let state = indicator.current().await;
        assert_eq!(state.label, "Loading...");
        assert!(state.chart.is_empty());
    }

    #[tokio::test]
    async fn test_successful_refresh_commits_label_delta_and_chart() {
        let (indicator, view) = indicator(Some(json!({ "usd": { "eur": 0.92 } })), "USD", "EUR");

        assert!(indicator.refresh(RefreshTrigger::Manual).await);

        let state = indicator.current().await;
        assert_eq!(state.label, "USD/EUR: 0.9200");
        let delta = state.delta.expect("previous day available");
        assert_eq!(delta.direction, DeltaDirection::Neutral);
        assert_eq!(delta.magnitude, "0.0000");
        assert_eq!(state.series.len(), 10);
        assert!(state.chart.len() > 1);
        assert_eq!(view.shown.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_network_error_clears_chart() {
        let (indicator, view) = indicator(None, "usd", "eur");

        assert!(indicator.refresh(RefreshTrigger::Timer).await);

        let state = indicator.current().await;
        assert_eq!(state.label, "Error");
        assert!(state.delta.is_none());
        assert!(state.series.is_empty());
        assert_eq!(state.chart.len(), 1);
        assert!(matches!(state.chart[0], DrawCommand::Clear { .. }));
        assert_eq!(view.shown.lock().unwrap()[0].label, "Error");
    }

    #[tokio::test]
    async fn test_missing_pair_is_config_error() {
        let (indicator, _) = indicator(Some(json!({})), "usd", "");
        indicator.refresh(RefreshTrigger::Startup).await;

        let state = indicator.current().await;
        assert_eq!(state.label, "Config Error");
        assert!(state.delta.is_none());
        assert!(state.series.is_empty());
        assert_eq!(state.chart.len(), 1);
        assert!(matches!(state.chart[0], DrawCommand::Clear { .. }));
    }

    #[tokio::test]
    async fn test_unpublished_pair_is_not_supported() {
        let (indicator, _) = indicator(Some(json!({ "usd": { "gbp": 0.79 } })), "usd", "eur");
        indicator.settings.set_config(SettingKey::Target, "xyz");
        indicator.refresh(RefreshTrigger::SettingsChanged).await;

        let state = indicator.current().await;
        assert_eq!(state.label, "Not supported yet");
        assert!(state.delta.is_none());
        assert!(state.series.is_empty());
        assert_eq!(state.chart.len(), 1);
        assert!(matches!(state.chart[0], DrawCommand::Clear { .. }));
    }

    #[tokio::test]
    async fn test_spawned_refreshes_commit_latest() {
        let (indicator, view) = indicator(Some(json!({ "usd": { "eur": 0.92 } })), "usd", "eur");
        let indicator = Arc::new(indicator);

        let first = indicator.spawn_refresh(RefreshTrigger::Timer);
        let second = indicator.spawn_refresh(RefreshTrigger::Manual);
        let committed = [first.await.unwrap(), second.await.unwrap()];

        // whichever started last always commits; the other may be discarded
        assert!(committed.iter().any(|c| *c));
        let shown = view.shown.lock().unwrap().len();
        assert_eq!(shown, committed.iter().filter(|c| **c).count());
        assert_eq!(indicator.current().await.label, "USD/EUR: 0.9200");
    }

    #[tokio::test]
    async fn test_stale_generation_is_discarded() {
        let (indicator, view) = indicator(None, "usd", "eur");

        let older = indicator.begin();
        let newer = indicator.begin();

        let mut newer_state = IndicatorState::loading();
        newer_state.label = "USD/EUR: 0.9300".to_string();
        let mut older_state = IndicatorState::loading();
        older_state.label = "USD/EUR: 0.9100".to_string();

        assert!(indicator.commit(newer, newer_state).await);
        assert!(!indicator.commit(older, older_state).await);

        assert_eq!(indicator.current().await.label, "USD/EUR: 0.9300");
        assert_eq!(view.shown.lock().unwrap().len(), 1);
    }
}
