use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod commands;
mod config;
mod models;
mod services;
mod settings;
mod utils;

use api::currency_api::CurrencyApiClient;
use commands::Flow;
use config::AppConfig;
use models::IndicatorState;
use services::chart_service;
use services::indicator_service::{ChartSize, Indicator, IndicatorView, RefreshTrigger};
use services::rate_service::RatePipeline;
use settings::{SettingsStore, WatchSettings};

/// Logs each committed state and writes the chart to a PNG
struct ConsoleView {
    chart_path: PathBuf,
    chart_size: ChartSize,
}

impl IndicatorView for ConsoleView {
    fn show(&self, state: &IndicatorState) -> Result<(), String> {
        match &state.delta {
            Some(delta) => info!(
                "💱 {}  {} {} ({}, {})",
                state.label,
                delta.direction.arrow(),
                delta.magnitude,
                delta.direction.icon_name(),
                delta.direction.color()
            ),
            None => info!("💱 {}", state.label),
        }

        chart_service::export_png(
            &state.chart,
            self.chart_size.width,
            self.chart_size.height,
            &self.chart_path,
        )?;
        debug!("Chart written to {}", self.chart_path.display());
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rate_indicator=debug,reqwest=warn,hyper=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("💹 Starting rate indicator...");

    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return;
        }
    };
    debug!("Configuration: {:?}", config);

    let http_client = match CurrencyApiClient::build_http_client(config.http_timeout) {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            return;
        }
    };
    let client = CurrencyApiClient::with_base_url(http_client, config.api_base_url.clone());

    let settings: Arc<dyn SettingsStore> =
        Arc::new(WatchSettings::new(&config.base_currency, &config.target_currency));
    let chart_size = ChartSize {
        width: config.chart_width,
        height: config.chart_height,
    };
    let view = Arc::new(ConsoleView {
        chart_path: config.chart_path.clone(),
        chart_size,
    });
    let pipeline = RatePipeline::new(Arc::new(client.clone()), client.base_url());
    let indicator = Arc::new(Indicator::new(pipeline, settings.clone(), view, chart_size));

    indicator.spawn_refresh(RefreshTrigger::Startup);

    let mut timer = tokio::time::interval(config.refresh_interval);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately; startup already refreshed
    timer.tick().await;

    let mut config_changes = settings.on_config_change();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    info!(
        "Refreshing every {}s; chart at {}. Type `help` for commands.",
        config.refresh_interval.as_secs(),
        config.chart_path.display()
    );

    loop {
        tokio::select! {
            _ = timer.tick() => {
                indicator.spawn_refresh(RefreshTrigger::Timer);
            }
            changed = config_changes.changed() => {
                if changed.is_err() {
                    warn!("Settings store closed");
                    break;
                }
                config_changes.borrow_and_update();
                indicator.spawn_refresh(RefreshTrigger::SettingsChanged);
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if commands::handle_line(&line, &indicator, &settings, &client) == Flow::Quit {
                        break;
                    }
                }
                Ok(None) => {
                    debug!("stdin closed; manual commands disabled");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    stdin_open = false;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    info!("👋 Rate indicator stopped");
}
