use tokio::sync::watch;
use tracing::info;

use crate::models::CurrencyPair;

/// The two user-selectable settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    Base,
    Target,
}

impl SettingKey {
    pub fn name(&self) -> &'static str {
        match self {
            SettingKey::Base => "base-currency",
            SettingKey::Target => "target-currency",
        }
    }
}

/// Key-value store for the currency selection with change notification
pub trait SettingsStore: Send + Sync {
    fn get_config(&self) -> CurrencyPair;
    fn set_config(&self, key: SettingKey, value: &str);
    /// Receiver that wakes whenever either value changes
    fn on_config_change(&self) -> watch::Receiver<CurrencyPair>;
}

/// In-process settings backed by a `tokio::sync::watch` channel.
///
/// Codes are normalized to lowercase on write; setting a value that is
/// already current does not notify.
pub struct WatchSettings {
    tx: watch::Sender<CurrencyPair>,
}

impl WatchSettings {
    pub fn new(base: &str, target: &str) -> Self {
        let (tx, _rx) = watch::channel(CurrencyPair::new(base, target));
        Self { tx }
    }
}

impl SettingsStore for WatchSettings {
    fn get_config(&self) -> CurrencyPair {
        self.tx.borrow().clone()
    }

    fn set_config(&self, key: SettingKey, value: &str) {
        let value = value.trim().to_lowercase();
        let changed = self.tx.send_if_modified(|pair| {
            let slot = match key {
                SettingKey::Base => &mut pair.base,
                SettingKey::Target => &mut pair.target,
            };
            if *slot == value {
                return false;
            }
            *slot = value.clone();
            true
        });

        if changed {
            info!("Setting {} = {}", key.name(), value.to_uppercase());
        }
    }

    fn on_config_change(&self) -> watch::Receiver<CurrencyPair> {
        self.tx.subscribe()
    }
}
