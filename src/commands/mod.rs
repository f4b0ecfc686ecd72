//! Commands typed on stdin while the indicator runs

use std::sync::Arc;

use tracing::{info, warn};

use crate::api::currency_api::CurrencyApiClient;
use crate::services::indicator_service::{Indicator, RefreshTrigger};
use crate::settings::{SettingKey, SettingsStore};
use crate::utils::Table;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Refresh,
    Set(SettingKey, String),
    Currencies,
    Status,
    Help,
    Quit,
}

/// Whether the command loop keeps reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub const HELP: &str = "Commands:\n  \
    refresh            fetch rates now\n  \
    base <CODE>        set the base currency (e.g. ZAR)\n  \
    target <CODE>      set the target currency (e.g. INR)\n  \
    currencies         list available currency codes\n  \
    status             show the current rate and history\n  \
    quit               exit";

/// Parse one input line. Blank lines parse to `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some(command) = parts.first() else {
        return Ok(None);
    };
    let args = &parts[1..];

    let parsed = match command.to_lowercase().as_str() {
        "refresh" | "r" => Command::Refresh,
        "base" | "target" => {
            let key = if command.eq_ignore_ascii_case("base") {
                SettingKey::Base
            } else {
                SettingKey::Target
            };
            let code = match args {
                [code] if code.chars().all(|c| c.is_ascii_alphanumeric()) => code.to_uppercase(),
                _ => return Err(format!("❌ Usage: `{} <CODE>`", command.to_lowercase())),
            };
            Command::Set(key, code)
        }
        "currencies" | "list" => Command::Currencies,
        "status" | "s" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("❌ Unknown command: '{}'. Type `help` for a list.", other)),
    };

    Ok(Some(parsed))
}

const LIST_FAILED: &str = "❌ Failed to load currency list. Please check internet connection.";

/// Parse one line of input and start it.
///
/// Only `quit` and `help` finish here. Commands that wait on the network or
/// the indicator run on their own task so the event loop keeps turning.
pub fn handle_line(
    line: &str,
    indicator: &Arc<Indicator>,
    settings: &Arc<dyn SettingsStore>,
    client: &CurrencyApiClient,
) -> Flow {
    let command = match parse_command(line) {
        Ok(Some(command)) => command,
        Ok(None) => return Flow::Continue,
        Err(e) => {
            println!("{}", e);
            return Flow::Continue;
        }
    };

    match command {
        Command::Refresh => {
            indicator.spawn_refresh(RefreshTrigger::Manual);
        }
        Command::Set(key, code) => {
            let settings = Arc::clone(settings);
            let client = client.clone();
            tokio::spawn(async move {
                if let Err(e) = set_currency(key, &code, settings.as_ref(), &client).await {
                    println!("{}", e);
                }
            });
        }
        Command::Currencies => {
            let client = client.clone();
            tokio::spawn(async move { print_currencies(&client).await });
        }
        Command::Status => {
            let indicator = Arc::clone(indicator);
            tokio::spawn(async move { print_status(&indicator).await });
        }
        Command::Help => println!("{}", HELP),
        Command::Quit => {
            info!("Quit requested");
            return Flow::Quit;
        }
    }

    Flow::Continue
}

/// Store `code` under `key` if currencies.json lists it
pub async fn set_currency(
    key: SettingKey,
    code: &str,
    settings: &dyn SettingsStore,
    client: &CurrencyApiClient,
) -> Result<(), String> {
    let currencies = client.list_currencies().await.map_err(|e| {
        warn!("Failed to load currencies: {}", e);
        LIST_FAILED.to_string()
    })?;

    if !currencies.iter().any(|c| c.code.eq_ignore_ascii_case(code)) {
        return Err(format!(
            "❌ Unknown currency: '{}'. Type `currencies` for a list.",
            code
        ));
    }

    // the settings watcher in main triggers the refresh
    settings.set_config(key, code);
    Ok(())
}

async fn print_currencies(client: &CurrencyApiClient) {
    match client.list_currencies().await {
        Ok(currencies) => {
            let mut table = Table::new(&["Code", "Currency"]);
            for currency in currencies {
                table.add_row(vec![currency.code.to_uppercase(), currency.name]);
            }
            println!("{}", table.render());
        }
        Err(e) => {
            warn!("Failed to load currencies: {}", e);
            println!("{}", LIST_FAILED);
        }
    }
}

async fn print_status(indicator: &Indicator) {
    let state = indicator.current().await;
    println!("{}", state.label);
    if let Some(delta) = &state.delta {
        println!("{} {}", delta.direction.arrow(), delta.magnitude);
    }
    for sample in state.series.samples() {
        match sample.rate {
            Some(rate) => println!("  {}  {:.4}", sample.date, rate),
            None => println!("  {}  -", sample.date),
        }
    }
}
