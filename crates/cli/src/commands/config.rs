use secrecy::ExposeSecret;
use serde::Serialize;
use xsell_core::config::{locate_file, read_file_entries, AppConfig, LoadOptions, ENV_BINDINGS};

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct EffectiveValue {
    key: &'static str,
    value: String,
    source: String,
}

/// Reports the effective configuration with the layer each value came from.
/// Secrets are redacted.
pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            )
        }
    };

    let file = locate_file(None);
    let file_keys: Vec<String> = file
        .as_deref()
        .and_then(|path| read_file_entries(path).ok())
        .map(|entries| entries.into_iter().map(|(key, _)| key).collect())
        .unwrap_or_default();

    let entries: Vec<EffectiveValue> = ENV_BINDINGS
        .iter()
        .map(|binding| {
            let source = match (binding.active_var(), &file) {
                (Some(var), _) => format!("env ({var})"),
                (None, Some(path)) if file_keys.iter().any(|key| key == binding.key) => {
                    format!("file ({})", path.display())
                }
                _ => "default".to_string(),
            };
            EffectiveValue { key: binding.key, value: display_value(&config, binding.key), source }
        })
        .collect();

    CommandResult::success_with_data(
        "config",
        "effective config (source precedence: env > file > default)",
        serde_json::to_value(entries).ok(),
    )
}

fn display_value(config: &AppConfig, key: &str) -> String {
    let unset = || "<unset>".to_string();
    match key {
        "database.url" => config.database.url.clone(),
        "database.max_connections" => config.database.max_connections.to_string(),
        "database.timeout_secs" => config.database.timeout_secs.to_string(),
        "catalog.source" => format!("{:?}", config.catalog.source).to_ascii_lowercase(),
        "catalog.base_url" => config.catalog.base_url.clone().unwrap_or_else(unset),
        "catalog.api_token" => config
            .catalog
            .api_token
            .as_ref()
            .map(|token| redact_token(token.expose_secret()))
            .unwrap_or_else(unset),
        "catalog.page_size" => config.catalog.page_size.to_string(),
        "catalog.timeout_secs" => config.catalog.timeout_secs.to_string(),
        "engine.include_inactive_targets" => config.engine.include_inactive_targets.to_string(),
        "engine.numeric_scale" => config.engine.numeric_scale.to_string(),
        "server.bind_address" => config.server.bind_address.clone(),
        "server.port" => config.server.port.to_string(),
        "server.graceful_shutdown_secs" => config.server.graceful_shutdown_secs.to_string(),
        "logging.level" => config.logging.level.clone(),
        "logging.format" => format!("{:?}", config.logging.format).to_ascii_lowercase(),
        _ => unset(),
    }
}

/// Keeps at most the first four characters of a token.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    match trimmed.chars().count() {
        0 => "<empty>".to_string(),
        1..=8 => "<redacted>".to_string(),
        _ => format!("{}***", trimmed.chars().take(4).collect::<String>()),
    }
}
