use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cross_sell::value::DEFAULT_NUMERIC_SCALE;

pub const MAX_NUMERIC_SCALE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 1000;

const SEARCH_PATHS: [&str; 2] = ["xsell.toml", "config/xsell.toml"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub catalog: CatalogConfig,
    pub engine: EngineConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct CatalogConfig {
    pub source: CatalogSource,
    pub base_url: Option<String>,
    pub api_token: Option<SecretString>,
    pub page_size: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub include_inactive_targets: bool,
    pub numeric_scale: u32,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Where the product pool is read from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSource {
    Sql,
    Http,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

/// Programmatic overrides applied after file and environment layers.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub catalog_source: Option<CatalogSource>,
    pub catalog_base_url: Option<String>,
    pub include_inactive_targets: Option<bool>,
    pub server_port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

/// One environment variable that sets a dotted config key. `alias` is an older
/// spelling still honoured when the primary variable is unset.
#[derive(Clone, Copy, Debug)]
pub struct EnvBinding {
    pub key: &'static str,
    pub var: &'static str,
    pub alias: Option<&'static str>,
}

impl EnvBinding {
    const fn new(key: &'static str, var: &'static str) -> Self {
        Self { key, var, alias: None }
    }

    const fn with_alias(key: &'static str, var: &'static str, alias: &'static str) -> Self {
        Self { key, var, alias: Some(alias) }
    }

    /// The variable that currently supplies this key, if any.
    pub fn active_var(&self) -> Option<&'static str> {
        [Some(self.var), self.alias].into_iter().flatten().find(|var| read_env(var).is_some())
    }
}

pub const ENV_BINDINGS: &[EnvBinding] = &[
    EnvBinding::new("database.url", "XSELL_DATABASE_URL"),
    EnvBinding::new("database.max_connections", "XSELL_DATABASE_MAX_CONNECTIONS"),
    EnvBinding::new("database.timeout_secs", "XSELL_DATABASE_TIMEOUT_SECS"),
    EnvBinding::new("catalog.source", "XSELL_CATALOG_SOURCE"),
    EnvBinding::new("catalog.base_url", "XSELL_CATALOG_BASE_URL"),
    EnvBinding::new("catalog.api_token", "XSELL_CATALOG_API_TOKEN"),
    EnvBinding::new("catalog.page_size", "XSELL_CATALOG_PAGE_SIZE"),
    EnvBinding::new("catalog.timeout_secs", "XSELL_CATALOG_TIMEOUT_SECS"),
    EnvBinding::new("engine.include_inactive_targets", "XSELL_ENGINE_INCLUDE_INACTIVE_TARGETS"),
    EnvBinding::new("engine.numeric_scale", "XSELL_ENGINE_NUMERIC_SCALE"),
    EnvBinding::new("server.bind_address", "XSELL_SERVER_BIND_ADDRESS"),
    EnvBinding::new("server.port", "XSELL_SERVER_PORT"),
    EnvBinding::new("server.graceful_shutdown_secs", "XSELL_SERVER_GRACEFUL_SHUTDOWN_SECS"),
    EnvBinding::with_alias("logging.level", "XSELL_LOGGING_LEVEL", "XSELL_LOG_LEVEL"),
    EnvBinding::with_alias("logging.format", "XSELL_LOGGING_FORMAT", "XSELL_LOG_FORMAT"),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("unknown config key `{0}`")]
    UnknownKey(String),
    #[error("invalid value for `{key}` from {origin}: `{value}`")]
    InvalidValue { key: String, origin: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://xsell.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            catalog: CatalogConfig {
                source: CatalogSource::Sql,
                base_url: None,
                api_token: None,
                page_size: 200,
                timeout_secs: 30,
            },
            engine: EngineConfig {
                include_inactive_targets: false,
                numeric_scale: DEFAULT_NUMERIC_SCALE,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl FromStr for CatalogSource {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sql" => Ok(Self::Sql),
            "http" => Ok(Self::Http),
            other => Err(format!("unsupported catalog source `{other}` (expected sql|http)")),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unsupported log format `{other}` (expected compact|pretty|json)")),
        }
    }
}

impl AppConfig {
    /// Builds the config from defaults, then the TOML file, then `XSELL_*`
    /// variables, then `options.overrides`, and validates the result.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        match locate_file(options.config_path.as_deref()) {
            Some(path) => {
                for (key, raw) in read_file_entries(&path)? {
                    config.set(&key, &raw, &format!("file `{}`", path.display()))?;
                }
            }
            None if options.require_file => {
                let expected =
                    options.config_path.unwrap_or_else(|| PathBuf::from(SEARCH_PATHS[0]));
                return Err(ConfigError::MissingConfigFile(expected));
            }
            None => {}
        }

        for binding in ENV_BINDINGS {
            let Some(var) = binding.active_var() else {
                continue;
            };
            if let Some(raw) = read_env(var) {
                config.set(binding.key, &raw, &format!("env `{var}`"))?;
            }
        }

        config.apply_overrides(options.overrides);
        config.validate()?;
        Ok(config)
    }

    /// Assigns one dotted key from its textual form.
    fn set(&mut self, key: &str, raw: &str, origin: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            origin: origin.to_string(),
            value: raw.to_string(),
        };

        match key {
            "database.url" => self.database.url = raw.to_string(),
            "database.max_connections" => {
                self.database.max_connections = raw.trim().parse().map_err(|_| invalid())?
            }
            "database.timeout_secs" => {
                self.database.timeout_secs = raw.trim().parse().map_err(|_| invalid())?
            }
            "catalog.source" => self.catalog.source = raw.parse().map_err(|_| invalid())?,
            "catalog.base_url" => self.catalog.base_url = Some(raw.to_string()),
            "catalog.api_token" => {
                self.catalog.api_token = Some(SecretString::from(raw.to_string()))
            }
            "catalog.page_size" => {
                self.catalog.page_size = raw.trim().parse().map_err(|_| invalid())?
            }
            "catalog.timeout_secs" => {
                self.catalog.timeout_secs = raw.trim().parse().map_err(|_| invalid())?
            }
            "engine.include_inactive_targets" => {
                self.engine.include_inactive_targets =
                    raw.trim().to_ascii_lowercase().parse().map_err(|_| invalid())?
            }
            "engine.numeric_scale" => {
                self.engine.numeric_scale = raw.trim().parse().map_err(|_| invalid())?
            }
            "server.bind_address" => self.server.bind_address = raw.to_string(),
            "server.port" => self.server.port = raw.trim().parse().map_err(|_| invalid())?,
            "server.graceful_shutdown_secs" => {
                self.server.graceful_shutdown_secs = raw.trim().parse().map_err(|_| invalid())?
            }
            "logging.level" => self.logging.level = raw.to_string(),
            "logging.format" => self.logging.format = raw.parse().map_err(|_| invalid())?,
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        let ConfigOverrides {
            database_url,
            log_level,
            catalog_source,
            catalog_base_url,
            include_inactive_targets,
            server_port,
        } = overrides;

        replace(&mut self.database.url, database_url);
        replace(&mut self.logging.level, log_level);
        replace(&mut self.catalog.source, catalog_source);
        replace(&mut self.engine.include_inactive_targets, include_inactive_targets);
        replace(&mut self.server.port, server_port);
        if catalog_base_url.is_some() {
            self.catalog.base_url = catalog_base_url;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let database = &self.database;
        let url = database.url.trim();
        let checks = [
            (
                url.starts_with("sqlite:") || url == ":memory:",
                "database.url must be a sqlite URL (`sqlite://...`, `sqlite::memory:`, or `:memory:`)"
                    .to_string(),
            ),
            (
                database.max_connections > 0,
                "database.max_connections must be greater than zero".to_string(),
            ),
            (
                (1..=300).contains(&database.timeout_secs),
                "database.timeout_secs must be in range 1..=300".to_string(),
            ),
            (
                (1..=MAX_PAGE_SIZE).contains(&self.catalog.page_size),
                format!("catalog.page_size must be in range 1..={MAX_PAGE_SIZE}"),
            ),
            (
                (1..=300).contains(&self.catalog.timeout_secs),
                "catalog.timeout_secs must be in range 1..=300".to_string(),
            ),
            (
                self.engine.numeric_scale <= MAX_NUMERIC_SCALE,
                format!("engine.numeric_scale must be in range 0..={MAX_NUMERIC_SCALE}"),
            ),
            (self.server.port > 0, "server.port must be greater than zero".to_string()),
            (
                self.server.graceful_shutdown_secs > 0,
                "server.graceful_shutdown_secs must be greater than zero".to_string(),
            ),
            (
                matches!(
                    self.logging.level.trim().to_ascii_lowercase().as_str(),
                    "trace" | "debug" | "info" | "warn" | "error"
                ),
                "logging.level must be one of trace|debug|info|warn|error".to_string(),
            ),
        ];

        if let Some((_, message)) = checks.into_iter().find(|(ok, _)| !ok) {
            return Err(ConfigError::Validation(message));
        }
        self.validate_catalog_endpoint()
    }

    fn validate_catalog_endpoint(&self) -> Result<(), ConfigError> {
        let catalog = &self.catalog;
        if catalog.source == CatalogSource::Http {
            let base_url = catalog.base_url.as_deref().map(str::trim).unwrap_or_default();
            if base_url.is_empty() {
                return Err(ConfigError::Validation(
                    "catalog.base_url is required when catalog.source is `http`".to_string(),
                ));
            }
            if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                return Err(ConfigError::Validation(
                    "catalog.base_url must start with http:// or https://".to_string(),
                ));
            }
        }

        if catalog.api_token.as_ref().is_some_and(|token| token.expose_secret().trim().is_empty()) {
            return Err(ConfigError::Validation(
                "catalog.api_token must not be blank when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Explicit paths are used only if they exist; otherwise the search paths are tried.
pub fn locate_file(explicit_path: Option<&Path>) -> Option<PathBuf> {
    match explicit_path {
        Some(path) => path.exists().then_some(path.to_path_buf()),
        None => SEARCH_PATHS.iter().map(PathBuf::from).find(|path| path.exists()),
    }
}

/// Reads a config file into `(dotted key, value)` pairs with `${VAR}` expanded.
pub fn read_file_entries(path: &Path) -> Result<Vec<(String, String)>, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    let table: toml::Table = raw
        .parse()
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })?;

    let mut entries = Vec::new();
    for (section, values) in &table {
        let Some(values) = values.as_table() else {
            return Err(ConfigError::UnknownKey(section.clone()));
        };
        for (name, value) in values {
            let key = format!("{section}.{name}");
            let raw = match value {
                toml::Value::String(text) => expand_env(text)?,
                toml::Value::Integer(number) => number.to_string(),
                toml::Value::Boolean(flag) => flag.to_string(),
                other => other.to_string(),
            };
            entries.push((key, raw));
        }
    }
    Ok(entries)
}

fn expand_env(text: &str) -> Result<String, ConfigError> {
    let mut expanded = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("${") {
        expanded.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or(ConfigError::UnterminatedInterpolation)?;
        let var = &after[..end];
        let value = env::var(var)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: var.to_string() })?;
        expanded.push_str(&value);
        rest = &after[end + 1..];
    }

    expanded.push_str(rest);
    Ok(expanded)
}

fn replace<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn read_env(var: &str) -> Option<String> {
    env::var(var).ok().filter(|value| !value.trim().is_empty())
}
