pub mod config;
pub mod execute;
pub mod fields;
pub mod import_rules;
pub mod migrate;
pub mod seed;

use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Runtime;
use xsell_core::config::{AppConfig, LoadOptions};
use xsell_db::{connect_from_config, migrations, DbPool};

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
enum Status {
    Ok,
    Error,
}

#[derive(Debug, Serialize)]
struct CommandOutcome<'a> {
    command: &'a str,
    status: Status,
    error_class: Option<&'a str>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

/// A failure already classified for the operator: `(error_class, message, exit_code)`.
pub(crate) type Failure = (&'static str, String, u8);

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        Self::emit(
            0,
            CommandOutcome {
                command,
                status: Status::Ok,
                error_class: None,
                message: message.into(),
                data,
            },
        )
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::emit(
            exit_code,
            CommandOutcome {
                command,
                status: Status::Error,
                error_class: Some(error_class),
                message: message.into(),
                data: None,
            },
        )
    }

    fn from_failure(command: &str, (error_class, message, exit_code): Failure) -> Self {
        Self::failure(command, error_class, message, exit_code)
    }

    fn emit(exit_code: u8, outcome: CommandOutcome<'_>) -> Self {
        let output = serde_json::to_string(&outcome).unwrap_or_else(|error| {
            serde_json::json!({
                "command": outcome.command,
                "status": "error",
                "error_class": "serialization",
                "message": error.to_string(),
            })
            .to_string()
        });
        Self { exit_code, output }
    }
}

/// Loads configuration and builds the single-threaded runtime every database
/// command runs on.
pub(crate) fn prepare(command: &str) -> Result<(AppConfig, Runtime), CommandResult> {
    let config = AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })?;

    let runtime =
        tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
            CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            )
        })?;

    Ok((config, runtime))
}

/// Connects and brings the schema up to date.
pub(crate) async fn open_database(config: &AppConfig) -> Result<DbPool, Failure> {
    let pool = connect_from_config(&config.database)
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
    migrations::run_pending(&pool).await.map_err(|error| ("migration", error.to_string(), 5u8))?;
    Ok(pool)
}
