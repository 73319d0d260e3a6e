use std::sync::Arc;

use xsell_core::config::CatalogSource;
use xsell_core::{BulkExecutionError, BulkExecutor, EngineOptions, RuleId};
use xsell_db::repositories::{
    SqlAssociationStore, SqlCustomFieldRepository, SqlProductRepository, SqlRuleRepository,
};

use crate::commands::{open_database, prepare, CommandResult, Failure};

/// Runs bulk execution against the local product table. With `rule_id` only that
/// rule runs, whether or not it is active.
pub fn run(rule_id: Option<String>) -> CommandResult {
    let (config, runtime) = match prepare("execute") {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };
    if config.catalog.source != CatalogSource::Sql {
        return CommandResult::failure(
            "execute",
            "config_validation",
            "the CLI reads products from the database; run bulk execution through xsell-server \
             when catalog.source is `http`",
            2,
        );
    }

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let executor = BulkExecutor::new(
            Arc::new(SqlRuleRepository::new(pool.clone())),
            Arc::new(SqlProductRepository::new(pool.clone())),
            Arc::new(SqlCustomFieldRepository::new(pool.clone())),
            Arc::new(SqlAssociationStore::new(pool.clone())),
            EngineOptions::from_config(&config),
        );

        let rule_id = rule_id.map(RuleId);
        let outcome = executor.execute_bulk(rule_id.as_ref()).await;
        pool.close().await;
        outcome.map_err(|error| -> Failure { (error_class(&error), error.to_string(), 5u8) })
    });

    match result {
        Ok(report) => CommandResult::success_with_data(
            "execute",
            format!(
                "{} rule(s) over {} source product(s): {} created, {} skipped, {} error(s)",
                report.rules_executed.len(),
                report.total_products,
                report.cross_sellings_created,
                report.products_skipped,
                report.errors.len()
            ),
            serde_json::to_value(&report).ok(),
        ),
        Err(failure) => CommandResult::from_failure("execute", failure),
    }
}

fn error_class(error: &BulkExecutionError) -> &'static str {
    match error {
        BulkExecutionError::InvalidRuleId => "invalid_rule_id",
        BulkExecutionError::RuleNotFound(_) => "rule_not_found",
        BulkExecutionError::RuleRepository(_)
        | BulkExecutionError::FieldCatalog(_)
        | BulkExecutionError::Catalog(_) => "execution",
    }
}
