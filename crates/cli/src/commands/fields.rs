use xsell_core::cross_sell::ports::CustomFieldSource;
use xsell_core::FieldCatalog;
use xsell_db::repositories::SqlCustomFieldRepository;

use crate::commands::{open_database, prepare, CommandResult, Failure};

/// Lists the standard fields plus the custom fields currently configured.
pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("fields") {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let custom_fields = SqlCustomFieldRepository::new(pool.clone())
            .list_custom_fields()
            .await
            .map_err(|error| ("db_query", error.to_string(), 4u8))?;
        pool.close().await;
        Ok::<_, Failure>(FieldCatalog::resolve(custom_fields).list_fields())
    });

    match result {
        Ok(listing) => CommandResult::success_with_data(
            "fields",
            format!(
                "{} standard fields, {} custom fields",
                listing.standard_fields.len(),
                listing.custom_fields.len()
            ),
            serde_json::to_value(&listing).ok(),
        ),
        Err(failure) => CommandResult::from_failure("fields", failure),
    }
}
