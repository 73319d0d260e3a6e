use std::sync::Arc;

use axum::Router;
use thiserror::Error;
use tracing::info;
use xsell_core::config::{AppConfig, CatalogSource, ConfigError, LoadOptions};
use xsell_core::cross_sell::ports::ProductCatalog;
use xsell_core::errors::ApplicationError;
use xsell_core::{BulkExecutor, EngineOptions};
use xsell_db::repositories::{
    SqlAssociationStore, SqlCustomFieldRepository, SqlProductRepository, SqlRuleRepository,
};
use xsell_db::{connect_from_config, migrations, DbPool};

use crate::api::{self, ApiState};
use crate::catalog_client::HttpProductCatalog;
use crate::health;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub api: ApiState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("product catalog setup failed: {0}")]
    Catalog(#[source] ApplicationError),
}

impl Application {
    pub fn router(&self) -> Router {
        health::router(self.db_pool.clone()).merge(api::router(self.api.clone()))
    }
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", correlation_id = "bootstrap", "starting application bootstrap");

    let db_pool =
        connect_from_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.database_ready",
        correlation_id = "bootstrap",
        "database connected and migrations applied"
    );

    let catalog: Arc<dyn ProductCatalog> = match config.catalog.source {
        CatalogSource::Sql => Arc::new(SqlProductRepository::new(db_pool.clone())),
        CatalogSource::Http => Arc::new(
            HttpProductCatalog::from_config(&config.catalog).map_err(BootstrapError::Catalog)?,
        ),
    };
    info!(
        event_name = "system.bootstrap.catalog_ready",
        correlation_id = "bootstrap",
        source = ?config.catalog.source,
        "product catalog configured"
    );

    let rules = Arc::new(SqlRuleRepository::new(db_pool.clone()));
    let custom_fields = Arc::new(SqlCustomFieldRepository::new(db_pool.clone()));
    let executor = BulkExecutor::new(
        rules.clone(),
        catalog,
        custom_fields.clone(),
        Arc::new(SqlAssociationStore::new(db_pool.clone())),
        EngineOptions::from_config(&config),
    );

    Ok(Application {
        config,
        db_pool,
        api: ApiState { rules, custom_fields, executor: Arc::new(executor) },
    })
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;
    use xsell_core::config::{CatalogSource, ConfigOverrides, LoadOptions};
    use xsell_db::DemoCatalog;

    use crate::bootstrap::bootstrap;

    fn overrides(database_url: &str) -> ConfigOverrides {
        ConfigOverrides { database_url: Some(database_url.to_string()), ..ConfigOverrides::default() }
    }

    #[tokio::test]
    async fn http_catalog_without_base_url_fails_validation() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                catalog_source: Some(CatalogSource::Http),
                ..overrides("sqlite::memory:")
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().expect("error").to_string();
        assert!(message.contains("catalog.base_url"));
    }

    #[tokio::test]
    async fn seeded_database_executes_through_the_router() {
        let dir = tempfile::tempdir().expect("temp dir");
        let database_url = format!("sqlite://{}", dir.path().join("xsell.db").display());
        let app = bootstrap(LoadOptions { overrides: overrides(&database_url), ..LoadOptions::default() })
            .await
            .expect("bootstrap should succeed");
        DemoCatalog::load_into(&app.db_pool).await.expect("seed demo catalog");

        let response = app
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/cross-selling/execute-bulk")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let report: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(report["totalProducts"], 3);
        assert_eq!(report["crossSellingsCreated"], 6);

        app.db_pool.close().await;
    }
}
