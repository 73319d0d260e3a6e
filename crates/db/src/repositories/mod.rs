use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use xsell_core::cross_sell::fields::CustomFieldDefinition;
use xsell_core::domain::product::{Product, ProductId};
use xsell_core::errors::ApplicationError;

pub mod association;
pub mod custom_field;
pub mod memory;
pub mod product;
pub mod rule;

pub use association::SqlAssociationStore;
pub use custom_field::SqlCustomFieldRepository;
pub use memory::{
    InMemoryAssociationStore, InMemoryCustomFieldRepository, InMemoryProductRepository,
    InMemoryRuleRepository,
};
pub use product::SqlProductRepository;
pub use rule::SqlRuleRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        ApplicationError::Persistence(value.to_string())
    }
}

/// Write side of the product catalog; the read side is the core `ProductCatalog` port.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError>;
    async fn save(&self, product: Product) -> Result<(), RepositoryError>;
}

/// Write side of the store's custom field configuration.
#[async_trait]
pub trait CustomFieldRepository: Send + Sync {
    async fn save(&self, definition: CustomFieldDefinition) -> Result<(), RepositoryError>;
}

pub(crate) fn encode_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn decode_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("invalid `{column}` timestamp: {error}")))
}

pub(crate) fn decode_json<T: serde::de::DeserializeOwned>(
    column: &str,
    value: &str,
) -> Result<T, RepositoryError> {
    serde_json::from_str(value)
        .map_err(|error| RepositoryError::Decode(format!("invalid `{column}` json: {error}")))
}

pub(crate) fn encode_json<T: serde::Serialize>(
    column: &str,
    value: &T,
) -> Result<String, RepositoryError> {
    serde_json::to_string(value)
        .map_err(|error| RepositoryError::Decode(format!("cannot encode `{column}`: {error}")))
}

/// SQLite binds signed 64-bit integers only.
pub(crate) fn sql_count(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
