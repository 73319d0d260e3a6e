//! Collaborator ports the bulk executor depends on. Adapters live in `xsell-db`
//! (SQLite and in-memory) and `xsell-server` (external product API).

use async_trait::async_trait;

use crate::cross_sell::fields::CustomFieldDefinition;
use crate::domain::association::{AssociationWrite, CrossSellingAssociation};
use crate::domain::product::{Product, ProductId};
use crate::domain::rule::{CrossSellingRule, RuleId};
use crate::errors::ApplicationError;

#[async_trait]
pub trait RuleRepository: Send + Sync {
    /// Active rules ordered by creation time, then id.
    async fn list_active_rules(&self) -> Result<Vec<CrossSellingRule>, ApplicationError>;
    async fn get_rule(&self, id: &RuleId) -> Result<Option<CrossSellingRule>, ApplicationError>;
    async fn list_rules(&self) -> Result<Vec<CrossSellingRule>, ApplicationError>;
    async fn save_rule(&self, rule: CrossSellingRule) -> Result<(), ApplicationError>;
}

/// One page of the product catalog. `total` is the catalog size when the source
/// reports it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: Option<usize>,
}

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Products in a stable order. A page shorter than `limit` ends the listing.
    async fn list_page(&self, offset: usize, limit: usize) -> Result<ProductPage, ApplicationError>;
}

#[async_trait]
pub trait CustomFieldSource: Send + Sync {
    async fn list_custom_fields(&self) -> Result<Vec<CustomFieldDefinition>, ApplicationError>;
}

#[async_trait]
pub trait AssociationStore: Send + Sync {
    async fn exists(&self, source: &ProductId, target: &ProductId)
        -> Result<bool, ApplicationError>;

    /// Inserts the association unless the `(source, target)` pair is already stored.
    async fn create(
        &self,
        association: CrossSellingAssociation,
    ) -> Result<AssociationWrite, ApplicationError>;

    async fn list_for_source(
        &self,
        source: &ProductId,
    ) -> Result<Vec<CrossSellingAssociation>, ApplicationError>;
}
