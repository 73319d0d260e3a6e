use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use xsell_core::cross_sell::fields::CustomFieldDefinition;
use xsell_core::cross_sell::ports::{
    AssociationStore, CustomFieldSource, ProductCatalog, ProductPage, RuleRepository,
};
use xsell_core::domain::association::{AssociationWrite, CrossSellingAssociation};
use xsell_core::domain::product::{Product, ProductId};
use xsell_core::domain::rule::{CrossSellingRule, RuleId};
use xsell_core::errors::ApplicationError;

use super::{CustomFieldRepository, ProductRepository, RepositoryError};

#[derive(Default)]
pub struct InMemoryRuleRepository {
    rules: RwLock<BTreeMap<String, CrossSellingRule>>,
}

impl InMemoryRuleRepository {
    pub fn with_rules(rules: impl IntoIterator<Item = CrossSellingRule>) -> Self {
        Self { rules: RwLock::new(rules.into_iter().map(|rule| (rule.id.0.clone(), rule)).collect()) }
    }

    async fn sorted(&self, only_active: bool) -> Vec<CrossSellingRule> {
        let rules = self.rules.read().await;
        let mut selected: Vec<CrossSellingRule> =
            rules.values().filter(|rule| !only_active || rule.active).cloned().collect();
        selected.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        selected
    }
}

#[async_trait]
impl RuleRepository for InMemoryRuleRepository {
    async fn list_active_rules(&self) -> Result<Vec<CrossSellingRule>, ApplicationError> {
        Ok(self.sorted(true).await)
    }

    async fn get_rule(&self, id: &RuleId) -> Result<Option<CrossSellingRule>, ApplicationError> {
        Ok(self.rules.read().await.get(&id.0).cloned())
    }

    async fn list_rules(&self) -> Result<Vec<CrossSellingRule>, ApplicationError> {
        Ok(self.sorted(false).await)
    }

    async fn save_rule(&self, rule: CrossSellingRule) -> Result<(), ApplicationError> {
        let mut rules = self.rules.write().await;
        let created_at = rules.get(&rule.id.0).map(|existing| existing.created_at);
        let mut rule = rule;
        if let Some(created_at) = created_at {
            rule.created_at = created_at;
        }
        rules.insert(rule.id.0.clone(), rule);
        Ok(())
    }
}

/// Products keyed by id, so pages come out in id order like the SQL adapter.
#[derive(Default)]
pub struct InMemoryProductRepository {
    products: RwLock<BTreeMap<String, Product>>,
}

impl InMemoryProductRepository {
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            products: RwLock::new(
                products.into_iter().map(|product| (product.id.0.clone(), product)).collect(),
            ),
        }
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.get(&id.0).cloned())
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        products.insert(product.id.0.clone(), product);
        Ok(())
    }
}

#[async_trait]
impl ProductCatalog for InMemoryProductRepository {
    async fn list_page(&self, offset: usize, limit: usize) -> Result<ProductPage, ApplicationError> {
        let products = self.products.read().await;
        Ok(ProductPage {
            products: products.values().skip(offset).take(limit).cloned().collect(),
            total: Some(products.len()),
        })
    }
}

#[derive(Default)]
pub struct InMemoryCustomFieldRepository {
    fields: RwLock<Vec<CustomFieldDefinition>>,
}

impl InMemoryCustomFieldRepository {
    /// Keeps the definitions as given, duplicates included, so catalog resolution
    /// sees the same input a misconfigured store would send.
    pub fn with_fields(fields: impl IntoIterator<Item = CustomFieldDefinition>) -> Self {
        Self { fields: RwLock::new(fields.into_iter().collect()) }
    }
}

#[async_trait]
impl CustomFieldRepository for InMemoryCustomFieldRepository {
    async fn save(&self, definition: CustomFieldDefinition) -> Result<(), RepositoryError> {
        let mut fields = self.fields.write().await;
        match fields.iter_mut().find(|existing| existing.field == definition.field) {
            Some(existing) => *existing = definition,
            None => fields.push(definition),
        }
        Ok(())
    }
}

#[async_trait]
impl CustomFieldSource for InMemoryCustomFieldRepository {
    async fn list_custom_fields(&self) -> Result<Vec<CustomFieldDefinition>, ApplicationError> {
        Ok(self.fields.read().await.clone())
    }
}

#[derive(Default)]
pub struct InMemoryAssociationStore {
    associations: RwLock<BTreeMap<(String, String), CrossSellingAssociation>>,
}

impl InMemoryAssociationStore {
    pub async fn all(&self) -> Vec<CrossSellingAssociation> {
        self.associations.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.associations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.associations.read().await.is_empty()
    }
}

#[async_trait]
impl AssociationStore for InMemoryAssociationStore {
    async fn exists(&self, source: &ProductId, target: &ProductId) -> Result<bool, ApplicationError> {
        let associations = self.associations.read().await;
        Ok(associations.contains_key(&(source.0.clone(), target.0.clone())))
    }

    async fn create(
        &self,
        association: CrossSellingAssociation,
    ) -> Result<AssociationWrite, ApplicationError> {
        let mut associations = self.associations.write().await;
        let key =
            (association.source_product_id.0.clone(), association.target_product_id.0.clone());
        if associations.contains_key(&key) {
            return Ok(AssociationWrite::AlreadyExists);
        }
        associations.insert(key, association);
        Ok(AssociationWrite::Created)
    }

    async fn list_for_source(
        &self,
        source: &ProductId,
    ) -> Result<Vec<CrossSellingAssociation>, ApplicationError> {
        let associations = self.associations.read().await;
        Ok(associations
            .values()
            .filter(|association| association.source_product_id == *source)
            .cloned()
            .collect())
    }
}
