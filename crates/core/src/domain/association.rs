use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::product::ProductId;
use crate::domain::rule::RuleId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssociationId(pub String);

/// Persisted cross-selling link. The ordered `(source, target)` pair is unique
/// across all rules; the rule id only records which rule created it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossSellingAssociation {
    pub id: AssociationId,
    pub source_product_id: ProductId,
    pub target_product_id: ProductId,
    pub rule_id: RuleId,
    pub created_at: DateTime<Utc>,
}

impl CrossSellingAssociation {
    pub fn new(source: ProductId, target: ProductId, rule_id: RuleId) -> Self {
        Self {
            id: AssociationId(Uuid::new_v4().to_string()),
            source_product_id: source,
            target_product_id: target,
            rule_id,
            created_at: Utc::now(),
        }
    }

    pub fn pair(&self) -> (&ProductId, &ProductId) {
        (&self.source_product_id, &self.target_product_id)
    }
}

/// Outcome of an insert against the association store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssociationWrite {
    Created,
    AlreadyExists,
}
