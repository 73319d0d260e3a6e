use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::debug;

use xsell_core::cross_sell::ports::AssociationStore;
use xsell_core::domain::association::{AssociationId, AssociationWrite, CrossSellingAssociation};
use xsell_core::domain::product::ProductId;
use xsell_core::domain::rule::RuleId;
use xsell_core::errors::ApplicationError;

use super::{decode_timestamp, encode_timestamp, RepositoryError};
use crate::DbPool;

pub struct SqlAssociationStore {
    pool: DbPool,
}

impl SqlAssociationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn count(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM cross_selling_association")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn pair_exists(
        &self,
        source: &ProductId,
        target: &ProductId,
    ) -> Result<bool, RepositoryError> {
        let found: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM cross_selling_association
                           WHERE source_product_id = ?1 AND target_product_id = ?2)",
        )
        .bind(&source.0)
        .bind(&target.0)
        .fetch_one(&self.pool)
        .await?;
        Ok(found == 1)
    }

    /// The unique `(source, target)` constraint arbitrates concurrent writers: a
    /// conflicting insert affects no rows and is reported as `AlreadyExists`.
    async fn insert(
        &self,
        association: &CrossSellingAssociation,
    ) -> Result<AssociationWrite, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO cross_selling_association
                 (id, source_product_id, target_product_id, rule_id, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(source_product_id, target_product_id) DO NOTHING",
        )
        .bind(&association.id.0)
        .bind(&association.source_product_id.0)
        .bind(&association.target_product_id.0)
        .bind(&association.rule_id.0)
        .bind(encode_timestamp(&association.created_at))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            debug!(
                event_name = "association.insert_conflict",
                source_product_id = %association.source_product_id,
                target_product_id = %association.target_product_id,
                "association pair already stored"
            );
            return Ok(AssociationWrite::AlreadyExists);
        }
        Ok(AssociationWrite::Created)
    }

    async fn fetch_for_source(
        &self,
        source: &ProductId,
    ) -> Result<Vec<CrossSellingAssociation>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, source_product_id, target_product_id, rule_id, created_at
             FROM cross_selling_association
             WHERE source_product_id = ?
             ORDER BY created_at ASC, target_product_id ASC",
        )
        .bind(&source.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_association).collect()
    }
}

fn row_to_association(row: &SqliteRow) -> Result<CrossSellingAssociation, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());

    let id: String = row.try_get("id").map_err(decode)?;
    let source: String = row.try_get("source_product_id").map_err(decode)?;
    let target: String = row.try_get("target_product_id").map_err(decode)?;
    let rule_id: String = row.try_get("rule_id").map_err(decode)?;
    let created_at: String = row.try_get("created_at").map_err(decode)?;

    Ok(CrossSellingAssociation {
        id: AssociationId(id),
        source_product_id: ProductId(source),
        target_product_id: ProductId(target),
        rule_id: RuleId(rule_id),
        created_at: decode_timestamp("created_at", &created_at)?,
    })
}

#[async_trait]
impl AssociationStore for SqlAssociationStore {
    async fn exists(&self, source: &ProductId, target: &ProductId) -> Result<bool, ApplicationError> {
        Ok(self.pair_exists(source, target).await?)
    }

    async fn create(
        &self,
        association: CrossSellingAssociation,
    ) -> Result<AssociationWrite, ApplicationError> {
        Ok(self.insert(&association).await?)
    }

    async fn list_for_source(
        &self,
        source: &ProductId,
    ) -> Result<Vec<CrossSellingAssociation>, ApplicationError> {
        Ok(self.fetch_for_source(source).await?)
    }
}

#[cfg(test)]
mod tests {
    use xsell_core::cross_sell::ports::AssociationStore;
    use xsell_core::domain::association::{AssociationWrite, CrossSellingAssociation};
    use xsell_core::domain::product::ProductId;
    use xsell_core::domain::rule::RuleId;

    use super::SqlAssociationStore;
    use crate::{connect_with_settings, migrations};

    fn link(source: &str, target: &str, rule: &str) -> CrossSellingAssociation {
        CrossSellingAssociation::new(
            ProductId(source.to_owned()),
            ProductId(target.to_owned()),
            RuleId(rule.to_owned()),
        )
    }

    #[tokio::test]
    async fn duplicate_pairs_report_already_exists() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let store = SqlAssociationStore::new(pool);

        let first = store.create(link("lamp-1", "bulb-1", "rule-a")).await.expect("create");
        let again = store.create(link("lamp-1", "bulb-1", "rule-b")).await.expect("create");
        let reverse = store.create(link("bulb-1", "lamp-1", "rule-b")).await.expect("create");

        assert_eq!(first, AssociationWrite::Created);
        assert_eq!(again, AssociationWrite::AlreadyExists);
        assert_eq!(reverse, AssociationWrite::Created);
        assert_eq!(store.count().await.expect("count"), 2);

        let lamp = ProductId("lamp-1".to_owned());
        let bulb = ProductId("bulb-1".to_owned());
        assert!(store.exists(&lamp, &bulb).await.expect("exists"));
        assert!(!store.exists(&lamp, &ProductId("bulb-2".to_owned())).await.expect("exists"));

        let stored = store.list_for_source(&lamp).await.expect("list");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].rule_id, RuleId("rule-a".to_owned()));
    }
}
