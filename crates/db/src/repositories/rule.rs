use async_trait::async_trait;
use sqlx::sqlite::{SqliteExecutor, SqliteRow};
use sqlx::Row;

use xsell_core::cross_sell::ports::RuleRepository;
use xsell_core::domain::rule::{CrossSellingRule, RuleId};
use xsell_core::errors::ApplicationError;

use super::{decode_json, decode_timestamp, encode_json, encode_timestamp, RepositoryError};
use crate::DbPool;

const RULE_COLUMNS: &str = "id, name, description, active, source_conditions_json,
                            target_criteria_json, created_at, updated_at";

pub struct SqlRuleRepository {
    pool: DbPool,
}

impl SqlRuleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch_many(&self, only_active: bool) -> Result<Vec<CrossSellingRule>, RepositoryError> {
        let sql = if only_active {
            format!(
                "SELECT {RULE_COLUMNS} FROM cross_selling_rule
                 WHERE active = 1 ORDER BY created_at ASC, id ASC"
            )
        } else {
            format!("SELECT {RULE_COLUMNS} FROM cross_selling_rule ORDER BY created_at ASC, id ASC")
        };

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_rule).collect()
    }

    async fn fetch_one(&self, id: &RuleId) -> Result<Option<CrossSellingRule>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {RULE_COLUMNS} FROM cross_selling_rule WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_rule).transpose()
    }

    /// Upserts every rule in one transaction. Nothing is written unless all succeed.
    pub async fn save_all(&self, rules: &[CrossSellingRule]) -> Result<(), ApplicationError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        for rule in rules {
            upsert_rule(&mut *tx, rule).await?;
        }
        tx.commit().await.map_err(RepositoryError::from)?;
        Ok(())
    }
}

async fn upsert_rule<'e>(
    executor: impl SqliteExecutor<'e>,
    rule: &CrossSellingRule,
) -> Result<(), RepositoryError> {
    let conditions = encode_json("source_conditions_json", &rule.source_conditions)?;
    let criteria = encode_json("target_criteria_json", &rule.target_criteria)?;

    sqlx::query(
        "INSERT INTO cross_selling_rule (id, name, description, active, source_conditions_json,
                                         target_criteria_json, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
             name = excluded.name,
             description = excluded.description,
             active = excluded.active,
             source_conditions_json = excluded.source_conditions_json,
             target_criteria_json = excluded.target_criteria_json,
             updated_at = excluded.updated_at",
    )
    .bind(&rule.id.0)
    .bind(&rule.name)
    .bind(&rule.description)
    .bind(rule.active)
    .bind(conditions)
    .bind(criteria)
    .bind(encode_timestamp(&rule.created_at))
    .bind(encode_timestamp(&rule.updated_at))
    .execute(executor)
    .await?;

    Ok(())
}

fn row_to_rule(row: &SqliteRow) -> Result<CrossSellingRule, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());

    let id: String = row.try_get("id").map_err(decode)?;
    let name: String = row.try_get("name").map_err(decode)?;
    let description: Option<String> = row.try_get("description").map_err(decode)?;
    let active: bool = row.try_get("active").map_err(decode)?;
    let conditions: String = row.try_get("source_conditions_json").map_err(decode)?;
    let criteria: String = row.try_get("target_criteria_json").map_err(decode)?;
    let created_at: String = row.try_get("created_at").map_err(decode)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode)?;

    Ok(CrossSellingRule {
        id: RuleId(id),
        name,
        description,
        active,
        source_conditions: decode_json("source_conditions_json", &conditions)?,
        target_criteria: decode_json("target_criteria_json", &criteria)?,
        created_at: decode_timestamp("created_at", &created_at)?,
        updated_at: decode_timestamp("updated_at", &updated_at)?,
    })
}

#[async_trait]
impl RuleRepository for SqlRuleRepository {
    async fn list_active_rules(&self) -> Result<Vec<CrossSellingRule>, ApplicationError> {
        Ok(self.fetch_many(true).await?)
    }

    async fn get_rule(&self, id: &RuleId) -> Result<Option<CrossSellingRule>, ApplicationError> {
        Ok(self.fetch_one(id).await?)
    }

    async fn list_rules(&self) -> Result<Vec<CrossSellingRule>, ApplicationError> {
        Ok(self.fetch_many(false).await?)
    }

    async fn save_rule(&self, rule: CrossSellingRule) -> Result<(), ApplicationError> {
        Ok(upsert_rule(&self.pool, &rule).await?)
    }
}
