use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use xsell_core::cross_sell::fields::{CustomFieldDefinition, FieldType};
use xsell_core::cross_sell::ports::CustomFieldSource;
use xsell_core::errors::ApplicationError;

use super::{encode_timestamp, CustomFieldRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCustomFieldRepository {
    pool: DbPool,
}

impl SqlCustomFieldRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch_all(&self) -> Result<Vec<CustomFieldDefinition>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT field, label, field_type FROM custom_field ORDER BY created_at ASC, field ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<CustomFieldDefinition, RepositoryError> {
                let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());
                let field: String = row.try_get("field").map_err(decode)?;
                let label: String = row.try_get("label").map_err(decode)?;
                let raw_type: String = row.try_get("field_type").map_err(decode)?;
                let field_type = FieldType::parse(&raw_type).ok_or_else(|| {
                    RepositoryError::Decode(format!("unknown field type `{raw_type}` for `{field}`"))
                })?;
                Ok(CustomFieldDefinition { field, label, field_type })
            })
            .collect()
    }
}

#[async_trait]
impl CustomFieldRepository for SqlCustomFieldRepository {
    async fn save(&self, definition: CustomFieldDefinition) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO custom_field (field, label, field_type, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(field) DO UPDATE SET
                 label = excluded.label,
                 field_type = excluded.field_type",
        )
        .bind(&definition.field)
        .bind(&definition.label)
        .bind(definition.field_type.as_str())
        .bind(encode_timestamp(&Utc::now()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl CustomFieldSource for SqlCustomFieldRepository {
    async fn list_custom_fields(&self) -> Result<Vec<CustomFieldDefinition>, ApplicationError> {
        Ok(self.fetch_all().await?)
    }
}
