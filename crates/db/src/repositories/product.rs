use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use xsell_core::cross_sell::ports::{ProductCatalog, ProductPage};
use xsell_core::domain::product::{FieldValue, Product, ProductId};
use xsell_core::errors::ApplicationError;

use super::{decode_json, encode_json, encode_timestamp, sql_count, ProductRepository, RepositoryError};
use crate::DbPool;

/// Product table adapter. Serves as the engine's catalog when `catalog.source = "sql"`.
pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<ProductPage, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, active, attributes_json FROM product
             ORDER BY id ASC LIMIT ? OFFSET ?",
        )
        .bind(sql_count(limit))
        .bind(sql_count(offset))
        .fetch_all(&self.pool)
        .await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM product")
            .fetch_one(&self.pool)
            .await?;

        let products = rows.iter().map(row_to_product).collect::<Result<Vec<_>, _>>()?;
        Ok(ProductPage { products, total: usize::try_from(total).ok() })
    }
}

fn row_to_product(row: &SqliteRow) -> Result<Product, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());

    let id: String = row.try_get("id").map_err(decode)?;
    let name: String = row.try_get("name").map_err(decode)?;
    let active: bool = row.try_get("active").map_err(decode)?;
    let attributes: String = row.try_get("attributes_json").map_err(decode)?;
    let attributes: BTreeMap<String, Option<FieldValue>> =
        decode_json("attributes_json", &attributes)?;
    let attributes =
        attributes.into_iter().filter_map(|(field, value)| Some((field, value?))).collect();

    Ok(Product { id: ProductId(id), name, active, attributes })
}

#[async_trait]
impl ProductRepository for SqlProductRepository {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, active, attributes_json FROM product WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        let attributes = encode_json("attributes_json", &product.attributes)?;

        sqlx::query(
            "INSERT INTO product (id, name, active, attributes_json, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 active = excluded.active,
                 attributes_json = excluded.attributes_json,
                 updated_at = excluded.updated_at",
        )
        .bind(&product.id.0)
        .bind(&product.name)
        .bind(product.active)
        .bind(attributes)
        .bind(encode_timestamp(&Utc::now()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ProductCatalog for SqlProductRepository {
    async fn list_page(&self, offset: usize, limit: usize) -> Result<ProductPage, ApplicationError> {
        Ok(self.fetch_page(offset, limit).await?)
    }
}
