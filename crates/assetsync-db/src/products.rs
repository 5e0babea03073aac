//! Database operations for `products` and the [`TargetStore`] adapter over them.

use assetsync_core::TargetRecord;
use assetsync_pipeline::{CollaboratorError, TargetStore};
use async_trait::async_trait;
use sqlx::PgPool;

use crate::DbError;

/// A live row from the `products` table, limited to the columns the asset
/// sync reads.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    /// Previous display name; matched after `name`.
    pub legacy_name: Option<String>,
    /// Identifier of the corresponding catalog record, when linked.
    pub airtable_id: Option<String>,
    pub images: Vec<String>,
}

impl From<ProductRow> for TargetRecord {
    fn from(row: ProductRow) -> Self {
        TargetRecord {
            id: row.id.to_string(),
            name: row.name,
            alternate_names: row
                .legacy_name
                .filter(|n| !n.trim().is_empty())
                .into_iter()
                .collect(),
            external_id: row.airtable_id.filter(|id| !id.trim().is_empty()),
            asset_urls: row.images,
        }
    }
}

/// List all products that have not been soft-deleted, ordered by `id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_products(pool: &PgPool) -> Result<Vec<ProductRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(
        "SELECT id, name, legacy_name, airtable_id, images \
         FROM products \
         WHERE deleted_at IS NULL \
         ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Replace the `images` array of one product in a single statement.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no live product has that `id`, or
/// [`DbError::Sqlx`] on query failure.
pub async fn update_product_images(
    pool: &PgPool,
    product_id: i64,
    images: &[String],
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE products SET images = $2, updated_at = NOW() \
         WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(product_id)
    .bind(images)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound(product_id.to_string()));
    }
    Ok(())
}

/// [`TargetStore`] backed by the `products` table.
#[derive(Clone)]
pub struct PgTargetStore {
    pool: PgPool,
}

impl PgTargetStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl From<DbError> for CollaboratorError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(id) => CollaboratorError::NotFound(id),
            other => CollaboratorError::Backend(other.to_string()),
        }
    }
}

#[async_trait]
impl TargetStore for PgTargetStore {
    async fn list_records(&self) -> Result<Vec<TargetRecord>, CollaboratorError> {
        let rows = list_products(&self.pool).await?;
        tracing::debug!(products = rows.len(), "loaded products");
        Ok(rows.into_iter().map(TargetRecord::from).collect())
    }

    async fn update_asset_list(&self, id: &str, urls: &[String]) -> Result<(), CollaboratorError> {
        let product_id: i64 = id
            .parse()
            .map_err(|_| CollaboratorError::NotFound(id.to_string()))?;
        update_product_images(&self.pool, product_id, urls).await?;
        Ok(())
    }
}
