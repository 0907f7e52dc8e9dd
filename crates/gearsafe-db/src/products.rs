//! Database operations for `products`.
//!
//! A product is stored as a JSONB document. `uuid`, `external_id`,
//! `gear_type`, `manufacturer`, and `model` are mirrored into columns so the
//! uniqueness constraints live in Postgres; on read the column values win
//! over whatever the document says.

use chrono::{DateTime, Utc};
use gearsafe_core::{GearType, Product};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A stored product with its row metadata.
#[derive(Debug, Clone)]
pub struct ProductRecord {
    pub id: i64,
    pub product: Product,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i64,
    uuid: Uuid,
    external_id: Option<String>,
    document: Json<Product>,
    created_at_utc: DateTime<Utc>,
    updated_at_utc: DateTime<Utc>,
}

impl From<ProductRow> for ProductRecord {
    fn from(row: ProductRow) -> Self {
        let mut product = row.document.0;
        product.uuid = row.uuid;
        product.external_id = row.external_id;
        Self {
            id: row.id,
            product,
            created_at_utc: row.created_at_utc,
            updated_at_utc: row.updated_at_utc,
        }
    }
}

/// Result of [`upsert_product`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub id: i64,
    /// The stored uuid, which is the existing row's when one was updated.
    pub uuid: Uuid,
    pub created: bool,
}

const SELECT_COLUMNS: &str =
    "SELECT id, uuid, external_id, document, created_at_utc, updated_at_utc FROM products";

/// Looks up a product by its natural key.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails or the document does not
/// decode.
pub async fn find_by_manufacturer_model(
    pool: &PgPool,
    gear_type: GearType,
    manufacturer: &str,
    model: &str,
) -> Result<Option<ProductRecord>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "{SELECT_COLUMNS} WHERE gear_type = $1 AND manufacturer = $2 AND model = $3"
    ))
    .bind(gear_type.as_str())
    .bind(manufacturer)
    .bind(model)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(ProductRecord::from))
}

/// Looks up a product by its retailer id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails or the document does not
/// decode.
pub async fn find_by_external_id(
    pool: &PgPool,
    external_id: &str,
) -> Result<Option<ProductRecord>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!("{SELECT_COLUMNS} WHERE external_id = $1"))
        .bind(external_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(ProductRecord::from))
}

/// Inserts `product` or updates the row it identifies.
///
/// The row is found by `external_id` first, then by
/// `(gear_type, manufacturer, model)`. An existing row keeps its `uuid` and
/// `created_at_utc`; the document is replaced. When neither lookup hits, the
/// insert still carries `ON CONFLICT` on the natural key so a concurrent
/// writer's row is updated rather than duplicated.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure, including a unique violation
/// on `external_id` raced by another writer.
pub async fn upsert_product(pool: &PgPool, product: &Product) -> Result<UpsertOutcome, DbError> {
    let existing = match product.external_id.as_deref() {
        Some(external_id) => find_by_external_id(pool, external_id).await?,
        None => None,
    };
    let existing = match existing {
        Some(record) => Some(record),
        None => {
            find_by_manufacturer_model(
                pool,
                product.gear_type(),
                &product.manufacturer,
                &product.model,
            )
            .await?
        }
    };

    if let Some(record) = existing {
        let mut document = product.clone();
        document.uuid = record.product.uuid;
        if document.external_id.is_none() {
            document.external_id = record.product.external_id;
        }

        sqlx::query(
            "UPDATE products SET \
                 external_id    = $2, \
                 gear_type      = $3, \
                 manufacturer   = $4, \
                 model          = $5, \
                 document       = $6, \
                 updated_at_utc = NOW() \
             WHERE id = $1",
        )
        .bind(record.id)
        .bind(&document.external_id)
        .bind(document.gear_type().as_str())
        .bind(&document.manufacturer)
        .bind(&document.model)
        .bind(Json(&document))
        .execute(pool)
        .await?;

        return Ok(UpsertOutcome {
            id: record.id,
            uuid: document.uuid,
            created: false,
        });
    }

    let (id, uuid, created) = sqlx::query_as::<_, (i64, Uuid, bool)>(
        "INSERT INTO products \
             (uuid, external_id, gear_type, manufacturer, model, document) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (gear_type, manufacturer, model) DO UPDATE SET \
             external_id    = COALESCE(EXCLUDED.external_id, products.external_id), \
             document       = jsonb_set(EXCLUDED.document, '{uuid}', to_jsonb(products.uuid)), \
             updated_at_utc = NOW() \
         RETURNING id, uuid, (xmax = 0) AS created",
    )
    .bind(product.uuid)
    .bind(&product.external_id)
    .bind(product.gear_type().as_str())
    .bind(&product.manufacturer)
    .bind(&product.model)
    .bind(Json(product))
    .fetch_one(pool)
    .await?;

    Ok(UpsertOutcome { id, uuid, created })
}

/// One page of products with `id > after_id`, ordered by `id`.
///
/// Keyset pagination: rows inserted or updated during a walk never shift the
/// cursor, so each id is visited at most once.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_products_page(
    pool: &PgPool,
    after_id: i64,
    limit: i64,
) -> Result<Vec<ProductRecord>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "{SELECT_COLUMNS} WHERE id > $1 ORDER BY id LIMIT $2"
    ))
    .bind(after_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(ProductRecord::from).collect())
}
