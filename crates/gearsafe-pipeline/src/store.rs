//! The catalog store seam used by every job.
//!
//! Production runs against Postgres through `gearsafe-db`; tests plug in an
//! in-memory implementation.

use async_trait::async_trait;
use gearsafe_core::{GearType, Product};
use gearsafe_db::{DbError, ProductRecord, UpsertOutcome};
use sqlx::PgPool;

/// Products per page when walking the catalog.
pub const PAGE_SIZE: i64 = 25;

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_by_manufacturer_model(
        &self,
        gear_type: GearType,
        manufacturer: &str,
        model: &str,
    ) -> Result<Option<ProductRecord>, DbError>;

    async fn find_by_external_id(&self, external_id: &str)
        -> Result<Option<ProductRecord>, DbError>;

    /// Insert, or update in place keeping uuid and creation time.
    async fn upsert(&self, product: &Product) -> Result<UpsertOutcome, DbError>;

    /// Up to `limit` products with `id > after_id`, ordered by id.
    async fn list_page(&self, after_id: i64, limit: i64) -> Result<Vec<ProductRecord>, DbError>;

    async fn list_manufacturers(&self) -> Result<Vec<String>, DbError>;
}

#[async_trait]
impl CatalogStore for PgPool {
    async fn find_by_manufacturer_model(
        &self,
        gear_type: GearType,
        manufacturer: &str,
        model: &str,
    ) -> Result<Option<ProductRecord>, DbError> {
        gearsafe_db::find_by_manufacturer_model(self, gear_type, manufacturer, model).await
    }

    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<ProductRecord>, DbError> {
        gearsafe_db::find_by_external_id(self, external_id).await
    }

    async fn upsert(&self, product: &Product) -> Result<UpsertOutcome, DbError> {
        gearsafe_db::upsert_product(self, product).await
    }

    async fn list_page(&self, after_id: i64, limit: i64) -> Result<Vec<ProductRecord>, DbError> {
        gearsafe_db::list_products_page(self, after_id, limit).await
    }

    async fn list_manufacturers(&self) -> Result<Vec<String>, DbError> {
        gearsafe_db::list_manufacturers(self).await
    }
}

/// Walks the catalog in id order, one page at a time.
///
/// The cursor is the last id seen, so rows upserted during the walk never
/// shift later pages and no id is yielded twice.
pub struct CatalogPager<'a> {
    store: &'a dyn CatalogStore,
    after_id: i64,
    page_size: i64,
    exhausted: bool,
}

impl<'a> CatalogPager<'a> {
    #[must_use]
    pub fn new(store: &'a dyn CatalogStore) -> Self {
        Self::with_page_size(store, PAGE_SIZE)
    }

    #[must_use]
    pub fn with_page_size(store: &'a dyn CatalogStore, page_size: i64) -> Self {
        Self {
            store,
            after_id: 0,
            page_size: page_size.max(1),
            exhausted: false,
        }
    }

    /// The next page, or `None` once the catalog is exhausted.
    ///
    /// # Errors
    ///
    /// Any store error; the cursor does not advance, so the call may be
    /// retried.
    pub async fn next_page(&mut self) -> Result<Option<Vec<ProductRecord>>, DbError> {
        if self.exhausted {
            return Ok(None);
        }
        let page = self.store.list_page(self.after_id, self.page_size).await?;
        if page.len() < usize::try_from(self.page_size).unwrap_or(usize::MAX) {
            self.exhausted = true;
        }
        match page.last() {
            Some(last) => {
                self.after_id = last.id;
                Ok(Some(page))
            }
            None => Ok(None),
        }
    }
}
