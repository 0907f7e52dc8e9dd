//! Test doubles shared by the pipeline integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use gearsafe_core::{GearType, Product};
use gearsafe_db::{DbError, ProductRecord, UpsertOutcome};
use gearsafe_pipeline::{
    CatalogStore, Endpoints, ImageStore, Pipeline, PipelineError, PipelineSettings,
};
use gearsafe_scraper::{FetchPool, FetchPoolConfig};

/// Keeps products in a vector and mirrors the Postgres upsert rules: match on
/// external id first, then on the natural key; an update keeps the stored
/// uuid and, when the incoming one is absent, the stored external id.
#[derive(Default)]
pub struct MemoryStore {
    products: Mutex<Vec<ProductRecord>>,
    manufacturers: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn with_manufacturers(names: &[&str]) -> Self {
        let store = Self::default();
        *store.manufacturers.lock().unwrap() = names.iter().map(|n| (*n).to_string()).collect();
        store
    }

    /// Seeds a product as if an earlier run had stored it.
    pub fn seed(&self, mut product: Product) -> Product {
        product.refresh_derived();
        let mut products = self.products.lock().unwrap();
        let id = i64::try_from(products.len()).unwrap() + 1;
        let now = Utc::now();
        products.push(ProductRecord {
            id,
            product: product.clone(),
            created_at_utc: now,
            updated_at_utc: now,
        });
        product
    }

    pub fn products(&self) -> Vec<Product> {
        self.products
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.product.clone())
            .collect()
    }

    pub fn get(&self, manufacturer: &str, model: &str) -> Option<Product> {
        self.products()
            .into_iter()
            .find(|p| p.manufacturer == manufacturer && p.model == model)
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn find_by_manufacturer_model(
        &self,
        gear_type: GearType,
        manufacturer: &str,
        model: &str,
    ) -> Result<Option<ProductRecord>, DbError> {
        Ok(self
            .products
            .lock()
            .unwrap()
            .iter()
            .find(|r| {
                r.product.gear_type() == gear_type
                    && r.product.manufacturer == manufacturer
                    && r.product.model == model
            })
            .cloned())
    }

    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<ProductRecord>, DbError> {
        Ok(self
            .products
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.product.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn upsert(&self, product: &Product) -> Result<UpsertOutcome, DbError> {
        let mut products = self.products.lock().unwrap();
        let existing = product
            .external_id
            .as_deref()
            .and_then(|ext| {
                products
                    .iter()
                    .position(|r| r.product.external_id.as_deref() == Some(ext))
            })
            .or_else(|| {
                products.iter().position(|r| {
                    r.product.gear_type() == product.gear_type()
                        && r.product.manufacturer == product.manufacturer
                        && r.product.model == product.model
                })
            });

        match existing {
            Some(index) => {
                let record = &mut products[index];
                let mut updated = product.clone();
                updated.uuid = record.product.uuid;
                if updated.external_id.is_none() {
                    updated.external_id.clone_from(&record.product.external_id);
                }
                record.product = updated;
                record.updated_at_utc = Utc::now();
                Ok(UpsertOutcome {
                    id: record.id,
                    uuid: record.product.uuid,
                    created: false,
                })
            }
            None => {
                let id = i64::try_from(products.len()).unwrap() + 1;
                let now = Utc::now();
                products.push(ProductRecord {
                    id,
                    product: product.clone(),
                    created_at_utc: now,
                    updated_at_utc: now,
                });
                Ok(UpsertOutcome {
                    id,
                    uuid: product.uuid,
                    created: true,
                })
            }
        }
    }

    async fn list_page(&self, after_id: i64, limit: i64) -> Result<Vec<ProductRecord>, DbError> {
        let limit = usize::try_from(limit).unwrap();
        let mut page: Vec<ProductRecord> = self
            .products
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.id > after_id)
            .cloned()
            .collect();
        page.sort_by_key(|r| r.id);
        page.truncate(limit);
        Ok(page)
    }

    async fn list_manufacturers(&self) -> Result<Vec<String>, DbError> {
        let mut names = self.manufacturers.lock().unwrap().clone();
        names.sort();
        Ok(names)
    }
}

/// Records every object written to it.
#[derive(Default)]
pub struct MemoryImages {
    pub objects: Mutex<Vec<(String, usize)>>,
}

#[async_trait]
impl ImageStore for MemoryImages {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: Option<&str>,
    ) -> Result<(), PipelineError> {
        self.objects
            .lock()
            .unwrap()
            .push((key.to_string(), bytes.len()));
        Ok(())
    }
}

pub fn test_pool() -> FetchPool {
    FetchPool::new(&FetchPoolConfig {
        concurrency: 4,
        timeout_secs: 5,
        user_agent: "gearsafe-test/0.1".to_string(),
    })
    .expect("failed to build test FetchPool")
}

pub fn test_settings() -> PipelineSettings {
    PipelineSettings {
        affiliate_delay: Duration::ZERO,
        image_copy_max_retries: 0,
        worker_concurrency: 4,
    }
}

/// A pipeline whose upstreams all live on `base_url`.
pub fn pipeline(store: Arc<MemoryStore>, base_url: &str) -> Pipeline {
    pipeline_with_settings(store, base_url, test_settings())
}

pub fn pipeline_with_settings(
    store: Arc<MemoryStore>,
    base_url: &str,
    settings: PipelineSettings,
) -> Pipeline {
    Pipeline::new(store, test_pool(), settings).with_endpoints(Endpoints {
        sharp_index: format!("{base_url}/wp-admin/admin-ajax.php"),
        snell: format!("{base_url}/cert/certlist.json"),
        revzilla: base_url.to_string(),
    })
}
