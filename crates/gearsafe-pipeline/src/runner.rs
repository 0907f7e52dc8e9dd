//! The job runner: shared dependencies for every ingestion job.

use std::sync::Arc;
use std::time::Duration;

use gearsafe_core::{AppConfig, Product};
use gearsafe_scraper::sources::{revzilla, sharp, snell};
use gearsafe_scraper::{
    AffiliateClient, AffiliateConfig, FetchPool, RevzillaClient, SharpClient, SnellClient,
};

use crate::error::PipelineError;
use crate::images::{copy_image, ImageStore};
use crate::store::CatalogStore;

/// Tunables that come from configuration.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Pause after each affiliate search.
    pub affiliate_delay: Duration,
    pub image_copy_max_retries: u32,
    /// Worker-group size for detail-page fetches.
    pub worker_concurrency: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            affiliate_delay: Duration::from_secs(3),
            image_copy_max_retries: 3,
            worker_concurrency: gearsafe_scraper::client::DEFAULT_CONCURRENCY,
        }
    }
}

impl PipelineSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            affiliate_delay: Duration::from_millis(config.affiliate_delay_ms),
            image_copy_max_retries: config.image_copy_max_retries,
            worker_concurrency: config.fetch_concurrency.max(1),
        }
    }
}

/// Upstream base URLs. Overridden in tests to point at local mock servers.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub sharp_index: String,
    pub snell: String,
    pub revzilla: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            sharp_index: sharp::SHARP_INDEX_URL.to_owned(),
            snell: snell::SNELL_CERTIFICATIONS_URL.to_owned(),
            revzilla: revzilla::REVZILLA_BASE_URL.to_owned(),
        }
    }
}

/// Everything a job needs, built once per process and shared by reference.
///
/// The fetch pool and store are immutable after construction; per-job state
/// such as the manufacturer list lives inside each job run.
pub struct Pipeline {
    pub(crate) store: Arc<dyn CatalogStore>,
    pub(crate) fetch: FetchPool,
    pub(crate) images: Option<Arc<dyn ImageStore>>,
    pub(crate) affiliate: Option<AffiliateConfig>,
    pub(crate) endpoints: Endpoints,
    pub(crate) settings: PipelineSettings,
}

impl Pipeline {
    #[must_use]
    pub fn new(store: Arc<dyn CatalogStore>, fetch: FetchPool, settings: PipelineSettings) -> Self {
        Self {
            store,
            fetch,
            images: None,
            affiliate: None,
            endpoints: Endpoints::default(),
            settings,
        }
    }

    #[must_use]
    pub fn with_images(mut self, images: Arc<dyn ImageStore>) -> Self {
        self.images = Some(images);
        self
    }

    /// Enables the affiliate enrichment pass of the helmet job.
    #[must_use]
    pub fn with_affiliate(mut self, config: AffiliateConfig) -> Self {
        self.affiliate = Some(config);
        self
    }

    #[must_use]
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    #[must_use]
    pub fn store(&self) -> &dyn CatalogStore {
        self.store.as_ref()
    }

    pub(crate) fn sharp_client(&self) -> SharpClient {
        SharpClient::with_index_url(self.fetch.clone(), &self.endpoints.sharp_index)
    }

    pub(crate) fn snell_client(&self) -> SnellClient {
        SnellClient::with_url(self.fetch.clone(), &self.endpoints.snell)
    }

    pub(crate) fn revzilla_client(&self) -> RevzillaClient {
        RevzillaClient::with_base_url(self.fetch.clone(), &self.endpoints.revzilla)
    }

    pub(crate) fn affiliate_client(&self) -> Option<AffiliateClient> {
        self.affiliate
            .clone()
            .map(|config| AffiliateClient::new(self.fetch.clone(), config))
    }

    /// Copies `product.image_url` into object storage when an image store is
    /// wired and no key is recorded yet. Returns `true` if a copy was made.
    pub(crate) async fn refresh_image(&self, product: &mut Product) -> Result<bool, PipelineError> {
        let Some(images) = &self.images else {
            return Ok(false);
        };
        if product.image_url.is_empty() || !product.image_key.is_empty() {
            return Ok(false);
        }
        let key = copy_image(
            &self.fetch,
            images.as_ref(),
            &product.image_url,
            self.settings.image_copy_max_retries,
        )
        .await?;
        product.image_key = key;
        Ok(true)
    }
}
