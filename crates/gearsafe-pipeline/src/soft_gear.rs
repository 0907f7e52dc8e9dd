//! Soft-gear ingestion: one RevZilla category per run.

use std::collections::HashSet;

use futures::stream::{self, StreamExt};
use gearsafe_core::{Certifications, Product};
use gearsafe_scraper::infer::infer_soft_gear;
use gearsafe_scraper::sources::revzilla::MIN_CATEGORY_LISTINGS;
use gearsafe_scraper::{canonicalize_manufacturer, ProductListing, RevzillaClient, SoftGearCategory};

use crate::error::PipelineError;
use crate::report::JobReport;
use crate::runner::Pipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListingChange {
    Created,
    Updated,
    Discontinued,
    Unchanged,
    /// No description and not in the catalog: nothing to record.
    Ignored,
}

#[derive(Debug)]
struct ListingOutcome {
    change: ListingChange,
    image_copied: bool,
    image_failed: bool,
}

impl ListingOutcome {
    fn plain(change: ListingChange) -> Self {
        Self {
            change,
            image_copied: false,
            image_failed: false,
        }
    }
}

impl Pipeline {
    /// Ingests one soft-gear category.
    ///
    /// With `min_check` set, a listing page with fewer than
    /// [`MIN_CATEGORY_LISTINGS`] products aborts the run.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Structural`] on a short listing, and any failure
    /// fetching the listing or loading the manufacturer list. Per-listing
    /// failures are logged and counted.
    pub async fn run_soft_gear(
        &self,
        category: SoftGearCategory,
        min_check: bool,
    ) -> Result<JobReport, PipelineError> {
        let mut report = JobReport::new(format!("sync_revzilla_{category}"));
        let client = self.revzilla_client();
        let listings = client
            .fetch_listings(category, min_check.then_some(MIN_CATEGORY_LISTINGS))
            .await?;
        let manufacturers = self.store.list_manufacturers().await?;
        let listings = dedupe_listings(listings, &manufacturers, &mut report);

        let results: Vec<(String, Result<ListingOutcome, PipelineError>)> =
            stream::iter(listings)
                .map(|listing| {
                    let client = &client;
                    let manufacturers = manufacturers.as_slice();
                    async move {
                        let url = listing.url.clone();
                        let result = self
                            .sync_listing(client, category, listing, manufacturers)
                            .await;
                        (url, result)
                    }
                })
                .buffer_unordered(self.settings.worker_concurrency)
                .collect()
                .await;

        for (url, result) in results {
            match result {
                Ok(outcome) => {
                    match outcome.change {
                        ListingChange::Created => report.created += 1,
                        ListingChange::Updated => report.updated += 1,
                        ListingChange::Discontinued => report.discontinued += 1,
                        ListingChange::Unchanged | ListingChange::Ignored => {}
                    }
                    if outcome.image_copied {
                        report.enriched += 1;
                    }
                    if outcome.image_failed {
                        report.warn();
                    }
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "skipping listing");
                    report.skip();
                }
            }
        }

        report.log_completion();
        Ok(report)
    }

    /// `new|existing → enriched → scored → persisted`, or
    /// `existing → discontinued → persisted` for a listing without copy.
    async fn sync_listing(
        &self,
        client: &RevzillaClient,
        category: SoftGearCategory,
        listing: ProductListing,
        manufacturers: &[String],
    ) -> Result<ListingOutcome, PipelineError> {
        let parts = client.fetch_description_parts(&listing.url).await?;
        let existing = match self.store.find_by_external_id(&listing.external_id).await? {
            Some(record) => Some(record),
            None => {
                let (manufacturer, model) = natural_key(&listing, manufacturers);
                self.store
                    .find_by_manufacturer_model(category.gear_type(), &manufacturer, &model)
                    .await?
            }
        };

        if parts.is_empty() {
            let Some(record) = existing else {
                tracing::debug!(url = %listing.url, "listing without description, not in catalog");
                return Ok(ListingOutcome::plain(ListingChange::Ignored));
            };
            if record.product.is_discontinued {
                return Ok(ListingOutcome::plain(ListingChange::Unchanged));
            }
            let mut product = record.product;
            product.is_discontinued = true;
            self.store.upsert(&product).await?;
            return Ok(ListingOutcome::plain(ListingChange::Discontinued));
        }

        let (baseline, mut product) = match existing {
            Some(record) => (Some(record.product.clone()), record.product),
            None => (None, new_product(category, &listing, manufacturers)),
        };
        product.external_id = Some(listing.external_id.clone());

        product.affiliate_buy_url.clone_from(&listing.url);
        if let Some(price) = listing.price_cents {
            product.affiliate_price_cents = price;
        }
        if !listing.image_url.is_empty() && listing.image_url != product.image_url {
            product.image_url = listing.image_url;
            product.image_key.clear();
        }
        product.is_discontinued = false;

        let mut certifications = Certifications::empty(category.gear_type());
        infer_soft_gear(&mut certifications, &parts);
        product.certifications = certifications;
        product.refresh_derived();

        let mut outcome = ListingOutcome::plain(ListingChange::Unchanged);
        match self.refresh_image(&mut product).await {
            Ok(copied) => outcome.image_copied = copied,
            Err(e) => {
                tracing::warn!(url = %product.image_url, error = %e, "image copy failed");
                outcome.image_failed = true;
            }
        }

        if baseline.as_ref() == Some(&product) {
            return Ok(outcome);
        }
        let upserted = self.store.upsert(&product).await?;
        outcome.change = if upserted.created {
            ListingChange::Created
        } else {
            ListingChange::Updated
        };
        Ok(outcome)
    }
}

fn new_product(
    category: SoftGearCategory,
    listing: &ProductListing,
    manufacturers: &[String],
) -> Product {
    let (manufacturer, model) = natural_key(listing, manufacturers);
    let mut product = Product::new(category.gear_type(), manufacturer, model);
    product.external_id = Some(listing.external_id.clone());
    product
}

/// Canonical manufacturer and model a listing is stored under.
fn natural_key(listing: &ProductListing, manufacturers: &[String]) -> (String, String) {
    (
        canonicalize_manufacturer(&listing.brand, manufacturers).into_name(),
        model_from_listing(&listing.brand, &listing.name),
    )
}

/// Keeps one listing per catalog row. Listings sharing an external id or a
/// (manufacturer, model) pair would otherwise overwrite each other in
/// completion order; the lowest external id wins.
fn dedupe_listings(
    mut listings: Vec<ProductListing>,
    manufacturers: &[String],
    report: &mut JobReport,
) -> Vec<ProductListing> {
    listings.sort_by(|a, b| a.external_id.cmp(&b.external_id));
    let mut ids = HashSet::new();
    let mut keys = HashSet::new();
    listings.retain(|listing| {
        if !ids.insert(listing.external_id.clone()) {
            return false;
        }
        let key = natural_key(listing, manufacturers);
        if keys.contains(&key) {
            tracing::warn!(
                external_id = %listing.external_id,
                manufacturer = %key.0,
                model = %key.1,
                "listing collides with another listing of the same product"
            );
            report.warn();
            return false;
        }
        keys.insert(key);
        true
    });
    listings
}

/// Listing names repeat the brand ("Alpinestars T-GP Plus R v3 Jacket");
/// the model is what follows it.
fn model_from_listing(brand: &str, name: &str) -> String {
    let name = name.trim();
    let brand = brand.trim();
    if !brand.is_empty()
        && name.len() > brand.len()
        && name.is_char_boundary(brand.len())
        && name[..brand.len()].eq_ignore_ascii_case(brand)
    {
        let rest = name[brand.len()..].trim();
        if !rest.is_empty() {
            return rest.to_owned();
        }
    }
    name.to_owned()
}
