//! Helmet ingestion: SHARP, then SNELL, then upsert, then affiliate
//! enrichment.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use gearsafe_core::{
    Certifications, GearType, HelmetCertifications, Product, NO_LATCH_PERCENTAGE,
    UNKNOWN_WEIGHT_LBS,
};
use gearsafe_scraper::infer::infer_helmet_text;
use gearsafe_scraper::normalize::snell_subtype;
use gearsafe_scraper::sources::sharp::MIN_HELMET_URLS;
use gearsafe_scraper::sources::snell::{MIN_SNELL_RECORDS, MOTORCYCLE_STANDARD};
use gearsafe_scraper::{
    canonicalize_manufacturer, AffiliateClient, ScraperError, SharpHelmet, SnellRecord,
};

use crate::error::PipelineError;
use crate::linkage::{
    best_affiliate_match, decide, link_snell_to_sharp, AffiliateDecision, SnellLink,
};
use crate::report::JobReport;
use crate::runner::Pipeline;
use crate::store::CatalogPager;

#[derive(Debug, Clone)]
pub struct HelmetJobOptions {
    /// Caps the SHARP index size; `None` fetches everything.
    pub sharp_limit: Option<usize>,
    pub min_sharp_urls: usize,
    pub snell_standard: String,
    pub min_snell_records: usize,
}

impl Default for HelmetJobOptions {
    fn default() -> Self {
        Self {
            sharp_limit: None,
            min_sharp_urls: MIN_HELMET_URLS,
            snell_standard: MOTORCYCLE_STANDARD.to_owned(),
            min_snell_records: MIN_SNELL_RECORDS,
        }
    }
}

/// What the affiliate pass did to one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AffiliateOutcome {
    Discontinued,
    Enriched,
    Unmatched,
}

/// Spaces affiliate requests by a fixed delay; the first request goes out
/// immediately.
struct Pacer {
    delay: Duration,
    primed: bool,
}

impl Pacer {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            primed: false,
        }
    }

    async fn wait(&mut self) {
        if self.primed && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.primed = true;
    }
}

impl Pipeline {
    /// Runs the combined helmet job.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Structural`] when SHARP or SNELL return too few
    /// records, and any failure loading the manufacturer list, the SHARP
    /// index, the SNELL feed, or a catalog page. Record-level failures are
    /// logged and counted in the report instead.
    pub async fn run_helmets(&self, options: &HelmetJobOptions) -> Result<JobReport, PipelineError> {
        let mut report = JobReport::new("helmets");
        let manufacturers = self.store.list_manufacturers().await?;

        let sharp_products = self.collect_sharp(options, &manufacturers, &mut report).await?;
        tracing::info!(count = sharp_products.len(), "SHARP helmets collected");

        let records = self
            .snell_client()
            .fetch_records(&options.snell_standard, options.min_snell_records)
            .await?;
        let (sharp_products, snell_only) =
            merge_snell(sharp_products, &records, &manufacturers, &mut report);
        tracing::info!(snell_only = snell_only.len(), "SNELL records merged");

        for product in sharp_products.into_iter().chain(snell_only) {
            self.persist_sighting(product, &mut report).await;
        }

        self.enrich_from_affiliate(&mut report).await?;

        report.log_completion();
        Ok(report)
    }

    async fn collect_sharp(
        &self,
        options: &HelmetJobOptions,
        manufacturers: &[String],
        report: &mut JobReport,
    ) -> Result<Vec<Product>, PipelineError> {
        let sharp = self.sharp_client();
        let urls = sharp
            .fetch_helmet_urls(options.sharp_limit, options.min_sharp_urls)
            .await?;

        let mut results: Vec<(String, Result<SharpHelmet, ScraperError>)> = stream::iter(urls)
            .map(|url| {
                let sharp = &sharp;
                async move {
                    let result = sharp.fetch_helmet(&url).await;
                    (url, result)
                }
            })
            .buffer_unordered(self.settings.worker_concurrency)
            .collect()
            .await;
        // Completion order is arbitrary; URL order keeps merges deterministic.
        results.sort_by(|a, b| a.0.cmp(&b.0));

        let mut products: Vec<Product> = Vec::new();
        let mut by_key: HashMap<(String, String), usize> = HashMap::new();
        for (url, result) in results {
            let helmet = match result {
                Ok(helmet) => helmet,
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "skipping SHARP helmet");
                    report.skip();
                    continue;
                }
            };
            let product = sharp_product(helmet, manufacturers, report);
            let key = (product.manufacturer.clone(), product.model.clone());
            match by_key.get(&key) {
                Some(&index) => products[index].absorb_source(product),
                None => {
                    by_key.insert(key, products.len());
                    products.push(product);
                }
            }
        }
        Ok(products)
    }

    /// Upserts one source sighting, folding it into the stored product when
    /// there is one. Writes nothing if the result is unchanged.
    async fn persist_sighting(&self, mut fresh: Product, report: &mut JobReport) {
        let existing = match self
            .store
            .find_by_manufacturer_model(fresh.gear_type(), &fresh.manufacturer, &fresh.model)
            .await
        {
            Ok(existing) => existing,
            Err(e) => {
                tracing::warn!(manufacturer = %fresh.manufacturer, model = %fresh.model, error = %e, "catalog lookup failed");
                report.skip();
                return;
            }
        };

        let product = match existing {
            Some(record) => {
                let mut stored = record.product.clone();
                stored.absorb_source(fresh);
                stored.refresh_derived();
                if stored == record.product {
                    return;
                }
                stored
            }
            None => {
                fresh.refresh_derived();
                fresh
            }
        };

        match self.store.upsert(&product).await {
            Ok(outcome) if outcome.created => report.created += 1,
            Ok(_) => report.updated += 1,
            Err(e) => {
                tracing::warn!(manufacturer = %product.manufacturer, model = %product.model, error = %e, "upsert failed");
                report.skip();
            }
        }
    }

    async fn enrich_from_affiliate(&self, report: &mut JobReport) -> Result<(), PipelineError> {
        let Some(client) = self.affiliate_client() else {
            tracing::info!("no affiliate API key configured; skipping enrichment");
            return Ok(());
        };

        let mut pacer = Pacer::new(self.settings.affiliate_delay);
        let mut pager = CatalogPager::new(self.store());
        while let Some(page) = pager.next_page().await? {
            for record in page {
                if record.product.gear_type() != GearType::Helmet {
                    continue;
                }
                let original = record.product;
                let mut product = original.clone();

                let outcome = match link_affiliate(&client, &mut pacer, &mut product).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::warn!(manufacturer = %original.manufacturer, model = %original.model, error = %e, "affiliate lookup failed");
                        report.skip();
                        continue;
                    }
                };
                if outcome == AffiliateOutcome::Unmatched {
                    tracing::warn!(manufacturer = %original.manufacturer, model = %original.model, "no confident affiliate match");
                    report.warn();
                    continue;
                }

                if outcome == AffiliateOutcome::Enriched {
                    if let Err(e) = self.refresh_image(&mut product).await {
                        tracing::warn!(url = %product.image_url, error = %e, "image copy failed");
                        report.warn();
                    }
                }
                if product == original {
                    continue;
                }
                match self.store.upsert(&product).await {
                    Ok(_) if outcome == AffiliateOutcome::Discontinued => report.discontinued += 1,
                    Ok(_) => report.enriched += 1,
                    Err(e) => {
                        tracing::warn!(manufacturer = %product.manufacturer, model = %product.model, error = %e, "upsert failed");
                        report.skip();
                    }
                }
            }
        }
        Ok(())
    }
}

/// Tries each model candidate in order until one yields a confident match.
async fn link_affiliate(
    client: &AffiliateClient,
    pacer: &mut Pacer,
    product: &mut Product,
) -> Result<AffiliateOutcome, ScraperError> {
    let candidates: Vec<String> = product
        .model_candidates()
        .into_iter()
        .map(str::to_owned)
        .collect();

    for candidate in candidates {
        pacer.wait().await;
        let results = client.search(&product.manufacturer, &candidate).await?;
        let Some(best) = best_affiliate_match(results, &product.manufacturer, &candidate) else {
            continue;
        };
        if decide(best.confidence, false) == AffiliateDecision::NoMatch {
            tracing::debug!(candidate = %candidate, name = %best.product.name, confidence = best.confidence, "affiliate match below threshold");
            continue;
        }

        let discontinued = client.is_discontinued(&best.product.buy_url).await?;
        match decide(best.confidence, discontinued) {
            AffiliateDecision::Discontinued => {
                product.is_discontinued = true;
                return Ok(AffiliateOutcome::Discontinued);
            }
            AffiliateDecision::Available => {
                let listing = best.product;
                product.affiliate_buy_url = listing.buy_url;
                if let Some(price) = listing.price_cents {
                    product.affiliate_price_cents = price;
                }
                product.is_discontinued = false;
                if product.image_url.is_empty() && !listing.image_url.is_empty() {
                    product.image_url = listing.image_url;
                    product.image_key.clear();
                }
                if let Some(certs) = product.helmet_certifications_mut() {
                    let (dot, ece) = infer_helmet_text(certs, &listing.description);
                    if dot || ece {
                        tracing::debug!(dot, ece, "certifications inferred from affiliate copy");
                    }
                }
                product.refresh_derived();
                return Ok(AffiliateOutcome::Enriched);
            }
            AffiliateDecision::NoMatch => {}
        }
    }
    Ok(AffiliateOutcome::Unmatched)
}

fn sharp_product(helmet: SharpHelmet, manufacturers: &[String], report: &mut JobReport) -> Product {
    let matched = canonicalize_manufacturer(&helmet.manufacturer, manufacturers);
    if !matched.is_success() {
        tracing::warn!(manufacturer = %helmet.manufacturer, url = %helmet.url, "unknown SHARP manufacturer");
        report.warn();
    }

    let mut product = Product::new(GearType::Helmet, matched.into_name(), helmet.model);
    product.subtype = helmet.subtype;
    product.weight_lbs = helmet.weight_lbs.unwrap_or(UNKNOWN_WEIGHT_LBS);
    product.sizes = helmet.sizes;
    product.retention_system = helmet.retention_system;
    product.materials = helmet.materials;
    product.msrp_cents = helmet.price_cents.unwrap_or(0);
    product.latch_percentage = helmet.latch_percentage.unwrap_or(NO_LATCH_PERCENTAGE);
    product.certifications = Certifications::Helmet(HelmetCertifications {
        sharp: Some(helmet.rating),
        ece: helmet.is_ece,
        ..HelmetCertifications::default()
    });
    product
}

/// Links SNELL records onto the SHARP set. Returns the updated SHARP set and
/// the helmets known only to SNELL.
fn merge_snell(
    mut sharp_products: Vec<Product>,
    records: &[SnellRecord],
    manufacturers: &[String],
    report: &mut JobReport,
) -> (Vec<Product>, Vec<Product>) {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut snell_only: Vec<Product> = Vec::new();

    for record in records {
        let manufacturer = canonicalize_manufacturer(&record.manufacturer, manufacturers).into_name();
        let model = record.model.trim().to_owned();
        // One row per size; link each helmet once.
        if model.is_empty() || !seen.insert((manufacturer.clone(), model.clone())) {
            continue;
        }

        match link_snell_to_sharp(&sharp_products, &manufacturer, &model) {
            SnellLink::Matched { index, confidence } => {
                let product = &mut sharp_products[index];
                tracing::debug!(manufacturer = %manufacturer, snell_model = %model, sharp_model = %product.model, confidence, "SNELL record linked");
                if let Some(certs) = product.helmet_certifications_mut() {
                    certs.snell = true;
                    certs.dot = true;
                }
            }
            SnellLink::NoCandidates => {
                tracing::warn!(manufacturer = %manufacturer, model = %model, "no SHARP helmets for SNELL manufacturer; adding SNELL-only helmet");
                report.warn();
                let mut product = Product::new(GearType::Helmet, manufacturer, model);
                product.subtype = snell_subtype(&record.faceconfig).to_owned();
                if let Some(certs) = product.helmet_certifications_mut() {
                    certs.snell = true;
                    certs.dot = true;
                }
                snell_only.push(product);
            }
            SnellLink::LowConfidence {
                best_model,
                confidence,
            } => {
                tracing::warn!(manufacturer = %manufacturer, model = %model, best_model = %best_model, confidence, "SNELL record below match threshold");
                report.warn();
            }
        }
    }

    (sharp_products, snell_only)
}
