//! Catalog-wide recomputation of derived fields.

use crate::error::PipelineError;
use crate::report::JobReport;
use crate::runner::Pipeline;
use crate::store::CatalogPager;

impl Pipeline {
    /// Recomputes search price and safety for every product, writing only the
    /// rows whose derived fields changed.
    ///
    /// # Errors
    ///
    /// Any store error while paging. Failed writes are logged and counted.
    pub async fn run_rescore(&self) -> Result<JobReport, PipelineError> {
        let mut report = JobReport::new("rescore");
        let mut pager = CatalogPager::new(self.store());

        while let Some(page) = pager.next_page().await? {
            for record in page {
                let mut product = record.product;
                if !product.refresh_derived() {
                    continue;
                }
                match self.store.upsert(&product).await {
                    Ok(_) => report.updated += 1,
                    Err(e) => {
                        tracing::warn!(uuid = %product.uuid, error = %e, "rescore write failed");
                        report.skip();
                    }
                }
            }
        }

        report.log_completion();
        Ok(report)
    }
}
