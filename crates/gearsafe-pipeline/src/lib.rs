//! Record linkage and the ingestion jobs built on the source adapters.

pub mod error;
pub mod helmets;
pub mod images;
pub mod linkage;
pub mod report;
pub mod rescore;
pub mod runner;
pub mod soft_gear;
pub mod store;

pub use error::PipelineError;
pub use helmets::HelmetJobOptions;
pub use images::{copy_image, image_key, ImageStore};
pub use report::JobReport;
pub use runner::{Endpoints, Pipeline, PipelineSettings};
pub use store::{CatalogPager, CatalogStore, PAGE_SIZE};
