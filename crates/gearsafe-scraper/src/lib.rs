pub mod client;
pub mod error;
mod html;
pub mod infer;
pub mod normalize;
pub mod parse;
pub mod retry;
pub mod sources;

pub use client::{FetchPool, FetchPoolConfig};
pub use error::ScraperError;
pub use normalize::{canonicalize_manufacturer, name_similarity, ManufacturerMatch};
pub use sources::affiliate::{AffiliateClient, AffiliateConfig, AffiliateProduct};
pub use sources::revzilla::{ProductListing, RevzillaClient, SoftGearCategory};
pub use sources::sharp::{SharpClient, SharpHelmet};
pub use sources::snell::{SnellClient, SnellRecord};
