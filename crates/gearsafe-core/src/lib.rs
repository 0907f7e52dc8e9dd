//! Domain model, safety scoring, and configuration for the gearsafe
//! ingestion pipeline. Nothing in this crate performs I/O beyond reading
//! environment variables.

pub mod app_config;
pub mod certifications;
pub mod config;
pub mod product;
pub mod scoring;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, ObjectStorageConfig};
pub use certifications::{
    CeZone, Certifications, HelmetCertifications, JacketCertifications, PantsCertifications,
    SharpImpactZones, SharpRating, SharpTopZones, ZoneCertifications,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use product::{GearType, ModelAlias, Product, NO_LATCH_PERCENTAGE, UNKNOWN_WEIGHT_LBS};
pub use scoring::{compute_safety_percentage, zone_score};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
