//! Copying product images into object storage.

use std::time::Duration;

use async_trait::async_trait;
use gearsafe_scraper::retry::Backoff;
use gearsafe_scraper::FetchPool;
use sha2::{Digest, Sha256};

use crate::error::PipelineError;

const COPY_BACKOFF_BASE: Duration = Duration::from_millis(500);
const KNOWN_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "gif"];

/// Object-storage write primitive. Implementations map their own failures to
/// [`PipelineError::Image`].
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), PipelineError>;
}

/// Storage key for an image URL: hex SHA-256 of the URL plus its extension.
///
/// The same URL always maps to the same key, so re-copying is an overwrite.
#[must_use]
pub fn image_key(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    match url_extension(url) {
        Some(ext) => format!("{hex}.{ext}"),
        None => hex,
    }
}

fn url_extension(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file = path.rsplit('/').next()?;
    let (_, ext) = file.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    KNOWN_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Downloads `url` and writes it under [`image_key`]. Returns the key.
///
/// The download is retried with exponential backoff on transient failures.
///
/// # Errors
///
/// [`PipelineError::Scraper`] when the download fails for good, or whatever
/// the store returns.
pub async fn copy_image(
    fetch: &FetchPool,
    store: &dyn ImageStore,
    url: &str,
    max_retries: u32,
) -> Result<String, PipelineError> {
    let fetched = Backoff::new(max_retries, COPY_BACKOFF_BASE)
        .run(|| fetch.get_bytes(url))
        .await
        .map_err(PipelineError::Scraper)?;
    let key = image_key(url);
    store
        .put(&key, fetched.bytes, fetched.content_type.as_deref())
        .await?;
    tracing::debug!(url, key = %key, "copied product image");
    Ok(key)
}
