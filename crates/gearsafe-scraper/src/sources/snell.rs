//! SNELL Memorial Foundation certification list.

use serde::Deserialize;

use crate::client::FetchPool;
use crate::error::ScraperError;

pub const SNELL_CERTIFICATIONS_URL: &str = "https://www.smf.org/cert/certlist.json";

/// Fewer records than this for a standard means the feed changed shape.
pub const MIN_SNELL_RECORDS: usize = 100;

/// Standard ingested by the helmet job.
pub const MOTORCYCLE_STANDARD: &str = "M2015";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SnellRecord {
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub standard: String,
    #[serde(default)]
    pub helmettype: String,
    #[serde(default)]
    pub faceconfig: String,
}

#[derive(Debug, Deserialize)]
struct SnellResponse {
    #[serde(default)]
    data: Vec<SnellRecord>,
}

pub struct SnellClient {
    pool: FetchPool,
    url: String,
}

impl SnellClient {
    #[must_use]
    pub fn new(pool: FetchPool) -> Self {
        Self::with_url(pool, SNELL_CERTIFICATIONS_URL)
    }

    #[must_use]
    pub fn with_url(pool: FetchPool, url: impl Into<String>) -> Self {
        Self {
            pool,
            url: url.into(),
        }
    }

    /// Fetches every record certified to `standard`.
    ///
    /// # Errors
    ///
    /// [`ScraperError::Deserialize`] for a malformed body and
    /// [`ScraperError::TooFewRecords`] when fewer than `minimum` records match.
    pub async fn fetch_records(
        &self,
        standard: &str,
        minimum: usize,
    ) -> Result<Vec<SnellRecord>, ScraperError> {
        let body = self.pool.get_text(&self.url).await?;
        let records = filter_standard(parse_records(&body)?, standard);
        tracing::info!(count = records.len(), standard, "fetched SNELL records");

        if records.len() < minimum {
            return Err(ScraperError::TooFewRecords {
                upstream: "snell",
                found: records.len(),
                minimum,
            });
        }
        Ok(records)
    }
}

/// Parses the `{ "data": [...] }` envelope.
///
/// # Errors
///
/// [`ScraperError::Deserialize`] when the body is not that shape.
pub fn parse_records(body: &str) -> Result<Vec<SnellRecord>, ScraperError> {
    serde_json::from_str::<SnellResponse>(body)
        .map(|r| r.data)
        .map_err(|source| ScraperError::Deserialize {
            context: "snell certifications".to_owned(),
            source,
        })
}

/// Keeps records whose trimmed `standard` equals `standard`, ignoring case.
#[must_use]
pub fn filter_standard(records: Vec<SnellRecord>, standard: &str) -> Vec<SnellRecord> {
    let wanted = standard.trim();
    records
        .into_iter()
        .filter(|r| r.standard.trim().eq_ignore_ascii_case(wanted))
        .collect()
}
