use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("XML error for {context}: {source}")]
    Xml {
        context: String,
        #[source]
        source: quick_xml::Error,
    },

    #[error("parse error for {context}: {reason}")]
    Parse { context: String, reason: String },

    #[error("{upstream} returned {found} records, expected at least {minimum}; page layout may have changed")]
    TooFewRecords {
        upstream: &'static str,
        found: usize,
        minimum: usize,
    },

    #[error("unrecognized impact image \"{src}\" on {url}")]
    UnrecognizedImpactImage { url: String, src: String },

    #[error("fetch pool is closed")]
    PoolClosed,
}

impl ScraperError {
    /// Structural failures mean the upstream changed shape; a job that sees
    /// one must abort rather than continue with partial data.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(self, ScraperError::TooFewRecords { .. })
    }
}
