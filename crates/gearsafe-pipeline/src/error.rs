use gearsafe_db::DbError;
use gearsafe_scraper::ScraperError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// An upstream returned too few records; the job aborts.
    #[error("structural failure: {0}")]
    Structural(#[source] ScraperError),

    #[error("catalog store error: {0}")]
    Store(#[from] DbError),

    #[error("scraper error: {0}")]
    Scraper(#[source] ScraperError),

    #[error("image copy failed: {0}")]
    Image(String),
}

impl From<ScraperError> for PipelineError {
    fn from(err: ScraperError) -> Self {
        if err.is_structural() {
            Self::Structural(err)
        } else {
            Self::Scraper(err)
        }
    }
}
