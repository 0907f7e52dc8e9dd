//! Shared HTTP fetch pool.
//!
//! One `reqwest::Client` (keep-alive connection pool) plus a semaphore that
//! caps in-flight requests. A permit is held from send until the body is read
//! and is released when the request future completes, fails, or is dropped.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use tokio::sync::Semaphore;

use crate::error::ScraperError;

pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone)]
pub struct FetchPoolConfig {
    pub concurrency: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchPoolConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout_secs: 60,
            user_agent: gearsafe_core::config::DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetchPoolConfig {
    #[must_use]
    pub fn from_app_config(config: &gearsafe_core::AppConfig) -> Self {
        Self {
            concurrency: config.fetch_concurrency,
            timeout_secs: config.fetch_timeout_secs,
            user_agent: config.user_agent.clone(),
        }
    }
}

/// A downloaded binary body.
#[derive(Debug, Clone)]
pub struct FetchedBytes {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Cheap to clone; clones share the client and the concurrency cap.
#[derive(Debug, Clone)]
pub struct FetchPool {
    client: Client,
    permits: Arc<Semaphore>,
    concurrency: usize,
}

impl FetchPool {
    /// Creates a pool with the configured timeout, `User-Agent`, and cap.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(config: &FetchPoolConfig) -> Result<Self, ScraperError> {
        let concurrency = config.concurrency.max(1);
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(concurrency)
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()?;
        Ok(Self {
            client,
            permits: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        })
    }

    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Permits not currently held by an in-flight request.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// `GET` a URL and return the body as text.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] on network failure and
    /// [`ScraperError::UnexpectedStatus`] on any non-2xx status.
    pub async fn get_text(&self, url: &str) -> Result<String, ScraperError> {
        self.send_text(self.client.get(url), url).await
    }

    /// `GET` with an `Authorization: Bearer` header.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_text`].
    pub async fn get_text_with_bearer(
        &self,
        url: &str,
        token: &str,
    ) -> Result<String, ScraperError> {
        let request = self.client.get(url).bearer_auth(token);
        self.send_text(request, url).await
    }

    /// `POST` an urlencoded form and return the body as text.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_text`].
    pub async fn post_form_text(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<String, ScraperError> {
        self.send_text(self.client.post(url).form(form), url).await
    }

    /// `GET` a binary body, e.g. a product image.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_text`].
    pub async fn get_bytes(&self, url: &str) -> Result<FetchedBytes, ScraperError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ScraperError::PoolClosed)?;
        let response = check_status(self.client.get(url).send().await?, url)?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let bytes = response.bytes().await?.to_vec();
        Ok(FetchedBytes {
            bytes,
            content_type,
        })
    }

    async fn send_text(&self, request: RequestBuilder, url: &str) -> Result<String, ScraperError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ScraperError::PoolClosed)?;
        let response = check_status(request.send().await?, url)?;
        Ok(response.text().await?)
    }
}

fn check_status(response: Response, url: &str) -> Result<Response, ScraperError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ScraperError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_owned(),
        })
    }
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
