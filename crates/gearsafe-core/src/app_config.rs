use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }

    /// Relaxes the requirement for worker API keys.
    #[must_use]
    pub fn is_development(self) -> bool {
        self == Self::Development
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object storage credentials used for product image copies.
///
/// Either all three `AWS_*` variables are present or none are.
#[derive(Clone, PartialEq, Eq)]
pub struct ObjectStorageConfig {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
}

impl std::fmt::Debug for ObjectStorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStorageConfig")
            .field("access_key_id", &"[redacted]")
            .field("secret_access_key", &"[redacted]")
            .field("bucket", &self.bucket)
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub logzio_token: Option<String>,
    pub object_storage: Option<ObjectStorageConfig>,
    pub cj_api_key: Option<String>,
    pub cj_website_id: String,
    pub cj_advertiser_ids: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub fetch_concurrency: usize,
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
    pub affiliate_delay_ms: u64,
    pub image_copy_max_retries: u32,
    pub server_timeout_secs: u64,
    pub worker_api_keys: Vec<String>,
}

impl AppConfig {
    /// JSON log lines are emitted when a log-forwarding token is configured.
    #[must_use]
    pub fn json_logs(&self) -> bool {
        self.logzio_token.is_some()
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field(
                "logzio_token",
                &self.logzio_token.as_ref().map(|_| "[redacted]"),
            )
            .field("object_storage", &self.object_storage)
            .field(
                "cj_api_key",
                &self.cj_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("cj_website_id", &self.cj_website_id)
            .field("cj_advertiser_ids", &self.cj_advertiser_ids)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("fetch_concurrency", &self.fetch_concurrency)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("affiliate_delay_ms", &self.affiliate_delay_ms)
            .field("image_copy_max_retries", &self.image_copy_max_retries)
            .field("server_timeout_secs", &self.server_timeout_secs)
            .field("worker_api_keys", &self.worker_api_keys.len())
            .finish()
    }
}
