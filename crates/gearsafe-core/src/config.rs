use std::net::SocketAddr;
use std::str::FromStr;

use crate::app_config::{AppConfig, Environment, ObjectStorageConfig};
use crate::ConfigError;

/// Desktop browser UA sent on every upstream request. SHARP and `RevZilla`
/// both serve reduced markup to unknown agents.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Reads `.env` (if present) and then the process environment.
///
/// # Errors
///
/// [`ConfigError`] for a missing required variable or an unparsable value.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Same as [`load_app_config`] without touching `.env`.
///
/// # Errors
///
/// See [`load_app_config`].
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Variable access over an arbitrary lookup, so tests can use a map.
struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    /// Present and not blank.
    fn get(&self, var: &str) -> Option<String> {
        (self.lookup)(var).ok().filter(|v| !v.trim().is_empty())
    }

    fn required(&self, var: &str) -> Result<String, ConfigError> {
        self.get(var)
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_owned()))
    }

    fn text(&self, var: &str, default: &str) -> String {
        (self.lookup)(var).unwrap_or_else(|_| default.to_owned())
    }

    fn parsed<T>(&self, var: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let Some(raw) = self.get(var) else {
            return Ok(default);
        };
        raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnvVar {
            var: var.to_owned(),
            reason: e.to_string(),
        })
    }
}

/// Builds the config from `lookup` instead of the real environment.
///
/// # Errors
///
/// See [`load_app_config`].
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let vars = Vars { lookup };

    let database_url = vars.required("DATABASE_CONNECTION_STRING")?;
    let env = parse_environment(&vars.required("APP_ENVIRONMENT")?)?;
    let bind_addr = vars.parsed("GEARSAFE_BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?;
    let log_level = vars.text("GEARSAFE_LOG_LEVEL", "info");
    let logzio_token = vars.get("LOGZIO_TOKEN");

    let object_storage = parse_object_storage(
        vars.get("AWS_ACCESS_KEY_ID"),
        vars.get("AWS_SECRET_ACCESS_KEY"),
        vars.get("AWS_S3_BUCKET"),
    )?;

    let cj_api_key = vars.get("CJ_API_KEY");
    let cj_website_id = vars.text("CJ_WEBSITE_ID", "");
    let cj_advertiser_ids = vars.text("CJ_ADVERTISER_IDS", "");

    let db_max_connections = vars.parsed("GEARSAFE_DB_MAX_CONNECTIONS", 10)?;
    let db_min_connections = vars.parsed("GEARSAFE_DB_MIN_CONNECTIONS", 1)?;
    let db_acquire_timeout_secs = vars.parsed("GEARSAFE_DB_ACQUIRE_TIMEOUT_SECS", 10)?;

    let fetch_concurrency: usize = vars.parsed("GEARSAFE_FETCH_CONCURRENCY", 4)?;
    if fetch_concurrency == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "GEARSAFE_FETCH_CONCURRENCY".to_owned(),
            reason: "must be at least 1".to_owned(),
        });
    }
    let fetch_timeout_secs = vars.parsed("GEARSAFE_FETCH_TIMEOUT_SECS", 60)?;
    let user_agent = vars.text("GEARSAFE_USER_AGENT", DEFAULT_USER_AGENT);
    let affiliate_delay_ms = vars.parsed("GEARSAFE_AFFILIATE_DELAY_MS", 3000)?;
    let image_copy_max_retries = vars.parsed("GEARSAFE_IMAGE_COPY_MAX_RETRIES", 3)?;
    let server_timeout_secs = vars.parsed("GEARSAFE_SERVER_TIMEOUT_SECS", 7200)?;

    let worker_api_keys = vars
        .text("GEARSAFE_WORKER_API_KEYS", "")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect();

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        logzio_token,
        object_storage,
        cj_api_key,
        cj_website_id,
        cj_advertiser_ids,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        fetch_concurrency,
        fetch_timeout_secs,
        user_agent,
        affiliate_delay_ms,
        image_copy_max_retries,
        server_timeout_secs,
        worker_api_keys,
    })
}

/// Parse `APP_ENVIRONMENT`. Unknown values are a startup error.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "development" | "dev" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "staging" => Ok(Environment::Staging),
        "production" | "prod" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "APP_ENVIRONMENT".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

fn parse_object_storage(
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    bucket: Option<String>,
) -> Result<Option<ObjectStorageConfig>, ConfigError> {
    match (access_key_id, secret_access_key, bucket) {
        (Some(access_key_id), Some(secret_access_key), Some(bucket)) => {
            Ok(Some(ObjectStorageConfig {
                access_key_id,
                secret_access_key,
                bucket,
            }))
        }
        (None, None, None) => Ok(None),
        _ => Err(ConfigError::InvalidEnvVar {
            var: "AWS_S3_BUCKET".to_string(),
            reason: "AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY and AWS_S3_BUCKET must be set together"
                .to_string(),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
