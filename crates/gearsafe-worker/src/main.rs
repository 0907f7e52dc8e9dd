mod api;
mod middleware;

use std::sync::Arc;
use std::time::Duration;

use gearsafe_core::AppConfig;
use gearsafe_pipeline::{Pipeline, PipelineSettings};
use gearsafe_scraper::{AffiliateConfig, FetchPool, FetchPoolConfig};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = gearsafe_core::load_app_config()?;
    init_tracing(&config)?;

    let pool_config = gearsafe_db::PoolConfig::from_app_config(&config);
    let pool = gearsafe_db::connect_pool(&config.database_url, pool_config).await?;
    gearsafe_db::run_migrations(&pool).await?;

    let pipeline = build_pipeline(&config, pool.clone())?;
    let auth = AuthState::from_keys(&config.worker_api_keys, config.env.is_development())?;
    let app = build_app(
        AppState {
            pool,
            pipeline: Arc::new(pipeline),
        },
        auth,
        Duration::from_secs(config.server_timeout_secs),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "worker listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn init_tracing(config: &AppConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    if config.json_logs() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
    Ok(())
}

fn build_pipeline(config: &AppConfig, pool: sqlx::PgPool) -> anyhow::Result<Pipeline> {
    let fetch = FetchPool::new(&FetchPoolConfig::from_app_config(config))?;
    let mut pipeline = Pipeline::new(
        Arc::new(pool),
        fetch,
        PipelineSettings::from_app_config(config),
    );

    match AffiliateConfig::from_app_config(config) {
        Some(affiliate) => pipeline = pipeline.with_affiliate(affiliate),
        None => tracing::warn!("CJ_API_KEY not set; affiliate enrichment disabled"),
    }
    if config.object_storage.is_some() {
        tracing::warn!("object storage configured but no image store client is available; image copies are skipped");
    }
    Ok(pipeline)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
