use std::sync::Arc;

use clap::{Parser, Subcommand};
use gearsafe_core::AppConfig;
use gearsafe_pipeline::{HelmetJobOptions, JobReport, Pipeline, PipelineSettings};
use gearsafe_scraper::{AffiliateConfig, FetchPool, FetchPoolConfig, SoftGearCategory};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "gearsafe-cli")]
#[command(about = "Run gearsafe ingestion jobs from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations.
    Migrate,
    /// SHARP + SNELL ingestion followed by affiliate enrichment.
    Helmets {
        /// Cap on SHARP detail pages; also lowers the index minimum to match.
        #[arg(long)]
        sharp_limit: Option<usize>,
    },
    /// Ingest one RevZilla category (jackets, pants, boots, gloves).
    SoftGear {
        category: SoftGearCategory,
        /// Accept listing pages of any size.
        #[arg(long)]
        no_min_check: bool,
    },
    /// Recompute search price and safety for every product.
    Rescore,
    /// Manage the canonical manufacturer list.
    Manufacturers {
        #[command(subcommand)]
        command: ManufacturerCommands,
    },
}

#[derive(Debug, Subcommand)]
enum ManufacturerCommands {
    List,
    Add { name: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = gearsafe_core::load_app_config()?;
    init_tracing(&config)?;

    let pool_config = gearsafe_db::PoolConfig::from_app_config(&config);
    let pool = gearsafe_db::connect_pool(&config.database_url, pool_config).await?;

    match cli.command {
        Commands::Migrate => {
            let applied = gearsafe_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Commands::Helmets { sharp_limit } => {
            let pipeline = build_pipeline(&config, pool)?;
            let report = pipeline.run_helmets(&helmet_options(sharp_limit)).await?;
            print_report(&report)?;
        }
        Commands::SoftGear {
            category,
            no_min_check,
        } => {
            let pipeline = build_pipeline(&config, pool)?;
            let report = pipeline.run_soft_gear(category, !no_min_check).await?;
            print_report(&report)?;
        }
        Commands::Rescore => {
            let pipeline = build_pipeline(&config, pool)?;
            let report = pipeline.run_rescore().await?;
            print_report(&report)?;
        }
        Commands::Manufacturers { command } => match command {
            ManufacturerCommands::List => {
                for name in gearsafe_db::list_manufacturers(&pool).await? {
                    println!("{name}");
                }
            }
            ManufacturerCommands::Add { name } => {
                let name = name.trim();
                anyhow::ensure!(!name.is_empty(), "manufacturer name must not be empty");
                if gearsafe_db::insert_manufacturer(&pool, name).await? {
                    println!("added {name}");
                } else {
                    println!("{name} already exists");
                }
            }
        },
    }

    Ok(())
}

fn init_tracing(config: &AppConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    if config.json_logs() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
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
    Ok(pipeline)
}

/// A limited run cannot meet the full-index minimum, so the minimum drops to
/// the limit.
fn helmet_options(sharp_limit: Option<usize>) -> HelmetJobOptions {
    let defaults = HelmetJobOptions::default();
    HelmetJobOptions {
        sharp_limit,
        min_sharp_urls: sharp_limit.map_or(defaults.min_sharp_urls, |limit| {
            limit.min(defaults.min_sharp_urls)
        }),
        ..defaults
    }
}

fn print_report(report: &JobReport) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}
