use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

mod artifact;
mod config;
mod db;
mod error;
mod features;
mod models;
mod server;
mod service;

use artifact::ModelArtifact;
use config::AppConfig;
use db::{ActivityTable, PgRecordSource};
use service::PredictionService;

#[derive(Parser)]
#[command(name = "learner-type")]
#[command(about = "Learner type prediction from learning activity", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the prediction API
    Serve,
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed activity
    Seed,
    /// Import activity rows from a CSV file
    Import {
        #[arg(long, value_enum)]
        table: ActivityTable,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print the feature vector computed for one learner
    Features {
        #[arg(long)]
        user_id: i64,
    },
    /// Predict the learner type for one learner
    Predict {
        #[arg(long)]
        user_id: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve => {
            let artifact = load_artifact(&config)?;
            let pool = db::lazy_pool(
                config.database_url()?,
                config.max_connections,
                config.query_timeout(),
            )
            .context("invalid DATABASE_URL")?;
            let source = PgRecordSource::new(pool, config.query_timeout());
            let service = PredictionService::new(source, artifact);
            server::serve(service, &config.bind_addr).await?;
        }
        Commands::InitDb => {
            let pool = connect(&config).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect(&config).await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { table, csv } => {
            let pool = connect(&config).await?;
            let inserted = db::import_csv(&pool, table, &csv).await?;
            println!("Inserted {inserted} {table:?} rows from {}.", csv.display());
        }
        Commands::Features { user_id } => {
            let pool = connect(&config).await?;
            let source = PgRecordSource::new(pool, config.query_timeout());
            let features = service::learner_features(&source, user_id).await?;
            println!("{}", serde_json::to_string_pretty(&features)?);
        }
        Commands::Predict { user_id } => {
            let artifact = load_artifact(&config)?;
            let pool = connect(&config).await?;
            let source = PgRecordSource::new(pool, config.query_timeout());
            let service = PredictionService::new(source, artifact);
            let prediction = service.predict(user_id).await?;
            println!("{}", serde_json::to_string_pretty(&prediction)?);
        }
    }

    Ok(())
}

fn load_artifact(config: &AppConfig) -> anyhow::Result<Arc<ModelArtifact>> {
    log::info!(
        "Loading model artifacts: scaler {}, classifier {}",
        config.scaler_path.display(),
        config.classifier_path.display()
    );
    let artifact = ModelArtifact::load(&config.scaler_path, &config.classifier_path)
        .context("failed to load model artifacts")?;
    Ok(Arc::new(artifact))
}

async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.query_timeout())
        .connect(config.database_url()?)
        .await
        .context("failed to connect to Postgres")
}
