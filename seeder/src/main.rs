use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use seeder::config::{Args, SeedConfig};
use seeder::console;
use seeder::images::LocalImageCache;
use seeder::loader::FileLoader;
use seeder::orchestrator::SeedOrchestrator;
use seeder::password::Argon2PasswordHasher;
use seeder::store::{MemoryStore, PgStore, SeedStore};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let default_filter = if args.verbose {
        "seeder=debug,shared=debug"
    } else {
        "seeder=info,shared=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .init();

    let config = SeedConfig::load(&args);

    if let Err(e) = run(config).await {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(config: SeedConfig) -> Result<()> {
    console::header("ComicWise Database Seeder");
    config.validate().context("Invalid seeder configuration")?;

    let store: Arc<dyn SeedStore> = if config.in_memory {
        console::info("Using the in-memory store, nothing will be persisted");
        Arc::new(MemoryStore::new())
    } else {
        let url = config.require_database_url()?;
        let store = PgStore::connect(url, config.pool_size())
            .await
            .context("Failed to connect to database")?;
        if config.migrate {
            store.migrate().await.context("Failed to run migrations")?;
            console::success("Migrations applied");
        }
        Arc::new(store)
    };

    console::info(&format!("Fixture directory: {}", config.data_dir.display()));
    info!(
        batch_size = config.options.batch_size,
        concurrency = config.options.image_download_concurrency,
        skip_images = config.options.skip_image_download,
        dry_run = config.options.dry_run,
        "Seeder configured"
    );

    let images = Arc::new(LocalImageCache::new(
        config.upload_dir.clone(),
        &config.public_base_url,
    ));
    let hasher = Arc::new(Argon2PasswordHasher::new());
    let loader = FileLoader::new(config.data_dir.clone());

    let orchestrator = SeedOrchestrator::new(config, store, images, hasher, loader);
    let report = orchestrator.run().await?;

    for phase in report.executed() {
        if let Some(ref snapshot) = phase.snapshot {
            println!(
                "  {:<10} loaded {:>5}  created {:>5}  updated {:>5}  skipped {:>5}  errors {:>5}",
                phase.phase.to_string(),
                phase.loaded,
                snapshot.created,
                snapshot.updated,
                snapshot.skipped,
                snapshot.errors
            );
        }
    }

    Ok(())
}
