/// Seed orchestrator
/// Runs the entity phases in dependency order: users, comics, chapters.
/// Every collaborator is injected at construction.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

use crate::batch::BatchProcessor;
use crate::config::SeedConfig;
use crate::console;
use crate::error::SeedError;
use crate::images::ImageService;
use crate::loader::FileLoader;
use crate::password::PasswordHasher;
use crate::progress::ProgressSnapshot;
use crate::seeders::{self, ChapterSeeder, ComicSeeder, EntitySeeder, SeedContext, UserSeeder};
use crate::store::SeedStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Users,
    Comics,
    Chapters,
}

impl Phase {
    /// Dependency order
    pub const ALL: [Phase; 3] = [Phase::Users, Phase::Comics, Phase::Chapters];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Users => write!(f, "Users"),
            Phase::Comics => write!(f, "Comics"),
            Phase::Chapters => write!(f, "Chapters"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PhaseReport {
    pub phase: Phase,
    pub skipped: bool,
    pub loaded: usize,
    pub snapshot: Option<ProgressSnapshot>,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub phases: Vec<PhaseReport>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn phase(&self, phase: Phase) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| p.phase == phase)
    }

    /// Phases that actually ran
    pub fn executed(&self) -> impl Iterator<Item = &PhaseReport> {
        self.phases.iter().filter(|p| !p.skipped)
    }

    pub fn total_errors(&self) -> usize {
        self.phases
            .iter()
            .filter_map(|p| p.snapshot.as_ref())
            .map(|s| s.errors)
            .sum()
    }
}

pub struct SeedOrchestrator {
    config: SeedConfig,
    store: Arc<dyn SeedStore>,
    images: Arc<dyn ImageService>,
    hasher: Arc<dyn PasswordHasher>,
    loader: FileLoader,
}

impl SeedOrchestrator {
    pub fn new(
        config: SeedConfig,
        store: Arc<dyn SeedStore>,
        images: Arc<dyn ImageService>,
        hasher: Arc<dyn PasswordHasher>,
        loader: FileLoader,
    ) -> Self {
        SeedOrchestrator {
            config,
            store,
            images,
            hasher,
            loader,
        }
    }

    pub fn config(&self) -> &SeedConfig {
        &self.config
    }

    /// Run every enabled phase. Per-record failures are only counted; a
    /// connectivity, loader or configuration failure aborts the run.
    pub async fn run(&self) -> Result<RunReport, SeedError> {
        let started = Instant::now();
        match self.run_phases().await {
            Ok(phases) => {
                let report = RunReport {
                    phases,
                    elapsed: started.elapsed(),
                };
                info!(
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    errors = report.total_errors(),
                    "Seeding completed"
                );
                console::footer(
                    true,
                    &format!(
                        "Seeding completed in {:.2}s",
                        report.elapsed.as_secs_f64()
                    ),
                );
                Ok(report)
            }
            Err(e) => {
                let elapsed = started.elapsed();
                error!(error = %e, elapsed_ms = elapsed.as_millis() as u64, "Seeding failed");
                console::footer(
                    false,
                    &format!("Seeding failed after {:.2}s: {}", elapsed.as_secs_f64(), e),
                );
                Err(e)
            }
        }
    }

    async fn run_phases(&self) -> Result<Vec<PhaseReport>, SeedError> {
        self.store.ping().await.map_err(SeedError::Connectivity)?;
        info!("Store connectivity check passed");

        let options = &self.config.options;
        let processor = BatchProcessor::new(options.batch_size, options.image_download_concurrency)?;
        if options.dry_run {
            console::warn("Dry run: no changes will be written");
        }

        let ctx = Arc::new(SeedContext {
            store: self.store.clone(),
            images: self.images.clone(),
            hasher: self.hasher.clone(),
            options: options.clone(),
            default_password: self.config.default_password.clone(),
            password_cost: self.config.password_cost,
        });

        let mut reports = Vec::with_capacity(Phase::ALL.len());
        for phase in Phase::ALL {
            console::section(&phase.to_string());

            if !self.is_enabled(phase) {
                console::info(&format!("{} seeding disabled, skipping", phase));
                reports.push(PhaseReport {
                    phase,
                    skipped: true,
                    loaded: 0,
                    snapshot: None,
                });
                continue;
            }

            let records = self.loader.load(self.patterns(phase)).await?;
            let loaded = records.len();
            console::info(&format!("Loaded {} {} records", loaded, phase.to_string().to_lowercase()));

            let seeder: Box<dyn EntitySeeder> = match phase {
                Phase::Users => Box::new(UserSeeder::new(ctx.clone())),
                Phase::Comics => Box::new(ComicSeeder::new(ctx.clone())),
                Phase::Chapters => Box::new(ChapterSeeder::new(ctx.clone())),
            };
            let snapshot = seeders::seed(seeder.as_ref(), records, &processor).await;

            reports.push(PhaseReport {
                phase,
                skipped: false,
                loaded,
                snapshot: Some(snapshot),
            });
        }

        Ok(reports)
    }

    fn is_enabled(&self, phase: Phase) -> bool {
        let enabled = &self.config.enabled;
        match phase {
            Phase::Users => enabled.users,
            Phase::Comics => enabled.comics,
            Phase::Chapters => enabled.chapters,
        }
    }

    fn patterns(&self, phase: Phase) -> &[String] {
        let files = &self.config.files;
        match phase {
            Phase::Users => files.users.as_slice(),
            Phase::Comics => files.comics.as_slice(),
            Phase::Chapters => files.chapters.as_slice(),
        }
    }
}
