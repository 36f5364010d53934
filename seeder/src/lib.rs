//! ComicWise fixture seeder
//! Loads JSON fixture files and upserts users, comics and chapters into the
//! database in dependency order, in bounded-concurrency batches.

pub mod batch;
pub mod config;
pub mod console;
pub mod error;
pub mod images;
pub mod loader;
pub mod orchestrator;
pub mod password;
pub mod progress;
pub mod seeders;
pub mod store;

pub use batch::{BatchError, BatchProcessor, BatchSummary};
pub use config::{Args, SeedConfig, SeedOptions};
pub use error::SeedError;
pub use orchestrator::{Phase, PhaseReport, RunReport, SeedOrchestrator};
pub use progress::{ProgressSnapshot, ProgressTracker};
