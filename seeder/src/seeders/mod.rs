/// Entity seeders
/// Each seeder turns one fixture record into a create, update or skip against
/// the store. [`seed`] drives a seeder over a whole record list through the
/// batch processor and tracks the outcomes.

pub mod chapters;
pub mod comics;
pub mod users;

use async_trait::async_trait;
use serde_json::Value;
use shared::ValidationError;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::batch::BatchProcessor;
use crate::config::SeedOptions;
use crate::images::ImageService;
use crate::password::{PasswordError, PasswordHasher};
use crate::progress::{ProgressSnapshot, ProgressTracker};
use crate::store::{SeedStore, StoreError};

pub use chapters::ChapterSeeder;
pub use comics::ComicSeeder;
pub use users::UserSeeder;

const DRY_RUN_NOTE: &str = "(dry run)";

/// Failure of a single record; counted and logged, never fatal
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Invalid fixture: {0}")]
    InvalidFixture(#[from] serde_json::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// Successful terminal outcome of a record, with a short description
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created(String),
    Updated(String),
    Skipped(String),
}

impl Outcome {
    /// Tag the message of an outcome that was not written
    fn dry_run(self) -> Self {
        match self {
            Outcome::Created(m) => Outcome::Created(format!("{} {}", m, DRY_RUN_NOTE)),
            Outcome::Updated(m) => Outcome::Updated(format!("{} {}", m, DRY_RUN_NOTE)),
            Outcome::Skipped(m) => Outcome::Skipped(m),
        }
    }
}

/// Collaborators and settings shared by every seeder of a run
pub struct SeedContext {
    pub store: Arc<dyn SeedStore>,
    pub images: Arc<dyn ImageService>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub options: SeedOptions,
    pub default_password: Option<String>,
    pub password_cost: u32,
}

impl SeedContext {
    /// Whether image URLs should go through the image service
    pub fn materialise_images(&self) -> bool {
        !self.options.skip_image_download && !self.options.dry_run
    }

    /// Run `url` through the image service unless images are skipped
    pub async fn process_image(&self, url: Option<&str>, folder: &str) -> Option<String> {
        let url = url?;
        if !self.materialise_images() {
            return None;
        }
        self.images.process_image_url(url, folder).await
    }

    fn finish(&self, outcome: Outcome) -> Outcome {
        if self.options.dry_run {
            outcome.dry_run()
        } else {
            outcome
        }
    }
}

#[async_trait]
pub trait EntitySeeder: Send + Sync {
    /// Label used in progress lines and summaries
    fn name(&self) -> &'static str;

    async fn process_record(&self, record: Value) -> Result<Outcome, RecordError>;
}

/// Seed every record, returning the final progress counters.
/// Each record ends in exactly one outcome, panics included.
pub async fn seed<S>(seeder: &S, records: Vec<Value>, processor: &BatchProcessor) -> ProgressSnapshot
where
    S: EntitySeeder + ?Sized,
{
    let tracker = ProgressTracker::new(seeder.name(), records.len());
    let tracker_ref = &tracker;

    let summary = processor
        .process(records, move |record| async move {
            match seeder.process_record(record).await {
                Ok(Outcome::Created(message)) => {
                    tracker_ref.created(Some(&message));
                    Ok(())
                }
                Ok(Outcome::Updated(message)) => {
                    tracker_ref.updated(Some(&message));
                    Ok(())
                }
                Ok(Outcome::Skipped(message)) => {
                    tracker_ref.skipped(Some(&message));
                    Ok(())
                }
                Err(e) => {
                    tracker_ref.error(Some(&e.to_string()));
                    Err(e)
                }
            }
        })
        .await;

    for _ in 0..summary.panicked {
        tracker.error(Some("record handler panicked"));
    }

    debug!(
        entity = seeder.name(),
        chunks = summary.chunks,
        failed = summary.failed,
        panicked = summary.panicked,
        "Seeding pass finished"
    );

    tracker.complete()
}
