use thiserror::Error;

use crate::batch::BatchError;
use crate::config::ConfigError;
use crate::loader::LoaderError;
use crate::store::StoreError;

/// Errors that abort a seeding run. Per-record failures never end up here.
#[derive(Error, Debug)]
pub enum SeedError {
    #[error("Database connectivity check failed: {0}")]
    Connectivity(#[source] StoreError),
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error("Invalid batch configuration: {0}")]
    Batch(#[from] BatchError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
