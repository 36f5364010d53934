/// Backing store abstraction
/// The seeders only talk to the database through [`SeedStore`], so a run can
/// target Postgres or the in-process [`MemoryStore`].

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use shared::{Chapter, ChapterDraft, Comic, ComicDraft, ReferenceKind, User, UserDraft};
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    SqlError(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Duplicate {entity}: {key}")]
    Duplicate { entity: &'static str, key: String },
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::SqlError(e.to_string())
    }
}

/// Data access needed by the seeding pipeline
#[async_trait]
pub trait SeedStore: Send + Sync {
    /// Trivial round trip used as the pre-flight connectivity probe
    async fn ping(&self) -> Result<(), StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn insert_user(&self, id: Uuid, user: &UserDraft) -> Result<User, StoreError>;
    async fn update_user(&self, id: Uuid, user: &UserDraft) -> Result<User, StoreError>;

    /// Id of the named row in a lookup table, if present
    async fn find_reference(&self, kind: ReferenceKind, name: &str)
        -> Result<Option<i32>, StoreError>;
    /// Id of the named row in a lookup table, inserting it when missing
    async fn get_or_create_reference(&self, kind: ReferenceKind, name: &str)
        -> Result<i32, StoreError>;

    async fn find_comic_by_slug(&self, slug: &str) -> Result<Option<Comic>, StoreError>;
    async fn insert_comic(&self, comic: &ComicDraft) -> Result<Comic, StoreError>;
    async fn update_comic(&self, id: i32, comic: &ComicDraft) -> Result<Comic, StoreError>;
    /// Replace the genre links of a comic
    async fn set_comic_genres(&self, comic_id: i32, genre_ids: &[i32]) -> Result<(), StoreError>;

    async fn find_chapter(&self, comic_id: i32, chapter_number: i32)
        -> Result<Option<Chapter>, StoreError>;
    async fn insert_chapter(&self, chapter: &ChapterDraft) -> Result<Chapter, StoreError>;
    async fn update_chapter(&self, id: i32, chapter: &ChapterDraft) -> Result<Chapter, StoreError>;
    /// Replace the page images of a chapter; page numbers follow slice order
    async fn replace_chapter_images(&self, chapter_id: i32, image_urls: &[String])
        -> Result<(), StoreError>;
}
