use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use shared::{ComicDraft, ComicFixture, ComicStatus, NameRef, ReferenceKind, Validatable};
use std::sync::Arc;
use tracing::debug;

use super::{EntitySeeder, Outcome, RecordError, SeedContext};

const COVER_FOLDER: &str = "comics";

/// Upserts comics keyed by slug, creating their authors, artists, types
/// and genres on the way
pub struct ComicSeeder {
    ctx: Arc<SeedContext>,
}

impl ComicSeeder {
    pub fn new(ctx: Arc<SeedContext>) -> Self {
        ComicSeeder { ctx }
    }

    /// Id of a named lookup row. Dry runs only look it up.
    async fn reference(
        &self,
        kind: ReferenceKind,
        name: Option<&NameRef>,
    ) -> Result<Option<i32>, RecordError> {
        let Some(name) = name else {
            return Ok(None);
        };
        let store = &self.ctx.store;
        let id = if self.ctx.options.dry_run {
            store.find_reference(kind, name.name()).await?
        } else {
            Some(store.get_or_create_reference(kind, name.name()).await?)
        };
        Ok(id)
    }

    async fn genre_ids(&self, genres: &[NameRef]) -> Result<Vec<i32>, RecordError> {
        let mut ids = Vec::with_capacity(genres.len());
        for genre in genres {
            if let Some(id) = self.reference(ReferenceKind::Genre, Some(genre)).await? {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}

#[async_trait]
impl EntitySeeder for ComicSeeder {
    fn name(&self) -> &'static str {
        "Comics"
    }

    async fn process_record(&self, record: Value) -> Result<Outcome, RecordError> {
        let mut fixture: ComicFixture = serde_json::from_value(record)?;
        fixture.sanitize_and_validate()?;

        let slug = fixture.effective_slug();
        let store = &self.ctx.store;
        let existing = store.find_comic_by_slug(&slug).await?;

        let now = Utc::now();
        let status = fixture
            .status
            .as_deref()
            .and_then(|s| s.parse::<ComicStatus>().ok());
        let author_id = self.reference(ReferenceKind::Author, fixture.author.as_ref()).await?;
        let artist_id = self.reference(ReferenceKind::Artist, fixture.artist.as_ref()).await?;
        let type_id = self
            .reference(ReferenceKind::ComicType, fixture.comic_type.as_ref())
            .await?;
        let genre_ids = self.genre_ids(&fixture.genres).await?;
        let cover_image = self
            .ctx
            .process_image(fixture.cover_image.as_deref(), COVER_FOLDER)
            .await;

        let outcome = match existing {
            Some(existing) => {
                let draft = ComicDraft {
                    title: fixture.title.clone(),
                    slug: existing.slug.clone(),
                    description: fixture
                        .description
                        .clone()
                        .unwrap_or_else(|| existing.description.clone()),
                    cover_image: cover_image
                        .or(existing.cover_image.clone())
                        .or(fixture.cover_image.clone()),
                    status: status.unwrap_or(existing.status),
                    publication_date: fixture.publication_date.or(existing.publication_date),
                    rating: fixture.rating.or(existing.rating),
                    views: fixture.views.unwrap_or(existing.views),
                    author_id: author_id.or(existing.author_id),
                    artist_id: artist_id.or(existing.artist_id),
                    type_id: type_id.or(existing.type_id),
                    created_at: existing.created_at,
                    updated_at: fixture.updated_at.unwrap_or(now),
                };
                if !self.ctx.options.dry_run {
                    store.update_comic(existing.id, &draft).await?;
                    // an update without genres keeps the existing links
                    if !fixture.genres.is_empty() {
                        store.set_comic_genres(existing.id, &genre_ids).await?;
                    }
                }
                debug!(slug = %slug, genres = genre_ids.len(), "Comic updated");
                Outcome::Updated(slug)
            }
            None => {
                let draft = ComicDraft {
                    title: fixture.title.clone(),
                    slug: slug.clone(),
                    description: fixture.description.clone().unwrap_or_default(),
                    cover_image: cover_image.or(fixture.cover_image.clone()),
                    status: status.unwrap_or_default(),
                    publication_date: fixture.publication_date,
                    rating: fixture.rating,
                    views: fixture.views.unwrap_or(0),
                    author_id,
                    artist_id,
                    type_id,
                    created_at: fixture.created_at.unwrap_or(now),
                    updated_at: fixture.updated_at.unwrap_or(now),
                };
                if !self.ctx.options.dry_run {
                    let comic = store.insert_comic(&draft).await?;
                    store.set_comic_genres(comic.id, &genre_ids).await?;
                }
                debug!(slug = %slug, genres = genre_ids.len(), "Comic created");
                Outcome::Created(slug)
            }
        };

        Ok(self.ctx.finish(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeedOptions;
    use crate::images::ImageService;
    use crate::password::{PasswordError, PasswordHasher};
    use crate::store::MemoryStore;
    use serde_json::json;

    struct NoHasher;

    #[async_trait]
    impl PasswordHasher for NoHasher {
        async fn hash(&self, _plaintext: &str, _cost: u32) -> Result<String, PasswordError> {
            Err(PasswordError::HashFailed("not used".to_string()))
        }
    }

    /// Pretends every external image was stored under /uploads
    struct FakeUploads;

    #[async_trait]
    impl ImageService for FakeUploads {
        async fn process_image_url(&self, url: &str, folder: &str) -> Option<String> {
            let name = url.rsplit('/').next()?;
            Some(format!("/uploads/{}/{}", folder, name))
        }
    }

    fn seeder(store: Arc<MemoryStore>, options: SeedOptions) -> ComicSeeder {
        ComicSeeder::new(Arc::new(SeedContext {
            store,
            images: Arc::new(FakeUploads),
            hasher: Arc::new(NoHasher),
            options,
            default_password: None,
            password_cost: 1,
        }))
    }

    fn one_piece() -> Value {
        json!({
            "title": "One Piece",
            "description": "<p>Pirates</p>",
            "coverImage": "https://cdn.example.com/covers/op.jpg",
            "status": "Ongoing",
            "rating": "9.1",
            "author": {"name": "Eiichiro Oda"},
            "artist": "Eiichiro Oda",
            "type": "Manga",
            "genres": ["Action", {"name": "Adventure"}, "action"]
        })
    }

    #[tokio::test]
    async fn test_create_resolves_references() {
        let store = Arc::new(MemoryStore::new());
        let seeder = seeder(store.clone(), SeedOptions::default());

        let outcome = seeder.process_record(one_piece()).await.unwrap();
        assert_eq!(outcome, Outcome::Created("one-piece".to_string()));

        let comics = store.comics();
        assert_eq!(comics.len(), 1);
        let comic = &comics[0];
        assert_eq!(comic.description, "Pirates");
        assert_eq!(comic.cover_image.as_deref(), Some("/uploads/comics/op.jpg"));
        assert_eq!(comic.rating, Some(9.1));
        assert_eq!(comic.status, ComicStatus::Ongoing);
        // author and artist are separate lookup tables
        assert!(comic.author_id.is_some());
        assert!(comic.artist_id.is_some());
        assert_ne!(comic.author_id, comic.artist_id);
        assert_eq!(store.reference_names(ReferenceKind::Genre), vec!["Action", "Adventure"]);
        assert_eq!(store.comic_genre_ids(comic.id).len(), 2);
    }

    #[tokio::test]
    async fn test_second_pass_updates() {
        let store = Arc::new(MemoryStore::new());
        let seeder = seeder(store.clone(), SeedOptions::default());
        seeder.process_record(one_piece()).await.unwrap();

        let outcome = seeder
            .process_record(json!({"title": "One Piece", "status": "completed", "views": 10}))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Updated("one-piece".to_string()));

        let comic = &store.comics()[0];
        assert_eq!(comic.status, ComicStatus::Completed);
        assert_eq!(comic.views, 10);
        assert_eq!(comic.description, "Pirates");
        assert_eq!(comic.cover_image.as_deref(), Some("/uploads/comics/op.jpg"));
        assert_eq!(store.comic_genre_ids(comic.id).len(), 2);
    }

    #[tokio::test]
    async fn test_skip_images_keeps_source_url() {
        let store = Arc::new(MemoryStore::new());
        let options = SeedOptions {
            skip_image_download: true,
            ..SeedOptions::default()
        };
        let seeder = seeder(store.clone(), options);
        seeder.process_record(one_piece()).await.unwrap();
        assert_eq!(
            store.comics()[0].cover_image.as_deref(),
            Some("https://cdn.example.com/covers/op.jpg")
        );
    }

    #[tokio::test]
    async fn test_dry_run_creates_no_references() {
        let store = Arc::new(MemoryStore::new());
        let options = SeedOptions {
            dry_run: true,
            ..SeedOptions::default()
        };
        let seeder = seeder(store.clone(), options);
        let outcome = seeder.process_record(one_piece()).await.unwrap();
        assert_eq!(outcome, Outcome::Created("one-piece (dry run)".to_string()));
        assert!(store.comics().is_empty());
        assert!(store.reference_names(ReferenceKind::Genre).is_empty());
    }

    #[tokio::test]
    async fn test_bad_rating_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let seeder = seeder(store.clone(), SeedOptions::default());
        let err = seeder
            .process_record(json!({"title": "Broken", "rating": 42}))
            .await
            .unwrap_err();
        assert!(matches!(err, RecordError::Validation(_)));
        assert!(store.comics().is_empty());
    }
}
