use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use shared::validation::fixtures::default_chapter_slug;
use shared::validation::sanitizers::slugify;
use shared::{ChapterDraft, ChapterFixture, Comic, Validatable};
use std::sync::Arc;
use tracing::debug;

use super::{EntitySeeder, Outcome, RecordError, SeedContext};

/// Upserts chapters keyed by (comic, chapter number) and replaces their pages
pub struct ChapterSeeder {
    ctx: Arc<SeedContext>,
}

impl ChapterSeeder {
    pub fn new(ctx: Arc<SeedContext>) -> Self {
        ChapterSeeder { ctx }
    }

    /// Parent comic by slug, falling back to the slugified title
    async fn find_comic(&self, fixture: &ChapterFixture) -> Result<Option<Comic>, RecordError> {
        let (slug, title) = fixture.comic_keys();
        let store = &self.ctx.store;

        if let Some(slug) = slug {
            if let Some(comic) = store.find_comic_by_slug(&slug.to_lowercase()).await? {
                return Ok(Some(comic));
            }
        }
        if let Some(title) = title {
            let slug = slugify(&title);
            if !slug.is_empty() {
                return Ok(store.find_comic_by_slug(&slug).await?);
            }
        }
        Ok(None)
    }

    /// Page URLs in order. Images are processed one at a time; a page that
    /// cannot be materialised keeps its source URL.
    async fn page_urls(&self, fixture: &ChapterFixture, comic_slug: &str) -> Vec<String> {
        let folder = format!("chapters/{}", comic_slug);
        let mut urls = Vec::with_capacity(fixture.images.len());
        for image in &fixture.images {
            let source = image.url();
            let processed = self.ctx.process_image(Some(source), &folder).await;
            urls.push(processed.unwrap_or_else(|| source.to_string()));
        }
        urls
    }
}

#[async_trait]
impl EntitySeeder for ChapterSeeder {
    fn name(&self) -> &'static str {
        "Chapters"
    }

    async fn process_record(&self, record: Value) -> Result<Outcome, RecordError> {
        let mut fixture: ChapterFixture = serde_json::from_value(record)?;
        fixture.sanitize_and_validate()?;

        let Some(comic) = self.find_comic(&fixture).await? else {
            let (slug, title) = fixture.comic_keys();
            let key = slug.or(title).unwrap_or_default();
            return Ok(Outcome::Skipped(format!("comic '{}' not found", key)));
        };

        // validation guarantees a whole, non-negative number
        let chapter_number = fixture.resolved_number().unwrap_or_default() as i32;
        let label = format!("{} #{}", comic.slug, chapter_number);

        let store = &self.ctx.store;
        let existing = store.find_chapter(comic.id, chapter_number).await?;

        let now = Utc::now();
        let pages = self.page_urls(&fixture, &comic.slug).await;

        let outcome = match existing {
            Some(existing) => {
                let draft = ChapterDraft {
                    comic_id: comic.id,
                    chapter_number,
                    title: fixture
                        .title
                        .clone()
                        .or_else(|| fixture.name.clone())
                        .unwrap_or_else(|| existing.title.clone()),
                    slug: fixture.slug.clone().unwrap_or_else(|| existing.slug.clone()),
                    release_date: fixture.release_date.or(existing.release_date),
                    views: fixture.views.unwrap_or(existing.views),
                    created_at: existing.created_at,
                    updated_at: fixture.updated_at.unwrap_or(now),
                };
                if !self.ctx.options.dry_run {
                    store.update_chapter(existing.id, &draft).await?;
                    // an update without images keeps the existing pages
                    if !pages.is_empty() {
                        store.replace_chapter_images(existing.id, &pages).await?;
                    }
                }
                debug!(chapter = %label, pages = pages.len(), "Chapter updated");
                Outcome::Updated(label)
            }
            None => {
                let draft = ChapterDraft {
                    comic_id: comic.id,
                    chapter_number,
                    title: fixture.display_title(chapter_number),
                    slug: fixture
                        .slug
                        .clone()
                        .unwrap_or_else(|| default_chapter_slug(&comic.slug, chapter_number)),
                    release_date: fixture.release_date,
                    views: fixture.views.unwrap_or(0),
                    created_at: fixture.created_at.unwrap_or(now),
                    updated_at: fixture.updated_at.unwrap_or(now),
                };
                if !self.ctx.options.dry_run {
                    let chapter = store.insert_chapter(&draft).await?;
                    if !pages.is_empty() {
                        store.replace_chapter_images(chapter.id, &pages).await?;
                    }
                }
                debug!(chapter = %label, pages = pages.len(), "Chapter created");
                Outcome::Created(label)
            }
        };

        Ok(self.ctx.finish(outcome))
    }
}
