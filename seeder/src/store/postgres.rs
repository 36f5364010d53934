/// Postgres-backed store
/// Plain runtime-checked sqlx queries against the ComicWise schema

use async_trait::async_trait;
use shared::{Chapter, ChapterDraft, Comic, ComicDraft, ReferenceKind, User, UserDraft};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::{SeedStore, StoreError};

const USER_COLUMNS: &str =
    "id, name, email, email_verified, image, password, role, created_at, updated_at";

const COMIC_COLUMNS: &str = "id, title, slug, description, cover_image, status, publication_date, \
     rating, views, author_id, artist_id, type_id, created_at, updated_at";

const CHAPTER_COLUMNS: &str =
    "id, comic_id, chapter_number, title, slug, release_date, views, created_at, updated_at";

/// Store over a shared Postgres connection pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    /// Open a pool sized for `max_connections` concurrent record handlers
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        info!(max_connections = max_connections, "Database pool ready");
        Ok(PgStore { pool })
    }

    /// Apply the bundled schema migrations
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::SqlError(format!("migration failed: {}", e)))?;
        info!("Database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a failed INSERT, surfacing unique violations as duplicates
fn insert_error(e: sqlx::Error, entity: &'static str, key: &str) -> StoreError {
    if let sqlx::Error::Database(ref db) = e {
        if db.is_unique_violation() {
            return StoreError::Duplicate {
                entity,
                key: key.to_string(),
            };
        }
    }
    error!("Failed to insert {} {}: {}", entity, key, e);
    StoreError::SqlError(e.to_string())
}

fn update_error(e: sqlx::Error, entity: &'static str, key: &str) -> StoreError {
    match e {
        sqlx::Error::RowNotFound => StoreError::NotFound {
            entity,
            key: key.to_string(),
        },
        other => {
            error!("Failed to update {} {}: {}", entity, key, other);
            StoreError::SqlError(other.to_string())
        }
    }
}

#[async_trait]
impl SeedStore for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let query = format!(
            r#"SELECT {} FROM "user" WHERE email = $1 LIMIT 1"#,
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn insert_user(&self, id: Uuid, user: &UserDraft) -> Result<User, StoreError> {
        let query = format!(
            r#"
            INSERT INTO "user" (
                id, name, email, email_verified, image, password, role, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let created = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(user.email_verified)
            .bind(&user.image)
            .bind(&user.password)
            .bind(user.role)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| insert_error(e, "user", &user.email))?;

        debug!("Created user: {} ({})", created.email, created.id);
        Ok(created)
    }

    async fn update_user(&self, id: Uuid, user: &UserDraft) -> Result<User, StoreError> {
        let query = format!(
            r#"
            UPDATE "user"
            SET name = $2, email_verified = $3, image = $4, password = $5,
                role = $6, updated_at = $7
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let updated = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&user.name)
            .bind(user.email_verified)
            .bind(&user.image)
            .bind(&user.password)
            .bind(user.role)
            .bind(user.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| update_error(e, "user", &user.email))?;

        debug!("Updated user: {} ({})", updated.email, updated.id);
        Ok(updated)
    }

    async fn find_reference(
        &self,
        kind: ReferenceKind,
        name: &str,
    ) -> Result<Option<i32>, StoreError> {
        let query = format!(r#"SELECT id FROM "{}" WHERE name = $1 LIMIT 1"#, kind.table());
        let id = sqlx::query_scalar::<_, i32>(&query)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    async fn get_or_create_reference(
        &self,
        kind: ReferenceKind,
        name: &str,
    ) -> Result<i32, StoreError> {
        // DO UPDATE so RETURNING also yields the id of an existing row
        let query = format!(
            r#"
            INSERT INTO "{}" (name, created_at)
            VALUES ($1, NOW())
            ON CONFLICT (name) DO UPDATE
            SET name = EXCLUDED.name
            RETURNING id
            "#,
            kind.table()
        );
        let id = sqlx::query_scalar::<_, i32>(&query)
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to get or create {} {}: {}", kind, name, e);
                StoreError::SqlError(e.to_string())
            })?;

        debug!("Resolved {} '{}' to id {}", kind, name, id);
        Ok(id)
    }

    async fn find_comic_by_slug(&self, slug: &str) -> Result<Option<Comic>, StoreError> {
        let query = format!("SELECT {} FROM comic WHERE slug = $1 LIMIT 1", COMIC_COLUMNS);
        let comic = sqlx::query_as::<_, Comic>(&query)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(comic)
    }

    async fn insert_comic(&self, comic: &ComicDraft) -> Result<Comic, StoreError> {
        let query = format!(
            r#"
            INSERT INTO comic (
                title, slug, description, cover_image, status, publication_date,
                rating, views, author_id, artist_id, type_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            COMIC_COLUMNS
        );
        let created = sqlx::query_as::<_, Comic>(&query)
            .bind(&comic.title)
            .bind(&comic.slug)
            .bind(&comic.description)
            .bind(&comic.cover_image)
            .bind(comic.status)
            .bind(comic.publication_date)
            .bind(comic.rating)
            .bind(comic.views)
            .bind(comic.author_id)
            .bind(comic.artist_id)
            .bind(comic.type_id)
            .bind(comic.created_at)
            .bind(comic.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| insert_error(e, "comic", &comic.slug))?;

        debug!("Created comic: {} ({})", created.slug, created.id);
        Ok(created)
    }

    async fn update_comic(&self, id: i32, comic: &ComicDraft) -> Result<Comic, StoreError> {
        let query = format!(
            r#"
            UPDATE comic
            SET title = $2, description = $3, cover_image = $4, status = $5,
                publication_date = $6, rating = $7, views = $8, author_id = $9,
                artist_id = $10, type_id = $11, updated_at = $12
            WHERE id = $1
            RETURNING {}
            "#,
            COMIC_COLUMNS
        );
        let updated = sqlx::query_as::<_, Comic>(&query)
            .bind(id)
            .bind(&comic.title)
            .bind(&comic.description)
            .bind(&comic.cover_image)
            .bind(comic.status)
            .bind(comic.publication_date)
            .bind(comic.rating)
            .bind(comic.views)
            .bind(comic.author_id)
            .bind(comic.artist_id)
            .bind(comic.type_id)
            .bind(comic.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| update_error(e, "comic", &comic.slug))?;

        debug!("Updated comic: {} ({})", updated.slug, updated.id);
        Ok(updated)
    }

    async fn set_comic_genres(&self, comic_id: i32, genre_ids: &[i32]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM comic_to_genre WHERE comic_id = $1")
            .bind(comic_id)
            .execute(&mut *tx)
            .await?;

        for genre_id in genre_ids {
            sqlx::query(
                r#"
                INSERT INTO comic_to_genre (comic_id, genre_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(comic_id)
            .bind(genre_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!("Linked {} genres to comic {}", genre_ids.len(), comic_id);
        Ok(())
    }

    async fn find_chapter(
        &self,
        comic_id: i32,
        chapter_number: i32,
    ) -> Result<Option<Chapter>, StoreError> {
        let query = format!(
            "SELECT {} FROM chapter WHERE comic_id = $1 AND chapter_number = $2 LIMIT 1",
            CHAPTER_COLUMNS
        );
        let chapter = sqlx::query_as::<_, Chapter>(&query)
            .bind(comic_id)
            .bind(chapter_number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(chapter)
    }

    async fn insert_chapter(&self, chapter: &ChapterDraft) -> Result<Chapter, StoreError> {
        let query = format!(
            r#"
            INSERT INTO chapter (
                comic_id, chapter_number, title, slug, release_date, views, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            CHAPTER_COLUMNS
        );
        let created = sqlx::query_as::<_, Chapter>(&query)
            .bind(chapter.comic_id)
            .bind(chapter.chapter_number)
            .bind(&chapter.title)
            .bind(&chapter.slug)
            .bind(chapter.release_date)
            .bind(chapter.views)
            .bind(chapter.created_at)
            .bind(chapter.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| insert_error(e, "chapter", &chapter.slug))?;

        debug!("Created chapter: {} ({})", created.slug, created.id);
        Ok(created)
    }

    async fn update_chapter(&self, id: i32, chapter: &ChapterDraft) -> Result<Chapter, StoreError> {
        let query = format!(
            r#"
            UPDATE chapter
            SET title = $2, slug = $3, release_date = $4, views = $5, updated_at = $6
            WHERE id = $1
            RETURNING {}
            "#,
            CHAPTER_COLUMNS
        );
        let updated = sqlx::query_as::<_, Chapter>(&query)
            .bind(id)
            .bind(&chapter.title)
            .bind(&chapter.slug)
            .bind(chapter.release_date)
            .bind(chapter.views)
            .bind(chapter.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| update_error(e, "chapter", &chapter.slug))?;

        debug!("Updated chapter: {} ({})", updated.slug, updated.id);
        Ok(updated)
    }

    async fn replace_chapter_images(
        &self,
        chapter_id: i32,
        image_urls: &[String],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chapter_image WHERE chapter_id = $1")
            .bind(chapter_id)
            .execute(&mut *tx)
            .await?;

        for (index, url) in image_urls.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO chapter_image (chapter_id, page_number, image_url)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(chapter_id)
            .bind(index as i32 + 1)
            .bind(url)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!("Stored {} images for chapter {}", image_urls.len(), chapter_id);
        Ok(())
    }
}
