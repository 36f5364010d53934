/// In-process store
/// Mirrors the Postgres schema's keys and unique constraints in memory. Backs
/// `--in-memory` runs (fixture checks without a database) and the test suite.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use shared::{Chapter, ChapterDraft, Comic, ComicDraft, Reference, ReferenceKind, User, UserDraft};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use super::{SeedStore, StoreError};

#[derive(Debug, Default)]
struct MemoryState {
    users: Vec<User>,
    references: HashMap<ReferenceKind, Vec<Reference>>,
    comics: Vec<Comic>,
    comic_genres: HashMap<i32, Vec<i32>>,
    chapters: Vec<Chapter>,
    chapter_images: HashMap<i32, Vec<String>>,
    next_id: i32,
}

impl MemoryState {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `ping` fail, as an unreachable database would
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn users(&self) -> Vec<User> {
        self.state.lock().users.clone()
    }

    pub fn comics(&self) -> Vec<Comic> {
        self.state.lock().comics.clone()
    }

    pub fn chapters(&self) -> Vec<Chapter> {
        self.state.lock().chapters.clone()
    }

    /// Names stored in one lookup table, in insertion order
    pub fn reference_names(&self, kind: ReferenceKind) -> Vec<String> {
        self.state
            .lock()
            .references
            .get(&kind)
            .map(|rows| rows.iter().map(|r| r.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn comic_genre_ids(&self, comic_id: i32) -> Vec<i32> {
        self.state
            .lock()
            .comic_genres
            .get(&comic_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn chapter_images(&self, chapter_id: i32) -> Vec<String> {
        self.state
            .lock()
            .chapter_images
            .get(&chapter_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl SeedStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let state = self.state.lock();
        Ok(state.users.iter().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, id: Uuid, user: &UserDraft) -> Result<User, StoreError> {
        let mut state = self.state.lock();
        if state.users.iter().any(|u| u.email == user.email || u.id == id) {
            return Err(StoreError::Duplicate {
                entity: "user",
                key: user.email.clone(),
            });
        }
        let created = User {
            id,
            name: user.name.clone(),
            email: user.email.clone(),
            email_verified: user.email_verified,
            image: user.image.clone(),
            password: user.password.clone(),
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        };
        state.users.push(created.clone());
        Ok(created)
    }

    async fn update_user(&self, id: Uuid, user: &UserDraft) -> Result<User, StoreError> {
        let mut state = self.state.lock();
        let existing = state
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "user",
                key: user.email.clone(),
            })?;
        existing.name = user.name.clone();
        existing.email_verified = user.email_verified;
        existing.image = user.image.clone();
        existing.password = user.password.clone();
        existing.role = user.role;
        existing.updated_at = user.updated_at;
        Ok(existing.clone())
    }

    async fn find_reference(
        &self,
        kind: ReferenceKind,
        name: &str,
    ) -> Result<Option<i32>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .references
            .get(&kind)
            .and_then(|rows| rows.iter().find(|r| r.name == name))
            .map(|r| r.id))
    }

    async fn get_or_create_reference(
        &self,
        kind: ReferenceKind,
        name: &str,
    ) -> Result<i32, StoreError> {
        let mut state = self.state.lock();
        if let Some(id) = state
            .references
            .get(&kind)
            .and_then(|rows| rows.iter().find(|r| r.name == name))
            .map(|r| r.id)
        {
            return Ok(id);
        }
        let id = state.next_id();
        state.references.entry(kind).or_default().push(Reference {
            id,
            name: name.to_string(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn find_comic_by_slug(&self, slug: &str) -> Result<Option<Comic>, StoreError> {
        let state = self.state.lock();
        Ok(state.comics.iter().find(|c| c.slug == slug).cloned())
    }

    async fn insert_comic(&self, comic: &ComicDraft) -> Result<Comic, StoreError> {
        let mut state = self.state.lock();
        if state.comics.iter().any(|c| c.slug == comic.slug) {
            return Err(StoreError::Duplicate {
                entity: "comic",
                key: comic.slug.clone(),
            });
        }
        let id = state.next_id();
        let created = Comic {
            id,
            title: comic.title.clone(),
            slug: comic.slug.clone(),
            description: comic.description.clone(),
            cover_image: comic.cover_image.clone(),
            status: comic.status,
            publication_date: comic.publication_date,
            rating: comic.rating,
            views: comic.views,
            author_id: comic.author_id,
            artist_id: comic.artist_id,
            type_id: comic.type_id,
            created_at: comic.created_at,
            updated_at: comic.updated_at,
        };
        state.comics.push(created.clone());
        Ok(created)
    }

    async fn update_comic(&self, id: i32, comic: &ComicDraft) -> Result<Comic, StoreError> {
        let mut state = self.state.lock();
        let existing = state
            .comics
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "comic",
                key: comic.slug.clone(),
            })?;
        existing.title = comic.title.clone();
        existing.description = comic.description.clone();
        existing.cover_image = comic.cover_image.clone();
        existing.status = comic.status;
        existing.publication_date = comic.publication_date;
        existing.rating = comic.rating;
        existing.views = comic.views;
        existing.author_id = comic.author_id;
        existing.artist_id = comic.artist_id;
        existing.type_id = comic.type_id;
        existing.updated_at = comic.updated_at;
        Ok(existing.clone())
    }

    async fn set_comic_genres(&self, comic_id: i32, genre_ids: &[i32]) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let mut ids: Vec<i32> = Vec::with_capacity(genre_ids.len());
        for id in genre_ids {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        state.comic_genres.insert(comic_id, ids);
        Ok(())
    }

    async fn find_chapter(
        &self,
        comic_id: i32,
        chapter_number: i32,
    ) -> Result<Option<Chapter>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .chapters
            .iter()
            .find(|c| c.comic_id == comic_id && c.chapter_number == chapter_number)
            .cloned())
    }

    async fn insert_chapter(&self, chapter: &ChapterDraft) -> Result<Chapter, StoreError> {
        let mut state = self.state.lock();
        let conflict = state.chapters.iter().any(|c| {
            c.slug == chapter.slug
                || (c.comic_id == chapter.comic_id && c.chapter_number == chapter.chapter_number)
        });
        if conflict {
            return Err(StoreError::Duplicate {
                entity: "chapter",
                key: chapter.slug.clone(),
            });
        }
        let id = state.next_id();
        let created = Chapter {
            id,
            comic_id: chapter.comic_id,
            chapter_number: chapter.chapter_number,
            title: chapter.title.clone(),
            slug: chapter.slug.clone(),
            release_date: chapter.release_date,
            views: chapter.views,
            created_at: chapter.created_at,
            updated_at: chapter.updated_at,
        };
        state.chapters.push(created.clone());
        Ok(created)
    }

    async fn update_chapter(&self, id: i32, chapter: &ChapterDraft) -> Result<Chapter, StoreError> {
        let mut state = self.state.lock();
        if state
            .chapters
            .iter()
            .any(|c| c.id != id && c.slug == chapter.slug)
        {
            return Err(StoreError::Duplicate {
                entity: "chapter",
                key: chapter.slug.clone(),
            });
        }
        let existing = state
            .chapters
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "chapter",
                key: chapter.slug.clone(),
            })?;
        existing.title = chapter.title.clone();
        existing.slug = chapter.slug.clone();
        existing.release_date = chapter.release_date;
        existing.views = chapter.views;
        existing.updated_at = chapter.updated_at;
        Ok(existing.clone())
    }

    async fn replace_chapter_images(
        &self,
        chapter_id: i32,
        image_urls: &[String],
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.chapter_images.insert(chapter_id, image_urls.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{ComicStatus, UserRole};

    fn draft(email: &str) -> UserDraft {
        let now = Utc::now();
        UserDraft {
            name: "Test".to_string(),
            email: email.to_string(),
            email_verified: None,
            image: None,
            password: None,
            role: UserRole::User,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_user_email_is_unique() {
        let store = MemoryStore::new();
        store.insert_user(Uuid::new_v4(), &draft("a@x.com")).await.unwrap();
        let err = store
            .insert_user(Uuid::new_v4(), &draft("a@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { entity: "user", .. }));
    }

    #[tokio::test]
    async fn test_reference_get_or_create_is_stable() {
        let store = MemoryStore::new();
        let first = store
            .get_or_create_reference(ReferenceKind::Genre, "Action")
            .await
            .unwrap();
        let second = store
            .get_or_create_reference(ReferenceKind::Genre, "Action")
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(
            store.find_reference(ReferenceKind::Author, "Action").await.unwrap(),
            None
        );
        assert_eq!(store.reference_names(ReferenceKind::Genre), vec!["Action"]);
    }

    #[tokio::test]
    async fn test_comic_update_keeps_slug() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut comic = ComicDraft {
            title: "One".to_string(),
            slug: "one".to_string(),
            description: String::new(),
            cover_image: None,
            status: ComicStatus::Ongoing,
            publication_date: None,
            rating: None,
            views: 0,
            author_id: None,
            artist_id: None,
            type_id: None,
            created_at: now,
            updated_at: now,
        };
        let created = store.insert_comic(&comic).await.unwrap();
        comic.title = "One (Remastered)".to_string();
        comic.status = ComicStatus::Completed;
        let updated = store.update_comic(created.id, &comic).await.unwrap();
        assert_eq!(updated.slug, "one");
        assert_eq!(updated.status, ComicStatus::Completed);
        assert_eq!(store.comics().len(), 1);
    }

    #[tokio::test]
    async fn test_offline_ping_fails() {
        let store = MemoryStore::new();
        assert!(store.ping().await.is_ok());
        store.set_offline(true);
        assert!(matches!(store.ping().await, Err(StoreError::Unavailable(_))));
    }
}
