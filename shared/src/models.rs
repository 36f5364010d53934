use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ═══════════════════════════════════════════════════════════════════════════
// ACCOUNTS
// ═══════════════════════════════════════════════════════════════════════════

/// A reader or staff account. `email` is the natural key.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub email_verified: Option<DateTime<Utc>>,
    pub image: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Account role, least privileged first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Moderator,
    Admin,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::User => write!(f, "user"),
            UserRole::Moderator => write!(f, "moderator"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(UserRole::User),
            "moderator" => Ok(UserRole::Moderator),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Column values written when inserting or updating a user
#[derive(Debug, Clone)]
pub struct UserDraft {
    pub name: String,
    pub email: String,
    pub email_verified: Option<DateTime<Utc>>,
    pub image: Option<String>,
    pub password: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ═══════════════════════════════════════════════════════════════════════════
// CATALOG
// ═══════════════════════════════════════════════════════════════════════════

/// Lookup tables a comic points at by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Author,
    Artist,
    ComicType,
    Genre,
}

impl ReferenceKind {
    pub fn table(&self) -> &'static str {
        match self {
            ReferenceKind::Author => "author",
            ReferenceKind::Artist => "artist",
            ReferenceKind::ComicType => "type",
            ReferenceKind::Genre => "genre",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Author => write!(f, "author"),
            ReferenceKind::Artist => write!(f, "artist"),
            ReferenceKind::ComicType => write!(f, "type"),
            ReferenceKind::Genre => write!(f, "genre"),
        }
    }
}

/// Row of one of the name-keyed lookup tables (author, artist, type, genre)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reference {
    pub id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Publication status of a comic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "comic_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ComicStatus {
    #[default]
    Ongoing,
    Hiatus,
    Completed,
    Dropped,
    ComingSoon,
}

impl fmt::Display for ComicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComicStatus::Ongoing => write!(f, "ongoing"),
            ComicStatus::Hiatus => write!(f, "hiatus"),
            ComicStatus::Completed => write!(f, "completed"),
            ComicStatus::Dropped => write!(f, "dropped"),
            ComicStatus::ComingSoon => write!(f, "coming_soon"),
        }
    }
}

impl FromStr for ComicStatus {
    type Err = String;

    /// Accepts the scraped spellings as well ("Coming Soon", "coming-soon", "ONGOING")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "ongoing" => Ok(ComicStatus::Ongoing),
            "hiatus" => Ok(ComicStatus::Hiatus),
            "completed" => Ok(ComicStatus::Completed),
            "dropped" | "cancelled" => Ok(ComicStatus::Dropped),
            "coming_soon" => Ok(ComicStatus::ComingSoon),
            _ => Err(format!("unknown status '{}'", s.trim())),
        }
    }
}

/// A comic series. `slug` is the natural key.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Comic {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub cover_image: Option<String>,
    pub status: ComicStatus,
    pub publication_date: Option<DateTime<Utc>>,
    pub rating: Option<f64>,
    pub views: i64,
    pub author_id: Option<i32>,
    pub artist_id: Option<i32>,
    pub type_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Column values written when inserting or updating a comic
#[derive(Debug, Clone)]
pub struct ComicDraft {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub cover_image: Option<String>,
    pub status: ComicStatus,
    pub publication_date: Option<DateTime<Utc>>,
    pub rating: Option<f64>,
    pub views: i64,
    pub author_id: Option<i32>,
    pub artist_id: Option<i32>,
    pub type_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ═══════════════════════════════════════════════════════════════════════════
// READING
// ═══════════════════════════════════════════════════════════════════════════

/// One chapter of a comic. `(comic_id, chapter_number)` is the natural key.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Chapter {
    pub id: i32,
    pub comic_id: i32,
    pub chapter_number: i32,
    pub title: String,
    pub slug: String,
    pub release_date: Option<DateTime<Utc>>,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Column values written when inserting or updating a chapter
#[derive(Debug, Clone)]
pub struct ChapterDraft {
    pub comic_id: i32,
    pub chapter_number: i32,
    pub title: String,
    pub slug: String,
    pub release_date: Option<DateTime<Utc>>,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A page image of a chapter
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChapterImage {
    pub id: i32,
    pub chapter_id: i32,
    pub page_number: i32,
    pub image_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing_is_case_insensitive() {
        assert_eq!("ADMIN".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!(" moderator ".parse::<UserRole>().unwrap(), UserRole::Moderator);
        assert!("owner".parse::<UserRole>().is_err());
        assert_eq!(UserRole::default(), UserRole::User);
    }

    #[test]
    fn test_status_accepts_scraped_spellings() {
        assert_eq!("Coming Soon".parse::<ComicStatus>().unwrap(), ComicStatus::ComingSoon);
        assert_eq!("coming-soon".parse::<ComicStatus>().unwrap(), ComicStatus::ComingSoon);
        assert_eq!("Completed".parse::<ComicStatus>().unwrap(), ComicStatus::Completed);
        assert!("paused".parse::<ComicStatus>().is_err());
    }

    #[test]
    fn test_reference_tables() {
        assert_eq!(ReferenceKind::ComicType.table(), "type");
        assert_eq!(ReferenceKind::Genre.to_string(), "genre");
    }
}
