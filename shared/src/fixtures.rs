//! Typed views of the JSON fixture records.
//!
//! Fixture files are hand-written or scraped, so the shapes here are forgiving:
//! camelCase or snake_case keys, names given either as plain strings or as
//! `{ "name": ... }` objects, numbers given either as JSON numbers or as strings.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::validation::sanitizers::{extract_number, slugify};

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFixture {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, alias = "email_verified")]
    pub email_verified: Option<EmailVerified>,
    #[serde(default, alias = "created_at", deserialize_with = "flexible_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "updated_at", deserialize_with = "flexible_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// `emailVerified` is either a timestamp or a plain flag
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmailVerified {
    Flag(bool),
    At(#[serde(deserialize_with = "required_datetime")] DateTime<Utc>),
}

impl EmailVerified {
    /// Resolve to the column value, using `now` for a bare `true`
    pub fn resolve(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            EmailVerified::Flag(true) => Some(now),
            EmailVerified::Flag(false) => None,
            EmailVerified::At(at) => Some(*at),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Comics
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComicFixture {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "cover_image", alias = "coverImageUrl", alias = "image")]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(
        default,
        alias = "publication_date",
        alias = "publishedAt",
        deserialize_with = "flexible_datetime"
    )]
    pub publication_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub views: Option<i64>,
    #[serde(default)]
    pub author: Option<NameRef>,
    #[serde(default)]
    pub artist: Option<NameRef>,
    #[serde(default, rename = "type", alias = "comicType", alias = "comic_type")]
    pub comic_type: Option<NameRef>,
    #[serde(default)]
    pub genres: Vec<NameRef>,
    #[serde(default, alias = "created_at", deserialize_with = "flexible_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "updated_at", deserialize_with = "flexible_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ComicFixture {
    /// Natural key: the explicit slug, else the slugified title
    pub fn effective_slug(&self) -> String {
        match self.slug {
            Some(ref slug) if !slug.trim().is_empty() => slug.trim().to_lowercase(),
            _ => slugify(&self.title),
        }
    }
}

/// A lookup entity referenced by name: `"Oda"` or `{ "name": "Oda" }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NameRef {
    Name(String),
    Object { name: String },
}

impl NameRef {
    pub fn name(&self) -> &str {
        match self {
            NameRef::Name(name) => name,
            NameRef::Object { name } => name,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Chapters
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterFixture {
    #[serde(default)]
    pub comic: Option<ComicRef>,
    #[serde(default, alias = "comic_slug")]
    pub comic_slug: Option<String>,
    #[serde(default, alias = "comic_title")]
    pub comic_title: Option<String>,
    #[serde(
        default,
        alias = "chapter_number",
        alias = "number",
        deserialize_with = "lenient_f64"
    )]
    pub chapter_number: Option<f64>,
    #[serde(default, alias = "chaptername", alias = "chapterName")]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(
        default,
        alias = "release_date",
        alias = "releasedAt",
        deserialize_with = "flexible_datetime"
    )]
    pub release_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub views: Option<i64>,
    #[serde(default)]
    pub images: Vec<ImageRef>,
    #[serde(default, alias = "created_at", deserialize_with = "flexible_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "updated_at", deserialize_with = "flexible_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// The parent comic of a chapter: a slug/title string or `{ "slug", "title" }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComicRef {
    Key(String),
    Object {
        #[serde(default)]
        slug: Option<String>,
        #[serde(default)]
        title: Option<String>,
    },
}

/// A page image: `"https://..."` or `{ "url": "https://..." }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageRef {
    Url(String),
    Object {
        #[serde(alias = "imageUrl", alias = "image_url", alias = "src")]
        url: String,
    },
}

impl ImageRef {
    pub fn url(&self) -> &str {
        match self {
            ImageRef::Url(url) => url,
            ImageRef::Object { url } => url,
        }
    }
}

impl ChapterFixture {
    /// Candidate keys for the parent comic, most specific first.
    /// Titles are returned as-is; callers slugify them.
    pub fn comic_keys(&self) -> (Option<String>, Option<String>) {
        let mut slug = self.comic_slug.clone();
        let mut title = self.comic_title.clone();
        match &self.comic {
            Some(ComicRef::Key(key)) => {
                if slug.is_none() {
                    slug = Some(key.clone());
                }
                if title.is_none() {
                    title = Some(key.clone());
                }
            }
            Some(ComicRef::Object {
                slug: ref_slug,
                title: ref_title,
            }) => {
                if slug.is_none() {
                    slug = ref_slug.clone();
                }
                if title.is_none() {
                    title = ref_title.clone();
                }
            }
            None => {}
        }
        (slug, title)
    }
}

impl ChapterFixture {
    /// Explicit chapter number, else the first number in `name`, else in `title`
    pub fn resolved_number(&self) -> Option<f64> {
        self.chapter_number
            .or_else(|| self.name.as_deref().and_then(extract_number))
            .or_else(|| self.title.as_deref().and_then(extract_number))
    }

    /// Display title: explicit title, else name, else "Chapter <n>"
    pub fn display_title(&self, chapter_number: i32) -> String {
        self.title
            .clone()
            .or_else(|| self.name.clone())
            .unwrap_or_else(|| format!("Chapter {}", chapter_number))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Lenient scalar decoding
// ─────────────────────────────────────────────────────────────────────────────

/// Parse a timestamp in any of the formats found in fixture files
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn datetime_from_value(value: &Value) -> Result<Option<DateTime<Utc>>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => parse_datetime(s)
            .map(Some)
            .ok_or_else(|| format!("invalid timestamp '{}'", s)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
            .map(Some)
            .ok_or_else(|| format!("invalid timestamp {}", n)),
        other => Err(format!("invalid timestamp {}", other)),
    }
}

fn flexible_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    datetime_from_value(&value).map_err(serde::de::Error::custom)
}

fn required_datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    datetime_from_value(&value)
        .map_err(serde::de::Error::custom)?
        .ok_or_else(|| serde::de::Error::custom("missing timestamp"))
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid number '{}'", s))),
        other => Err(serde::de::Error::custom(format!("invalid number {}", other))),
    }
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .replace(',', "")
            .parse::<i64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid integer '{}'", s))),
        other => Err(serde::de::Error::custom(format!("invalid integer {}", other))),
    }
}
