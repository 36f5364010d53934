//! Validation implementations for fixture record types

use uuid::Uuid;

use super::sanitizers::{
    normalize_email, sanitize_description, sanitize_name, slugify, trim_optional,
};
use super::validators::{
    validate_email, validate_image_ref, validate_image_ref_optional, validate_length,
    validate_range, validate_required, validate_slug,
};
use super::{FieldError, Validatable, ValidationBuilder};
use crate::fixtures::{ChapterFixture, ComicFixture, ComicRef, ImageRef, NameRef, UserFixture};
use crate::models::{ComicStatus, UserRole};

// ─────────────────────────────────────────────────────────────────────────────
// Constants for validation rules
// ─────────────────────────────────────────────────────────────────────────────

const MAX_NAME_LENGTH: usize = 255;
const MAX_EMAIL_LENGTH: usize = 255;
const MIN_PASSWORD_LENGTH: usize = 6;
const MAX_PASSWORD_LENGTH: usize = 128;
const MAX_TITLE_LENGTH: usize = 255;
const MAX_DESCRIPTION_LENGTH: usize = 10_000;
const MAX_GENRES_COUNT: usize = 30;
const MAX_RATING: f64 = 10.0;
const MAX_CHAPTER_IMAGES: usize = 500;

// ─────────────────────────────────────────────────────────────────────────────
// UserFixture validation
// ─────────────────────────────────────────────────────────────────────────────

impl Validatable for UserFixture {
    fn sanitize(&mut self) {
        trim_optional(&mut self.id);
        self.name = sanitize_name(&self.name);
        self.email = normalize_email(&self.email);
        // passwords keep their whitespace, only blank ones are dropped
        if self.password.as_deref().is_some_and(|p| p.is_empty()) {
            self.password = None;
        }
        trim_optional(&mut self.image);
        trim_optional(&mut self.role);
    }

    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut v = ValidationBuilder::new();

        v.check("name", || validate_required(&self.name, "name"));
        if !self.name.is_empty() {
            v.check("name", || validate_length(&self.name, 1, MAX_NAME_LENGTH));
        }

        v.check("email", || validate_email(&self.email));
        v.check("email", || validate_length(&self.email, 0, MAX_EMAIL_LENGTH));

        if let Some(ref password) = self.password {
            v.check("password", || {
                validate_length(password, MIN_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH)
            });
        }

        v.check("image", || validate_image_ref_optional(&self.image));

        if let Some(ref role) = self.role {
            v.check("role", || role.parse::<UserRole>().map(|_| ()));
        }

        if let Some(ref id) = self.id {
            v.check_condition(Uuid::parse_str(id).is_err(), "id", "must be a valid UUID");
        }

        v.build()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ComicFixture validation
// ─────────────────────────────────────────────────────────────────────────────

fn sanitize_name_ref(value: &mut Option<NameRef>) {
    if let Some(name_ref) = value.as_ref() {
        let cleaned = sanitize_name(name_ref.name());
        *value = if cleaned.is_empty() {
            None
        } else {
            Some(NameRef::Name(cleaned))
        };
    }
}

impl Validatable for ComicFixture {
    fn sanitize(&mut self) {
        self.title = sanitize_name(&self.title);

        trim_optional(&mut self.slug);
        if let Some(ref mut slug) = self.slug {
            *slug = slug.to_lowercase();
        }

        if let Some(ref description) = self.description {
            self.description = Some(sanitize_description(description));
        }
        trim_optional(&mut self.description);
        trim_optional(&mut self.cover_image);
        trim_optional(&mut self.status);

        sanitize_name_ref(&mut self.author);
        sanitize_name_ref(&mut self.artist);
        sanitize_name_ref(&mut self.comic_type);

        let mut genres: Vec<NameRef> = Vec::with_capacity(self.genres.len());
        for genre in &self.genres {
            let cleaned = sanitize_name(genre.name());
            if cleaned.is_empty() || genres.iter().any(|g| g.name().eq_ignore_ascii_case(&cleaned)) {
                continue;
            }
            genres.push(NameRef::Name(cleaned));
        }
        self.genres = genres;
    }

    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut v = ValidationBuilder::new();

        v.check("title", || validate_required(&self.title, "title"));
        if !self.title.is_empty() {
            v.check("title", || validate_length(&self.title, 1, MAX_TITLE_LENGTH));
            v.check("slug", || {
                let slug = self.effective_slug();
                if slug.is_empty() {
                    return Err("cannot be derived from title".to_string());
                }
                validate_slug(&slug)
            });
        }

        if let Some(ref description) = self.description {
            v.check("description", || {
                validate_length(description, 0, MAX_DESCRIPTION_LENGTH)
            });
        }

        v.check("coverImage", || validate_image_ref_optional(&self.cover_image));

        if let Some(ref status) = self.status {
            v.check("status", || status.parse::<ComicStatus>().map(|_| ()));
        }

        if let Some(rating) = self.rating {
            v.check("rating", || validate_range(rating, 0.0, MAX_RATING));
        }

        if let Some(views) = self.views {
            v.check_condition(views < 0, "views", "must not be negative");
        }

        for (field, name_ref) in [
            ("author", &self.author),
            ("artist", &self.artist),
            ("type", &self.comic_type),
        ] {
            if let Some(name_ref) = name_ref {
                v.check(field, || validate_length(name_ref.name(), 1, MAX_NAME_LENGTH));
            }
        }

        v.check_condition(
            self.genres.len() > MAX_GENRES_COUNT,
            "genres",
            format!("must have at most {} entries", MAX_GENRES_COUNT),
        );
        for genre in &self.genres {
            v.check("genres", || validate_length(genre.name(), 1, MAX_NAME_LENGTH));
        }

        v.build()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ChapterFixture validation
// ─────────────────────────────────────────────────────────────────────────────

impl Validatable for ChapterFixture {
    fn sanitize(&mut self) {
        trim_optional(&mut self.comic_slug);
        if let Some(ref mut slug) = self.comic_slug {
            *slug = slug.to_lowercase();
        }
        trim_optional(&mut self.comic_title);
        self.comic = match self.comic.take() {
            Some(ComicRef::Key(key)) if key.trim().is_empty() => None,
            Some(ComicRef::Key(key)) => Some(ComicRef::Key(key.trim().to_string())),
            Some(ComicRef::Object { mut slug, mut title }) => {
                trim_optional(&mut slug);
                trim_optional(&mut title);
                if slug.is_none() && title.is_none() {
                    None
                } else {
                    Some(ComicRef::Object { slug, title })
                }
            }
            None => None,
        };

        if let Some(ref name) = self.name {
            self.name = Some(sanitize_name(name));
        }
        trim_optional(&mut self.name);
        if let Some(ref title) = self.title {
            self.title = Some(sanitize_name(title));
        }
        trim_optional(&mut self.title);
        trim_optional(&mut self.slug);

        self.images = self
            .images
            .iter()
            .map(|image| image.url().trim().to_string())
            .filter(|url| !url.is_empty())
            .map(ImageRef::Url)
            .collect();
    }

    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut v = ValidationBuilder::new();

        let (comic_slug, comic_title) = self.comic_keys();
        v.check_condition(
            comic_slug.is_none() && comic_title.is_none(),
            "comic",
            "a comic slug or title is required",
        );

        match self.resolved_number() {
            None => {
                v.add_error(
                    "chapterNumber",
                    "is required (or must be derivable from name/title)",
                );
            }
            Some(number) => {
                v.check("chapterNumber", || validate_range(number, 0.0, i32::MAX as f64));
                v.check_condition(
                    number.fract() != 0.0,
                    "chapterNumber",
                    "must be a whole number",
                );
            }
        }

        if let Some(ref title) = self.title {
            v.check("title", || validate_length(title, 1, MAX_TITLE_LENGTH));
        }

        if let Some(ref slug) = self.slug {
            v.check("slug", || validate_slug(slug));
        }

        if let Some(views) = self.views {
            v.check_condition(views < 0, "views", "must not be negative");
        }

        v.check_condition(
            self.images.len() > MAX_CHAPTER_IMAGES,
            "images",
            format!("must have at most {} entries", MAX_CHAPTER_IMAGES),
        );
        for (index, image) in self.images.iter().enumerate() {
            v.check(&format!("images[{}]", index), || validate_image_ref(image.url()));
        }

        v.build()
    }
}

/// Slug a chapter gets when the fixture does not provide one
pub fn default_chapter_slug(comic_slug: &str, chapter_number: i32) -> String {
    slugify(&format!("{} chapter {}", comic_slug, chapter_number))
}
