use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use shared::{User, UserDraft, UserFixture, UserRole, Validatable};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::{EntitySeeder, Outcome, RecordError, SeedContext};

const AVATAR_FOLDER: &str = "avatars";

/// Upserts accounts keyed by email
pub struct UserSeeder {
    ctx: Arc<SeedContext>,
}

impl UserSeeder {
    pub fn new(ctx: Arc<SeedContext>) -> Self {
        UserSeeder { ctx }
    }

    /// Hash the fixture password, or the configured fallback for new accounts
    async fn password_hash(
        &self,
        fixture: &UserFixture,
        existing: Option<&User>,
    ) -> Result<Option<String>, RecordError> {
        let plaintext = match (&fixture.password, existing) {
            (Some(password), _) => Some(password.as_str()),
            (None, None) => self.ctx.default_password.as_deref(),
            (None, Some(_)) => None,
        };
        match plaintext {
            Some(plaintext) => Ok(Some(
                self.ctx.hasher.hash(plaintext, self.ctx.password_cost).await?,
            )),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl EntitySeeder for UserSeeder {
    fn name(&self) -> &'static str {
        "Users"
    }

    async fn process_record(&self, record: Value) -> Result<Outcome, RecordError> {
        let mut fixture: UserFixture = serde_json::from_value(record)?;
        fixture.sanitize_and_validate()?;

        let store = &self.ctx.store;
        let existing = store.find_user_by_email(&fixture.email).await?;

        let now = Utc::now();
        let role = fixture.role.as_deref().and_then(|r| r.parse::<UserRole>().ok());
        let email_verified = fixture.email_verified.as_ref().map(|v| v.resolve(now));
        let image = self
            .ctx
            .process_image(fixture.image.as_deref(), AVATAR_FOLDER)
            .await;
        let password = self.password_hash(&fixture, existing.as_ref()).await?;

        let outcome = match existing {
            Some(existing) => {
                let draft = UserDraft {
                    name: fixture.name.clone(),
                    email: existing.email.clone(),
                    email_verified: email_verified.unwrap_or(existing.email_verified),
                    image: image.or(existing.image.clone()).or(fixture.image.clone()),
                    password: password.or(existing.password.clone()),
                    role: role.unwrap_or(existing.role),
                    created_at: existing.created_at,
                    updated_at: fixture.updated_at.unwrap_or(now),
                };
                if !self.ctx.options.dry_run {
                    store.update_user(existing.id, &draft).await?;
                }
                debug!(email = %draft.email, "User updated");
                Outcome::Updated(draft.email)
            }
            None => {
                // the id was validated as a UUID during sanitize_and_validate
                let id = fixture
                    .id
                    .as_deref()
                    .and_then(|id| Uuid::parse_str(id).ok())
                    .unwrap_or_else(Uuid::new_v4);
                let draft = UserDraft {
                    name: fixture.name.clone(),
                    email: fixture.email.clone(),
                    email_verified: email_verified.flatten(),
                    image: image.or(fixture.image.clone()),
                    password,
                    role: role.unwrap_or_default(),
                    created_at: fixture.created_at.unwrap_or(now),
                    updated_at: fixture.updated_at.unwrap_or(now),
                };
                if !self.ctx.options.dry_run {
                    store.insert_user(id, &draft).await?;
                }
                debug!(email = %draft.email, id = %id, "User created");
                Outcome::Created(draft.email)
            }
        };

        Ok(self.ctx.finish(outcome))
    }
}
