/// Run configuration
/// Defaults, overlaid with environment variables, overlaid with CLI flags.
/// Built once before the run starts and never mutated afterwards.

use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_IMAGE_CONCURRENCY: usize = 5;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_PASSWORD_COST: u32 = 3;
pub const DEFAULT_DATA_DIR: &str = "data/seed";
pub const DEFAULT_UPLOAD_DIR: &str = "public/uploads";
pub const DEFAULT_PUBLIC_BASE_URL: &str = "/uploads";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Parser, Debug, Default, Clone)]
#[command(name = "seeder")]
#[command(about = "Seed the ComicWise database from JSON fixture files")]
pub struct Args {
    /// Seed users only
    #[arg(long, conflicts_with_all = ["comics_only", "chapters_only"])]
    pub users_only: bool,

    /// Seed comics only
    #[arg(long, conflicts_with = "chapters_only")]
    pub comics_only: bool,

    /// Seed chapters only
    #[arg(long)]
    pub chapters_only: bool,

    #[arg(long)]
    pub no_users: bool,

    #[arg(long)]
    pub no_comics: bool,

    #[arg(long)]
    pub no_chapters: bool,

    /// Keep fixture image URLs as they are instead of downloading them
    #[arg(long)]
    pub skip_images: bool,

    #[arg(short, long)]
    pub verbose: bool,

    /// Report what would change without writing to the database
    #[arg(long)]
    pub dry_run: bool,

    /// Records per chunk (positive integer; other values are ignored)
    #[arg(long, value_name = "N", allow_hyphen_values = true)]
    pub batch_size: Option<String>,

    /// Records processed concurrently inside a chunk, which bounds store
    /// round trips as well as image downloads (positive integer; other values
    /// are ignored)
    #[arg(long, value_name = "N", allow_hyphen_values = true)]
    pub image_concurrency: Option<String>,

    /// Directory that relative fixture patterns are resolved against
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// User fixture file or wildcard pattern (repeatable)
    #[arg(long = "users", value_name = "PATTERN")]
    pub users: Vec<String>,

    /// Comic fixture file or wildcard pattern (repeatable)
    #[arg(long = "comics", value_name = "PATTERN")]
    pub comics: Vec<String>,

    /// Chapter fixture file or wildcard pattern (repeatable)
    #[arg(long = "chapters", value_name = "PATTERN")]
    pub chapters: Vec<String>,

    #[arg(long)]
    pub database_url: Option<String>,

    /// Apply the bundled schema migrations before seeding
    #[arg(long)]
    pub migrate: bool,

    /// Seed an in-process store instead of Postgres
    #[arg(long)]
    pub in_memory: bool,
}

/// Fixture patterns per entity kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityFiles {
    pub users: Vec<String>,
    pub comics: Vec<String>,
    pub chapters: Vec<String>,
}

impl Default for EntityFiles {
    fn default() -> Self {
        EntityFiles {
            users: vec!["users.json".to_string(), "users*.json".to_string()],
            comics: vec!["comics.json".to_string(), "comicsdata*.json".to_string()],
            chapters: vec!["chapters.json".to_string(), "chaptersdata*.json".to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityToggles {
    pub users: bool,
    pub comics: bool,
    pub chapters: bool,
}

impl Default for EntityToggles {
    fn default() -> Self {
        EntityToggles {
            users: true,
            comics: true,
            chapters: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedOptions {
    pub batch_size: usize,
    pub image_download_concurrency: usize,
    pub skip_image_download: bool,
    pub verbose: bool,
    pub dry_run: bool,
}

impl Default for SeedOptions {
    fn default() -> Self {
        SeedOptions {
            batch_size: DEFAULT_BATCH_SIZE,
            image_download_concurrency: DEFAULT_IMAGE_CONCURRENCY,
            skip_image_download: false,
            verbose: false,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SeedConfig {
    pub files: EntityFiles,
    pub enabled: EntityToggles,
    pub options: SeedOptions,
    pub data_dir: PathBuf,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub default_password: Option<String>,
    pub password_cost: u32,
    pub upload_dir: PathBuf,
    pub public_base_url: String,
    pub in_memory: bool,
    pub migrate: bool,
}

impl Default for SeedConfig {
    fn default() -> Self {
        SeedConfig {
            files: EntityFiles::default(),
            enabled: EntityToggles::default(),
            options: SeedOptions::default(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            default_password: None,
            password_cost: DEFAULT_PASSWORD_COST,
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
            in_memory: false,
            migrate: false,
        }
    }
}

impl SeedConfig {
    /// Build from the process environment and parsed flags
    pub fn load(args: &Args) -> Self {
        Self::from_sources(args, |key| std::env::var(key).ok())
    }

    /// Build from an arbitrary environment lookup and parsed flags
    pub fn from_sources<F>(args: &Args, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = SeedConfig::default();
        config.apply_env(&env);
        config.apply_args(args);
        config
    }

    fn apply_env<F>(&mut self, env: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = non_empty(env("DATABASE_URL")) {
            self.database_url = Some(url);
        }
        if let Some(dir) = non_empty(env("SEED_DATA_DIR")) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(password) = non_empty(env("SEED_DEFAULT_PASSWORD")) {
            self.default_password = Some(password);
        }
        if let Some(dir) = non_empty(env("SEED_UPLOAD_DIR")) {
            self.upload_dir = PathBuf::from(dir);
        }
        if let Some(base) = non_empty(env("SEED_PUBLIC_BASE_URL")) {
            self.public_base_url = base;
        }
        if let Some(raw) = non_empty(env("DB_MAX_CONNECTIONS")) {
            match parse_positive(&raw) {
                Some(n) => self.max_connections = n as u32,
                None => warn!(
                    value = %raw,
                    default = self.max_connections,
                    "Ignoring invalid DB_MAX_CONNECTIONS"
                ),
            }
        }
        if let Some(raw) = non_empty(env("SEED_PASSWORD_COST")) {
            match parse_positive(&raw) {
                Some(n) => self.password_cost = n as u32,
                None => warn!(
                    value = %raw,
                    default = self.password_cost,
                    "Ignoring invalid SEED_PASSWORD_COST"
                ),
            }
        }
    }

    fn apply_args(&mut self, args: &Args) {
        if args.users_only || args.comics_only || args.chapters_only {
            self.enabled = EntityToggles {
                users: args.users_only,
                comics: args.comics_only,
                chapters: args.chapters_only,
            };
        }
        if args.no_users {
            self.enabled.users = false;
        }
        if args.no_comics {
            self.enabled.comics = false;
        }
        if args.no_chapters {
            self.enabled.chapters = false;
        }

        self.options.skip_image_download = args.skip_images;
        self.options.verbose = args.verbose;
        self.options.dry_run = args.dry_run;

        if let Some(ref raw) = args.batch_size {
            match parse_positive(raw) {
                Some(n) => self.options.batch_size = n,
                None => warn!(value = %raw, "Ignoring invalid --batch-size"),
            }
        }
        if let Some(ref raw) = args.image_concurrency {
            match parse_positive(raw) {
                Some(n) => self.options.image_download_concurrency = n,
                None => warn!(value = %raw, "Ignoring invalid --image-concurrency"),
            }
        }

        if let Some(ref dir) = args.data_dir {
            self.data_dir = dir.clone();
        }
        if !args.users.is_empty() {
            self.files.users = args.users.clone();
        }
        if !args.comics.is_empty() {
            self.files.comics = args.comics.clone();
        }
        if !args.chapters.is_empty() {
            self.files.chapters = args.chapters.clone();
        }
        if let Some(url) = non_empty(args.database_url.clone()) {
            self.database_url = Some(url);
        }
        self.migrate = args.migrate;
        self.in_memory = args.in_memory;
    }

    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_URL".to_string()))
    }

    /// Pool size: enough connections for every concurrently processed record
    pub fn pool_size(&self) -> u32 {
        let concurrency = u32::try_from(self.options.image_download_concurrency).unwrap_or(u32::MAX);
        self.max_connections.max(concurrency)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.migrate && self.in_memory {
            return Err(ConfigError::InvalidConfig(
                "--migrate has no effect with --in-memory".to_string(),
            ));
        }
        if !self.in_memory {
            self.require_database_url()?;
        }
        Ok(())
    }
}

/// Positive integer, or `None` for anything else
pub fn parse_positive(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok().filter(|n| *n > 0)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn parse(flags: &[&str]) -> Args {
        let mut argv = vec!["seeder"];
        argv.extend_from_slice(flags);
        Args::try_parse_from(argv).unwrap()
    }

    fn config(flags: &[&str], env: &[(&str, &str)]) -> SeedConfig {
        let env: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SeedConfig::from_sources(&parse(flags), |key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[], &[]);
        assert_eq!(config.enabled, EntityToggles::default());
        assert_eq!(config.options, SeedOptions::default());
        assert_eq!(config.files.comics, vec!["comics.json", "comicsdata*.json"]);
        assert_eq!(config.data_dir, PathBuf::from("data/seed"));
        assert_eq!(config.password_cost, 3);
        assert!(!config.in_memory);
    }

    #[test]
    fn test_only_flags_enable_exactly_one_kind() {
        let config = config(&["--comics-only"], &[]);
        assert_eq!(
            config.enabled,
            EntityToggles {
                users: false,
                comics: true,
                chapters: false
            }
        );
        assert!(Args::try_parse_from(["seeder", "--users-only", "--chapters-only"]).is_err());
    }

    #[test]
    fn test_no_flags_disable_one_kind() {
        let config = config(&["--no-users", "--no-chapters"], &[]);
        assert!(!config.enabled.users);
        assert!(config.enabled.comics);
        assert!(!config.enabled.chapters);
    }

    #[test]
    fn test_numeric_flags_are_lenient() {
        let good = config(&["--batch-size", "25", "--image-concurrency", "8"], &[]);
        assert_eq!(good.options.batch_size, 25);
        assert_eq!(good.options.image_download_concurrency, 8);

        let bad = config(&["--batch-size", "lots", "--image-concurrency", "0"], &[]);
        assert_eq!(bad.options.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(bad.options.image_download_concurrency, DEFAULT_IMAGE_CONCURRENCY);

        let negative = config(&["--batch-size=-4"], &[]);
        assert_eq!(negative.options.batch_size, DEFAULT_BATCH_SIZE);

        let spaced = config(&["--batch-size", "-4", "--image-concurrency", "-1", "--users-only"], &[]);
        assert_eq!(spaced.options.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(spaced.options.image_download_concurrency, DEFAULT_IMAGE_CONCURRENCY);
        assert!(spaced.enabled.users);
        assert!(!spaced.enabled.comics);
    }

    #[test]
    fn test_boolean_options() {
        let config = config(&["--skip-images", "-v", "--dry-run"], &[]);
        assert!(config.options.skip_image_download);
        assert!(config.options.verbose);
        assert!(config.options.dry_run);
    }

    #[test]
    fn test_env_overlay_and_flag_precedence() {
        let config = config(
            &["--database-url", "postgres://flag/db", "--users", "people/*.json"],
            &[
                ("DATABASE_URL", "postgres://env/db"),
                ("DB_MAX_CONNECTIONS", "not-a-number"),
                ("SEED_PASSWORD_COST", "4"),
                ("SEED_PUBLIC_BASE_URL", "https://cdn.example.com/u"),
            ],
        );
        assert_eq!(config.database_url.as_deref(), Some("postgres://flag/db"));
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.password_cost, 4);
        assert_eq!(config.public_base_url, "https://cdn.example.com/u");
        assert_eq!(config.files.users, vec!["people/*.json"]);
        assert_eq!(config.files.chapters, EntityFiles::default().chapters);
    }

    #[test]
    fn test_pool_covers_concurrency() {
        let config = config(&["--image-concurrency", "32"], &[("DB_MAX_CONNECTIONS", "10")]);
        assert_eq!(config.pool_size(), 32);
    }

    #[test]
    fn test_database_url_required_unless_in_memory() {
        assert!(matches!(
            config(&[], &[]).validate(),
            Err(ConfigError::MissingEnv(_))
        ));
        assert!(config(&["--in-memory"], &[]).validate().is_ok());
    }
}
