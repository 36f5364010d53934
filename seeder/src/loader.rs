/// Fixture file loader
/// Resolves exact paths and `*`/`?` wildcard patterns to JSON files and
/// flattens their contents into one list of records per entity kind

use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to read fixture file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to list fixture directory {path}: {source}")]
    ListDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid fixture pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Loads fixture records; relative patterns resolve against `base_dir`
#[derive(Debug, Clone)]
pub struct FileLoader {
    base_dir: PathBuf,
}

impl FileLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        FileLoader {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Load every record matched by `patterns`, in pattern order.
    /// A file matched by more than one pattern is loaded once, at its first match.
    pub async fn load(&self, patterns: &[String]) -> Result<Vec<Value>, LoaderError> {
        let mut records = Vec::new();
        let mut seen = HashSet::new();

        for pattern in patterns {
            let files = self.resolve(pattern).await?;
            if files.is_empty() {
                debug!(pattern = %pattern, "No fixture files matched");
            }
            for file in files {
                if !seen.insert(file.clone()) {
                    continue;
                }
                let loaded = load_file(&file).await?;
                info!(
                    file = %file.display(),
                    records = loaded.len(),
                    "Loaded fixture file"
                );
                records.extend(loaded);
            }
        }

        Ok(records)
    }

    /// Resolve one pattern to the files it names
    pub async fn resolve(&self, pattern: &str) -> Result<Vec<PathBuf>, LoaderError> {
        let path = self.base_dir.join(pattern);

        if !has_wildcard(pattern) {
            return match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => Ok(vec![path]),
                Ok(_) => Ok(Vec::new()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
                Err(source) => Err(LoaderError::Read { path, source }),
            };
        }

        let file_pattern = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| LoaderError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "pattern has no file name component".to_string(),
            })?;
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.base_dir.clone());

        let dir_text = dir.to_string_lossy();
        if has_wildcard(&dir_text) {
            return Err(LoaderError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "wildcards are only supported in the file name".to_string(),
            });
        }

        let matcher = glob_to_regex(file_pattern).map_err(|e| LoaderError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(LoaderError::ListDir { path: dir, source }),
        };

        let mut names = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(source) => return Err(LoaderError::ListDir { path: dir, source }),
            };
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if matcher.is_match(name) {
                    names.push(name.to_string());
                }
            }
        }

        // read_dir order is platform dependent
        names.sort();
        Ok(names.into_iter().map(|name| dir.join(name)).collect())
    }
}

fn has_wildcard(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// Translate a file-name glob into an anchored regex:
/// `*` matches any run, `?` any single character, everything else literally
pub fn glob_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr)
}

/// Parse one fixture file. Unparseable content is logged and yields no records;
/// only I/O failures are errors.
async fn load_file(path: &Path) -> Result<Vec<Value>, LoaderError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(LoaderError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(object @ Value::Object(_)) => Ok(vec![object]),
        Ok(other) => {
            warn!(
                file = %path.display(),
                kind = json_kind(&other),
                "Fixture file is neither an array nor an object, skipping"
            );
            Ok(Vec::new())
        }
        Err(e) => {
            warn!(file = %path.display(), error = %e, "Failed to parse fixture file, skipping");
            Ok(Vec::new())
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
