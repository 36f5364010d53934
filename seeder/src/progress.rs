/// Per-entity progress tracking
/// Counts seeding outcomes, prints one line per outcome and a final summary

use colored::{ColoredString, Colorize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::warn;

/// Terminal outcome of one fixture record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Created,
    Updated,
    Skipped,
    Error,
}

impl OutcomeKind {
    fn label(&self) -> ColoredString {
        match self {
            OutcomeKind::Created => "CREATED".green(),
            OutcomeKind::Updated => "UPDATED".blue(),
            OutcomeKind::Skipped => "SKIPPED".yellow(),
            OutcomeKind::Error => "ERROR".red().bold(),
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeKind::Created => write!(f, "created"),
            OutcomeKind::Updated => write!(f, "updated"),
            OutcomeKind::Skipped => write!(f, "skipped"),
            OutcomeKind::Error => write!(f, "error"),
        }
    }
}

/// Point-in-time copy of a tracker's counters
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressSnapshot {
    pub name: String,
    pub total: usize,
    pub current: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
    pub elapsed_ms: u128,
}

impl ProgressSnapshot {
    /// Sum of the four outcome counters
    pub fn outcomes(&self) -> usize {
        self.created + self.updated + self.skipped + self.errors
    }
}

/// Outcome counters for one entity kind's run.
///
/// Counters are atomics so the handlers of a chunk, polled concurrently,
/// can all record through a shared reference.
#[derive(Debug)]
pub struct ProgressTracker {
    name: String,
    total: usize,
    current: AtomicUsize,
    created: AtomicUsize,
    updated: AtomicUsize,
    skipped: AtomicUsize,
    errors: AtomicUsize,
    started: Instant,
}

impl ProgressTracker {
    pub fn new(name: impl Into<String>, total: usize) -> Self {
        ProgressTracker {
            name: name.into(),
            total,
            current: AtomicUsize::new(0),
            created: AtomicUsize::new(0),
            updated: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            started: Instant::now(),
        }
    }

    pub fn created(&self, message: Option<&str>) {
        self.record(OutcomeKind::Created, message);
    }

    pub fn updated(&self, message: Option<&str>) {
        self.record(OutcomeKind::Updated, message);
    }

    pub fn skipped(&self, message: Option<&str>) {
        self.record(OutcomeKind::Skipped, message);
    }

    pub fn error(&self, message: Option<&str>) {
        self.record(OutcomeKind::Error, message);
    }

    fn record(&self, kind: OutcomeKind, message: Option<&str>) {
        let counter = match kind {
            OutcomeKind::Created => &self.created,
            OutcomeKind::Updated => &self.updated,
            OutcomeKind::Skipped => &self.skipped,
            OutcomeKind::Error => &self.errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        let current = self.current.fetch_add(1, Ordering::Relaxed) + 1;

        if current > self.total {
            warn!(
                entity = %self.name,
                current = current,
                total = self.total,
                "More outcomes recorded than records expected"
            );
        }

        let line = format_progress_line(
            &self.name,
            current,
            self.total,
            self.started.elapsed(),
            &kind.label().to_string(),
            message,
        );
        println!("{}", line);

        if kind == OutcomeKind::Error {
            warn!(
                entity = %self.name,
                record = current,
                error = message.unwrap_or(""),
                "Record failed"
            );
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            name: self.name.clone(),
            total: self.total,
            current: self.current.load(Ordering::Relaxed),
            created: self.created.load(Ordering::Relaxed),
            updated: self.updated.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            elapsed_ms: self.started.elapsed().as_millis(),
        }
    }

    /// Print the summary block and return the final counters
    pub fn complete(&self) -> ProgressSnapshot {
        let snapshot = self.snapshot();
        println!();
        println!("{}", format!("{} summary", self.name).bold());
        println!("  {:<10} {}", "Created:".green(), snapshot.created);
        println!("  {:<10} {}", "Updated:".blue(), snapshot.updated);
        println!("  {:<10} {}", "Skipped:".yellow(), snapshot.skipped);
        println!("  {:<10} {}", "Errors:".red(), snapshot.errors);
        println!(
            "  {:<10} {:.2}s",
            "Elapsed:",
            snapshot.elapsed_ms as f64 / 1000.0
        );
        snapshot
    }
}

/// `[Users] 3/10 (30.0%) 0.42s CREATED a@x.com`
pub fn format_progress_line(
    name: &str,
    current: usize,
    total: usize,
    elapsed: Duration,
    label: &str,
    message: Option<&str>,
) -> String {
    let percent = if total == 0 {
        100.0
    } else {
        current as f64 * 100.0 / total as f64
    };
    let mut line = format!(
        "[{}] {}/{} ({:.1}%) {:.2}s {}",
        name,
        current,
        total,
        percent,
        elapsed.as_secs_f64(),
        label
    );
    if let Some(message) = message {
        line.push(' ');
        line.push_str(message);
    }
    line
}
