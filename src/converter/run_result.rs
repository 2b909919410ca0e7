//! # Run Result Module
//!
//! Aggregatore thread-safe degli esiti dei job, condiviso tra tutti i worker.
//! Ogni job registra il proprio esito con una sola chiamata a `record`, così
//! successo e fallimento dei tag arrivano insieme e nessun esito va perso.

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Terminal state of one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Converted; tags copied, skipped or failed
    Converted { source: PathBuf, destination: PathBuf, tags: TagOutcome },
    ConversionFailed { source: PathBuf, reason: String },
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Converted { .. })
    }

    pub fn source(&self) -> &PathBuf {
        match self {
            Self::Converted { source, .. } | Self::ConversionFailed { source, .. } => source,
        }
    }
}

/// Result of tag propagation after a successful conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagOutcome {
    Copied(usize),
    Disabled,
    Failed(String),
}

#[derive(Debug, Default)]
struct Totals {
    converted: usize,
    conversion_failures: Vec<PathBuf>,
    tag_failures: Vec<PathBuf>,
    artwork_copied: usize,
    artwork_failures: Vec<PathBuf>,
}

/// Shared outcome aggregator
#[derive(Debug, Clone)]
pub struct RunResult {
    jobs_queued: usize,
    totals: Arc<Mutex<Totals>>,
}

impl RunResult {
    pub fn new(jobs_queued: usize) -> Self {
        Self {
            jobs_queued,
            totals: Arc::new(Mutex::new(Totals::default())),
        }
    }

    /// Record the terminal outcome of one job
    pub async fn record(&self, outcome: &JobOutcome) {
        let mut totals = self.totals.lock().await;
        match outcome {
            JobOutcome::Converted { destination, tags, .. } => {
                totals.converted += 1;
                if let TagOutcome::Failed(_) = tags {
                    totals.tag_failures.push(destination.clone());
                }
            }
            JobOutcome::ConversionFailed { source, .. } => {
                totals.conversion_failures.push(source.clone());
            }
        }
    }

    pub async fn record_artwork(&self, copied: usize, failed: Vec<PathBuf>) {
        let mut totals = self.totals.lock().await;
        totals.artwork_copied += copied;
        totals.artwork_failures.extend(failed);
    }

    /// Snapshot of the counters
    pub async fn summary(&self) -> RunSummary {
        let totals = self.totals.lock().await;
        RunSummary {
            jobs_queued: self.jobs_queued,
            converted: totals.converted,
            conversion_failures: totals.conversion_failures.clone(),
            tag_failures: totals.tag_failures.clone(),
            artwork_copied: totals.artwork_copied,
            artwork_failures: totals.artwork_failures.clone(),
        }
    }
}

/// Statistiche finali di un run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub jobs_queued: usize,
    pub converted: usize,
    pub conversion_failures: Vec<PathBuf>,
    pub tag_failures: Vec<PathBuf>,
    pub artwork_copied: usize,
    pub artwork_failures: Vec<PathBuf>,
}

impl RunSummary {
    /// Terminal outcomes recorded so far
    pub fn outcomes(&self) -> usize {
        self.converted + self.conversion_failures.len()
    }

    /// Every queued job has exactly one outcome
    pub fn is_complete(&self) -> bool {
        self.outcomes() == self.jobs_queued
    }

    pub fn has_failures(&self) -> bool {
        !self.conversion_failures.is_empty()
    }

    pub fn format_summary(&self) -> String {
        let mut lines = Vec::new();

        if self.conversion_failures.is_empty() {
            lines.push("0 conversion errors".to_string());
        } else {
            lines.push(format!("{} songs failed to convert", self.conversion_failures.len()));
            lines.extend(self.conversion_failures.iter().map(|p| format!("  {}", p.display())));
        }

        if self.tag_failures.is_empty() {
            lines.push("0 tag errors".to_string());
        } else {
            lines.push(format!("{} tag writes failed", self.tag_failures.len()));
            lines.extend(self.tag_failures.iter().map(|p| format!("  {}", p.display())));
        }

        if self.converted == 0 {
            lines.push("0 songs converted".to_string());
        } else {
            lines.push(format!("{} songs successfully converted", self.converted));
        }

        if self.artwork_copied > 0 || !self.artwork_failures.is_empty() {
            lines.push(format!(
                "{} artwork files copied, {} failed",
                self.artwork_copied,
                self.artwork_failures.len()
            ));
        }

        lines.join("\n")
    }
}
