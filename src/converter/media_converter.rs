//! # Media Converter Main Orchestrator
//!
//! Orchestratore principale che delega responsabilità ai moduli specializzati:
//! pianificazione, creazione directory, copia artwork, conversione concorrente
//! e riepilogo finale.

use crate::{
    config::ConversionConfig,
    converter::{
        planner::{ConversionJob, ConversionPlanner},
        run_result::{JobOutcome, RunResult, RunSummary, TagOutcome},
        task_converter::{TaskConverter, TaskOptions},
    },
    error::ConversionError,
    file_manager::FileManager,
    json_output::JsonMessage,
    progress::ProgressManager,
    tags::{LoftyTagStore, TagStore},
};
use anyhow::{Context, Result};
use futures::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

/// Orchestratore di un run di conversione
pub struct MediaConverter {
    config: ConversionConfig,
    tag_store: Arc<dyn TagStore>,
}

impl MediaConverter {
    /// Both codecs must carry a resolved path; anything else is a bug in the caller.
    pub fn new(config: ConversionConfig) -> Self {
        assert!(
            !config.decoder.resolved_path.as_os_str().is_empty(),
            "decoder {} has no resolved path",
            config.decoder.name()
        );
        assert!(
            !config.encoder.resolved_path.as_os_str().is_empty(),
            "encoder {} has no resolved path",
            config.encoder.name()
        );

        Self {
            config,
            tag_store: Arc::new(LoftyTagStore),
        }
    }

    pub fn with_tag_store(mut self, tag_store: Arc<dyn TagStore>) -> Self {
        self.tag_store = tag_store;
        self
    }

    pub fn planner(&self) -> ConversionPlanner {
        ConversionPlanner::new(
            self.config.source_dir(),
            self.config.decoder.extension(),
            self.config.dest_dir(),
            self.config.encoder.extension(),
        )
        .with_artwork(self.config.copy_artwork)
    }

    /// Esegue il run completo e restituisce il riepilogo
    pub async fn run(&self) -> Result<RunSummary> {
        let start_time = Instant::now();

        let plan = self.planner().plan().with_context(|| {
            format!("Failed to scan source directory {}", self.config.source_dir().display())
        })?;

        self.emit_start_message(plan.jobs.len(), plan.artwork.len());

        let created = FileManager::create_directories(&plan.directories)
            .await
            .context("Failed to create destination directories")?;
        debug!("Created {} destination directories", created);

        let result = RunResult::new(plan.jobs.len());

        if !plan.artwork.is_empty() {
            let (copied, failed) = FileManager::copy_artwork(&plan.artwork).await;
            info!("Copied {} artwork files ({} failed)", copied, failed.len());
            result.record_artwork(copied, failed).await;
        }

        if plan.jobs.is_empty() {
            if !self.config.json_output {
                info!("Nothing to convert, destination is up to date");
            }
        } else {
            let progress = if self.config.json_output {
                ProgressManager::hidden(plan.jobs.len() as u64)
            } else {
                ProgressManager::new(plan.jobs.len() as u64)
            };
            self.convert_concurrently(plan.jobs, &result, &progress).await?;
            let partial = result.summary().await;
            progress.finish(&format!(
                "{} converted, {} failed",
                partial.converted,
                partial.conversion_failures.len()
            ));
        }

        let summary = result.summary().await;
        self.print_final_stats(&summary, start_time.elapsed().as_secs_f64());
        Ok(summary)
    }

    fn emit_start_message(&self, total_jobs: usize, artwork_files: usize) {
        if self.config.json_output {
            JsonMessage::start(&self.config, total_jobs, artwork_files).emit();
            return;
        }

        info!(
            "Converting {} -> {}",
            self.config.source_dir().display(),
            self.config.dest_dir().display()
        );
        info!("Decoder: {}", self.config.decoder);
        info!("Encoder: {} (flags: {})", self.config.encoder, self.config.encoder.flags());
        info!("Workers: {}", self.config.threads());
        if !self.config.copy_tags {
            info!("Tag copying disabled");
        }
        if let Some(limit) = self.config.job_timeout {
            info!("Per-file timeout: {:?}", limit);
        }
        info!("Found {} files to convert, {} artwork files to copy", total_jobs, artwork_files);
    }

    /// Dispatch every job under the worker cap and wait for all of them
    async fn convert_concurrently(
        &self,
        mut jobs: Vec<ConversionJob>,
        result: &RunResult,
        progress: &ProgressManager,
    ) -> Result<()> {
        let semaphore = Arc::new(Semaphore::new(self.config.threads().max(1)));
        let converter = TaskConverter::new(
            Arc::new(self.config.decoder.clone()),
            Arc::new(self.config.encoder.clone()),
            Arc::clone(&self.tag_store),
            TaskOptions {
                copy_tags: self.config.copy_tags,
                strict_exit_status: self.config.strict_exit_status,
                timeout: self.config.job_timeout,
                show_codec_output: self.config.show_codec_output,
                json_output: self.config.json_output,
            },
        );
        let json_output = self.config.json_output;

        let mut sources: Vec<PathBuf> = Vec::with_capacity(jobs.len());
        let mut tasks = Vec::with_capacity(jobs.len());

        // last discovered converts first
        while let Some(job) = jobs.pop() {
            let permit = semaphore.clone().acquire_owned().await?;
            debug!("Dispatching {}", job.source.display());

            let converter = converter.clone();
            let result = result.clone();
            let progress = progress.clone();
            sources.push(job.source.clone());

            tasks.push(tokio::spawn(async move {
                let _permit = permit;
                let outcome = converter.convert(&job).await;
                finish_job(&outcome, &result, &progress, json_output).await;
            }));
        }

        // a panicked worker never recorded its outcome
        for (source, joined) in sources.into_iter().zip(join_all(tasks).await) {
            if let Err(e) = joined {
                error!("Worker for {} terminated abnormally: {}", source.display(), e);
                let outcome = JobOutcome::ConversionFailed {
                    source,
                    reason: ConversionError::Worker(e.to_string()).to_string(),
                };
                finish_job(&outcome, result, progress, json_output).await;
            }
        }

        Ok(())
    }

    fn print_final_stats(&self, summary: &RunSummary, duration: f64) {
        if self.config.json_output {
            JsonMessage::complete(summary, duration).emit();
            return;
        }

        info!("=== Conversion Complete ===");
        info!("Jobs queued: {}", summary.jobs_queued);
        info!("Converted: {}", summary.converted);
        info!("Failed: {}", summary.conversion_failures.len());
        info!("Tag errors: {}", summary.tag_failures.len());
        info!("Duration: {:.1}s", duration);
    }
}

/// Report one outcome. Recording comes last so an outcome is counted exactly once.
async fn finish_job(outcome: &JobOutcome, result: &RunResult, progress: &ProgressManager, json_output: bool) {
    if json_output {
        JsonMessage::file_complete(outcome).emit();
    }

    let name = outcome
        .source()
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned();
    let message = match outcome {
        JobOutcome::Converted {
            tags: TagOutcome::Failed(_),
            ..
        } => format!("[TAGS] {}: converted, tags not copied", name),
        JobOutcome::Converted { .. } => format!("[OK] {}", name),
        JobOutcome::ConversionFailed { .. } => format!("[ERROR] {}", name),
    };
    progress.update(&message);

    result.record(outcome).await;
}
