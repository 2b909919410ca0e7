//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per l'uso da script
//! o da interfacce grafiche.
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio della conversione, con la configurazione scelta
//! - `file_complete`: Esito di un singolo job
//! - `complete`: Fine del run con il riepilogo
//! - `error`: Errore fatale prima o durante il run
//!
//! Ogni messaggio è una riga JSON su stdout.

use crate::config::ConversionConfig;
use crate::converter::run_result::{JobOutcome, RunSummary, TagOutcome};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum JsonMessage {
    #[serde(rename = "start")]
    Start {
        source_dir: PathBuf,
        dest_dir: PathBuf,
        total_jobs: usize,
        artwork_files: usize,
        config: JsonConfig,
    },

    #[serde(rename = "file_complete")]
    FileComplete {
        source: PathBuf,
        destination: Option<PathBuf>,
        success: bool,
        /// `None` when tag copying is disabled or the conversion failed
        tags_copied: Option<bool>,
        error: Option<String>,
    },

    #[serde(rename = "complete")]
    Complete {
        jobs_queued: usize,
        converted: usize,
        conversion_failures: Vec<PathBuf>,
        tag_failures: Vec<PathBuf>,
        artwork_copied: usize,
        artwork_failures: Vec<PathBuf>,
        duration_seconds: f64,
    },

    #[serde(rename = "error")]
    Error { message: String, details: Option<String> },
}

/// Configurazione per output JSON
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct JsonConfig {
    pub decoder: String,
    pub encoder: String,
    pub threads: usize,
    pub copy_artwork: bool,
    pub copy_tags: bool,
    pub strict_exit_status: bool,
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(config: &ConversionConfig, total_jobs: usize, artwork_files: usize) -> Self {
        Self::Start {
            source_dir: config.source_dir().to_path_buf(),
            dest_dir: config.dest_dir().to_path_buf(),
            total_jobs,
            artwork_files,
            config: JsonConfig::from(config),
        }
    }

    pub fn file_complete(outcome: &JobOutcome) -> Self {
        match outcome {
            JobOutcome::Converted {
                source,
                destination,
                tags,
            } => Self::FileComplete {
                source: source.clone(),
                destination: Some(destination.clone()),
                success: true,
                tags_copied: match tags {
                    TagOutcome::Copied(_) => Some(true),
                    TagOutcome::Failed(_) => Some(false),
                    TagOutcome::Disabled => None,
                },
                error: match tags {
                    TagOutcome::Failed(reason) => Some(reason.clone()),
                    _ => None,
                },
            },
            JobOutcome::ConversionFailed { source, reason } => Self::FileComplete {
                source: source.clone(),
                destination: None,
                success: false,
                tags_copied: None,
                error: Some(reason.clone()),
            },
        }
    }

    pub fn complete(summary: &RunSummary, duration_seconds: f64) -> Self {
        Self::Complete {
            jobs_queued: summary.jobs_queued,
            converted: summary.converted,
            conversion_failures: summary.conversion_failures.clone(),
            tag_failures: summary.tag_failures.clone(),
            artwork_copied: summary.artwork_copied,
            artwork_failures: summary.artwork_failures.clone(),
            duration_seconds,
        }
    }

    /// Crea un messaggio di errore
    pub fn error(message: String, details: Option<String>) -> Self {
        Self::Error { message, details }
    }
}

impl From<&ConversionConfig> for JsonConfig {
    fn from(config: &ConversionConfig) -> Self {
        Self {
            decoder: config.decoder.name().to_string(),
            encoder: config.encoder.name().to_string(),
            threads: config.threads(),
            copy_artwork: config.copy_artwork,
            copy_tags: config.copy_tags,
            strict_exit_status: config.strict_exit_status,
        }
    }
}
