//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - `ConversionConfig`: configurazione validata di un singolo run
//! - `Settings`: preferenze persistenti su file JSON (codec di default,
//!   thread, flag per codec, codec aggiuntivi definiti dall'utente)
//!
//! ## Validazione:
//! - La sorgente deve essere una directory leggibile
//! - La destinazione, se esiste, deve essere una directory scrivibile;
//!   altrimenti il primo antenato esistente deve essere scrivibile
//! - `threads`: 0 = numero di CPU, negativo = errore
//!
//! ## Esempio:
//! ```rust,ignore
//! let mut config = ConversionConfig::new(&source, &dest, decoder, encoder)?;
//! config.set_threads(0)?;
//! config.copy_tags = false;
//! ```

use crate::codec::{CodecDefinition, CodecTable, ResolvedCodec};
use crate::error::{CodecError, ConfigError};
use crate::platform;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Validated configuration for one conversion run
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    pub decoder: ResolvedCodec,
    pub encoder: ResolvedCodec,
    source_dir: PathBuf,
    dest_dir: PathBuf,
    threads: usize,
    /// Copy cover images and scans next to the converted files
    pub copy_artwork: bool,
    pub copy_tags: bool,
    /// Fail a job when a codec exits non-zero
    pub strict_exit_status: bool,
    /// Per-job limit; `None` waits indefinitely
    pub job_timeout: Option<Duration>,
    pub json_output: bool,
    /// Pass codec stdout/stderr through to the terminal
    pub show_codec_output: bool,
}

impl ConversionConfig {
    /// Build a config with validated directories and one worker per CPU
    pub fn new(
        source_dir: &Path,
        dest_dir: &Path,
        decoder: ResolvedCodec,
        encoder: ResolvedCodec,
    ) -> Result<Self, ConfigError> {
        validate_source_dir(source_dir)?;
        validate_dest_dir(dest_dir)?;

        Ok(Self {
            decoder,
            encoder,
            source_dir: source_dir.to_path_buf(),
            dest_dir: dest_dir.to_path_buf(),
            threads: platform::available_cpus(),
            copy_artwork: true,
            copy_tags: true,
            strict_exit_status: false,
            job_timeout: None,
            json_output: false,
            show_codec_output: false,
        })
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn set_source_dir(&mut self, path: &Path) -> Result<(), ConfigError> {
        validate_source_dir(path)?;
        self.source_dir = path.to_path_buf();
        Ok(())
    }

    pub fn set_dest_dir(&mut self, path: &Path) -> Result<(), ConfigError> {
        validate_dest_dir(path)?;
        self.dest_dir = path.to_path_buf();
        Ok(())
    }

    /// 0 selects the number of available CPUs
    pub fn set_threads(&mut self, threads: i64) -> Result<(), ConfigError> {
        self.threads = resolve_threads(threads)?;
        Ok(())
    }
}

/// Source must be an existing, listable directory
pub fn validate_source_dir(path: &Path) -> Result<(), ConfigError> {
    if !path.is_dir() {
        return Err(ConfigError::SourceNotADirectory(path.to_path_buf()));
    }
    if std::fs::read_dir(path).is_err() {
        return Err(ConfigError::SourceNotReadable(path.to_path_buf()));
    }
    Ok(())
}

/// Destination must be a writable directory, or creatable under a writable ancestor
pub fn validate_dest_dir(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        if !path.is_dir() {
            return Err(ConfigError::DestinationIsFile(path.to_path_buf()));
        }
        if !is_writable_dir(path) {
            return Err(ConfigError::DestinationNotWritable(path.to_path_buf()));
        }
        return Ok(());
    }

    let ancestor = path
        .ancestors()
        .skip(1)
        .map(|a| if a.as_os_str().is_empty() { Path::new(".") } else { a })
        .find(|a| a.exists());

    match ancestor {
        Some(dir) if dir.is_dir() && is_writable_dir(dir) => {
            debug!("Destination {} will be created under {}", path.display(), dir.display());
            Ok(())
        }
        _ => Err(ConfigError::DestinationParentNotWritable(path.to_path_buf())),
    }
}

/// Negative counts are rejected, 0 means one worker per CPU
pub fn resolve_threads(threads: i64) -> Result<usize, ConfigError> {
    match threads {
        t if t < 0 => Err(ConfigError::InvalidThreadCount(t)),
        0 => Ok(platform::available_cpus()),
        t => usize::try_from(t).map_err(|_| ConfigError::InvalidThreadCount(t)),
    }
}

fn is_writable_dir(dir: &Path) -> bool {
    tempfile::Builder::new()
        .prefix(".lossy-mirror-")
        .tempfile_in(dir)
        .is_ok()
}

/// Persistent user preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Substring matched against available decoder names
    pub decoder: String,
    pub encoder: String,
    pub threads: i64,
    pub copy_artwork: bool,
    pub copy_tags: bool,
    pub strict_exit_status: bool,
    pub job_timeout_secs: Option<u64>,
    /// Codec name → flags replacing its defaults
    pub flag_overrides: BTreeMap<String, String>,
    pub extra_decoders: Vec<CodecDefinition>,
    pub extra_encoders: Vec<CodecDefinition>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            decoder: "flac".to_string(),
            encoder: "mp3".to_string(),
            threads: 0,
            copy_artwork: true,
            copy_tags: true,
            strict_exit_status: false,
            job_timeout_secs: None,
            flag_overrides: BTreeMap::new(),
            extra_decoders: Vec::new(),
            extra_encoders: Vec::new(),
        }
    }
}

impl Settings {
    /// `<config dir>/lossy-mirror/settings.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("lossy-mirror").join("settings.json"))
    }

    /// Load settings from file; a missing file yields the defaults
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&content)
            .map_err(|e| ConfigError::Settings(format!("{}: {}", path.display(), e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save settings as pretty JSON, creating the parent directory if needed
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write settings file {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        resolve_threads(self.threads)?;
        if self.job_timeout_secs == Some(0) {
            return Err(ConfigError::Settings("job_timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    /// Built-in codecs followed by the user-defined ones
    pub fn codec_table(&self) -> Result<CodecTable, CodecError> {
        CodecTable::builtin()?.with_definitions(&self.extra_decoders, &self.extra_encoders)
    }

    /// Replace the default flags of `codec` when an override is configured
    pub fn apply_flag_overrides(&self, codec: &mut ResolvedCodec) {
        if let Some(flags) = self.flag_overrides.get(codec.name()) {
            debug!("Overriding flags for {}: {}", codec.name(), flags);
            codec.override_flags(flags.clone());
        }
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        self.job_timeout_secs.map(Duration::from_secs)
    }
}
