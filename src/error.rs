//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Categorie di errori:
//! - `CodecError`: discovery e selezione dei codec esterni
//! - `ConfigError`: validazione di directory e numero di thread
//! - `PlanError`: errori durante la scansione dell'albero sorgente (fatali)
//! - `ConversionError`: errori per singolo job (isolati, mai propagati)
//! - `TagError`: errori nella copia dei tag (isolati dalla conversione)
//!
//! ## Esempio:
//! ```rust,ignore
//! if !path.is_file() {
//!     return Err(CodecError::NotFound { executable: name.to_string() });
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;

/// Errors raised while locating, probing or selecting codecs
#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("Executable not found in working directory or PATH: {executable}")]
    NotFound { executable: String },

    #[error("Executable is not executable by the current user: {}", path.display())]
    NotExecutable { path: PathBuf },

    #[error("{} was not built with support for {feature}", path.display())]
    UnsupportedBuild { path: PathBuf, feature: String },

    #[error("No decoders available on this system")]
    NoDecodersAvailable,

    #[error("No encoders available on this system")]
    NoEncodersAvailable,

    #[error("No available codec matches '{query}'")]
    CodecNotSelectable { query: String },

    #[error("Invalid argument template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("Template for {codec} needs a value for {{{placeholder}}}")]
    MissingPlaceholderValue { codec: String, placeholder: &'static str },
}

impl CodecError {
    pub fn not_selectable(query: impl Into<String>) -> Self {
        Self::CodecNotSelectable { query: query.into() }
    }

    pub fn invalid_template(template: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTemplate {
            template: template.into(),
            reason: reason.into(),
        }
    }
}

/// Configuration validation errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Source directory not a directory: {}", .0.display())]
    SourceNotADirectory(PathBuf),

    #[error("Source directory not readable: {}", .0.display())]
    SourceNotReadable(PathBuf),

    #[error("Destination directory is a file: {}", .0.display())]
    DestinationIsFile(PathBuf),

    #[error("Destination directory not writable: {}", .0.display())]
    DestinationNotWritable(PathBuf),

    #[error("Destination directory parent not writable: {}", .0.display())]
    DestinationParentNotWritable(PathBuf),

    #[error("Invalid thread count: {0} (must be 0 for auto or a positive number)")]
    InvalidThreadCount(i64),

    #[error("Settings error: {0}")]
    Settings(String),
}

/// Errors while walking the source tree. Any of these aborts planning.
#[derive(thiserror::Error, Debug)]
pub enum PlanError {
    #[error("Failed to walk source tree: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Path {} is outside of source directory {}", path.display(), root.display())]
    OutsideSource { path: PathBuf, root: PathBuf },
}

/// Per-job conversion errors
#[derive(thiserror::Error, Debug)]
pub enum ConversionError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to connect decoder output to encoder input: {0}")]
    Pipe(String),

    #[error("{program} exited with {status}")]
    ExitStatus { program: String, status: std::process::ExitStatus },

    #[error("Failed to move {} to {}: {source}", from.display(), to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Conversion timed out after {0:?}")]
    Timeout(Duration),

    #[error("Template error: {0}")]
    Template(#[from] CodecError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Worker terminated abnormally: {0}")]
    Worker(String),
}

impl ConversionError {
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }
}

/// Tag propagation errors
#[derive(thiserror::Error, Debug)]
pub enum TagError {
    #[error("Tag library error on {}: {message}", path.display())]
    Library { path: PathBuf, message: String },

    #[error("File format of {} does not support tags", .0.display())]
    Unsupported(PathBuf),

    #[error("Tag worker failed: {0}")]
    Worker(String),
}
