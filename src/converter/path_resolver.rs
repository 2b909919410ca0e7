//! # Path Resolution Module
//!
//! Centralizza il calcolo dei path di destinazione: stesso path relativo
//! sotto la directory di destinazione, estensione del codec di output.

use crate::error::PlanError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Utility per calcolare i path di output in modo centralizzato
pub struct PathResolver;

impl PathResolver {
    /// Mirror `path` from `source_root` into `dest_root`
    pub fn mirror(path: &Path, source_root: &Path, dest_root: &Path) -> Result<PathBuf, PlanError> {
        let relative = path.strip_prefix(source_root).map_err(|_| PlanError::OutsideSource {
            path: path.to_path_buf(),
            root: source_root.to_path_buf(),
        })?;
        Ok(dest_root.join(relative))
    }

    /// Destination of a converted file: mirrored path with the encoder extension
    pub fn destination_for(
        source_file: &Path,
        source_root: &Path,
        dest_root: &Path,
        encoder_extension: &str,
    ) -> Result<PathBuf, PlanError> {
        let mirrored = Self::mirror(source_file, source_root, dest_root)?;
        let destination = mirrored.with_extension(encoder_extension.trim_start_matches('.'));
        debug!("Resolved output path: {} -> {}", source_file.display(), destination.display());
        Ok(destination)
    }

    /// Temporary output path: `track.mp3` becomes `track.tmp.mp3`.
    ///
    /// The real extension stays last because some encoders pick the container
    /// from it.
    pub fn temporary_path(destination: &Path, encoder_extension: &str) -> PathBuf {
        destination.with_extension(format!("tmp.{}", encoder_extension.trim_start_matches('.')))
    }
}
