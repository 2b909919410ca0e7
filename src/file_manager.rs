//! # File Management Module
//!
//! Questo modulo gestisce le operazioni sui file che non riguardano i codec.
//!
//! ## Responsabilità:
//! - Riconoscimento delle estensioni (audio sorgente e artwork)
//! - Creazione dell'albero di directory di destinazione
//! - Copia verbatim dell'artwork (copertine, scansioni)
//!
//! ## Formati artwork:
//! - JPG, JPEG, PNG, GIF, BMP (confronto case-insensitive)
//!
//! ## Esempio:
//! ```rust,ignore
//! if FileManager::extension_matches(&path, ".flac") {
//!     // queue for conversion
//! } else if FileManager::is_artwork(&path) {
//!     // copy verbatim
//! }
//! ```

use crate::converter::planner::ArtworkCopy;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Extensions copied verbatim as artwork
pub const ARTWORK_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp"];

/// File operations for the mirrored tree
pub struct FileManager;

impl FileManager {
    /// Extension with its leading dot (`.flac`), if any
    pub fn dotted_extension(path: &Path) -> Option<String> {
        path.extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
    }

    /// Case-sensitive comparison against a dotted extension
    pub fn extension_matches(path: &Path, dotted_extension: &str) -> bool {
        Self::dotted_extension(path).as_deref() == Some(dotted_extension)
    }

    /// Check if a file is artwork
    pub fn is_artwork(path: &Path) -> bool {
        if let Some(ext) = path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            ARTWORK_EXTENSIONS.contains(&ext_lower.as_str())
        } else {
            false
        }
    }

    /// Create every directory, tolerating the ones that already exist
    pub async fn create_directories(directories: &BTreeSet<PathBuf>) -> std::io::Result<usize> {
        let mut created = 0;
        for dir in directories {
            if !dir.is_dir() {
                fs::create_dir_all(dir).await?;
                debug!("Created directory: {}", dir.display());
                created += 1;
            }
        }
        Ok(created)
    }

    /// Copy artwork files, returning the number copied and the sources that failed
    pub async fn copy_artwork(copies: &[ArtworkCopy]) -> (usize, Vec<PathBuf>) {
        let mut copied = 0;
        let mut failed = Vec::new();

        for copy in copies {
            match fs::copy(&copy.source, &copy.destination).await {
                Ok(_) => {
                    debug!("Copied artwork {} -> {}", copy.source.display(), copy.destination.display());
                    copied += 1;
                }
                Err(e) => {
                    warn!("Failed to copy artwork {}: {}", copy.source.display(), e);
                    failed.push(copy.source.clone());
                }
            }
        }

        (copied, failed)
    }
}
