//! # Conversion Planner
//!
//! Walks the source tree once and decides what has to happen:
//! - files with the decoder extension whose destination does not exist yet
//! - artwork files whose copy does not exist yet
//! - destination directories needed by either of the above
//!
//! Any error during the walk aborts planning; a partial plan is never returned.

use crate::converter::path_resolver::PathResolver;
use crate::error::PlanError;
use crate::file_manager::FileManager;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// One source-file-to-destination-file conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub destination_dir: PathBuf,
}

/// One artwork file to copy verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtworkCopy {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Output of a planning pass
#[derive(Debug, Default)]
pub struct ConversionPlan {
    /// In discovery order
    pub jobs: Vec<ConversionJob>,
    pub directories: BTreeSet<PathBuf>,
    pub artwork: Vec<ArtworkCopy>,
}

/// Builds the work list for one source/destination pair
#[derive(Debug, Clone)]
pub struct ConversionPlanner {
    source_dir: PathBuf,
    dest_dir: PathBuf,
    decoder_extension: String,
    encoder_extension: String,
    include_artwork: bool,
}

impl ConversionPlanner {
    pub fn new(source_dir: &Path, decoder_extension: &str, dest_dir: &Path, encoder_extension: &str) -> Self {
        Self {
            source_dir: source_dir.to_path_buf(),
            dest_dir: dest_dir.to_path_buf(),
            decoder_extension: decoder_extension.to_string(),
            encoder_extension: encoder_extension.to_string(),
            include_artwork: false,
        }
    }

    pub fn with_artwork(mut self, include_artwork: bool) -> Self {
        self.include_artwork = include_artwork;
        self
    }

    /// Walk the source tree and build the plan
    pub fn plan(&self) -> Result<ConversionPlan, PlanError> {
        debug!("Get convert list starting: {}", self.source_dir.display());
        let mut plan = ConversionPlan::default();

        for entry in WalkDir::new(&self.source_dir).sort_by_file_name() {
            let entry = entry?;
            let path = entry.path();

            let is_file = entry.file_type().is_file() || (entry.path_is_symlink() && path.is_file());
            if !is_file {
                continue;
            }

            if FileManager::extension_matches(path, &self.decoder_extension) {
                self.plan_conversion(path, &mut plan)?;
            } else if self.include_artwork && FileManager::is_artwork(path) {
                self.plan_artwork(path, &mut plan)?;
            }
        }

        debug!(
            "Planned {} conversion(s), {} artwork copie(s), {} directorie(s)",
            plan.jobs.len(),
            plan.artwork.len(),
            plan.directories.len()
        );
        Ok(plan)
    }

    fn plan_conversion(&self, path: &Path, plan: &mut ConversionPlan) -> Result<(), PlanError> {
        let destination =
            PathResolver::destination_for(path, &self.source_dir, &self.dest_dir, &self.encoder_extension)?;

        if destination.exists() {
            debug!("Skipping, output already exists: {}", destination.display());
            return Ok(());
        }

        let destination_dir = self.mirrored_parent(path)?;
        debug!("Adding to convert list: {}", path.display());
        plan.directories.insert(destination_dir.clone());
        plan.jobs.push(ConversionJob {
            source: path.to_path_buf(),
            destination,
            destination_dir,
        });
        Ok(())
    }

    fn plan_artwork(&self, path: &Path, plan: &mut ConversionPlan) -> Result<(), PlanError> {
        let destination = PathResolver::mirror(path, &self.source_dir, &self.dest_dir)?;
        if destination.exists() {
            return Ok(());
        }

        plan.directories.insert(self.mirrored_parent(path)?);
        plan.artwork.push(ArtworkCopy {
            source: path.to_path_buf(),
            destination,
        });
        Ok(())
    }

    fn mirrored_parent(&self, path: &Path) -> Result<PathBuf, PlanError> {
        let parent = path.parent().unwrap_or(&self.source_dir);
        PathResolver::mirror(parent, &self.source_dir, &self.dest_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, PathBuf, PathBuf) {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let dest = temp.path().join("dest");

        for album in ["album_0", "album_1"] {
            let dir = src.join(album);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("track.flac"), b"flac").unwrap();
            std::fs::write(dir.join("track.wav"), b"wav").unwrap();
            std::fs::write(dir.join("cover.jpg"), b"jpg").unwrap();
        }
        std::fs::create_dir_all(src.join("empty")).unwrap();
        std::fs::write(src.join("notes.txt"), b"txt").unwrap();

        (temp, src, dest)
    }

    #[test]
    fn test_plan_matches_decoder_extension() {
        let (_temp, src, dest) = fixture();
        let plan = ConversionPlanner::new(&src, ".flac", &dest, ".mp3").plan().unwrap();

        assert_eq!(plan.jobs.len(), 2);
        assert_eq!(plan.jobs[0].source, src.join("album_0/track.flac"));
        assert_eq!(plan.jobs[0].destination, dest.join("album_0/track.mp3"));
        assert_eq!(plan.jobs[0].destination_dir, dest.join("album_0"));
        assert!(plan.artwork.is_empty());

        let expected: BTreeSet<PathBuf> = [dest.join("album_0"), dest.join("album_1")].into_iter().collect();
        assert_eq!(plan.directories, expected);
    }

    #[test]
    fn test_extension_match_is_exact() {
        let (_temp, src, dest) = fixture();
        std::fs::write(src.join("album_0/LOUD.FLAC"), b"flac").unwrap();
        std::fs::write(src.join("album_0/track.flac.part"), b"flac").unwrap();

        let plan = ConversionPlanner::new(&src, ".flac", &dest, ".mp3").plan().unwrap();
        assert_eq!(plan.jobs.len(), 2);
    }

    #[test]
    fn test_artwork_is_planned_when_enabled() {
        let (_temp, src, dest) = fixture();
        let plan = ConversionPlanner::new(&src, ".wav", &dest, ".ogg")
            .with_artwork(true)
            .plan()
            .unwrap();

        assert_eq!(plan.jobs.len(), 2);
        assert_eq!(plan.artwork.len(), 2);
        assert_eq!(plan.artwork[1].destination, dest.join("album_1/cover.jpg"));
        assert!(!plan.directories.contains(&dest.join("empty")));
    }

    #[test]
    fn test_existing_destinations_are_skipped() {
        let (_temp, src, dest) = fixture();
        std::fs::create_dir_all(dest.join("album_1")).unwrap();
        std::fs::write(dest.join("album_1/track.mp3"), b"done").unwrap();
        std::fs::write(dest.join("album_1/cover.jpg"), b"done").unwrap();

        let plan = ConversionPlanner::new(&src, ".flac", &dest, ".mp3")
            .with_artwork(true)
            .plan()
            .unwrap();

        assert_eq!(plan.jobs.len(), 1);
        assert_eq!(plan.jobs[0].source, src.join("album_0/track.flac"));
        assert_eq!(plan.artwork.len(), 1);
    }

    #[test]
    fn test_replanning_after_completion_is_empty() {
        let (_temp, src, dest) = fixture();
        let planner = ConversionPlanner::new(&src, ".flac", &dest, ".mp3").with_artwork(true);

        let first = planner.plan().unwrap();
        assert!(!first.jobs.is_empty());
        for dir in &first.directories {
            std::fs::create_dir_all(dir).unwrap();
        }
        for job in &first.jobs {
            std::fs::write(&job.destination, b"converted").unwrap();
        }
        for art in &first.artwork {
            std::fs::copy(&art.source, &art.destination).unwrap();
        }

        let second = planner.plan().unwrap();
        assert!(second.jobs.is_empty());
        assert!(second.artwork.is_empty());
        assert!(second.directories.is_empty());
    }

    #[test]
    fn test_missing_source_aborts_planning() {
        let temp = TempDir::new().unwrap();
        let result = ConversionPlanner::new(&temp.path().join("nope"), ".flac", temp.path(), ".mp3").plan();
        assert!(matches!(result, Err(PlanError::Walk(_))));
    }
}
