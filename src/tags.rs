//! # Tag Propagation
//!
//! Copies a fixed set of textual tags from the lossless source to the
//! converted file. The store is a trait so the conversion pipeline can be
//! exercised without real audio files; `LoftyTagStore` is the production
//! implementation.

use crate::error::TagError;
use lofty::config::WriteOptions;
use lofty::prelude::*;
use lofty::tag::{ItemKey, Tag};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Tag keys propagated from source to destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TagKey {
    Album,
    Artist,
    Title,
    Performer,
    TrackNumber,
    Date,
    Genre,
}

impl TagKey {
    pub const ALL: [TagKey; 7] = [
        TagKey::Album,
        TagKey::Artist,
        TagKey::Title,
        TagKey::Performer,
        TagKey::TrackNumber,
        TagKey::Date,
        TagKey::Genre,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Album => "album",
            Self::Artist => "artist",
            Self::Title => "title",
            Self::Performer => "performer",
            Self::TrackNumber => "tracknumber",
            Self::Date => "date",
            Self::Genre => "genre",
        }
    }

    fn item_key(&self) -> ItemKey {
        match self {
            Self::Album => ItemKey::AlbumTitle,
            Self::Artist => ItemKey::TrackArtist,
            Self::Title => ItemKey::TrackTitle,
            Self::Performer => ItemKey::Performer,
            Self::TrackNumber => ItemKey::TrackNumber,
            Self::Date => ItemKey::RecordingDate,
            Self::Genre => ItemKey::Genre,
        }
    }
}

/// Tag values by key; absent keys are simply missing
pub type TagMap = BTreeMap<TagKey, String>;

/// Read/write access to the tags of an audio file
pub trait TagStore: Send + Sync {
    /// Read every recognized key present on `path`
    fn read(&self, path: &Path) -> Result<TagMap, TagError>;

    /// Set `tags` on `path` and persist
    fn write(&self, path: &Path, tags: &TagMap) -> Result<(), TagError>;
}

/// Copy recognized tags from `source` to `destination`, returning how many were set
pub fn copy_tags(store: &dyn TagStore, source: &Path, destination: &Path) -> Result<usize, TagError> {
    let tags = store.read(source)?;
    store.write(destination, &tags)?;
    debug!("Copied {} tag(s) {} -> {}", tags.len(), source.display(), destination.display());
    Ok(tags.len())
}

/// Tag store backed by the `lofty` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagStore;

fn library_error(path: &Path) -> impl FnOnce(lofty::error::LoftyError) -> TagError + '_ {
    move |e| TagError::Library {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

impl TagStore for LoftyTagStore {
    fn read(&self, path: &Path) -> Result<TagMap, TagError> {
        let tagged = lofty::read_from_path(path).map_err(library_error(path))?;

        let mut tags = TagMap::new();
        let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) else {
            return Ok(tags);
        };

        for key in TagKey::ALL {
            if let Some(value) = tag.get_string(&key.item_key()) {
                tags.insert(key, value.to_string());
            }
        }
        Ok(tags)
    }

    fn write(&self, path: &Path, tags: &TagMap) -> Result<(), TagError> {
        let mut tagged = lofty::read_from_path(path).map_err(library_error(path))?;

        if tagged.primary_tag().is_none() {
            let tag_type = tagged.primary_tag_type();
            tagged.insert_tag(Tag::new(tag_type));
        }
        let tag = tagged
            .primary_tag_mut()
            .ok_or_else(|| TagError::Unsupported(path.to_path_buf()))?;

        for (key, value) in tags {
            if !tag.insert_text(key.item_key(), value.clone()) {
                debug!("{} cannot hold '{}' tag", path.display(), key.as_str());
            }
        }

        tag.save_to_path(path, WriteOptions::default())
            .map_err(library_error(path))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// In-memory store; paths without an entry fail like unreadable files
    #[derive(Default)]
    pub struct MemoryTagStore {
        pub files: Mutex<HashMap<PathBuf, TagMap>>,
    }

    impl TagStore for MemoryTagStore {
        fn read(&self, path: &Path) -> Result<TagMap, TagError> {
            self.files
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| TagError::Unsupported(path.to_path_buf()))
        }

        fn write(&self, path: &Path, tags: &TagMap) -> Result<(), TagError> {
            let mut files = self.files.lock().unwrap();
            let entry = files.entry(path.to_path_buf()).or_default();
            entry.extend(tags.iter().map(|(k, v)| (*k, v.clone())));
            Ok(())
        }
    }

    #[test]
    fn test_copy_tags_between_files() {
        let store = MemoryTagStore::default();
        let mut source_tags = TagMap::new();
        source_tags.insert(TagKey::Artist, "fake_artist".to_string());
        source_tags.insert(TagKey::Title, "fake_title".to_string());
        source_tags.insert(TagKey::TrackNumber, "1".to_string());
        source_tags.insert(TagKey::Genre, "fake".to_string());
        store.files.lock().unwrap().insert(PathBuf::from("a.flac"), source_tags.clone());

        let copied = copy_tags(&store, Path::new("a.flac"), Path::new("a.mp3")).unwrap();
        assert_eq!(copied, 4);
        assert_eq!(store.files.lock().unwrap().get(Path::new("a.mp3")), Some(&source_tags));
    }

    #[test]
    fn test_copy_tags_fails_on_unreadable_source() {
        let store = MemoryTagStore::default();
        let err = copy_tags(&store, Path::new("missing.flac"), Path::new("out.mp3")).unwrap_err();
        assert!(matches!(err, TagError::Unsupported(_)));
        assert!(store.files.lock().unwrap().is_empty());
    }

    #[test]
    fn test_lofty_rejects_non_audio() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("garbage.flac");
        std::fs::write(&path, b"this is not a flac stream").unwrap();

        let err = LoftyTagStore.read(&path).unwrap_err();
        assert!(matches!(err, TagError::Library { .. }));
        assert!(LoftyTagStore.write(&path, &TagMap::new()).is_err());
    }

    /// Mono 16-bit PCM, a tenth of a second of silence
    fn write_wav(path: &Path) {
        let samples = vec![0u8; 8820];
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(4 + 24 + 8 + samples.len() as u32).to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&44_100u32.to_le_bytes());
        bytes.extend_from_slice(&88_200u32.to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&(samples.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&samples);
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_lofty_copies_tags_between_wav_files() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("track.wav");
        let destination = temp.path().join("copy.wav");
        write_wav(&source);
        write_wav(&destination);

        let mut tags = TagMap::new();
        tags.insert(TagKey::Album, "fake_album".to_string());
        tags.insert(TagKey::Artist, "fake_artist".to_string());
        tags.insert(TagKey::Title, "fake_title".to_string());
        tags.insert(TagKey::TrackNumber, "1".to_string());
        tags.insert(TagKey::Date, "2020".to_string());
        tags.insert(TagKey::Genre, "fake_genre".to_string());
        LoftyTagStore.write(&source, &tags).unwrap();

        assert!(LoftyTagStore.read(&destination).unwrap().is_empty());
        let copied = copy_tags(&LoftyTagStore, &source, &destination).unwrap();

        assert_eq!(copied, 6);
        assert_eq!(LoftyTagStore.read(&destination).unwrap(), tags);
    }

    #[test]
    fn test_tag_key_names() {
        let names: Vec<_> = TagKey::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["album", "artist", "title", "performer", "tracknumber", "date", "genre"]);
    }
}
