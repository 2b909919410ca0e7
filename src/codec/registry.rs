//! # Codec Registry
//!
//! Holds the static codec table and, after a discovery pass, the decoders and
//! encoders that are actually usable on this host. Selection by name only
//! considers the available set.

use crate::codec::descriptor::{CodecDescriptor, CodecRole, CodecTable};
use crate::codec::locator::{CodecLocator, ResolvedCodec};
use crate::error::CodecError;
use futures::future::join_all;
use tracing::{debug, info};

/// A codec excluded by the last discovery pass, with the reason
#[derive(Debug, Clone)]
pub struct UnavailableCodec {
    pub role: CodecRole,
    pub name: String,
    pub reason: String,
}

/// Registry of known and available codecs
pub struct CodecRegistry {
    table: CodecTable,
    locator: CodecLocator,
    available_decoders: Vec<ResolvedCodec>,
    available_encoders: Vec<ResolvedCodec>,
    unavailable: Vec<UnavailableCodec>,
    discovered: bool,
}

impl CodecRegistry {
    pub fn new(table: CodecTable, locator: CodecLocator) -> Self {
        Self {
            table,
            locator,
            available_decoders: Vec::new(),
            available_encoders: Vec::new(),
            unavailable: Vec::new(),
            discovered: false,
        }
    }

    /// Probe the host for every known codec.
    ///
    /// The available lists are replaced, never appended to. A missing codec
    /// only excludes itself; the pass fails only when a whole role is empty.
    pub async fn discover(&mut self) -> Result<(), CodecError> {
        let (decoders, mut unavailable) = self.discover_role(CodecRole::Decoder).await;
        let (encoders, unavailable_encoders) = self.discover_role(CodecRole::Encoder).await;
        unavailable.extend(unavailable_encoders);

        info!(
            "Discovered {} decoder(s) and {} encoder(s)",
            decoders.len(),
            encoders.len()
        );

        self.available_decoders = decoders;
        self.available_encoders = encoders;
        self.unavailable = unavailable;
        self.discovered = true;

        if self.available_decoders.is_empty() {
            return Err(CodecError::NoDecodersAvailable);
        }
        if self.available_encoders.is_empty() {
            return Err(CodecError::NoEncodersAvailable);
        }
        Ok(())
    }

    async fn discover_role(&self, role: CodecRole) -> (Vec<ResolvedCodec>, Vec<UnavailableCodec>) {
        let descriptors = self.table.descriptors(role);
        // join_all keeps declared order, which selection relies on
        let results = join_all(descriptors.iter().map(|d| self.locator.locate(d))).await;

        let mut available = Vec::new();
        let mut unavailable = Vec::new();
        for (descriptor, result) in descriptors.iter().zip(results) {
            match result {
                Ok(resolved) => {
                    debug!("{} {} available: {}", role, descriptor.name, resolved.resolved_path.display());
                    available.push(resolved);
                }
                Err(e) => {
                    debug!("{} {} not available: {}", role, descriptor.name, e);
                    unavailable.push(UnavailableCodec {
                        role,
                        name: descriptor.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        (available, unavailable)
    }

    /// First available decoder whose name contains `query`
    pub fn get_decoder(&self, query: &str) -> Result<ResolvedCodec, CodecError> {
        self.select(&self.available_decoders, query)
    }

    /// First available encoder whose name contains `query`
    pub fn get_encoder(&self, query: &str) -> Result<ResolvedCodec, CodecError> {
        self.select(&self.available_encoders, query)
    }

    fn select(&self, available: &[ResolvedCodec], query: &str) -> Result<ResolvedCodec, CodecError> {
        if !self.discovered {
            return Err(CodecError::not_selectable(query));
        }
        let codec = available
            .iter()
            .find(|codec| codec.name().contains(query))
            .cloned()
            .ok_or_else(|| CodecError::not_selectable(query))?;
        debug!("Returning {}", codec);
        Ok(codec)
    }

    /// Names of every known decoder, available or not
    pub fn known_decoder_names(&self) -> Vec<String> {
        names(&self.table.decoders)
    }

    /// Names of every known encoder, available or not
    pub fn known_encoder_names(&self) -> Vec<String> {
        names(&self.table.encoders)
    }

    pub fn available_decoders(&self) -> &[ResolvedCodec] {
        &self.available_decoders
    }

    pub fn available_encoders(&self) -> &[ResolvedCodec] {
        &self.available_encoders
    }

    pub fn unavailable(&self) -> &[UnavailableCodec] {
        &self.unavailable
    }

    /// Human readable availability report
    pub fn report(&self) -> String {
        let mut report = String::new();

        for (title, role, available) in [
            ("Decoders", CodecRole::Decoder, &self.available_decoders),
            ("Encoders", CodecRole::Encoder, &self.available_encoders),
        ] {
            report.push_str(&format!("{}:\n", title));
            for descriptor in self.table.descriptors(role) {
                if let Some(codec) = available.iter().find(|c| c.name() == descriptor.name) {
                    report.push_str(&format!(
                        "  [OK] {} ({}) -> {}{}\n",
                        codec.name(),
                        codec.extension(),
                        codec.resolved_path.display(),
                        codec
                            .version
                            .as_deref()
                            .map(|v| format!(" [{}]", v))
                            .unwrap_or_default()
                    ));
                } else {
                    let reason = self
                        .unavailable
                        .iter()
                        .find(|u| u.role == role && u.name == descriptor.name)
                        .map(|u| u.reason.as_str())
                        .unwrap_or("not probed");
                    report.push_str(&format!("  [--] {} ({}): {}\n", descriptor.name, descriptor.file_extension, reason));
                }
            }
        }

        report
    }
}

fn names(descriptors: &[CodecDescriptor]) -> Vec<String> {
    descriptors.iter().map(|d| d.name.clone()).collect()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::codec::test_support::fake_table;
    use tempfile::TempDir;

    fn registry_with_path() -> CodecRegistry {
        CodecRegistry::new(fake_table(), CodecLocator::from_env())
    }

    #[test]
    fn test_known_names_do_not_need_discovery() {
        let registry = CodecRegistry::new(CodecTable::builtin().unwrap(), CodecLocator::with_search_dirs(vec![]));
        assert_eq!(registry.known_decoder_names(), vec!["flac", "wav", "winwav"]);
        assert_eq!(
            registry.known_encoder_names(),
            vec!["mp3", "ogg", "aac", "avconv-fdkaac", "ffmpeg-fdkaac"]
        );
        assert!(registry.available_decoders().is_empty());
    }

    #[test]
    fn test_selection_before_discovery_fails() {
        let registry = registry_with_path();
        assert!(matches!(
            registry.get_decoder("flac"),
            Err(CodecError::CodecNotSelectable { .. })
        ));
    }

    #[tokio::test]
    async fn test_discover_excludes_missing_codecs() {
        let mut registry = registry_with_path();
        registry.discover().await.unwrap();

        let decoders: Vec<_> = registry.available_decoders().iter().map(|c| c.name().to_string()).collect();
        assert_eq!(decoders, vec!["flac", "wav"]);
        let encoders: Vec<_> = registry.available_encoders().iter().map(|c| c.name().to_string()).collect();
        assert_eq!(encoders, vec!["mp3", "ogg", "mp3-failing", "broken"]);

        assert!(registry.unavailable().iter().any(|u| u.name == "missing"));
        assert!(registry.report().contains("[--] missing"));
    }

    #[tokio::test]
    async fn test_discovery_is_idempotent() {
        let mut registry = registry_with_path();
        registry.discover().await.unwrap();
        let first = (registry.available_decoders().len(), registry.available_encoders().len());

        registry.discover().await.unwrap();
        let second = (registry.available_decoders().len(), registry.available_encoders().len());

        assert_eq!(first, second);
        assert_eq!(registry.available_decoders().to_vec(), {
            let mut again = registry_with_path();
            again.discover().await.unwrap();
            again.available_decoders().to_vec()
        });
    }

    #[tokio::test]
    async fn test_substring_selection() {
        let mut registry = registry_with_path();
        registry.discover().await.unwrap();

        let decoder = registry.get_decoder("flac").unwrap();
        assert!(decoder.name().contains("flac"));

        // first match in declared order wins
        let encoder = registry.get_encoder("mp3").unwrap();
        assert_eq!(encoder.name(), "mp3");
        let encoder = registry.get_encoder("fail").unwrap();
        assert_eq!(encoder.name(), "mp3-failing");

        assert!(matches!(
            registry.get_encoder("vorbis"),
            Err(CodecError::CodecNotSelectable { .. })
        ));
        // known but unavailable is not selectable either
        assert!(registry.get_decoder("missing").is_err());
    }

    #[tokio::test]
    async fn test_no_decoders_available() {
        let empty = TempDir::new().unwrap();
        let mut registry = CodecRegistry::new(
            CodecTable::builtin().unwrap(),
            CodecLocator::with_search_dirs(vec![empty.path().to_path_buf()]),
        );
        let err = registry.discover().await.unwrap_err();
        assert!(matches!(err, CodecError::NoDecodersAvailable));
        assert!(registry.available_decoders().is_empty());
    }

    #[tokio::test]
    async fn test_no_encoders_available() {
        let table = fake_table();
        let table = CodecTable::new(table.decoders, vec![table.encoders.last().unwrap().clone()]);
        let mut registry = CodecRegistry::new(table, CodecLocator::from_env());
        let err = registry.discover().await.unwrap_err();
        assert!(matches!(err, CodecError::NoEncodersAvailable));
    }
}
