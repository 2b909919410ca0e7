//! # Codec Module
//!
//! Discovery and invocation of external decoders and encoders:
//! - `descriptor`: static, declarative description of each codec
//! - `locator`: finds and verifies executables on the host
//! - `registry`: known vs available codecs and selection by name

pub mod descriptor;
pub mod locator;
pub mod registry;

pub use descriptor::{ArgTemplate, ArgToken, CodecDefinition, CodecDescriptor, CodecRole, CodecTable, CommandLine};
pub use locator::{CodecLocator, ResolvedCodec};
pub use registry::CodecRegistry;

/// Fake codecs built from tools every Unix host has (`cat`, `tee`, `sh`, `false`)
#[cfg(all(test, unix))]
pub(crate) mod test_support {
    use super::descriptor::{ArgTemplate, ArgToken, CodecDescriptor, CodecTable};
    use super::locator::ResolvedCodec;
    use std::path::{Path, PathBuf};

    pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn template(text: &str) -> ArgTemplate {
        ArgTemplate::parse(text).unwrap()
    }

    /// Decoders: flac/wav via `cat`, plus one that is never installed.
    /// Encoders: mp3/ogg via `tee`, one that writes output but exits 3,
    /// one that never writes output, and one that is never installed.
    pub fn fake_table() -> CodecTable {
        let decoders = vec![
            CodecDescriptor::new("flac", "cat", ".flac", template("{exe} {input} {flags}"), ""),
            CodecDescriptor::new("wav", "cat", ".wav", template("{exe} {input} {flags}"), ""),
            CodecDescriptor::new("missing", "lossy-mirror-missing-decoder", ".ape", template("{exe} {input}"), ""),
        ];

        let failing = ArgTemplate::from_tokens(vec![
            ArgToken::Executable,
            ArgToken::Literal("-c".to_string()),
            ArgToken::Literal("cat > \"$1\"; exit 3".to_string()),
            ArgToken::Literal("sh".to_string()),
            ArgToken::Output,
        ])
        .unwrap();

        let encoders = vec![
            CodecDescriptor::new("mp3", "tee", ".mp3", template("{exe} {flags} {output}"), ""),
            CodecDescriptor::new("ogg", "tee", ".ogg", template("{exe} {flags} {output}"), ""),
            CodecDescriptor::new("mp3-failing", "sh", ".mp3", failing, ""),
            CodecDescriptor::new("broken", "false", ".mp3", template("{exe} {output}"), ""),
            CodecDescriptor::new("missing", "lossy-mirror-missing-encoder", ".opus", template("{exe} {output}"), ""),
        ];

        CodecTable::new(decoders, encoders)
    }

    /// Resolve a fake codec by name without a discovery pass
    pub fn resolved(descriptors: &[CodecDescriptor], name: &str) -> ResolvedCodec {
        let descriptor = descriptors.iter().find(|d| d.name == name).unwrap().clone();
        let locator = super::locator::CodecLocator::from_env();
        let resolved_path = locator.find_executable(&descriptor.executable_name).unwrap();
        ResolvedCodec {
            descriptor,
            resolved_path,
            version: None,
            overridden_flags: None,
        }
    }
}
