//! # Codec Locator
//!
//! This module finds codec executables on the host:
//! - Current working directory first
//! - Then every PATH entry, in listed order
//!
//! A candidate must be a regular file with the exact executable name and be
//! executable by the current user. Optional probes then verify the build
//! variant and read a version string.

use crate::codec::descriptor::{CodecDescriptor, CommandLine, SupportProbe, TemplateValues, VersionProbe};
use crate::error::CodecError;
use crate::platform;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Probes that do not answer within this window are treated as failed
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// A descriptor with a located, verified executable attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCodec {
    pub descriptor: CodecDescriptor,
    pub resolved_path: PathBuf,
    pub version: Option<String>,
    pub overridden_flags: Option<String>,
}

impl ResolvedCodec {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn extension(&self) -> &str {
        &self.descriptor.file_extension
    }

    /// Flags used for invocation: the override when set, otherwise the defaults
    pub fn flags(&self) -> &str {
        self.overridden_flags
            .as_deref()
            .unwrap_or(&self.descriptor.default_flags)
    }

    /// Probed version line, or "unknown" when the codec has no probe
    pub fn version_label(&self) -> &str {
        self.version.as_deref().unwrap_or("unknown")
    }

    pub fn override_flags(&mut self, flags: impl Into<String>) {
        self.overridden_flags = Some(flags.into());
    }

    /// Render the invocation for this codec
    pub fn command_line(&self, input: Option<&Path>, output: Option<&Path>) -> Result<CommandLine, CodecError> {
        self.descriptor.arguments.render(
            self.name(),
            &TemplateValues {
                executable: &self.resolved_path,
                input,
                output,
                flags: self.flags(),
            },
        )
    }
}

impl std::fmt::Display for ResolvedCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} : {}", self.name(), self.resolved_path.display())
    }
}

/// Searches a fixed list of directories for codec executables
#[derive(Debug, Clone)]
pub struct CodecLocator {
    search_dirs: Vec<PathBuf>,
}

impl CodecLocator {
    /// Working directory, then PATH
    pub fn from_env() -> Self {
        Self::with_search_dirs(platform::default_search_dirs())
    }

    pub fn with_search_dirs(search_dirs: Vec<PathBuf>) -> Self {
        Self { search_dirs }
    }

    /// First regular file named `executable_name` in the search directories
    pub fn find_executable(&self, executable_name: &str) -> Option<PathBuf> {
        let file_name = platform::executable_file_name(executable_name);
        debug!("Checking {} paths for {}", self.search_dirs.len(), file_name);

        self.search_dirs
            .iter()
            .map(|dir| dir.join(&file_name))
            .find(|candidate| candidate.is_file())
    }

    /// Locate and verify the executable for `descriptor`
    pub async fn locate(&self, descriptor: &CodecDescriptor) -> Result<ResolvedCodec, CodecError> {
        let path = self
            .find_executable(&descriptor.executable_name)
            .ok_or_else(|| CodecError::NotFound {
                executable: descriptor.executable_name.clone(),
            })?;
        debug!("Found executable for {}: {}", descriptor.name, path.display());

        if !platform::is_executable(&path) {
            return Err(CodecError::NotExecutable { path });
        }

        Self::check_support(&path, &descriptor.support_probe).await?;
        let version = Self::probe_version(&path, &descriptor.version_probe).await;

        Ok(ResolvedCodec {
            descriptor: descriptor.clone(),
            resolved_path: path,
            version,
            overridden_flags: None,
        })
    }

    async fn check_support(path: &Path, probe: &SupportProbe) -> Result<(), CodecError> {
        let (args, feature) = match probe {
            SupportProbe::None => return Ok(()),
            SupportProbe::ExitsZero { args } => (args, None),
            SupportProbe::ListsFeature { args, feature } => (args, Some(feature)),
        };
        let unsupported = || CodecError::UnsupportedBuild {
            path: path.to_path_buf(),
            feature: feature.cloned().unwrap_or_else(|| "this codec".to_string()),
        };

        let output = run_probe(path, args).await.ok_or_else(unsupported)?;
        if !output.status.success() {
            debug!("Support probe for {} exited with {}", path.display(), output.status);
            return Err(unsupported());
        }

        if let Some(feature) = feature {
            let listed = String::from_utf8_lossy(&output.stdout).contains(feature.as_str())
                || String::from_utf8_lossy(&output.stderr).contains(feature.as_str());
            if !listed {
                debug!("{} does not list {}", path.display(), feature);
                return Err(unsupported());
            }
        }

        Ok(())
    }

    async fn probe_version(path: &Path, probe: &VersionProbe) -> Option<String> {
        let args = match probe {
            VersionProbe::None => return None,
            VersionProbe::FirstLine { args } => args,
        };

        let output = run_probe(path, args).await?;
        let version = first_line(&output.stdout).or_else(|| first_line(&output.stderr));
        debug!("Version of {}: {:?}", path.display(), version);
        version
    }
}

impl Default for CodecLocator {
    fn default() -> Self {
        Self::from_env()
    }
}

async fn run_probe(path: &Path, args: &[String]) -> Option<std::process::Output> {
    let child = Command::new(path)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    match tokio::time::timeout(PROBE_TIMEOUT, child).await {
        Ok(Ok(output)) => Some(output),
        Ok(Err(e)) => {
            debug!("Probe {} {:?} failed to run: {}", path.display(), args, e);
            None
        }
        Err(_) => {
            debug!("Probe {} {:?} timed out", path.display(), args);
            None
        }
    }
}

/// First non-empty line, trimmed
fn first_line(bytes: &[u8]) -> Option<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}
