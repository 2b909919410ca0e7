//! # Platform-specific utilities
//!
//! Questo modulo centralizza la logica cross-platform usata dal locator dei
//! codec: nomi degli eseguibili, lista di directory del PATH, controllo dei
//! permessi di esecuzione e numero di CPU disponibili.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Returns the on-disk file name for an executable (`.exe` appended on Windows)
pub fn executable_file_name(base_name: &str) -> String {
    if cfg!(windows) && !base_name.to_ascii_lowercase().ends_with(".exe") {
        format!("{}.exe", base_name)
    } else {
        base_name.to_string()
    }
}

/// Directories a codec executable is searched in: working directory first,
/// then every entry of PATH in listed order.
pub fn default_search_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = env::current_dir() {
        dirs.push(cwd);
    }

    dirs.extend(search_path_entries(env::var_os("PATH")));
    dirs
}

/// Split a path-list value using the platform separator. Empty entries are dropped.
pub fn search_path_entries(value: Option<OsString>) -> Vec<PathBuf> {
    match value {
        Some(paths) => env::split_paths(&paths)
            .filter(|p| !p.as_os_str().is_empty())
            .collect(),
        None => Vec::new(),
    }
}

/// Check whether the current user may execute the file at `path`
#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    match std::fs::metadata(path) {
        Ok(metadata) => metadata.is_file() && metadata.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

/// On Windows every regular file found with the right name is considered runnable
#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Number of workers used when the thread count is configured as 0
pub fn available_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Get system information for debugging
pub fn system_info() -> SystemInfo {
    SystemInfo {
        os: env::consts::OS,
        arch: env::consts::ARCH,
        family: env::consts::FAMILY,
        cpus: available_cpus(),
    }
}

/// System information structure
#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub os: &'static str,
    pub arch: &'static str,
    pub family: &'static str,
    pub cpus: usize,
}

impl std::fmt::Display for SystemInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} ({}, {} cpus)", self.os, self.arch, self.family, self.cpus)
    }
}
