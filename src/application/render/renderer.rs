//! Lookup table from precision tier and platform to a prebuilt renderer binary.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::domain::precision::PrecisionTier;

/// Operating-system family the renderer binaries were built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Unix,
    Windows,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Unix, Platform::Windows];

    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }

    fn executable_suffix(self) -> &'static str {
        match self {
            Platform::Unix => "",
            Platform::Windows => ".exe",
        }
    }
}

#[derive(Debug, Error)]
pub enum RendererTableError {
    #[error("renderer executables unavailable: {}", .problems.join("; "))]
    Unavailable { problems: Vec<String> },
}

/// Every `(tier, platform)` pair mapped to its executable path.
#[derive(Debug, Clone)]
pub struct RendererTable {
    entries: HashMap<(PrecisionTier, Platform), PathBuf>,
    platform: Platform,
}

impl RendererTable {
    /// Build the table for binaries named `<stem>-<bits>[.exe]` inside `directory`.
    pub fn new(directory: &Path, stem: &str) -> Self {
        Self::for_platform(directory, stem, Platform::current())
    }

    pub fn for_platform(directory: &Path, stem: &str, platform: Platform) -> Self {
        let entries = PrecisionTier::ALL
            .iter()
            .flat_map(|tier| Platform::ALL.iter().map(move |target| (*tier, *target)))
            .map(|(tier, target)| {
                let name = format!("{stem}-{}{}", tier.bits(), target.executable_suffix());
                ((tier, target), directory.join(name))
            })
            .collect();

        Self { entries, platform }
    }

    /// Executable for `tier` on the platform this table was built for.
    pub fn resolve(&self, tier: PrecisionTier) -> Option<&Path> {
        self.entries
            .get(&(tier, self.platform))
            .map(PathBuf::as_path)
    }

    /// Executables for the active platform, ordered by tier.
    pub fn active(&self) -> Vec<(PrecisionTier, &Path)> {
        PrecisionTier::ALL
            .iter()
            .filter_map(|tier| self.resolve(*tier).map(|path| (*tier, path)))
            .collect()
    }

    /// Check that every tier has a runnable binary for the active platform.
    pub fn validate(&self) -> Result<(), RendererTableError> {
        let mut problems = Vec::new();

        for tier in PrecisionTier::ALL {
            let Some(path) = self.resolve(tier) else {
                problems.push(format!("no entry for {tier} tier"));
                continue;
            };

            match fs::metadata(path) {
                Ok(metadata) if !metadata.is_file() => {
                    problems.push(format!("{} is not a regular file", path.display()));
                }
                Ok(metadata) => {
                    if !is_executable(&metadata) {
                        problems.push(format!("{} is not executable", path.display()));
                    }
                }
                Err(err) => {
                    problems.push(format!("{}: {err}", path.display()));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(RendererTableError::Unavailable { problems })
        }
    }
}

#[cfg(unix)]
fn is_executable(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &fs::Metadata) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn table_covers_every_tier_and_platform() {
        let table =
            RendererTable::for_platform(Path::new("/opt/fractal"), "mandelbrot", Platform::Unix);
        assert_eq!(table.entries.len(), 6);
        assert_eq!(
            table.resolve(PrecisionTier::Extended),
            Some(Path::new("/opt/fractal/mandelbrot-80"))
        );

        let windows =
            RendererTable::for_platform(Path::new("bin"), "mandelbrot", Platform::Windows);
        assert_eq!(
            windows.resolve(PrecisionTier::Extended2),
            Some(Path::new("bin").join("mandelbrot-128.exe").as_path())
        );
    }

    #[test]
    fn active_entries_are_ordered_by_tier() {
        let table = RendererTable::for_platform(Path::new("r"), "m", Platform::Unix);
        let tiers: Vec<PrecisionTier> = table.active().into_iter().map(|(tier, _)| tier).collect();
        assert_eq!(tiers, PrecisionTier::ALL.to_vec());
    }

    #[test]
    fn validate_reports_every_missing_binary() {
        let dir = TempDir::new().expect("temp dir");
        let table = RendererTable::for_platform(dir.path(), "mandelbrot", Platform::Unix);

        let err = table.validate().expect_err("binaries missing");
        let RendererTableError::Unavailable { problems } = err;
        assert_eq!(problems.len(), 3);
        assert!(problems[0].contains("mandelbrot-64"));
    }

    #[cfg(unix)]
    #[test]
    fn validate_accepts_executable_binaries_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().expect("temp dir");
        for bits in [64, 80, 128] {
            let path = dir.path().join(format!("mandelbrot-{bits}"));
            fs::write(&path, "#!/bin/sh\n").expect("write stub");
            let mode = if bits == 128 { 0o644 } else { 0o755 };
            fs::set_permissions(&path, fs::Permissions::from_mode(mode)).expect("set perms");
        }

        let table = RendererTable::for_platform(dir.path(), "mandelbrot", Platform::Unix);
        let err = table.validate().expect_err("128-bit binary not executable");
        let RendererTableError::Unavailable { problems } = err;
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("not executable"));

        let path = dir.path().join("mandelbrot-128");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("set perms");
        table.validate().expect("all binaries runnable");
    }
}
