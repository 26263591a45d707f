//! Input discovery and post-run cleanup.
//!
//! Paths named on the command line are explicit: a missing or unreadable
//! explicit file fails the run. Directories are walked recursively and
//! every file found is a discovered input, where problems only cost a
//! warning.

use std::path::{Path, PathBuf};

use dnssoc_core::Result;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A log file selected for correlation
#[derive(Debug, Clone)]
pub struct InputFile {
    pub path: PathBuf,
    /// Named directly rather than discovered inside a directory
    pub explicit: bool,
}

/// Expand the given paths into concrete input files.
///
/// Files are kept as explicit inputs. Directories are walked in file-name
/// order and contribute their files as discovered inputs. A path that
/// cannot be stat-ed at all is an error, unreadable entries inside a
/// directory are skipped with a warning.
pub fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<InputFile>> {
    let mut inputs = Vec::new();
    for path in paths {
        let metadata = std::fs::metadata(path)?;
        if metadata.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                match entry {
                    Ok(entry) if entry.file_type().is_file() => inputs.push(InputFile {
                        path: entry.into_path(),
                        explicit: false,
                    }),
                    Ok(_) => {}
                    Err(e) => {
                        warn!(dir = %path.display(), error = %e, "skipping unreadable entry");
                    }
                }
            }
        } else {
            inputs.push(InputFile {
                path: path.clone(),
                explicit: true,
            });
        }
    }
    debug!(inputs = inputs.len(), "collected input files");
    Ok(inputs)
}

/// Delete processed inputs, directories included.
///
/// Deletion failures are warnings only; the matches are already on disk
/// at this point.
pub fn remove_inputs(paths: &[PathBuf]) {
    for path in paths {
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "input already gone");
                continue;
            }
        };
        let removed = if metadata.is_dir() {
            std::fs::remove_dir_all(path)
        } else {
            std::fs::remove_file(path)
        };
        match removed {
            Ok(()) => debug!(path = %path.display(), "input removed"),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove input"),
        }
    }
}
