//! Finding photo bundles in the source directories
//!
//! Each visited directory is listed, its files grouped into bundles, and
//! bundles without any photo or video dropped. In incremental mode bundles
//! that are not newer than the newest file in the destination are dropped
//! as well, so repeated runs against the same phone only pick up new shots.

use crate::bundle::{Bundle, BundleGrouper};
use crate::config::{Config, ScanMode};
use chrono::{DateTime, Local};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Lazily produces the bundles to organize
#[derive(Debug)]
pub struct Scanner<'a> {
    config: &'a Config,
    newer_than: Option<SystemTime>,
}

impl<'a> Scanner<'a> {
    /// In incremental mode this walks the destination once to find its newest file
    pub fn new(config: &'a Config) -> Self {
        let newer_than = match config.scan_mode {
            ScanMode::Full => None,
            ScanMode::Incremental => newest_modified_time(&config.dest_dir),
        };
        Self { config, newer_than }
    }

    /// Only bundles strictly newer than this are produced
    pub fn newer_than(&self) -> Option<SystemTime> {
        self.newer_than
    }

    /// Interesting bundles from every source directory, in scan order
    pub fn bundles(&self) -> impl Iterator<Item = Bundle> + '_ {
        let (roots, recursive) = self.config.scan_roots();

        roots
            .into_iter()
            .flat_map(move |root| {
                self.log_start(&root, recursive);
                directories(root, recursive)
            })
            .flat_map(|dir| {
                let names = files_in(&dir);
                BundleGrouper::new(dir, names)
            })
            .filter(move |bundle| self.keep(bundle))
    }

    fn log_start(&self, root: &Path, recursive: bool) {
        let mode = if recursive {
            "recursively"
        } else {
            "not recursively"
        };
        match self.newer_than {
            Some(cutoff) => info!(
                "Reading {} {}, looking for files newer than {}",
                root.display(),
                mode,
                DateTime::<Local>::from(cutoff).format("%Y-%m-%d %H:%M:%S")
            ),
            None => info!("Reading {} {}", root.display(), mode),
        }
    }

    fn keep(&self, bundle: &Bundle) -> bool {
        if !bundle.is_interesting(&self.config.extensions) {
            debug!(bundle = %bundle, "Skipping bundle without photos or videos");
            return false;
        }

        let Some(cutoff) = self.newer_than else {
            return true;
        };

        match bundle.oldest_modified_time() {
            Ok(modified) if modified > cutoff => true,
            Ok(_) => {
                debug!(bundle = %bundle, "Skipping bundle older than destination");
                false
            }
            Err(e) => {
                warn!(bundle = %bundle, error = %e, "Cannot read modification time, skipping");
                false
            }
        }
    }
}

/// `root` and, when recursive, every directory below it
fn directories(root: PathBuf, recursive: bool) -> impl Iterator<Item = PathBuf> {
    let exists = root.is_dir();
    if !exists {
        warn!(root = %root.display(), "Source directory does not exist, skipping");
    }

    let max_depth = if recursive { usize::MAX } else { 0 };
    exists
        .then(|| {
            WalkDir::new(root)
                .max_depth(max_depth)
                .sort_by_file_name()
                .into_iter()
        })
        .into_iter()
        .flatten()
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_dir() => Some(entry.into_path()),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Cannot read directory, skipping");
                None
            }
        })
}

/// Names of the regular files directly inside `dir`
fn files_in(dir: &Path) -> Vec<OsString> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Cannot list directory, skipping");
            return Vec::new();
        }
    };

    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name())
        .collect()
}

/// Modification time of the newest file anywhere under `dir`
pub fn newest_modified_time(dir: &Path) -> Option<SystemTime> {
    if !dir.exists() {
        debug!(dir = %dir.display(), "Destination does not exist yet");
        return None;
    }

    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok()?.modified().ok())
        .max()
}
