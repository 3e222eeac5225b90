//! Bundles of sibling files that are organized as one unit
//!
//! A DSLR typically writes a RAW and a JPEG for every shot, and raw converters
//! add an `.xmp` sidecar next to them. All files sharing a base name (path
//! minus extension) form a [`Bundle`] and always land in the same directory.

use crate::config::{ExtensionSets, FileOperation};
use crate::error::{Error, Result};
use crate::metadata::{Coordinates, MediaMetadata, MetadataResolver};
use crate::mover;
use chrono::{DateTime, Local, NaiveDateTime};
use std::cell::OnceCell;
use std::ffi::OsString;
use std::fmt::{self, Write as _};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::trace;

/// Split a path into its base (extension removed) and lowercase extension
fn split_base(path: &Path) -> (PathBuf, String) {
    match path.extension() {
        Some(ext) => (
            path.with_extension(""),
            ext.to_string_lossy().to_lowercase(),
        ),
        None => (path.to_path_buf(), String::new()),
    }
}

/// One or more files sharing a base name
#[derive(Debug)]
pub struct Bundle {
    /// Member paths in discovery order
    paths: Vec<PathBuf>,
    /// Shared path without extension
    base: PathBuf,
    /// Lowercase extension of each member, parallel to `paths`
    extensions: Vec<String>,
    /// Metadata of the first metadata-capable member, read at most once
    metadata: OnceCell<MediaMetadata>,
}

impl Bundle {
    /// Start a bundle containing only `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (base, extension) = split_base(&path);
        Self {
            paths: vec![path],
            base,
            extensions: vec![extension],
            metadata: OnceCell::new(),
        }
    }

    /// Add `path` if it differs from this bundle only by extension
    ///
    /// Returns false and leaves the bundle untouched otherwise.
    pub fn try_add(&mut self, path: &Path) -> bool {
        let (base, extension) = split_base(path);
        if base != self.base {
            return false;
        }

        self.paths.push(path.to_path_buf());
        self.extensions.push(extension);
        true
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// True if any member is a photo or video
    pub fn is_interesting(&self, extensions: &ExtensionSets) -> bool {
        self.extensions
            .iter()
            .any(|ext| extensions.classify(ext).is_interesting())
    }

    /// Modification time of the oldest member
    pub fn oldest_modified_time(&self) -> Result<SystemTime> {
        let mut oldest: Option<SystemTime> = None;
        for path in &self.paths {
            let modified = fs::metadata(path)?.modified()?;
            oldest = Some(oldest.map_or(modified, |o| o.min(modified)));
        }
        oldest.ok_or_else(|| Error::InvalidPath {
            path: self.base.clone(),
        })
    }

    /// Embedded metadata of this bundle, read on first call and cached
    ///
    /// Only the first member the resolver understands is consulted. Bundles
    /// without such a member have empty metadata.
    pub fn metadata(
        &self,
        resolver: &dyn MetadataResolver,
        extensions: &ExtensionSets,
    ) -> &MediaMetadata {
        self.metadata.get_or_init(|| {
            let source = self
                .paths
                .iter()
                .find(|path| extensions.classify_path(path).has_metadata());

            match source {
                Some(path) => {
                    trace!(path = %path.display(), "Reading bundle metadata");
                    resolver.extract(path)
                }
                None => MediaMetadata::default(),
            }
        })
    }

    /// Original shooting time recorded in the bundle's metadata
    pub fn capture_time(
        &self,
        resolver: &dyn MetadataResolver,
        extensions: &ExtensionSets,
    ) -> Option<NaiveDateTime> {
        self.metadata(resolver, extensions).captured_at
    }

    /// Date label: capture time if known, else the oldest modification time
    pub fn resolve_date(
        &self,
        resolver: &dyn MetadataResolver,
        extensions: &ExtensionSets,
        date_format: &str,
    ) -> Result<String> {
        let when = match self.capture_time(resolver, extensions) {
            Some(captured) => captured,
            None => DateTime::<Local>::from(self.oldest_modified_time()?).naive_local(),
        };

        let mut label = String::new();
        write!(label, "{}", when.format(date_format))
            .map_err(|_| Error::Config(format!("invalid date format '{}'", date_format)))?;
        Ok(label)
    }

    /// GPS position recorded in the bundle's metadata
    pub fn resolve_coordinates(
        &self,
        resolver: &dyn MetadataResolver,
        extensions: &ExtensionSets,
    ) -> Option<Coordinates> {
        self.metadata(resolver, extensions).coordinates
    }

    /// Move every member into `destination`, keeping file names
    pub fn move_to(&self, destination: &Path) -> Result<()> {
        self.transfer_to(destination, FileOperation::Move)
    }

    /// Copy every member into `destination`, keeping file names
    pub fn copy_to(&self, destination: &Path) -> Result<()> {
        self.transfer_to(destination, FileOperation::Copy)
    }

    /// Members already handled stay where they went if a later one fails
    pub fn transfer_to(&self, destination: &Path, operation: FileOperation) -> Result<()> {
        for path in &self.paths {
            let file_name = path.file_name().ok_or_else(|| Error::InvalidPath {
                path: path.clone(),
            })?;
            let target = destination.join(file_name);
            match operation {
                FileOperation::Move => mover::move_file(path, &target)?,
                FileOperation::Copy => mover::copy_file(path, &target)?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for Bundle {
    /// `path` for a single file, `base.[ext1,ext2]` for several
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let [path] = self.paths.as_slice() {
            return write!(f, "{}", path.display());
        }
        write!(f, "{}.[{}]", self.base.display(), self.extensions.join(","))
    }
}

/// Groups the files of one directory into bundles
///
/// File names are sorted so that siblings sharing a base are adjacent; each
/// run of names that fit the current bundle is emitted as one [`Bundle`].
/// The iterator is lazy and yields bundles in order of first appearance.
#[derive(Debug)]
pub struct BundleGrouper {
    directory: PathBuf,
    filenames: std::vec::IntoIter<OsString>,
    current: Option<Bundle>,
}

impl BundleGrouper {
    pub fn new<I, S>(directory: impl Into<PathBuf>, filenames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut filenames: Vec<OsString> = filenames.into_iter().map(Into::into).collect();
        filenames.sort();

        Self {
            directory: directory.into(),
            filenames: filenames.into_iter(),
            current: None,
        }
    }
}

impl Iterator for BundleGrouper {
    type Item = Bundle;

    fn next(&mut self) -> Option<Bundle> {
        for name in self.filenames.by_ref() {
            let path = self.directory.join(&name);

            if let Some(current) = self.current.as_mut() {
                if current.try_add(&path) {
                    continue;
                }
                // does not fit, emit and start over with this file
                return self.current.replace(Bundle::new(path));
            }

            self.current = Some(Bundle::new(path));
        }

        self.current.take()
    }
}

impl std::iter::FusedIterator for BundleGrouper {}
