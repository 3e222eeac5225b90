//! Configuration types for the photo organizer

use crate::error::{Error, Result};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File operation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FileOperation {
    /// Copy files to destination
    #[default]
    Copy,
    /// Move files to destination
    Move,
}

impl FileOperation {
    /// Verb used in action log lines
    pub fn action(&self) -> &'static str {
        match self {
            FileOperation::Copy => "Copying",
            FileOperation::Move => "Moving",
        }
    }
}

/// Which source files are considered on a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Scan every file regardless of age
    Full,
    /// Only bundles newer than the newest file already in the destination
    #[default]
    Incremental,
}

/// What a file is, judged by its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
    /// Image container carrying readable EXIF (JPEG, TIFF, HEIF)
    MetadataImage,
    /// Camera RAW file
    RawImage,
    /// Video file
    Video,
    /// Auxiliary file that travels with a primary image (XMP, AAE, ...)
    Sidecar,
    /// Anything else
    Unknown,
}

impl FileRole {
    /// Photos and videos are worth organizing; sidecars and junk are not
    pub fn is_interesting(&self) -> bool {
        matches!(
            self,
            FileRole::MetadataImage | FileRole::RawImage | FileRole::Video
        )
    }

    /// Whether the metadata resolver should be consulted for this file
    pub fn has_metadata(&self) -> bool {
        matches!(self, FileRole::MetadataImage)
    }
}

/// Extension sets used to classify files. Entries are lowercase, without the dot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionSets {
    /// Images whose embedded capture time and GPS can be read
    pub metadata_images: Vec<String>,

    /// RAW formats
    pub raw_images: Vec<String>,

    /// Video formats
    pub videos: Vec<String>,

    /// Sidecar formats
    pub sidecars: Vec<String>,
}

fn to_strings(exts: &[&str]) -> Vec<String> {
    exts.iter().map(|e| e.to_string()).collect()
}

impl Default for ExtensionSets {
    fn default() -> Self {
        Self {
            metadata_images: to_strings(&["jpg", "jpeg", "tif", "tiff", "heic", "heif"]),
            raw_images: to_strings(&[
                "3fr", "ari", "arw", "bay", "crw", "cr2", "cr3", "cap", "data", "dcs", "dcr",
                "dng", "drf", "eip", "erf", "fff", "gpr", "iiq", "k25", "kdc", "mdc", "mef",
                "mos", "mrw", "nef", "nrw", "obm", "orf", "pef", "ptx", "pxn", "r3d", "raf",
                "raw", "rwl", "rw2", "rwz", "sr2", "srf", "srw", "x3f",
            ]),
            videos: to_strings(&["mp4", "mov", "avi", "mkv"]),
            sidecars: to_strings(&["xmp", "aae", "pp3", "dop", "on1", "thm"]),
        }
    }
}

impl ExtensionSets {
    /// Classify an extension (with or without a leading dot, any case)
    pub fn classify(&self, ext: &str) -> FileRole {
        let ext_lower = ext.trim_start_matches('.').to_lowercase();
        let contains = |set: &[String]| set.iter().any(|e| e.eq_ignore_ascii_case(&ext_lower));

        if contains(&self.metadata_images) {
            FileRole::MetadataImage
        } else if contains(&self.raw_images) {
            FileRole::RawImage
        } else if contains(&self.videos) {
            FileRole::Video
        } else if contains(&self.sidecars) {
            FileRole::Sidecar
        } else {
            FileRole::Unknown
        }
    }

    /// Classify a path by its extension
    pub fn classify_path(&self, path: &Path) -> FileRole {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.classify(e))
            .unwrap_or(FileRole::Unknown)
    }
}

/// Configuration for the photo organizer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directories to read photos from
    pub source_dirs: Vec<PathBuf>,

    /// Where organized photos are placed
    pub dest_dir: PathBuf,

    /// Descend into subdirectories of each source
    pub recursive: bool,

    /// Sources are Android storage roots; scan `android_subdirs` beneath each, recursively
    pub android_root: bool,

    /// Subdirectories of an Android storage root that hold photos
    pub android_subdirs: Vec<String>,

    /// File operation mode
    pub operation: FileOperation,

    /// Log actions without touching the filesystem
    pub dry_run: bool,

    /// Full or incremental scan
    pub scan_mode: ScanMode,

    /// Minimum bundles sharing a label for that label to get its own
    /// subdirectory. Negative disables subdirectories entirely.
    pub min_dir_count: i32,

    /// chrono format string for the date part of a directory name
    pub date_format: String,

    /// Joins the date and place parts of a directory name
    pub label_separator: String,

    /// Extension classification
    pub extensions: ExtensionSets,

    /// Place table (TOML) used instead of the built-in GeoNames cities
    pub places_file: Option<PathBuf>,

    /// Nearest place farther than this yields no geo label; unlimited when unset
    pub geo_max_distance_km: Option<f64>,

    /// Verbose output
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dirs: vec![],
            dest_dir: PathBuf::from("."),
            recursive: false,
            android_root: false,
            android_subdirs: vec!["DCIM".into(), "Pictures".into()],
            operation: FileOperation::default(),
            dry_run: false,
            scan_mode: ScanMode::default(),
            min_dir_count: 3,
            date_format: "%Y-%m-%d".into(),
            label_separator: " - ".into(),
            extensions: ExtensionSets::default(),
            places_file: None,
            geo_max_distance_km: None,
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| Error::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(config)
    }

    /// Directories that will actually be scanned, and whether to recurse
    ///
    /// An Android root expands to its photo subdirectories and always recurses.
    pub fn scan_roots(&self) -> (Vec<PathBuf>, bool) {
        if self.android_root {
            let roots = self
                .source_dirs
                .iter()
                .flat_map(|src| self.android_subdirs.iter().map(move |sub| src.join(sub)))
                .collect();
            (roots, true)
        } else {
            (self.source_dirs.clone(), self.recursive)
        }
    }

    /// Check the configuration for mistakes that would make a run meaningless
    pub fn validate(&self) -> Result<()> {
        if self.source_dirs.is_empty() {
            return Err(Error::Config("no source directories given".into()));
        }

        if self.date_format.trim().is_empty() {
            return Err(Error::Config("date_format must not be empty".into()));
        }

        if StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(Error::Config(format!(
                "invalid date_format '{}'",
                self.date_format
            )));
        }

        if let Some(km) = self.geo_max_distance_km
            && !(km.is_finite() && km >= 0.0)
        {
            return Err(Error::Config(format!(
                "geo_max_distance_km must be a non-negative distance, got {}",
                km
            )));
        }

        // copying into the directory being read would copy files onto themselves
        if self.operation == FileOperation::Copy {
            let dest = normalized(&self.dest_dir);
            if let Some(source) = self.source_dirs.iter().find(|s| normalized(s) == dest) {
                return Err(Error::Config(format!(
                    "cannot copy into source directory {}; use a different destination or move",
                    source.display()
                )));
            }
        }

        // a destination below a source is only rescanned when that source is walked recursively
        let recursive = self.recursive || self.android_root;
        for source in &self.source_dirs {
            if recursive && self.dest_dir != *source && self.dest_dir.starts_with(source) {
                return Err(Error::Config(format!(
                    "destination {} is inside source {}",
                    self.dest_dir.display(),
                    source.display()
                )));
            }
        }

        Ok(())
    }
}

/// Canonical form of `path` when it exists, else the path as given
fn normalized(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
