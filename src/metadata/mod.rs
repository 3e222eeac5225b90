//! Embedded metadata extraction
//!
//! Reads the capture time and GPS position recorded inside a media file.
//! Extraction never fails from the caller's point of view: unsupported,
//! unreadable, or corrupt files simply yield empty [`MediaMetadata`].

pub mod exif;

use chrono::NaiveDateTime;
use std::path::Path;

pub use self::exif::ExifResolver;

/// A latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Metadata of interest for organizing a file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaMetadata {
    /// Original shooting time, in the camera's local wall-clock time
    pub captured_at: Option<NaiveDateTime>,
    /// Where the photo was taken
    pub coordinates: Option<Coordinates>,
}

impl MediaMetadata {
    pub fn is_empty(&self) -> bool {
        self.captured_at.is_none() && self.coordinates.is_none()
    }
}

/// Reads [`MediaMetadata`] from a single file
pub trait MetadataResolver {
    /// Must return empty metadata rather than fail
    fn extract(&self, path: &Path) -> MediaMetadata;
}

/// Resolver that never finds anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetadata;

impl MetadataResolver for NoMetadata {
    fn extract(&self, _path: &Path) -> MediaMetadata {
        MediaMetadata::default()
    }
}
