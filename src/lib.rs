//! Photo Organizer - sort unlabeled photos into dated directories
//!
//! This library provides functionality for organizing photos and videos
//! from sources such as phone picture folders:
//! - Bundling of RAW + JPEG + sidecar files that share a base name
//! - EXIF capture time and GPS extraction for images
//! - Offline place names for GPS positions
//! - Date (and place) labeled destination directories, with small
//!   directories collapsed into the destination root
//! - Incremental scanning and dry runs

pub mod bundle;
pub mod cli;
pub mod config;
pub mod error;
pub mod geo;
pub mod metadata;
pub mod mover;
pub mod organize;
pub mod process;
pub mod scan;

pub use bundle::{Bundle, BundleGrouper};
pub use cli::Cli;
pub use config::{Config, ExtensionSets, FileOperation, FileRole, ScanMode};
pub use error::{Error, Result};
pub use geo::{GeoLabeler, StaticGeoLabeler};
pub use metadata::{Coordinates, ExifResolver, MediaMetadata, MetadataResolver};
pub use mover::{Action, FileMover};
pub use organize::{CATCH_ALL, DirectoryBuckets, DirectoryOrganizer};
pub use process::{Processor, RunSummary};
pub use scan::Scanner;
