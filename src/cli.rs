//! CLI argument parsing with clap

use crate::config::{Config, FileOperation, ScanMode};
use clap::Parser;
use std::path::PathBuf;

/// Automatically organize photos from unlabeled sources such as phone picture folders.
///
/// Photos and videos are grouped with their sidecar files and placed into
/// dated subdirectories, named after the place they were taken when the
/// photo carries a GPS position.
#[derive(Parser, Debug)]
#[command(name = "photo-organizer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (TOML format)
    ///
    /// CLI arguments override config file settings.
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Search source directory recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Source is an Android storage root; check the subdirectories where
    /// Android puts photos (DCIM, Pictures)
    #[arg(long)]
    pub android_root: bool,

    /// Move files instead of copying
    #[arg(short = 'm', long = "move")]
    pub move_files: bool,

    /// Print actions but do not execute them
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Scan all files, not only those newer than the newest file in DEST_DIR
    #[arg(short, long)]
    pub full: bool,

    /// Minimum number of photos sharing a description to get their own
    /// subdirectory; -1 never uses subdirectories [default: 3]
    #[arg(long, allow_negative_numbers = true)]
    pub min_dir_count: Option<i32>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Output log format as JSON
    #[arg(long)]
    pub json_log: bool,

    /// Also write the log to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Location of photos to organize
    #[arg(required_unless_present = "config")]
    pub source_dir: Option<PathBuf>,

    /// Location of where to place organized photos [default: .]
    pub dest_dir: Option<PathBuf>,
}

impl Cli {
    /// Merge CLI arguments with config from file
    /// CLI arguments take precedence over config file settings
    pub fn merge_with_config(&self, mut config: Config) -> Config {
        if let Some(ref source) = self.source_dir {
            config.source_dirs = vec![source.clone()];
        }
        if let Some(ref dest) = self.dest_dir {
            config.dest_dir = dest.clone();
        }
        if self.recursive {
            config.recursive = true;
        }
        if self.android_root {
            config.android_root = true;
        }
        if self.move_files {
            config.operation = FileOperation::Move;
        }
        if self.dry_run {
            config.dry_run = true;
        }
        if self.full {
            config.scan_mode = ScanMode::Full;
        }
        if let Some(count) = self.min_dir_count {
            config.min_dir_count = count;
        }
        if self.verbose {
            config.verbose = true;
        }

        config
    }

    /// Convert CLI arguments to Config (when no config file is used)
    pub fn to_config(&self) -> Config {
        self.merge_with_config(Config::default())
    }
}
