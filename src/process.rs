//! End-to-end run: scan, organize, move
//!
//! Runs single-threaded. Bundles stream from the scanner into the organizer,
//! which needs all of them before it can collapse small directories; the
//! mover then walks the finished buckets in order. A failure while moving
//! aborts the run and leaves already-moved bundles where they are.

use crate::config::Config;
use crate::error::Result;
use crate::geo::{GeoLabeler, StaticGeoLabeler};
use crate::metadata::{ExifResolver, MetadataResolver};
use crate::mover::{Action, FileMover};
use crate::organize::DirectoryOrganizer;
use crate::scan::Scanner;
use tracing::{Level, info, span};

/// What a run did (or, in dry-run mode, would have done)
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Bundles placed
    pub bundles: usize,
    /// Individual files placed
    pub files: usize,
    /// Destination directories used, the root included
    pub directories: usize,
    /// Every logged action, in order
    pub actions: Vec<Action>,
}

impl RunSummary {
    pub fn summary(&self) -> String {
        format!(
            "Bundles: {}, Files: {}, Directories: {}",
            self.bundles, self.files, self.directories
        )
    }
}

/// Main processor for organizing media files
pub struct Processor {
    config: Config,
    resolver: Box<dyn MetadataResolver>,
    labeler: Box<dyn GeoLabeler>,
}

impl Processor {
    /// Processor reading EXIF and labeling with GeoNames or the configured place table
    pub fn new(config: Config) -> Result<Self> {
        let labeler = StaticGeoLabeler::from_config(&config)?;

        Ok(Self::with_collaborators(
            config,
            Box::new(ExifResolver),
            Box::new(labeler),
        ))
    }

    /// Processor with caller-supplied metadata and geo lookups
    pub fn with_collaborators(
        config: Config,
        resolver: Box<dyn MetadataResolver>,
        labeler: Box<dyn GeoLabeler>,
    ) -> Self {
        Self {
            config,
            resolver,
            labeler,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the whole pipeline once
    pub fn run(&self) -> Result<RunSummary> {
        let _span = span!(Level::INFO, "processor_run").entered();

        let scanner = Scanner::new(&self.config);
        let organizer =
            DirectoryOrganizer::new(&self.config, self.resolver.as_ref(), self.labeler.as_ref());
        let buckets = organizer.organize(scanner.bundles(), self.config.min_dir_count)?;

        let bundles = buckets.bundle_count();
        let files: usize = buckets
            .iter()
            .flat_map(|(_, bundles)| bundles.iter())
            .map(|bundle| bundle.len())
            .sum();
        info!(
            bundles,
            files,
            directories = buckets.len(),
            "Organized photo bundles"
        );

        if bundles == 0 {
            info!("No photos to organize");
        }

        let mover = FileMover::from_config(&self.config);
        let actions = mover.execute(&buckets)?;

        let summary = RunSummary {
            bundles,
            files,
            directories: buckets.len(),
            actions,
        };
        info!("{}", summary.summary());

        Ok(summary)
    }
}
