//! Assigning bundles to destination subdirectories
//!
//! Every bundle gets a label of the form `<date>` or `<date> - <place>`.
//! Labels shared by fewer than `min_dir_count` bundles are not worth their
//! own directory; those bundles go to the catch-all bucket instead, which is
//! the destination root.

use crate::bundle::Bundle;
use crate::config::{Config, ExtensionSets};
use crate::error::Result;
use crate::geo::GeoLabeler;
use crate::metadata::MetadataResolver;
use std::collections::HashMap;
use tracing::debug;

/// Name of the bucket that maps to the destination root
pub const CATCH_ALL: &str = "";

/// Ordered mapping of directory name to the bundles placed there
#[derive(Debug, Default)]
pub struct DirectoryBuckets {
    buckets: Vec<(String, Vec<Bundle>)>,
    index: HashMap<String, usize>,
}

impl DirectoryBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bundles to `name`, creating the bucket at the end if needed
    fn extend(&mut self, name: &str, bundles: impl IntoIterator<Item = Bundle>) {
        let slot = match self.index.get(name) {
            Some(&slot) => slot,
            None => {
                self.buckets.push((name.to_string(), Vec::new()));
                self.index.insert(name.to_string(), self.buckets.len() - 1);
                self.buckets.len() - 1
            }
        };
        self.buckets[slot].1.extend(bundles);
    }

    fn push(&mut self, name: &str, bundle: Bundle) {
        self.extend(name, std::iter::once(bundle));
    }

    /// Bundles assigned to `name`
    pub fn get(&self, name: &str) -> Option<&[Bundle]> {
        self.index
            .get(name)
            .map(|&slot| self.buckets[slot].1.as_slice())
    }

    /// Directory names in creation order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.buckets.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Bundle])> {
        self.buckets
            .iter()
            .map(|(name, bundles)| (name.as_str(), bundles.as_slice()))
    }

    /// Number of directories
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Number of bundles over all directories
    pub fn bundle_count(&self) -> usize {
        self.buckets.iter().map(|(_, bundles)| bundles.len()).sum()
    }
}

impl IntoIterator for DirectoryBuckets {
    type Item = (String, Vec<Bundle>);
    type IntoIter = std::vec::IntoIter<(String, Vec<Bundle>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.buckets.into_iter()
    }
}

/// Computes directory labels and buckets bundles by them
pub struct DirectoryOrganizer<'a> {
    resolver: &'a dyn MetadataResolver,
    labeler: &'a dyn GeoLabeler,
    extensions: &'a ExtensionSets,
    date_format: &'a str,
    separator: &'a str,
}

impl<'a> DirectoryOrganizer<'a> {
    pub fn new(
        config: &'a Config,
        resolver: &'a dyn MetadataResolver,
        labeler: &'a dyn GeoLabeler,
    ) -> Self {
        Self {
            resolver,
            labeler,
            extensions: &config.extensions,
            date_format: &config.date_format,
            separator: &config.label_separator,
        }
    }

    /// Directory name for a single bundle
    pub fn label_for(&self, bundle: &Bundle) -> Result<String> {
        let mut parts = vec![
            bundle.resolve_date(self.resolver, self.extensions, self.date_format)?,
        ];

        if let Some(coordinates) = bundle.resolve_coordinates(self.resolver, self.extensions)
            && let Some(place) = self.labeler.label_for(coordinates)
            && !place.is_empty()
        {
            parts.push(place);
        }

        Ok(parts.join(self.separator))
    }

    /// Bucket `bundles` by label, collapsing labels with fewer than
    /// `min_dir_count` bundles into [`CATCH_ALL`]. A negative count puts
    /// everything into [`CATCH_ALL`] without labeling.
    pub fn organize(
        &self,
        bundles: impl IntoIterator<Item = Bundle>,
        min_dir_count: i32,
    ) -> Result<DirectoryBuckets> {
        let mut result = DirectoryBuckets::new();

        if min_dir_count < 0 {
            result.extend(CATCH_ALL, bundles);
            return Ok(result);
        }

        let mut provisional = DirectoryBuckets::new();
        for bundle in bundles {
            let label = self.label_for(&bundle)?;
            debug!(bundle = %bundle, label = %label, "Labeled bundle");
            provisional.push(&label, bundle);
        }

        let min_dir_count = min_dir_count as usize;
        for (label, bundles) in provisional {
            if bundles.len() >= min_dir_count {
                result.extend(&label, bundles);
            } else {
                debug!(
                    label = %label,
                    count = bundles.len(),
                    min_dir_count,
                    "Too few bundles for own directory"
                );
                result.extend(CATCH_ALL, bundles);
            }
        }

        Ok(result)
    }
}
