//! Offline geographic labels
//!
//! Maps coordinates to the nearest named place. By default that is the
//! worldwide GeoNames city table bundled with `reverse_geocoder`; a TOML
//! table of `[[place]]` rows can replace it. Lookups are pure: a miss is
//! `None`, never an error.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::metadata::Coordinates;
use reverse_geocoder::ReverseGeocoder;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Mean Earth radius in kilometres
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Maps coordinates to a short place name
pub trait GeoLabeler {
    /// City, else country, else `None`
    fn label_for(&self, coordinates: Coordinates) -> Option<String>;
}

/// A labeler that never labels anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeoLabels;

impl GeoLabeler for NoGeoLabels {
    fn label_for(&self, _coordinates: Coordinates) -> Option<String> {
        None
    }
}

/// One reference point of a place table
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Place {
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Place {
    fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    fn label(&self) -> Option<String> {
        [&self.city, &self.country]
            .into_iter()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Deserialize)]
struct PlaceTable {
    #[serde(default)]
    place: Vec<Place>,
}

enum Places {
    GeoNames(ReverseGeocoder),
    Table(Vec<Place>),
}

/// Nearest-place labeler over a static set of places
pub struct StaticGeoLabeler {
    places: Places,
    max_distance_km: Option<f64>,
}

impl StaticGeoLabeler {
    /// Labeler over the GeoNames cities compiled into `reverse_geocoder`
    pub fn geonames(max_distance_km: Option<f64>) -> Self {
        Self {
            places: Places::GeoNames(ReverseGeocoder::new()),
            max_distance_km,
        }
    }

    /// Labeler over an explicit list of places
    pub fn new(places: Vec<Place>, max_distance_km: Option<f64>) -> Self {
        Self {
            places: Places::Table(places),
            max_distance_km,
        }
    }

    /// Labeler over a user-supplied TOML table of `[[place]]` rows
    pub fn load_from_file(path: &Path, max_distance_km: Option<f64>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let places = parse_places(&content, &path.display().to_string())?;
        info!(path = %path.display(), places = places.len(), "Loaded place table");
        Ok(Self::new(places, max_distance_km))
    }

    /// `places_file` when configured, GeoNames otherwise
    pub fn from_config(config: &Config) -> Result<Self> {
        match &config.places_file {
            Some(path) => Self::load_from_file(path, config.geo_max_distance_km),
            None => Ok(Self::geonames(config.geo_max_distance_km)),
        }
    }

    /// Closest known place
    fn nearest(&self, coordinates: Coordinates) -> Option<Place> {
        match &self.places {
            Places::GeoNames(geocoder) => {
                let record = geocoder
                    .search((coordinates.latitude, coordinates.longitude))
                    .record;
                Some(Place {
                    city: record.name.clone(),
                    country: record.cc.clone(),
                    latitude: record.lat,
                    longitude: record.lon,
                })
            }
            Places::Table(places) => places
                .iter()
                .min_by(|a, b| {
                    let da = haversine_km(coordinates, a.coordinates());
                    let db = haversine_km(coordinates, b.coordinates());
                    da.total_cmp(&db)
                })
                .cloned(),
        }
    }
}

impl GeoLabeler for StaticGeoLabeler {
    fn label_for(&self, coordinates: Coordinates) -> Option<String> {
        let place = self.nearest(coordinates)?;
        if let Some(max_km) = self.max_distance_km {
            let distance = haversine_km(coordinates, place.coordinates());
            if distance > max_km {
                debug!(
                    ?coordinates,
                    nearest = ?place.label(),
                    distance_km = distance,
                    "No place close enough"
                );
                return None;
            }
        }
        place.label()
    }
}

fn parse_places(content: &str, origin: &str) -> Result<Vec<Place>> {
    let table: PlaceTable = toml::from_str(content).map_err(|e| Error::PlaceTable {
        origin: origin.to_string(),
        message: e.to_string(),
    })?;
    Ok(table.place)
}

/// Great-circle distance between two points
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let d_lat = lat2 - lat1;
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}
