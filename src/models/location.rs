//! Location model for geographic coordinates and metadata

use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// Report target: coordinates plus the name shown to the user
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Display name (beach, lake, town)
    pub name: String,
}

impl Location {
    /// Create a new location
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, name: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            name: name.into(),
        }
    }

    /// Check that the coordinates are inside the valid ranges
    pub fn validate(&self) -> Result<(), FetchError> {
        let lat_ok = (-90.0..=90.0).contains(&self.latitude);
        let lon_ok = (-180.0..=180.0).contains(&self.longitude);
        if lat_ok && lon_ok {
            Ok(())
        } else {
            Err(FetchError::InvalidCoordinates {
                lat: self.latitude,
                lon: self.longitude,
            })
        }
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }

    /// Name usable as a directory and file name component.
    ///
    /// Whitespace is dropped and anything outside `[A-Za-z0-9_-]` is removed,
    /// so "Bells Beach" becomes "BellsBeach".
    #[must_use]
    pub fn file_stem(&self) -> String {
        let stem: String = self
            .name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        if stem.is_empty() {
            "Unnamed".to_string()
        } else {
            stem
        }
    }
}
