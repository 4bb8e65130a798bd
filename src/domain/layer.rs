// Map overlay domain models - GeoJSON features and report layers
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::geo::LngLat;

/// Symbolic name an image is registered under with the map engine
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IconRef(String);

impl IconRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IconRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where an icon comes from and the size it is displayed at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconSpec {
    pub name: IconRef,
    pub url: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Vec<f64> },
}

impl Geometry {
    pub fn point(position: LngLat) -> Self {
        Geometry::Point {
            coordinates: vec![position.lng, position.lat],
        }
    }

    pub fn lng_lat(&self) -> Option<LngLat> {
        match self {
            Geometry::Point { coordinates } => match coordinates.as_slice() {
                [lng, lat, ..] => Some(LngLat::new(*lng, *lat)),
                _ => None,
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureProperties {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub mode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    pub geometry: Geometry,
    #[serde(default)]
    pub properties: FeatureProperties,
}

impl Feature {
    pub fn point(position: LngLat, description: impl Into<String>, mode: impl Into<String>) -> Self {
        Self {
            geometry: Geometry::point(position),
            properties: FeatureProperties {
                description: description.into(),
                mode: mode.into(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Split features by report mode. Every mode gets an entry, empty or not,
    /// so replacing each layer's data clears markers from an earlier query.
    pub fn partition_by_mode(self) -> BTreeMap<ReportMode, FeatureCollection> {
        let mut partitions: BTreeMap<ReportMode, FeatureCollection> = ReportMode::ALL
            .iter()
            .map(|mode| (*mode, FeatureCollection::default()))
            .collect();

        for feature in self.features {
            let mode = ReportMode::from_mode(&feature.properties.mode);
            partitions.entry(mode).or_default().features.push(feature);
        }

        partitions
    }
}

/// Signal-report source, one map layer per mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReportMode {
    Ft8,
    Ft4,
    Wspr,
    Udarp,
    Own,
    Generic,
}

impl ReportMode {
    pub const ALL: [ReportMode; 6] = [
        ReportMode::Ft8,
        ReportMode::Ft4,
        ReportMode::Wspr,
        ReportMode::Udarp,
        ReportMode::Generic,
        ReportMode::Own,
    ];

    pub fn from_mode(mode: &str) -> Self {
        match mode.trim().to_ascii_uppercase().as_str() {
            "FT8" => ReportMode::Ft8,
            "FT4" => ReportMode::Ft4,
            "WSPR" => ReportMode::Wspr,
            "UDARP" => ReportMode::Udarp,
            "OWN" => ReportMode::Own,
            _ => ReportMode::Generic,
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            ReportMode::Ft8 => "ft8",
            ReportMode::Ft4 => "ft4",
            ReportMode::Wspr => "wspr",
            ReportMode::Udarp => "udarp",
            ReportMode::Own => "own",
            ReportMode::Generic => "generic",
        }
    }

    pub fn layer_name(self) -> String {
        format!("{}_layer", self.slug())
    }

    pub fn icon(self) -> IconRef {
        IconRef::new(format!("{}MarkerIcon", self.slug()))
    }

    /// Display size of the marker icon in pixels
    pub fn icon_size(self) -> (u32, u32) {
        match self {
            ReportMode::Own => (26, 32),
            _ => (22, 28),
        }
    }
}
