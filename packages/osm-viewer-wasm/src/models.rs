// Shared data structures: query region and load outcomes
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{LoadError, ViewerError};
use crate::wkb_decoder::GeometryKind;

/// Query region in lon/lat: (min_lon, min_lat, max_lon, max_lat).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self, ViewerError> {
        let coords = [min_lon, min_lat, max_lon, max_lat];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(ViewerError::Config(format!(
                "bounding box coordinates must be finite, got {:?}",
                coords
            )));
        }
        Ok(Self { min_lon, min_lat, max_lon, max_lat })
    }

    /// Server path for a layer, coordinates printed exactly as given.
    pub fn request_path(&self, layer: Layer) -> String {
        format!(
            "/{}/{}/{}/{}/{}",
            layer, self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

impl TryFrom<[f64; 4]> for BoundingBox {
    type Error = ViewerError;

    fn try_from(c: [f64; 4]) -> Result<Self, Self::Error> {
        BoundingBox::new(c[0], c[1], c[2], c[3])
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.min_lon, b.min_lat, b.max_lon, b.max_lat]
    }
}

/// The two server layers the viewer loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Buildings,
    Streets,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::Buildings => f.write_str("buildings"),
            Layer::Streets => f.write_str("streets"),
        }
    }
}

/// A collection member that was not converted into a mesh.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedGeometry {
    pub layer: Layer,
    pub index: usize,
    pub kind: GeometryKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchReport {
    pub layer: Layer,
    pub meshes_added: usize,
    pub skipped: Vec<SkippedGeometry>,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<LoadError>,
}

impl BranchReport {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    /// Newest load; its meshes are in the scene and a redraw was requested.
    Completed,
    /// A newer load started before this one settled; its meshes were dropped.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    pub generation: u64,
    pub status: LoadStatus,
    pub buildings: BranchReport,
    pub streets: BranchReport,
}

impl LoadReport {
    pub fn meshes_added(&self) -> usize {
        self.buildings.meshes_added + self.streets.meshes_added
    }

    pub fn skipped_count(&self) -> usize {
        self.buildings.skipped.len() + self.streets.skipped.len()
    }

    pub fn is_partial_failure(&self) -> bool {
        self.buildings.failed() != self.streets.failed()
    }
}

fn serialize_error<S: serde::Serializer>(error: &Option<LoadError>, s: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => s.serialize_some(&e.to_string()),
        None => s.serialize_none(),
    }
}
