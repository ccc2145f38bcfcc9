use futures::future::LocalBoxFuture;
use geo_types::{Geometry, Polygon};
use std::rc::Rc;

use crate::error::LoadError;
use crate::extrude::ExtrudeSettings;
use crate::mesh::{self, Material, Mesh};
use crate::models::{BoundingBox, BranchReport, Layer, SkippedGeometry};
use crate::shape::shape_from_polygon;
use crate::wkb_decoder::{self, GeometryKind};

/// Where geometry bodies come from. The browser implementation issues an HTTP
/// GET; tests script the responses.
pub trait GeometrySource {
    fn fetch(&self, path: &str) -> LocalBoxFuture<'_, Result<Vec<u8>, LoadError>>;
}

/// Result of one branch before its meshes are handed to the scene.
#[derive(Debug, Default)]
pub struct BranchOutput {
    pub meshes: Vec<Mesh>,
    pub skipped: Vec<SkippedGeometry>,
    pub error: Option<LoadError>,
}

impl BranchOutput {
    fn failed(error: LoadError) -> Self {
        Self { error: Some(error), ..Self::default() }
    }

    /// Report for the caller; `meshes_added` is zero when the meshes were discarded.
    pub fn report(&self, layer: Layer, meshes_added: usize) -> BranchReport {
        BranchReport {
            layer,
            meshes_added,
            skipped: self.skipped.clone(),
            error: self.error.clone(),
        }
    }
}

/// Fetches, decodes and converts the building and street layers.
#[derive(Clone)]
pub struct DataLoader {
    source: Rc<dyn GeometrySource>,
    extrude_settings: ExtrudeSettings,
    buildings_material: Material,
    streets_material: Material,
}

impl DataLoader {
    pub fn new(
        source: Rc<dyn GeometrySource>,
        extrude_settings: ExtrudeSettings,
        buildings_material: Material,
        streets_material: Material,
    ) -> Self {
        Self { source, extrude_settings, buildings_material, streets_material }
    }

    pub async fn fetch_layer(&self, layer: Layer, bbox: &BoundingBox) -> Result<Geometry<f64>, LoadError> {
        let path = bbox.request_path(layer);
        let body = self.source.fetch(&path).await?;
        log::debug!("Fetched {} bytes from {}", body.len(), path);
        wkb_decoder::decode(&body)
    }

    /// Fetch and convert one layer. Failures are logged and end up in the output, never retried.
    pub async fn load_layer(&self, layer: Layer, bbox: &BoundingBox) -> BranchOutput {
        match self.fetch_layer(layer, bbox).await {
            Ok(geometry) => self.convert(layer, geometry),
            Err(err) => {
                log::error!("Loading {} failed: {}", layer, err);
                BranchOutput::failed(err)
            }
        }
    }

    pub fn convert(&self, layer: Layer, geometry: Geometry<f64>) -> BranchOutput {
        let mut output = BranchOutput::default();

        for (index, member) in wkb_decoder::collection_members(geometry).into_iter().enumerate() {
            match (layer, member) {
                (Layer::Buildings, Geometry::Polygon(polygon)) => {
                    output.meshes.push(self.building(&polygon));
                }
                (Layer::Streets, Geometry::Polygon(polygon)) => {
                    output.meshes.push(self.street(&polygon));
                }
                (Layer::Streets, Geometry::MultiPolygon(polygons)) => {
                    output
                        .meshes
                        .extend(polygons.iter().map(|polygon| self.street(polygon)));
                }
                (layer, other) => {
                    let kind = GeometryKind::of(&other);
                    log::info!("Skipping {} member {}, not a polygon: {}", layer, index, kind);
                    output.skipped.push(SkippedGeometry { layer, index, kind });
                }
            }
        }

        log::debug!(
            "Converted {} {} meshes, skipped {}",
            output.meshes.len(),
            layer,
            output.skipped.len()
        );
        output
    }

    fn building(&self, polygon: &Polygon<f64>) -> Mesh {
        let outline = shape_from_polygon(polygon);
        mesh::extrude(&outline, &self.extrude_settings, self.buildings_material)
    }

    fn street(&self, polygon: &Polygon<f64>) -> Mesh {
        let outline = shape_from_polygon(polygon);
        mesh::flatten(&outline, self.streets_material)
    }
}
