use nalgebra::{Matrix4, Point3, Rotation3, Translation3, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

use crate::extrude::{extrude_outline, flatten_outline, ExtrudeSettings, MeshGeometry};
use crate::shape::Outline;

/// Rotation shared by every mesh. Outlines are built in the X-Y plane with
/// extrusion along +Z; this lays them onto the ground so depth becomes height.
pub const DISPLAY_ROTATION: [f64; 3] = [FRAC_PI_2, PI, 0.0];
/// Offset shared by every mesh, centres server coordinates under the default camera.
pub const DISPLAY_POSITION: [f64; 3] = [1600.0, 0.0, -800.0];

/// 24-bit RGB colour, serialised as the plain number the JS engine expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub color: Color,
    #[serde(default = "default_flat_shading")]
    pub flat_shading: bool,
}

fn default_flat_shading() -> bool {
    true
}

impl Material {
    pub fn buildings() -> Self {
        Self { color: Color(0xc0c080), flat_shading: true }
    }

    pub fn streets() -> Self {
        Self { color: Color(0xc0c0c0), flat_shading: true }
    }
}

/// Euler rotation (XYZ order, radians) plus translation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transform {
    pub rotation: [f64; 3],
    pub position: [f64; 3],
}

impl Transform {
    pub fn display_plane() -> Self {
        Self { rotation: DISPLAY_ROTATION, position: DISPLAY_POSITION }
    }

    /// Local-to-world matrix, rotation applied X then Y then Z as in an XYZ Euler.
    pub fn matrix(&self) -> Matrix4<f64> {
        let [rx, ry, rz] = self.rotation;
        let rotation = Rotation3::from_axis_angle(&Vector3::x_axis(), rx)
            * Rotation3::from_axis_angle(&Vector3::y_axis(), ry)
            * Rotation3::from_axis_angle(&Vector3::z_axis(), rz);
        let [px, py, pz] = self.position;
        Translation3::new(px, py, pz).to_homogeneous() * rotation.to_homogeneous()
    }

    pub fn apply(&self, local: [f64; 3]) -> [f64; 3] {
        let p = self.matrix().transform_point(&Point3::new(local[0], local[1], local[2]));
        [p.x, p.y, p.z]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MeshKind {
    Extruded,
    Flat,
}

/// Renderable mesh. Owned by the scene, never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub kind: MeshKind,
    pub geometry: MeshGeometry,
    pub material: Material,
    pub transform: Transform,
}

/// Extruded solid for a building footprint.
pub fn extrude(outline: &Outline, settings: &ExtrudeSettings, material: Material) -> Mesh {
    Mesh {
        kind: MeshKind::Extruded,
        geometry: extrude_outline(outline, settings),
        material,
        transform: Transform::display_plane(),
    }
}

/// Zero-thickness surface for a street polygon.
pub fn flatten(outline: &Outline, material: Material) -> Mesh {
    Mesh {
        kind: MeshKind::Flat,
        geometry: flatten_outline(outline),
        material,
        transform: Transform::display_plane(),
    }
}
