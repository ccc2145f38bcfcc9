use earcutr::earcut;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

use crate::shape::Outline;

const EPSILON: f64 = 1e-10;

/// Simple 2D vector struct
#[derive(Clone, Copy, Debug, PartialEq)]
struct Vector2 {
    x: f64,
    y: f64,
}

impl Vector2 {
    fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn sub(&self, v: &Vector2) -> Self {
        Self::new(self.x - v.x, self.y - v.y)
    }

    fn length_sq(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    fn add_scaled_vector(&self, v: &Vector2, s: f64) -> Self {
        Self {
            x: self.x + v.x * s,
            y: self.y + v.y * s,
        }
    }
}

/// Extrusion settings, deserialised from the viewer config.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtrudeSettings {
    #[serde(default = "default_depth")]
    pub depth: f64,
    #[serde(default = "default_steps")]
    pub steps: u32,
    #[serde(default)]
    pub bevel_enabled: bool,
    #[serde(default = "default_bevel_thickness")]
    pub bevel_thickness: f64,
    #[serde(default = "default_bevel_size")]
    pub bevel_size: f64,
    #[serde(default)]
    pub bevel_offset: f64,
    #[serde(default = "default_bevel_segments")]
    pub bevel_segments: u32,
}

impl Default for ExtrudeSettings {
    fn default() -> Self {
        Self {
            depth: default_depth(),
            steps: default_steps(),
            bevel_enabled: false,
            bevel_thickness: default_bevel_thickness(),
            bevel_size: default_bevel_size(),
            bevel_offset: 0.0,
            bevel_segments: default_bevel_segments(),
        }
    }
}

// Building extrusion defaults
fn default_depth() -> f64 {
    15.0
}
fn default_steps() -> u32 {
    1
}
fn default_bevel_thickness() -> f64 {
    0.2
}
fn default_bevel_size() -> f64 {
    0.1
}
fn default_bevel_segments() -> u32 {
    3
}

/// Flat-shaded triangle soup: every triangle owns its three vertices and shares one normal.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MeshGeometry {
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshGeometry {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    fn push_triangle(&mut self, a: [f64; 3], b: [f64; 3], c: [f64; 3]) {
        let normal = face_normal(a, b, c);
        self.push_triangle_with_normal(a, b, c, normal);
    }

    fn push_triangle_with_normal(&mut self, a: [f64; 3], b: [f64; 3], c: [f64; 3], normal: [f64; 3]) {
        let current_vertex = self.vertex_count() as u32;
        for p in [a, b, c] {
            self.positions.extend(p.iter().map(|&v| v as f32));
            self.normals.extend(normal.iter().map(|&v| v as f32));
        }
        self.indices
            .extend([current_vertex, current_vertex + 1, current_vertex + 2]);
    }
}

fn face_normal(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> [f64; 3] {
    let v1 = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let v2 = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];

    let nx = v1[1] * v2[2] - v1[2] * v2[1];
    let ny = v1[2] * v2[0] - v1[0] * v2[2];
    let nz = v1[0] * v2[1] - v1[1] * v2[0];

    let len = (nx * nx + ny * ny + nz * nz).sqrt();
    if len > EPSILON {
        [nx / len, ny / len, nz / len]
    } else {
        // Degenerate triangle, Z-up is visually right for ground-aligned outlines
        [0.0, 0.0, 1.0]
    }
}

/// Helper function to check if points are in clockwise order
fn is_clockwise(points: &[Vector2]) -> bool {
    let mut area = 0.0;
    for i in 0..points.len() {
        let j = (i + 1) % points.len();
        area += points[i].x * points[j].y;
        area -= points[j].x * points[i].y;
    }
    area < 0.0
}

/// Drop points that coincide with their predecessor, including a repeated closing point.
fn merge_overlapping_points(points: &mut Vec<Vector2>) {
    if points.len() < 2 {
        return;
    }

    let threshold_sq = EPSILON * EPSILON;
    let overlaps = |a: &Vector2, b: &Vector2| {
        let scale = a.x.abs().max(a.y.abs()).max(b.x.abs()).max(b.y.abs());
        a.sub(b).length_sq() <= threshold_sq * scale.max(1.0) * scale.max(1.0)
    };

    points.dedup_by(|current, prev| overlaps(&*current, &*prev));
    while points.len() > 1 && overlaps(&points[0], &points[points.len() - 1]) {
        points.pop();
    }
}

/// Outline converted to working form: cleaned, contour clockwise, holes counter-clockwise.
struct PreparedRings {
    contour: Vec<Vector2>,
    holes: Vec<Vec<Vector2>>,
}

impl PreparedRings {
    fn new(outline: &Outline) -> Option<Self> {
        let to_points = |ring: &[geo_types::Coord<f64>]| -> Vec<Vector2> {
            let mut points: Vec<Vector2> = ring.iter().map(|c| Vector2::new(c.x, c.y)).collect();
            merge_overlapping_points(&mut points);
            points
        };

        let mut contour = to_points(&outline.contour);
        if contour.is_empty() {
            return None;
        }
        if !is_clockwise(&contour) {
            contour.reverse();
        }

        let holes = outline
            .holes
            .iter()
            .map(|ring| to_points(ring))
            .filter(|hole| !hole.is_empty())
            .map(|mut hole| {
                if is_clockwise(&hole) {
                    hole.reverse();
                }
                hole
            })
            .collect();

        Some(Self { contour, holes })
    }

    fn rings(&self) -> impl Iterator<Item = &Vec<Vector2>> {
        std::iter::once(&self.contour).chain(self.holes.iter())
    }

    /// Contour followed by every hole, the index space of the triangulation.
    fn vertices(&self) -> Vec<Vector2> {
        self.rings().flatten().copied().collect()
    }

    fn bevel_movements(&self) -> Vec<Vector2> {
        self.rings()
            .flat_map(|ring| {
                let len = ring.len();
                (0..len).map(move |i| {
                    let prev = ring[(i + len - 1) % len];
                    let next = ring[(i + 1) % len];
                    bevel_vector(ring[i], prev, next)
                })
            })
            .collect()
    }

    /// Triangles as index triplets into `vertices()`.
    fn triangulate(&self) -> Vec<[usize; 3]> {
        let mut data: Vec<f64> = Vec::new();
        for pt in &self.contour {
            data.push(pt.x);
            data.push(pt.y);
        }
        let mut hole_indices: Vec<usize> = Vec::new();
        let mut idx_offset = self.contour.len();
        for hole in &self.holes {
            hole_indices.push(idx_offset);
            for pt in hole {
                data.push(pt.x);
                data.push(pt.y);
            }
            idx_offset += hole.len();
        }

        match earcut(&data, &hole_indices, 2) {
            Ok(indices) => indices
                .chunks_exact(3)
                .map(|chunk| [chunk[0], chunk[1], chunk[2]])
                .collect(),
            Err(e) => {
                log::warn!("Triangulation failed for outline with {} points: {:?}", idx_offset, e);
                Vec::new()
            }
        }
    }
}

/// Direction a ring vertex moves when the outline is bevelled outwards.
fn bevel_vector(pt: Vector2, prev: Vector2, next: Vector2) -> Vector2 {
    let v_prev = pt.sub(&prev);
    let v_next = next.sub(&pt);
    let v_prev_len_sq = v_prev.length_sq();

    let collinear = v_prev.x * v_next.y - v_prev.y * v_next.x;

    let (v_trans, shrink_by) = if collinear.abs() > EPSILON {
        let v_prev_len = v_prev_len_sq.sqrt();
        let v_next_len = v_next.length_sq().sqrt();

        // Edges shifted left by one unit
        let prev_shift = Vector2::new(prev.x - v_prev.y / v_prev_len, prev.y + v_prev.x / v_prev_len);
        let next_shift = Vector2::new(next.x - v_next.y / v_next_len, next.y + v_next.x / v_next_len);

        // Intersection of the shifted edges
        let sf = ((next_shift.x - prev_shift.x) * v_next.y - (next_shift.y - prev_shift.y) * v_next.x)
            / collinear;
        let v_trans = Vector2::new(
            prev_shift.x + v_prev.x * sf - pt.x,
            prev_shift.y + v_prev.y * sf - pt.y,
        );

        let trans_len_sq = v_trans.length_sq();
        if trans_len_sq <= 2.0 {
            return v_trans;
        }
        (v_trans, (trans_len_sq / 2.0).sqrt())
    } else {
        let same_direction = if v_prev.x > EPSILON {
            v_next.x > EPSILON
        } else if v_prev.x < -EPSILON {
            v_next.x < -EPSILON
        } else {
            v_prev.y.signum() == v_next.y.signum()
        };

        if same_direction {
            (Vector2::new(-v_prev.y, v_prev.x), v_prev_len_sq.sqrt())
        } else {
            (v_prev, (v_prev_len_sq / 2.0).sqrt())
        }
    };

    if shrink_by > EPSILON {
        Vector2::new(v_trans.x / shrink_by, v_trans.y / shrink_by)
    } else {
        Vector2::new(0.0, 0.0)
    }
}

fn winding(vertices: &[Vector2], face: [usize; 3]) -> f64 {
    let a = vertices[face[0]];
    let b = vertices[face[1]];
    let c = vertices[face[2]];
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Face with counter-clockwise winding, so its normal points along +Z.
fn upward(vertices: &[Vector2], face: [usize; 3]) -> [usize; 3] {
    if winding(vertices, face) >= 0.0 {
        face
    } else {
        [face[0], face[2], face[1]]
    }
}

/// Extrude an outline along +Z into a closed solid.
///
/// Layers run bottom to top: bottom bevel rings, `steps + 1` wall rings from
/// `z = 0` to `z = depth`, then the top bevel rings. Lids cap the first and the
/// last layer, side walls join every pair of adjacent layers for the contour and
/// each hole.
pub fn extrude_outline(outline: &Outline, settings: &ExtrudeSettings) -> MeshGeometry {
    let mut geometry = MeshGeometry::default();
    let Some(rings) = PreparedRings::new(outline) else {
        return geometry;
    };

    let steps = settings.steps.max(1) as usize;
    let (bevel_segments, bevel_thickness, bevel_size, bevel_offset) = if settings.bevel_enabled {
        (
            settings.bevel_segments.max(1) as usize,
            settings.bevel_thickness,
            settings.bevel_size,
            settings.bevel_offset,
        )
    } else {
        (0, 0.0, 0.0, 0.0)
    };

    let vertices = rings.vertices();
    let vlen = vertices.len();
    let movements = if settings.bevel_enabled {
        rings.bevel_movements()
    } else {
        Vec::new()
    };
    let faces = rings.triangulate();

    let mut placeholder: Vec<[f64; 3]> = Vec::with_capacity(vlen * (steps + 1 + 2 * bevel_segments));
    let mut push_layer = |scale: f64, z: f64| {
        for (i, vert) in vertices.iter().enumerate() {
            let p = movements
                .get(i)
                .map_or(*vert, |m| vert.add_scaled_vector(m, scale));
            placeholder.push([p.x, p.y, z]);
        }
    };

    // Bottom bevel, from the outer cap inwards
    for b in 0..bevel_segments {
        let t = b as f64 / bevel_segments as f64;
        let z = bevel_thickness * (t * FRAC_PI_2).cos();
        let bs = bevel_size * (t * FRAC_PI_2).sin() + bevel_offset;
        push_layer(bs, -z);
    }

    let bs = bevel_size + bevel_offset;
    for s in 0..=steps {
        push_layer(bs, settings.depth / steps as f64 * s as f64);
    }

    // Top bevel, back out to the cap
    for b in (0..bevel_segments).rev() {
        let t = b as f64 / bevel_segments as f64;
        let z = bevel_thickness * (t * FRAC_PI_2).cos();
        let bs = bevel_size * (t * FRAC_PI_2).sin() + bevel_offset;
        push_layer(bs, settings.depth + z);
    }

    let wall_layers = steps + 2 * bevel_segments;

    // Bottom faces
    for face in &faces {
        let [a, b, c] = upward(&vertices, *face);
        geometry.push_triangle(placeholder[c], placeholder[b], placeholder[a]);
    }

    // Top faces
    let offset_top = vlen * wall_layers;
    for face in &faces {
        let [a, b, c] = upward(&vertices, *face);
        geometry.push_triangle(
            placeholder[a + offset_top],
            placeholder[b + offset_top],
            placeholder[c + offset_top],
        );
    }

    // Side walls for contour and holes
    let mut layer_offset = 0;
    for ring in rings.rings() {
        let len = ring.len();
        for i in (0..len).rev() {
            let j = i;
            let k = if i == 0 { len - 1 } else { i - 1 };

            for s in 0..wall_layers {
                let slen1 = vlen * s;
                let slen2 = vlen * (s + 1);

                let a = placeholder[layer_offset + j + slen1];
                let b = placeholder[layer_offset + k + slen1];
                let c = placeholder[layer_offset + k + slen2];
                let d = placeholder[layer_offset + j + slen2];

                geometry.push_triangle(a, b, d);
                geometry.push_triangle(b, c, d);
            }
        }
        layer_offset += len;
    }

    geometry
}

/// Triangulate an outline into a zero-thickness surface at `z = 0` facing +Z.
pub fn flatten_outline(outline: &Outline) -> MeshGeometry {
    let mut geometry = MeshGeometry::default();
    let Some(rings) = PreparedRings::new(outline) else {
        return geometry;
    };

    let vertices = rings.vertices();
    let at = |i: usize| [vertices[i].x, vertices[i].y, 0.0];
    for face in rings.triangulate() {
        let [a, b, c] = upward(&vertices, face);
        geometry.push_triangle_with_normal(at(a), at(b), at(c), [0.0, 0.0, 1.0]);
    }

    geometry
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::Coord;

    fn closed_square(x: f64, y: f64, size: f64) -> Vec<Coord<f64>> {
        vec![
            Coord { x, y },
            Coord { x: x + size, y },
            Coord { x: x + size, y: y + size },
            Coord { x, y: y + size },
            Coord { x, y },
        ]
    }

    fn z_range(geometry: &MeshGeometry) -> (f32, f32) {
        geometry
            .positions
            .chunks_exact(3)
            .fold((f32::MAX, f32::MIN), |(lo, hi), p| (lo.min(p[2]), hi.max(p[2])))
    }

    #[test]
    fn extruded_square_has_lids_and_four_walls() {
        let outline = Outline { contour: closed_square(0.0, 0.0, 10.0), holes: vec![] };
        let geometry = extrude_outline(&outline, &ExtrudeSettings::default());

        // 2 triangles per lid, 2 per wall quad
        assert_eq!(geometry.triangle_count(), 2 + 2 + 4 * 2);
        assert_eq!(geometry.vertex_count(), geometry.triangle_count() * 3);
        assert_eq!(geometry.normals.len(), geometry.positions.len());
        assert_eq!(z_range(&geometry), (0.0, 15.0));
    }

    #[test]
    fn walls_point_outwards_and_lids_point_along_z() {
        let outline = Outline { contour: closed_square(0.0, 0.0, 10.0), holes: vec![] };
        let geometry = extrude_outline(&outline, &ExtrudeSettings::default());

        for (tri, normal) in geometry
            .positions
            .chunks_exact(9)
            .zip(geometry.normals.chunks_exact(9))
        {
            let cx = (tri[0] + tri[3] + tri[6]) / 3.0 - 5.0;
            let cy = (tri[1] + tri[4] + tri[7]) / 3.0 - 5.0;
            let cz = (tri[2] + tri[5] + tri[8]) / 3.0 - 7.5;
            let dot = cx * normal[0] + cy * normal[1] + cz * normal[2];
            assert!(dot > 0.0, "normal {:?} points into the solid", &normal[..3]);
        }
    }

    #[test]
    fn hole_walls_face_into_the_hole() {
        let outline = Outline {
            contour: closed_square(0.0, 0.0, 10.0),
            holes: vec![closed_square(4.0, 4.0, 2.0)],
        };
        let geometry = extrude_outline(&outline, &ExtrudeSettings::default());

        let mut hole_walls = 0;
        for (tri, normal) in geometry
            .positions
            .chunks_exact(9)
            .zip(geometry.normals.chunks_exact(9))
        {
            let cx = (tri[0] + tri[3] + tri[6]) / 3.0;
            let cy = (tri[1] + tri[4] + tri[7]) / 3.0;
            let cz = (tri[2] + tri[5] + tri[8]) / 3.0;

            if normal[2].abs() > 0.5 {
                // Lids: bottom faces down, top faces up
                assert_eq!(normal[2] > 0.0, cz > 7.5);
                continue;
            }

            let (dx, dy) = (cx - 5.0, cy - 5.0);
            let outward = dx * normal[0] + dy * normal[1];
            if dx.abs() <= 1.0 + 1e-4 && dy.abs() <= 1.0 + 1e-4 {
                hole_walls += 1;
                assert!(outward < 0.0, "hole wall normal {:?} points into the solid", &normal[..3]);
            } else {
                assert!(outward > 0.0, "outer wall normal {:?} points into the solid", &normal[..3]);
            }
        }
        assert_eq!(hole_walls, 4 * 2);
    }

    #[test]
    fn steps_multiply_wall_layers() {
        let outline = Outline { contour: closed_square(0.0, 0.0, 1.0), holes: vec![] };
        let settings = ExtrudeSettings { steps: 3, ..ExtrudeSettings::default() };
        let geometry = extrude_outline(&outline, &settings);
        assert_eq!(geometry.triangle_count(), 4 + 4 * 3 * 2);
    }

    #[test]
    fn hole_gets_its_own_walls() {
        let outline = Outline {
            contour: closed_square(0.0, 0.0, 10.0),
            holes: vec![closed_square(4.0, 4.0, 2.0)],
        };
        let geometry = extrude_outline(&outline, &ExtrudeSettings::default());
        // 8 lid triangles per side for a square with a square hole
        assert_eq!(geometry.triangle_count(), 2 * 8 + (4 + 4) * 2);
    }

    #[test]
    fn bevel_adds_cap_layers_beyond_depth() {
        let outline = Outline { contour: closed_square(0.0, 0.0, 10.0), holes: vec![] };
        let settings = ExtrudeSettings { bevel_enabled: true, ..ExtrudeSettings::default() };
        let geometry = extrude_outline(&outline, &settings);

        assert_eq!(geometry.triangle_count(), 4 + 4 * (1 + 2 * 3) * 2);
        let (lo, hi) = z_range(&geometry);
        assert!((lo + 0.2).abs() < 1e-5);
        assert!((hi - 15.2).abs() < 1e-5);
    }

    #[test]
    fn flat_square_is_two_upward_triangles() {
        let outline = Outline { contour: closed_square(0.0, 0.0, 3.0), holes: vec![] };
        let geometry = flatten_outline(&outline);

        assert_eq!(geometry.triangle_count(), 2);
        assert!(geometry.positions.chunks_exact(3).all(|p| p[2] == 0.0));
        assert!(geometry.normals.chunks_exact(3).all(|n| n == [0.0, 0.0, 1.0]));
        for tri in geometry.positions.chunks_exact(9) {
            let cross = (tri[3] - tri[0]) * (tri[7] - tri[1]) - (tri[4] - tri[1]) * (tri[6] - tri[0]);
            assert!(cross > 0.0);
        }
    }

    #[test]
    fn degenerate_outlines_yield_no_triangles() {
        let empty = Outline::default();
        assert!(extrude_outline(&empty, &ExtrudeSettings::default()).is_empty());
        assert!(flatten_outline(&empty).is_empty());

        let line = Outline {
            contour: vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 }],
            holes: vec![],
        };
        assert!(flatten_outline(&line).is_empty());
    }

    #[test]
    fn closing_point_is_merged() {
        let mut points = vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(1.0, 1.0),
            Vector2::new(0.0, 0.0),
        ];
        merge_overlapping_points(&mut points);
        assert_eq!(points.len(), 3);
    }
}
