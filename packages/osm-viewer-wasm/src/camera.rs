use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

const EPS: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    #[serde(default = "default_fov")]
    pub fov: f64,
    #[serde(default = "default_near")]
    pub near: f64,
    #[serde(default = "default_far")]
    pub far: f64,
    #[serde(default = "default_position")]
    pub position: [f64; 3],
    #[serde(default)]
    pub target: [f64; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: default_fov(),
            near: default_near(),
            far: default_far(),
            position: default_position(),
            target: [0.0; 3],
        }
    }
}

fn default_fov() -> f64 {
    60.0
}
fn default_near() -> f64 {
    1.0
}
fn default_far() -> f64 {
    2500.0
}
fn default_position() -> [f64; 3] {
    [0.0, 300.0, 100.0]
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlsConfig {
    #[serde(default = "default_min_distance")]
    pub min_distance: f64,
    #[serde(default = "default_max_distance")]
    pub max_distance: f64,
    #[serde(default)]
    pub min_polar_angle: f64,
    #[serde(default = "default_max_polar_angle")]
    pub max_polar_angle: f64,
    #[serde(default)]
    pub screen_space_panning: bool,
    #[serde(default = "default_speed")]
    pub rotate_speed: f64,
    #[serde(default = "default_speed")]
    pub pan_speed: f64,
    #[serde(default = "default_speed")]
    pub zoom_speed: f64,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            min_distance: default_min_distance(),
            max_distance: default_max_distance(),
            min_polar_angle: 0.0,
            max_polar_angle: default_max_polar_angle(),
            screen_space_panning: false,
            rotate_speed: default_speed(),
            pan_speed: default_speed(),
            zoom_speed: default_speed(),
        }
    }
}

fn default_min_distance() -> f64 {
    100.0
}
fn default_max_distance() -> f64 {
    500.0
}
fn default_max_polar_angle() -> f64 {
    FRAC_PI_2
}
fn default_speed() -> f64 {
    1.0
}

/// Perspective camera looking at `target` with +Y up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerspectiveCamera {
    pub fov: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
    pub position: [f64; 3],
    pub target: [f64; 3],
    pub up: [f64; 3],
}

impl PerspectiveCamera {
    pub fn new(config: &CameraConfig, width: f64, height: f64) -> Self {
        let mut camera = PerspectiveCamera {
            fov: config.fov,
            aspect: 1.0,
            near: config.near,
            far: config.far,
            position: config.position,
            target: config.target,
            up: [0.0, 1.0, 0.0],
        };
        camera.set_viewport(width, height);
        camera
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        if width > 0.0 && height > 0.0 {
            self.aspect = width / height;
        }
    }

    pub fn distance(&self) -> f64 {
        (self.position_vec() - self.target_vec()).norm()
    }

    /// Angle between +Y and the target-to-camera direction.
    pub fn polar_angle(&self) -> f64 {
        let offset = self.position_vec() - self.target_vec();
        (offset.y / offset.norm()).clamp(-1.0, 1.0).acos()
    }

    fn position_vec(&self) -> Vector3<f64> {
        Vector3::from(self.position)
    }

    fn target_vec(&self) -> Vector3<f64> {
        Vector3::from(self.target)
    }

    fn up_vec(&self) -> Vector3<f64> {
        Vector3::from(self.up)
    }

    /// Camera right and up axes in world space.
    fn basis(&self) -> (Vector3<f64>, Vector3<f64>) {
        let forward = (self.target_vec() - self.position_vec()).normalize();
        let right = forward.cross(&self.up_vec()).normalize();
        let up = right.cross(&forward);
        (right, up)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Rotate,
    Dolly,
    Pan,
}

impl DragMode {
    /// Left rotates, middle dollies, right pans.
    pub fn from_button(button: i16) -> Option<Self> {
        match button {
            0 => Some(DragMode::Rotate),
            1 => Some(DragMode::Dolly),
            2 => Some(DragMode::Pan),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Drag {
    mode: DragMode,
    last: (f64, f64),
}

/// Orbit camera controller: rotate around the target, dolly, pan.
///
/// Each input handler mutates the camera in place and returns whether the
/// camera changed, so the caller can schedule a redraw.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    config: ControlsConfig,
    drag: Option<Drag>,
}

impl OrbitControls {
    pub fn new(config: ControlsConfig) -> Self {
        Self { config, drag: None }
    }

    pub fn pointer_down(&mut self, button: i16, x: f64, y: f64) {
        self.drag = DragMode::from_button(button).map(|mode| Drag { mode, last: (x, y) });
    }

    pub fn pointer_up(&mut self) {
        self.drag = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn pointer_move(&mut self, camera: &mut PerspectiveCamera, x: f64, y: f64, viewport_height: f64) -> bool {
        let Some(drag) = self.drag.as_mut() else {
            return false;
        };
        let (dx, dy) = (x - drag.last.0, y - drag.last.1);
        drag.last = (x, y);
        let mode = drag.mode;

        if viewport_height <= 0.0 || (dx == 0.0 && dy == 0.0) {
            return false;
        }

        match mode {
            DragMode::Rotate => {
                let speed = 2.0 * PI * self.config.rotate_speed / viewport_height;
                self.rotate(camera, dx * speed, dy * speed)
            }
            DragMode::Dolly => {
                if dy > 0.0 {
                    self.dolly(camera, self.zoom_scale())
                } else if dy < 0.0 {
                    self.dolly(camera, 1.0 / self.zoom_scale())
                } else {
                    false
                }
            }
            DragMode::Pan => self.pan(camera, dx, dy, viewport_height),
        }
    }

    /// Wheel up moves closer, wheel down moves away.
    pub fn wheel(&self, camera: &mut PerspectiveCamera, delta_y: f64) -> bool {
        if delta_y < 0.0 {
            self.dolly(camera, self.zoom_scale())
        } else if delta_y > 0.0 {
            self.dolly(camera, 1.0 / self.zoom_scale())
        } else {
            false
        }
    }

    /// Rotate by the given angles (radians) to the left and upwards.
    pub fn rotate(&self, camera: &mut PerspectiveCamera, left: f64, up: f64) -> bool {
        self.update(camera, -left, -up, 1.0, Vector3::zeros())
    }

    /// Scale the distance to the target; values below one move closer.
    pub fn dolly(&self, camera: &mut PerspectiveCamera, scale: f64) -> bool {
        self.update(camera, 0.0, 0.0, scale, Vector3::zeros())
    }

    /// Pan by a screen-space pixel delta. Without screen-space panning the
    /// target stays in its horizontal plane.
    pub fn pan(&self, camera: &mut PerspectiveCamera, dx: f64, dy: f64, viewport_height: f64) -> bool {
        if viewport_height <= 0.0 {
            return false;
        }
        let target_distance = camera.distance() * (camera.fov.to_radians() / 2.0).tan();
        let left = 2.0 * dx * self.config.pan_speed * target_distance / viewport_height;
        let up = 2.0 * dy * self.config.pan_speed * target_distance / viewport_height;

        let (right, camera_up) = camera.basis();
        let up_axis = if self.config.screen_space_panning {
            camera_up
        } else {
            camera.up_vec().cross(&right)
        };
        let offset = right * -left + up_axis * up;
        self.update(camera, 0.0, 0.0, 1.0, offset)
    }

    fn zoom_scale(&self) -> f64 {
        0.95_f64.powf(self.config.zoom_speed)
    }

    fn update(
        &self,
        camera: &mut PerspectiveCamera,
        theta_delta: f64,
        phi_delta: f64,
        scale: f64,
        pan_offset: Vector3<f64>,
    ) -> bool {
        let target = camera.target_vec();
        let offset = camera.position_vec() - target;

        let radius = offset.norm();
        let (theta, phi) = if radius > 0.0 {
            (offset.x.atan2(offset.z), (offset.y / radius).clamp(-1.0, 1.0).acos())
        } else {
            (0.0, 0.0)
        };

        let theta = theta + theta_delta;
        let phi = (phi + phi_delta)
            .clamp(self.config.min_polar_angle, self.config.max_polar_angle)
            .clamp(EPS, PI - EPS);
        let radius = (radius * scale).clamp(self.config.min_distance, self.config.max_distance);

        let new_target = target + pan_offset;
        let sin_phi_radius = phi.sin() * radius;
        let new_offset = Vector3::new(
            sin_phi_radius * theta.sin(),
            phi.cos() * radius,
            sin_phi_radius * theta.cos(),
        );
        let new_position = new_target + new_offset;

        let changed = (new_position - camera.position_vec()).norm_squared() > EPS
            || (new_target - target).norm_squared() > EPS;
        if changed {
            camera.position = new_position.into();
            camera.target = new_target.into();
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera::new(&CameraConfig::default(), 800.0, 600.0)
    }

    #[test]
    fn default_camera_matches_viewer_setup() {
        let camera = camera();
        assert_eq!(camera.position, [0.0, 300.0, 100.0]);
        assert_eq!(camera.fov, 60.0);
        assert!((camera.aspect - 800.0 / 600.0).abs() < 1e-12);
        assert!((camera.distance() - 100_000f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn wheel_zoom_is_clamped_to_distance_limits() {
        let controls = OrbitControls::new(ControlsConfig::default());
        let mut camera = camera();

        for _ in 0..200 {
            controls.wheel(&mut camera, 1.0);
        }
        assert!((camera.distance() - 500.0).abs() < 1e-6);
        assert!(!controls.wheel(&mut camera, 1.0));

        for _ in 0..200 {
            controls.wheel(&mut camera, -1.0);
        }
        assert!((camera.distance() - 100.0).abs() < 1e-6);
    }

    #[test]
    fn camera_never_orbits_below_the_ground_plane() {
        let controls = OrbitControls::new(ControlsConfig::default());
        let mut camera = camera();

        assert!(controls.rotate(&mut camera, 0.0, -3.0));
        assert!(camera.polar_angle() <= FRAC_PI_2 + 1e-9);
        assert!(camera.position[1] >= -1e-6);
    }

    #[test]
    fn rotating_left_keeps_the_distance() {
        let controls = OrbitControls::new(ControlsConfig::default());
        let mut camera = camera();
        let before = camera.distance();

        assert!(controls.rotate(&mut camera, FRAC_PI_2, 0.0));
        assert!((camera.distance() - before).abs() < 1e-9);
        assert!(camera.position[0].abs() > 1.0);
    }

    #[test]
    fn ground_panning_keeps_target_height() {
        let controls = OrbitControls::new(ControlsConfig::default());
        let mut camera = camera();

        assert!(controls.pan(&mut camera, 40.0, -25.0, 600.0));
        assert!(camera.target[1].abs() < 1e-9);
        assert!(camera.target[0].abs() > 0.0);
    }

    #[test]
    fn pointer_drag_rotates_only_while_pressed() {
        let mut controls = OrbitControls::new(ControlsConfig::default());
        let mut camera = camera();

        assert!(!controls.pointer_move(&mut camera, 10.0, 10.0, 600.0));

        controls.pointer_down(0, 100.0, 100.0);
        assert!(controls.is_dragging());
        assert!(controls.pointer_move(&mut camera, 130.0, 100.0, 600.0));

        controls.pointer_up();
        let snapshot = camera;
        assert!(!controls.pointer_move(&mut camera, 200.0, 200.0, 600.0));
        assert_eq!(camera, snapshot);
    }
}
