// Viewer configuration, passed in from JS as an object or a JSON string
use serde::{Deserialize, Serialize};

use crate::camera::{CameraConfig, ControlsConfig};
use crate::error::ViewerError;
use crate::extrude::ExtrudeSettings;
use crate::mesh::Material;
use crate::models::BoundingBox;
use crate::scene::SceneConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerConfig {
    /// [minLon, minLat, maxLon, maxLat]
    pub bbox: BoundingBox,
    /// Prefix for the geometry endpoints, empty for same-origin requests.
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub extrude: ExtrudeSettings,
    #[serde(default = "Material::buildings")]
    pub buildings_material: Material,
    #[serde(default = "Material::streets")]
    pub streets_material: Material,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub controls: ControlsConfig,
    #[serde(default)]
    pub scene: SceneConfig,
}

impl ViewerConfig {
    pub fn new(bbox: BoundingBox) -> Self {
        Self {
            bbox,
            base_url: String::new(),
            extrude: ExtrudeSettings::default(),
            buildings_material: Material::buildings(),
            streets_material: Material::streets(),
            camera: CameraConfig::default(),
            controls: ControlsConfig::default(),
            scene: SceneConfig::default(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ViewerError> {
        let config: ViewerConfig =
            serde_json::from_str(json).map_err(|e| ViewerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ViewerError> {
        if !(self.extrude.depth.is_finite() && self.extrude.depth >= 0.0) {
            return Err(ViewerError::Config(format!(
                "extrude depth must be a non-negative number, got {}",
                self.extrude.depth
            )));
        }
        if self.controls.min_distance > self.controls.max_distance {
            return Err(ViewerError::Config(format!(
                "controls.minDistance ({}) exceeds controls.maxDistance ({})",
                self.controls.min_distance, self.controls.max_distance
            )));
        }
        if self.controls.min_polar_angle > self.controls.max_polar_angle {
            return Err(ViewerError::Config(
                "controls.minPolarAngle exceeds controls.maxPolarAngle".to_string(),
            ));
        }
        Ok(())
    }
}
