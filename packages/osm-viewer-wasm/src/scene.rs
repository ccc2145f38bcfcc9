use serde::{Deserialize, Serialize};

use crate::mesh::{Color, Mesh};

/// Background and fog settings of a scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneConfig {
    #[serde(default = "default_background")]
    pub background: Color,
    #[serde(default = "default_fog_density")]
    pub fog_density: f64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self { background: default_background(), fog_density: default_fog_density() }
    }
}

fn default_background() -> Color {
    Color(0xf0f0f0)
}

fn default_fog_density() -> f64 {
    0.001
}

/// Exponential-squared distance fog.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FogExp2 {
    pub color: Color,
    pub density: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Light {
    Directional { color: Color, position: [f64; 3] },
    Ambient { color: Color },
}

/// Everything drawn in one frame. Rebuilt from scratch on every load.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub background: Color,
    pub fog: FogExp2,
    pub lights: Vec<Light>,
    meshes: Vec<Mesh>,
    revision: u64,
}

impl Scene {
    pub fn new(config: &SceneConfig) -> Self {
        Scene {
            background: config.background,
            fog: FogExp2 { color: config.background, density: config.fog_density },
            lights: vec![
                Light::Directional { color: Color(0xffffff), position: [1.0, 1.0, 1.0] },
                Light::Directional { color: Color(0x888822), position: [-1.0, -1.0, -1.0] },
                Light::Ambient { color: Color(0x222222) },
            ],
            meshes: Vec::new(),
            revision: 0,
        }
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    /// Bumped on every change, renderers compare it to skip re-uploading.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn extend(&mut self, meshes: impl IntoIterator<Item = Mesh>) {
        let before = self.meshes.len();
        self.meshes.extend(meshes);
        if self.meshes.len() != before {
            self.revision += 1;
        }
    }

    /// Replace this scene with a fresh one, keeping the revision monotonic.
    pub fn rebuild(&mut self, config: &SceneConfig) {
        let revision = self.revision + 1;
        *self = Scene::new(config);
        self.revision = revision;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{flatten, Material};
    use crate::shape::Outline;

    #[test]
    fn fresh_scene_has_fixed_lights_and_fog() {
        let scene = Scene::new(&SceneConfig::default());
        assert_eq!(scene.background, Color(0xf0f0f0));
        assert_eq!(scene.fog, FogExp2 { color: Color(0xf0f0f0), density: 0.001 });
        assert_eq!(scene.lights.len(), 3);
        assert!(matches!(scene.lights[2], Light::Ambient { color: Color(0x222222) }));
        assert!(scene.meshes().is_empty());
    }

    #[test]
    fn rebuild_discards_meshes_and_advances_revision() {
        let mut scene = Scene::new(&SceneConfig::default());
        scene.extend(vec![flatten(&Outline::default(), Material::streets())]);
        assert_eq!(scene.revision(), 1);

        scene.rebuild(&SceneConfig::default());
        assert!(scene.meshes().is_empty());
        assert_eq!(scene.revision(), 2);

        scene.extend(Vec::new());
        assert_eq!(scene.revision(), 2);
    }
}
