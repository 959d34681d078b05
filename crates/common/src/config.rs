//! Scene configuration.
//!
//! Every field has a default that reproduces the reference scene, so an empty
//! YAML document (or no file at all) yields a runnable configuration.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Errors from loading or validating a [`SceneConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Window and viewport settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 800,
            title: "cubelit".into(),
        }
    }
}

impl WindowConfig {
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// Initial camera pose and tuning constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// World units per second.
    pub movement_speed: f32,
    /// Degrees per pixel of pointer motion.
    pub mouse_sensitivity: f32,
    /// Initial field of view in degrees.
    pub zoom: f32,
    pub zoom_min: f32,
    pub zoom_max: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 400.0),
            target: Vec3::new(0.0, 0.0, -20.0),
            up: Vec3::Y,
            movement_speed: 200.0,
            mouse_sensitivity: 0.1,
            zoom: 45.0,
            zoom_min: 1.0,
            zoom_max: 45.0,
        }
    }
}

/// Clip planes for the perspective projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub near: f32,
    pub far: f32,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            near: 0.1,
            far: 10_000.0,
        }
    }
}

/// Point light and its on-screen marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub position: Vec3,
    pub marker_scale: f32,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(100.0, 0.0, 500.0),
            marker_scale: 0.5,
            ambient: Vec3::splat(0.5),
            diffuse: Vec3::splat(0.5),
            specular: Vec3::ONE,
        }
    }
}

/// Cube surface properties. The diffuse colour comes from the texture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialConfig {
    pub specular: Vec3,
    pub shininess: f32,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        Self {
            specular: Vec3::splat(0.5),
            shininess: 32.0,
        }
    }
}

/// Cube size and placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSection {
    /// Width, height, depth of every cube. Cubes are authored with one
    /// corner at the origin.
    pub cube_extent: Vec3,
    pub instances: Vec<Vec3>,
}

impl Default for SceneSection {
    fn default() -> Self {
        let (w, h, d) = (100.0, 100.0, 100.0);
        Self {
            cube_extent: Vec3::new(w, h, d),
            instances: vec![
                Vec3::new(-2.0 * w, 0.0, 0.0),
                Vec3::new(0.0, h, -1.5 * d),
                Vec3::new(w, -h, 50.0),
                Vec3::new(-2.0 * w, -2.0 * h, -150.0),
                Vec3::new(2.0 * w + 50.0, 0.0, 0.0),
                Vec3::new(-2.0 * w + 150.0, -1.5 * h, -10.0),
            ],
        }
    }
}

/// Paths of the per-stage shader sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderPaths {
    pub vertex: PathBuf,
    pub scene_fragment: PathBuf,
    pub light_fragment: PathBuf,
}

impl Default for ShaderPaths {
    fn default() -> Self {
        Self {
            vertex: PathBuf::from("assets/shaders/scene.vert.wgsl"),
            scene_fragment: PathBuf::from("assets/shaders/lighting.frag.wgsl"),
            light_fragment: PathBuf::from("assets/shaders/light_source.frag.wgsl"),
        }
    }
}

/// Top-level configuration for one viewer run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub projection: ProjectionConfig,
    pub light: LightConfig,
    pub material: MaterialConfig,
    pub scene: SceneSection,
    pub shaders: ShaderPaths,
    /// Diffuse texture. A generated checkerboard is used when unset.
    pub texture: Option<PathBuf>,
}

impl SceneConfig {
    /// Parse a YAML document. Missing fields take their defaults.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded scene config");
        Ok(config)
    }

    /// Load from `path` if given, else use the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Reject values the camera or projection cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.window.width == 0 || self.window.height == 0 {
            return invalid(format!(
                "window size must be positive, got {}x{}",
                self.window.width, self.window.height
            ));
        }
        let p = &self.projection;
        if !(p.near.is_finite() && p.far.is_finite() && p.near > 0.0 && p.near < p.far) {
            return invalid(format!(
                "clip planes must be finite with 0 < near < far, got near={} far={}",
                p.near, p.far
            ));
        }
        let c = &self.camera;
        if !(c.zoom_min.is_finite()
            && c.zoom_max.is_finite()
            && c.zoom_min > 0.0
            && c.zoom_min <= c.zoom_max
            && c.zoom_max < 180.0)
        {
            return invalid(format!(
                "zoom range must satisfy 0 < min <= max < 180, got [{}, {}]",
                c.zoom_min, c.zoom_max
            ));
        }
        if !c.zoom.is_finite() {
            return invalid(format!("zoom must be finite, got {}", c.zoom));
        }
        if !(is_positive(c.movement_speed) && is_positive(c.mouse_sensitivity)) {
            return invalid(format!(
                "movement speed and mouse sensitivity must be finite and positive, got {} and {}",
                c.movement_speed, c.mouse_sensitivity
            ));
        }
        if !(c.position.is_finite() && c.target.is_finite() && c.up.is_finite()) {
            return invalid(format!(
                "camera vectors must be finite, got position={} target={} up={}",
                c.position, c.target, c.up
            ));
        }
        if !is_positive(self.light.marker_scale) {
            return invalid(format!(
                "light marker scale must be finite and positive, got {}",
                self.light.marker_scale
            ));
        }
        if !self.light.position.is_finite() {
            return invalid(format!(
                "light position must be finite, got {}",
                self.light.position
            ));
        }
        if !self.scene.cube_extent.to_array().into_iter().all(is_positive) {
            return invalid(format!(
                "cube extent must be finite and positive, got {}",
                self.scene.cube_extent
            ));
        }
        if let Some(bad) = self.scene.instances.iter().find(|v| !v.is_finite()) {
            return invalid(format!("instance position must be finite, got {bad}"));
        }
        Ok(())
    }
}

fn is_positive(v: f32) -> bool {
    v.is_finite() && v > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_reproduce_reference_scene() {
        let config = SceneConfig::default();
        assert_eq!(config.window.width, 1200);
        assert_eq!(config.window.height, 800);
        assert_eq!(config.camera.position, Vec3::new(0.0, 0.0, 400.0));
        assert_eq!(config.scene.instances.len(), 6);
        assert_eq!(config.material.shininess, 32.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_yaml_uses_defaults() {
        let config = SceneConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, SceneConfig::default());
    }

    #[test]
    fn partial_yaml_overrides_fields() {
        let yaml = "camera:\n  movement_speed: 50.0\nprojection:\n  far: 500.0\n";
        let config = SceneConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.camera.movement_speed, 50.0);
        assert_eq!(config.camera.zoom, 45.0);
        assert_eq!(config.projection.far, 500.0);
        assert_eq!(config.projection.near, 0.1);
    }

    #[test]
    fn rejects_inverted_clip_planes() {
        let yaml = "projection:\n  near: 10.0\n  far: 1.0\n";
        let err = SceneConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_inverted_zoom_range() {
        let mut config = SceneConfig::default();
        config.camera.zoom_min = 60.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_nan_camera_tuning() {
        let yaml = "camera:\n  movement_speed: .nan\n";
        let err = SceneConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let mut config = SceneConfig::default();
        config.camera.mouse_sensitivity = f32::NAN;
        assert!(config.validate().is_err());
        config.camera.mouse_sensitivity = 0.1;
        config.camera.zoom = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_infinite_ranges_and_extents() {
        let yaml = "projection:\n  far: .inf\n";
        assert!(SceneConfig::from_yaml_str(yaml).is_err());

        let mut config = SceneConfig::default();
        config.camera.zoom_max = f32::INFINITY;
        assert!(config.validate().is_err());

        let mut config = SceneConfig::default();
        config.scene.cube_extent = Vec3::new(100.0, f32::INFINITY, 100.0);
        assert!(config.validate().is_err());

        let mut config = SceneConfig::default();
        config.light.marker_scale = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = SceneConfig::default();
        config.scene.instances.push(Vec3::new(f32::NAN, 0.0, 0.0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_round_trips_through_file() {
        let mut config = SceneConfig::default();
        config.light.position = Vec3::new(1.0, 2.0, 3.0);
        config.texture = Some(PathBuf::from("images/container2.png"));

        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(config.to_yaml_string().unwrap().as_bytes())
            .unwrap();

        let loaded = SceneConfig::load(tmp.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SceneConfig::load(dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn aspect_guards_zero_height() {
        let window = WindowConfig {
            width: 100,
            height: 0,
            ..WindowConfig::default()
        };
        assert_eq!(window.aspect(), 100.0);
    }
}
