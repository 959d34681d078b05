//! Shared types and configuration for the cubelit workspace.

mod config;
mod types;

pub use config::{
    CameraConfig, ConfigError, LightConfig, MaterialConfig, ProjectionConfig, SceneConfig,
    SceneSection, ShaderPaths, WindowConfig,
};
pub use types::Direction;

pub fn crate_info() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"))
}
