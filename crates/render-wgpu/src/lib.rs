//! wgpu render backend for the cube scene.
//!
//! [`WgpuBackend`] plugs wgpu into the shader program manager: stages are
//! validated WGSL modules and programs are render pipelines with derived
//! bind group layouts. [`SceneRenderer`] owns the programs and draws the lit
//! cube instances followed by the light marker.
//!
//! # Invariants
//! - Matrices reach the GPU only through reflected uniform locations.
//! - The renderer never mutates camera or scene state.

mod backend;
mod context;
mod error;
mod renderer;
mod texture;

pub use backend::{DEPTH_FORMAT, WgpuBackend, WgpuProgram, WgpuStage};
pub use context::GpuContext;
pub use error::RenderError;
pub use renderer::{SceneRenderer, align_to};
pub use texture::TextureImage;

pub fn crate_info() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"))
}
