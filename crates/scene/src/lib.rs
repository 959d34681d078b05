//! Scene description and per-instance transform derivation.
//!
//! # Invariants
//! - Model, MVP and normal matrices are recomputed every frame from the
//!   camera and instance positions; nothing here is cached across frames.
//! - Normals use the inverse-transpose of the model-view matrix.

mod layout;
mod mesh;
mod transform;

pub use layout::SceneLayout;
pub use mesh::{Vertex, cube_mesh};
pub use transform::{
    FrameMatrices, InstanceTransforms, cube_model_matrix, light_marker_model, projection_matrix,
};

pub fn crate_info() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"))
}
