//! Shader stage compilation, program linking and uniform lookup.
//!
//! [`ShaderProgramManager`] owns every linked program and hands out
//! [`ProgramHandle`]s. The GPU API sits behind [`ShaderBackend`]; the
//! [`NagaBackend`] here checks WGSL without a device.

pub mod backend;
pub mod error;
pub mod manager;
pub mod naga_backend;
pub mod uniform;

pub use backend::{Linked, ShaderBackend, StageSet};
pub use error::{ShaderError, StageKind};
pub use manager::{CompiledStage, ProgramHandle, ShaderProgram, ShaderProgramManager};
pub use naga_backend::{NagaBackend, NagaProgram, NagaStage, compile_wgsl, link_stages};
pub use uniform::{Uniform, UniformBlock, UniformKind, UniformLocation, UniformValue};

pub fn crate_info() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"))
}
