use cubelit_shader::ShaderError;
use std::path::PathBuf;

/// Errors from GPU setup and scene rendering.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Shader(#[from] ShaderError),
    #[error("program `{program}` does not declare `{name}`")]
    MissingUniform { program: String, name: &'static str },
    #[error("program `{program}` places `{name}` outside block `{block}`")]
    UniformLayout {
        program: String,
        name: &'static str,
        block: String,
    },
    #[error("texture {path} could not be decoded: {source}")]
    Texture {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    #[error(transparent)]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error(transparent)]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}
