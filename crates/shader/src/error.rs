use crate::manager::ProgramHandle;
use std::fmt;
use std::path::PathBuf;

/// Kind of a compilable shader stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageKind {
    Vertex,
    Fragment,
    Geometry,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StageKind::Vertex => "vertex",
            StageKind::Fragment => "fragment",
            StageKind::Geometry => "geometry",
        })
    }
}

/// Errors from building or using shader programs.
///
/// Compile and link variants carry the full diagnostic text.
#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error("shader source {path} could not be read: {source}")]
    SourceNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{stage} stage `{label}` failed to compile:\n{log}")]
    Compile {
        stage: StageKind,
        label: String,
        log: String,
    },
    #[error("program `{label}` failed to link:\n{log}")]
    Link { label: String, log: String },
    #[error("invalid program handle {0}")]
    InvalidHandle(ProgramHandle),
}

impl ShaderError {
    /// Compiler or linker diagnostic text, if this error carries one.
    pub fn log(&self) -> Option<&str> {
        match self {
            ShaderError::Compile { log, .. } | ShaderError::Link { log, .. } => Some(log),
            _ => None,
        }
    }
}
