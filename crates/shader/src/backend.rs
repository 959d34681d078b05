use crate::error::StageKind;
use crate::uniform::UniformLocation;
use std::collections::BTreeMap;

/// The stages handed to [`ShaderBackend::link`], already checked for
/// composition (one vertex, one fragment, optional geometry).
pub struct StageSet<'a, S> {
    pub vertex: &'a S,
    pub fragment: &'a S,
    pub geometry: Option<&'a S>,
}

/// Output of a successful link.
pub struct Linked<P> {
    pub program: P,
    /// Every uniform the linked stages declare, keyed by reflected name.
    pub uniforms: BTreeMap<String, UniformLocation>,
}

/// Compiles stage sources and links them into programs for one GPU API.
///
/// Failures return the compiler or linker diagnostic text; the manager wraps
/// it into a [`crate::ShaderError`].
pub trait ShaderBackend {
    type Stage;
    type Program;

    /// Compile one stage. Stage kinds the API cannot express must fail with
    /// a log saying so.
    fn compile(&mut self, kind: StageKind, label: &str, source: &str)
    -> Result<Self::Stage, String>;

    /// Link compiled stages into an executable program and reflect its
    /// uniforms.
    fn link(
        &mut self,
        label: &str,
        stages: StageSet<'_, Self::Stage>,
    ) -> Result<Linked<Self::Program>, String>;
}
