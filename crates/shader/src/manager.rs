use crate::backend::{ShaderBackend, StageSet};
use crate::error::{ShaderError, StageKind};
use crate::uniform::{Uniform, UniformBlock, UniformKind, UniformLocation, UniformValue};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Identifier of a linked program. Never reused within a manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramHandle(u32);

impl ProgramHandle {
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProgramHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A compiled stage ready to be linked.
///
/// Stages are borrowed by [`ShaderProgramManager::build_program`]; once a
/// program is linked the caller may drop them.
#[derive(Debug)]
pub struct CompiledStage<S> {
    kind: StageKind,
    label: String,
    inner: S,
}

impl<S> CompiledStage<S> {
    pub fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

/// A linked, usable program with its uniform locations resolved.
#[derive(Debug)]
pub struct ShaderProgram<P> {
    handle: ProgramHandle,
    label: String,
    raw: P,
    uniform_locations: BTreeMap<String, UniformLocation>,
}

impl<P> ShaderProgram<P> {
    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// The backend's program object.
    pub fn raw(&self) -> &P {
        &self.raw
    }

    pub fn location(&self, uniform: Uniform) -> Option<&UniformLocation> {
        self.uniform_locations.get(uniform.name())
    }

    pub fn location_by_name(&self, name: &str) -> Option<&UniformLocation> {
        self.uniform_locations.get(name)
    }

    pub fn uniform_locations(&self) -> &BTreeMap<String, UniformLocation> {
        &self.uniform_locations
    }

    pub fn uniform_names(&self) -> impl Iterator<Item = &str> {
        self.uniform_locations.keys().map(String::as_str)
    }

    /// Zeroed CPU copy of the uniform buffer declared as `name`.
    pub fn new_block(&self, name: &str) -> Option<UniformBlock> {
        if name.contains('.') {
            return None;
        }
        self.uniform_locations
            .get(name)
            .filter(|loc| loc.kind == UniformKind::Buffer)
            .map(|loc| UniformBlock::zeroed(name, loc))
    }

    /// Write `value` into `block` at the location of `uniform`.
    ///
    /// Returns false when the program does not declare `uniform` or it lives
    /// in a different block.
    pub fn set_uniform(
        &self,
        block: &mut UniformBlock,
        uniform: Uniform,
        value: impl UniformValue,
    ) -> bool {
        match self.location(uniform) {
            Some(loc) => block.write(loc, &value),
            None => false,
        }
    }
}

/// Builds shader programs from stage sources and tracks the active one.
///
/// Programs are immutable once built. Failed builds are never retried.
pub struct ShaderProgramManager<B: ShaderBackend> {
    backend: B,
    programs: BTreeMap<ProgramHandle, ShaderProgram<B::Program>>,
    next_handle: u32,
    active: Option<ProgramHandle>,
}

impl<B: ShaderBackend> ShaderProgramManager<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            programs: BTreeMap::new(),
            next_handle: 1,
            active: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Read a stage source file and compile it.
    pub fn load_stage(
        &mut self,
        kind: StageKind,
        path: impl AsRef<Path>,
    ) -> Result<CompiledStage<B::Stage>, ShaderError> {
        let path = path.as_ref();
        let source =
            std::fs::read_to_string(path).map_err(|source| ShaderError::SourceNotFound {
                path: path.to_path_buf(),
                source,
            })?;
        self.compile_stage(kind, &path.display().to_string(), &source)
    }

    /// Compile an in-memory stage source.
    pub fn compile_stage(
        &mut self,
        kind: StageKind,
        label: &str,
        source: &str,
    ) -> Result<CompiledStage<B::Stage>, ShaderError> {
        let inner =
            self.backend
                .compile(kind, label, source)
                .map_err(|log| ShaderError::Compile {
                    stage: kind,
                    label: label.to_string(),
                    log: non_empty_log(log),
                })?;
        tracing::debug!(stage = %kind, label, "compiled shader stage");
        Ok(CompiledStage {
            kind,
            label: label.to_string(),
            inner,
        })
    }

    /// Link stages into a program: exactly one vertex and one fragment stage,
    /// optionally one geometry stage.
    pub fn build_program(
        &mut self,
        label: &str,
        stages: &[&CompiledStage<B::Stage>],
    ) -> Result<ProgramHandle, ShaderError> {
        let link_error = |log: String| ShaderError::Link {
            label: label.to_string(),
            log,
        };

        let vertex = pick_stage(stages, StageKind::Vertex)
            .map_err(link_error)?
            .ok_or_else(|| link_error("missing vertex stage".into()))?;
        let fragment = pick_stage(stages, StageKind::Fragment)
            .map_err(link_error)?
            .ok_or_else(|| link_error("missing fragment stage".into()))?;
        let geometry = pick_stage(stages, StageKind::Geometry).map_err(link_error)?;

        let linked = self
            .backend
            .link(
                label,
                StageSet {
                    vertex,
                    fragment,
                    geometry,
                },
            )
            .map_err(|log| link_error(non_empty_log(log)))?;

        let handle = ProgramHandle(self.next_handle);
        self.next_handle += 1;
        tracing::info!(
            %handle,
            label,
            uniforms = linked.uniforms.len(),
            "linked shader program"
        );
        self.programs.insert(
            handle,
            ShaderProgram {
                handle,
                label: label.to_string(),
                raw: linked.program,
                uniform_locations: linked.uniforms,
            },
        );
        Ok(handle)
    }

    /// Make `handle` the active program for subsequent draws and uniform
    /// uploads.
    pub fn use_program(
        &mut self,
        handle: ProgramHandle,
    ) -> Result<&ShaderProgram<B::Program>, ShaderError> {
        let program = self
            .programs
            .get(&handle)
            .ok_or(ShaderError::InvalidHandle(handle))?;
        self.active = Some(handle);
        Ok(program)
    }

    pub fn program(&self, handle: ProgramHandle) -> Result<&ShaderProgram<B::Program>, ShaderError> {
        self.programs
            .get(&handle)
            .ok_or(ShaderError::InvalidHandle(handle))
    }

    pub fn active(&self) -> Option<&ShaderProgram<B::Program>> {
        self.active.and_then(|h| self.programs.get(&h))
    }

    /// Drop a program. Its handle becomes invalid.
    pub fn release(&mut self, handle: ProgramHandle) -> Result<(), ShaderError> {
        self.programs
            .remove(&handle)
            .ok_or(ShaderError::InvalidHandle(handle))?;
        if self.active == Some(handle) {
            self.active = None;
        }
        tracing::debug!(%handle, "released shader program");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

/// The single stage of `kind`, if any.
fn pick_stage<'a, S>(
    stages: &[&'a CompiledStage<S>],
    kind: StageKind,
) -> Result<Option<&'a S>, String> {
    let mut matching = stages.iter().filter(|s| s.kind == kind);
    let first = matching.next();
    if let (Some(first), Some(extra)) = (first, matching.next()) {
        return Err(format!(
            "more than one {kind} stage: `{}` and `{}`",
            first.label, extra.label
        ));
    }
    Ok(first.map(|s| &s.inner))
}

fn non_empty_log(log: String) -> String {
    if log.trim().is_empty() {
        "(no diagnostic output)".to_string()
    } else {
        log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Linked;
    use std::io::Write;

    /// Backend that accepts any source not containing "error" and records
    /// link calls.
    #[derive(Default)]
    struct RecordingBackend {
        links: Vec<String>,
    }

    impl ShaderBackend for RecordingBackend {
        type Stage = String;
        type Program = String;

        fn compile(&mut self, _kind: StageKind, _label: &str, source: &str) -> Result<String, String> {
            if source.contains("error") {
                Err(String::new())
            } else {
                Ok(source.to_string())
            }
        }

        fn link(&mut self, label: &str, stages: StageSet<'_, String>) -> Result<Linked<String>, String> {
            self.links.push(label.to_string());
            let mut uniforms = BTreeMap::new();
            uniforms.insert(
                "object".to_string(),
                UniformLocation {
                    group: 0,
                    binding: 0,
                    offset: 0,
                    size: 64,
                    kind: UniformKind::Buffer,
                },
            );
            uniforms.insert(
                "object.mvp".to_string(),
                UniformLocation {
                    group: 0,
                    binding: 0,
                    offset: 0,
                    size: 64,
                    kind: UniformKind::Buffer,
                },
            );
            Ok(Linked {
                program: format!("{}+{}", stages.vertex, stages.fragment),
                uniforms,
            })
        }
    }

    fn manager() -> ShaderProgramManager<RecordingBackend> {
        ShaderProgramManager::new(RecordingBackend::default())
    }

    #[test]
    fn build_and_use_program() {
        let mut m = manager();
        let vs = m.compile_stage(StageKind::Vertex, "vs", "v").unwrap();
        let fs = m.compile_stage(StageKind::Fragment, "fs", "f").unwrap();
        let handle = m.build_program("scene", &[&vs, &fs]).unwrap();
        drop((vs, fs));

        let program = m.use_program(handle).unwrap();
        assert_eq!(program.raw(), "v+f");
        assert_eq!(program.label(), "scene");
        assert!(program.location(Uniform::Mvp).is_some());
        assert!(program.location(Uniform::LightPosition).is_none());
        assert_eq!(m.active().map(|p| p.handle()), Some(handle));
    }

    #[test]
    fn empty_compile_log_is_replaced() {
        let mut m = manager();
        let err = m
            .compile_stage(StageKind::Fragment, "broken", "error")
            .unwrap_err();
        match err {
            ShaderError::Compile { stage, label, log } => {
                assert_eq!(stage, StageKind::Fragment);
                assert_eq!(label, "broken");
                assert!(!log.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn stage_composition_is_checked_before_linking() {
        let mut m = manager();
        let vs = m.compile_stage(StageKind::Vertex, "vs", "v").unwrap();
        let vs2 = m.compile_stage(StageKind::Vertex, "vs2", "v2").unwrap();
        let fs = m.compile_stage(StageKind::Fragment, "fs", "f").unwrap();

        let missing = m.build_program("no-fragment", &[&vs]).unwrap_err();
        assert!(matches!(missing, ShaderError::Link { .. }));
        assert!(missing.log().unwrap().contains("fragment"));

        let doubled = m.build_program("two-vertex", &[&vs, &vs2, &fs]).unwrap_err();
        assert!(doubled.log().unwrap().contains("more than one vertex"));

        assert!(m.backend().links.is_empty());
        assert!(m.is_empty());
    }

    #[test]
    fn handles_are_not_reused_after_release() {
        let mut m = manager();
        let vs = m.compile_stage(StageKind::Vertex, "vs", "v").unwrap();
        let fs = m.compile_stage(StageKind::Fragment, "fs", "f").unwrap();
        let first = m.build_program("a", &[&vs, &fs]).unwrap();
        m.use_program(first).unwrap();

        m.release(first).unwrap();
        assert!(m.active().is_none());
        assert!(matches!(
            m.use_program(first),
            Err(ShaderError::InvalidHandle(h)) if h == first
        ));
        assert!(matches!(m.release(first), Err(ShaderError::InvalidHandle(_))));

        let second = m.build_program("b", &[&fs, &vs]).unwrap();
        assert_ne!(first, second);
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn unknown_handle_is_invalid() {
        let mut m = manager();
        let err = m.use_program(ProgramHandle(42)).unwrap_err();
        assert_eq!(err.to_string(), "invalid program handle #42");
        assert!(m.active().is_none());
    }

    #[test]
    fn missing_source_file_is_reported() {
        let mut m = manager();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.wgsl");
        match m.load_stage(StageKind::Vertex, &path).unwrap_err() {
            ShaderError::SourceNotFound { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn load_stage_uses_path_as_label() {
        let mut m = manager();
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"vertex source").unwrap();
        let stage = m.load_stage(StageKind::Vertex, tmp.path()).unwrap();
        assert_eq!(stage.label(), tmp.path().display().to_string());
        assert_eq!(stage.inner(), "vertex source");
        assert_eq!(stage.kind(), StageKind::Vertex);
    }

    #[test]
    fn blocks_are_written_through_locations() {
        let mut m = manager();
        let vs = m.compile_stage(StageKind::Vertex, "vs", "v").unwrap();
        let fs = m.compile_stage(StageKind::Fragment, "fs", "f").unwrap();
        let handle = m.build_program("scene", &[&vs, &fs]).unwrap();
        let program = m.program(handle).unwrap();

        assert_eq!(
            program.uniform_names().collect::<Vec<_>>(),
            ["object", "object.mvp"]
        );
        assert!(program.new_block("object.mvp").is_none());
        let mut block = program.new_block("object").unwrap();
        assert_eq!(block.bytes().len(), 64);
        assert!(program.set_uniform(&mut block, Uniform::Mvp, glam::Mat4::IDENTITY));
        assert!(!program.set_uniform(&mut block, Uniform::View, glam::Mat4::IDENTITY));
        assert_eq!(&block.bytes()[0..4], &1.0_f32.to_le_bytes());
    }
}
