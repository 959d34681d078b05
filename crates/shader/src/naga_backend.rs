//! WGSL front end built on naga.
//!
//! Compiling a stage parses and validates one WGSL module and picks its single
//! entry point for the requested stage. Linking checks that the stages agree
//! on their inter-stage interface and on every resource they share, then
//! reflects the uniform locations of the combined program.

use crate::backend::{Linked, ShaderBackend, StageSet};
use crate::error::StageKind;
use crate::uniform::{UniformKind, UniformLocation};
use naga::valid::{Capabilities, ModuleInfo, ValidationFlags, Validator};
use naga::{AddressSpace, Binding, Module, ShaderStage, TypeInner};
use std::collections::BTreeMap;

/// A parsed and validated WGSL stage.
#[derive(Debug)]
pub struct NagaStage {
    kind: StageKind,
    label: String,
    entry_point: String,
    module: Module,
    info: ModuleInfo,
}

impl NagaStage {
    pub fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn info(&self) -> &ModuleInfo {
        &self.info
    }
}

/// Parse and validate `source` as a single stage of kind `kind`.
///
/// Errors are rendered diagnostics with source excerpts.
pub fn compile_wgsl(kind: StageKind, label: &str, source: &str) -> Result<NagaStage, String> {
    let stage = match kind {
        StageKind::Vertex => ShaderStage::Vertex,
        StageKind::Fragment => ShaderStage::Fragment,
        StageKind::Geometry => {
            return Err(format!(
                "{label}: WGSL has no geometry stage; expand primitives on the CPU or in the vertex stage"
            ));
        }
    };

    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;
    let info = Validator::new(ValidationFlags::all(), Capabilities::default())
        .validate(&module)
        .map_err(|e| e.emit_to_string(source))?;

    let mut entries = module.entry_points.iter().filter(|ep| ep.stage == stage);
    let entry = entries
        .next()
        .ok_or_else(|| format!("{label}: no @{kind} entry point"))?;
    if let Some(extra) = entries.next() {
        return Err(format!(
            "{label}: more than one @{kind} entry point (`{}` and `{}`)",
            entry.name, extra.name
        ));
    }
    let entry_point = entry.name.clone();

    Ok(NagaStage {
        kind,
        label: label.to_string(),
        entry_point,
        module,
        info,
    })
}

/// Check the vertex/fragment pair for compatibility and reflect the uniform
/// locations both stages declare.
pub fn link_stages(
    vertex: &NagaStage,
    fragment: &NagaStage,
) -> Result<BTreeMap<String, UniformLocation>, String> {
    check_interface(vertex, fragment)?;
    let mut uniforms = BTreeMap::new();
    let mut claimed: BTreeMap<(u32, u32), (String, String)> = BTreeMap::new();
    for stage in [vertex, fragment] {
        for resource in resources(&stage.module) {
            let key = (resource.group, resource.binding);
            match claimed.get(&key) {
                Some((name, _)) if *name != resource.name => {
                    return Err(format!(
                        "@group({}) @binding({}) is `{name}` in one stage and `{}` in `{}`",
                        key.0, key.1, resource.name, stage.label
                    ));
                }
                Some((_, ty)) if *ty != resource.ty => {
                    return Err(format!(
                        "`{}` has type `{ty}` in one stage and `{}` in `{}`",
                        resource.name, resource.ty, stage.label
                    ));
                }
                Some(_) => {}
                None => {
                    claimed.insert(key, (resource.name.clone(), resource.ty.clone()));
                }
            }
            uniforms.extend(resource.locations);
        }
    }
    Ok(uniforms)
}

/// Program produced by [`NagaBackend`]: the entry points to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NagaProgram {
    pub vertex_entry: String,
    pub fragment_entry: String,
}

/// GPU-less backend: full WGSL compile and link checks without a device.
#[derive(Debug, Default)]
pub struct NagaBackend;

impl ShaderBackend for NagaBackend {
    type Stage = NagaStage;
    type Program = NagaProgram;

    fn compile(&mut self, kind: StageKind, label: &str, source: &str) -> Result<NagaStage, String> {
        compile_wgsl(kind, label, source)
    }

    fn link(
        &mut self,
        _label: &str,
        stages: StageSet<'_, NagaStage>,
    ) -> Result<Linked<NagaProgram>, String> {
        if let Some(geometry) = stages.geometry {
            return Err(format!("{}: geometry stages cannot be linked", geometry.label));
        }
        let uniforms = link_stages(stages.vertex, stages.fragment)?;
        Ok(Linked {
            program: NagaProgram {
                vertex_entry: stages.vertex.entry_point.clone(),
                fragment_entry: stages.fragment.entry_point.clone(),
            },
            uniforms,
        })
    }
}

struct Resource {
    name: String,
    group: u32,
    binding: u32,
    ty: String,
    locations: Vec<(String, UniformLocation)>,
}

fn resources(module: &Module) -> Vec<Resource> {
    let ctx = module.to_ctx();
    let mut out = Vec::new();
    for (_, var) in module.global_variables.iter() {
        let (Some(name), Some(rb)) = (&var.name, &var.binding) else {
            continue;
        };
        let inner = &module.types[var.ty].inner;
        let at = |offset: u32, size: u32, kind: UniformKind| UniformLocation {
            group: rb.group,
            binding: rb.binding,
            offset,
            size,
            kind,
        };

        let mut locations = Vec::new();
        match var.space {
            AddressSpace::Uniform => {
                locations.push((name.clone(), at(0, inner.size(ctx), UniformKind::Buffer)));
                if let TypeInner::Struct { members, .. } = inner {
                    for member in members {
                        let Some(member_name) = &member.name else {
                            continue;
                        };
                        let size = module.types[member.ty].inner.size(ctx);
                        locations.push((
                            format!("{name}.{member_name}"),
                            at(member.offset, size, UniformKind::Buffer),
                        ));
                    }
                }
            }
            AddressSpace::Handle => match inner {
                TypeInner::Image { .. } => {
                    locations.push((name.clone(), at(0, 0, UniformKind::Texture)));
                }
                TypeInner::Sampler { .. } => {
                    locations.push((name.clone(), at(0, 0, UniformKind::Sampler)));
                }
                _ => {}
            },
            _ => {}
        }

        out.push(Resource {
            name: name.clone(),
            group: rb.group,
            binding: rb.binding,
            ty: describe(module, var.ty),
            locations,
        });
    }
    out
}

/// Inter-stage values keyed by location.
fn locations_of(
    module: &Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&Binding>,
    out: &mut BTreeMap<u32, String>,
) {
    match binding {
        Some(Binding::Location { location, .. }) => {
            out.insert(*location, describe(module, ty));
        }
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    locations_of(module, member.ty, member.binding.as_ref(), out);
                }
            }
        }
    }
}

fn entry<'a>(stage: &'a NagaStage) -> Option<&'a naga::EntryPoint> {
    stage
        .module
        .entry_points
        .iter()
        .find(|ep| ep.name == stage.entry_point)
}

fn check_interface(vertex: &NagaStage, fragment: &NagaStage) -> Result<(), String> {
    let (Some(vs), Some(fs)) = (entry(vertex), entry(fragment)) else {
        return Err("entry point missing from compiled stage".into());
    };

    let mut produced = BTreeMap::new();
    if let Some(result) = &vs.function.result {
        locations_of(&vertex.module, result.ty, result.binding.as_ref(), &mut produced);
    }
    let mut consumed = BTreeMap::new();
    for arg in &fs.function.arguments {
        locations_of(&fragment.module, arg.ty, arg.binding.as_ref(), &mut consumed);
    }

    for (location, ty) in &consumed {
        match produced.get(location) {
            None => {
                return Err(format!(
                    "fragment input @location({location}) is not written by vertex stage `{}`",
                    vertex.label
                ));
            }
            Some(out_ty) if out_ty != ty => {
                return Err(format!(
                    "@location({location}) is `{out_ty}` in `{}` but `{ty}` in `{}`",
                    vertex.label, fragment.label
                ));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Module-independent type description, used to compare types across stages.
fn describe(module: &Module, ty: naga::Handle<naga::Type>) -> String {
    let ty = &module.types[ty];
    match &ty.inner {
        TypeInner::Scalar(scalar) => scalar_name(*scalar),
        TypeInner::Vector { size, scalar } => {
            format!("vec{}<{}>", *size as u8, scalar_name(*scalar))
        }
        TypeInner::Matrix {
            columns,
            rows,
            scalar,
        } => format!(
            "mat{}x{}<{}>",
            *columns as u8,
            *rows as u8,
            scalar_name(*scalar)
        ),
        TypeInner::Struct { members, span } => {
            let fields: Vec<String> = members
                .iter()
                .map(|m| {
                    format!(
                        "{}@{}: {}",
                        m.name.as_deref().unwrap_or("_"),
                        m.offset,
                        describe(module, m.ty)
                    )
                })
                .collect();
            format!(
                "struct {} {{ {} }} ({span} bytes)",
                ty.name.as_deref().unwrap_or("_"),
                fields.join(", ")
            )
        }
        TypeInner::Array { base, size, .. } => match size {
            naga::ArraySize::Constant(n) => format!("array<{}, {n}>", describe(module, *base)),
            _ => format!("array<{}>", describe(module, *base)),
        },
        other => format!("{other:?}"),
    }
}

fn scalar_name(scalar: naga::Scalar) -> String {
    let prefix = match scalar.kind {
        naga::ScalarKind::Sint | naga::ScalarKind::AbstractInt => "i",
        naga::ScalarKind::Uint => "u",
        naga::ScalarKind::Float | naga::ScalarKind::AbstractFloat => "f",
        naga::ScalarKind::Bool => return "bool".into(),
    };
    format!("{prefix}{}", scalar.width as u32 * 8)
}
