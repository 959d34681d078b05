use cubelit_scene::Vertex;
use cubelit_shader::{
    Linked, NagaStage, ShaderBackend, StageKind, StageSet, compile_wgsl, link_stages,
};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
    0 => Float32x3,
    1 => Float32x3,
    2 => Float32x2,
];

fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRIBUTES,
    }
}

/// A validated stage plus the wgpu module created from its IR.
pub struct WgpuStage {
    naga: NagaStage,
    module: wgpu::ShaderModule,
}

/// A linked render pipeline and the bind group layouts it derived.
pub struct WgpuProgram {
    pipeline: wgpu::RenderPipeline,
    bind_group_layouts: BTreeMap<u32, wgpu::BindGroupLayout>,
}

impl WgpuProgram {
    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    pub fn bind_group_layout(&self, group: u32) -> Option<&wgpu::BindGroupLayout> {
        self.bind_group_layouts.get(&group)
    }
}

/// Shader backend producing wgpu render pipelines.
///
/// Stages go through the naga front end first, so compile and link logs
/// carry WGSL source spans. Remaining device validation errors are captured
/// with error scopes.
pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    color_format: wgpu::TextureFormat,
}

impl WgpuBackend {
    pub fn new(device: Arc<wgpu::Device>, color_format: wgpu::TextureFormat) -> Self {
        Self {
            device,
            color_format,
        }
    }

    fn capture<T>(&self, f: impl FnOnce(&wgpu::Device) -> T) -> Result<T, String> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device);
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(err.to_string()),
            None => Ok(value),
        }
    }
}

impl ShaderBackend for WgpuBackend {
    type Stage = WgpuStage;
    type Program = WgpuProgram;

    fn compile(&mut self, kind: StageKind, label: &str, source: &str) -> Result<WgpuStage, String> {
        let naga = compile_wgsl(kind, label, source)?;
        let module = self.capture(|device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Naga(Cow::Owned(naga.module().clone())),
            })
        })?;
        Ok(WgpuStage { naga, module })
    }

    fn link(
        &mut self,
        label: &str,
        stages: StageSet<'_, WgpuStage>,
    ) -> Result<Linked<WgpuProgram>, String> {
        if let Some(geometry) = stages.geometry {
            return Err(format!(
                "{}: geometry stages are not supported by wgpu",
                geometry.naga.label()
            ));
        }
        let (vertex, fragment) = (stages.vertex, stages.fragment);
        let uniforms = link_stages(&vertex.naga, &fragment.naga)?;
        let color_format = self.color_format;

        let pipeline = self.capture(|device| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: None,
                vertex: wgpu::VertexState {
                    module: &vertex.module,
                    entry_point: Some(vertex.naga.entry_point()),
                    compilation_options: Default::default(),
                    buffers: &[vertex_layout()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fragment.module,
                    entry_point: Some(fragment.naga.entry_point()),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: color_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: Default::default(),
                    bias: Default::default(),
                }),
                multisample: Default::default(),
                multiview: None,
                cache: None,
            })
        })?;

        let groups: BTreeSet<u32> = uniforms.values().map(|loc| loc.group).collect();
        let bind_group_layouts = groups
            .into_iter()
            .map(|group| (group, pipeline.get_bind_group_layout(group)))
            .collect();

        Ok(Linked {
            program: WgpuProgram {
                pipeline,
                bind_group_layouts,
            },
            uniforms,
        })
    }
}
