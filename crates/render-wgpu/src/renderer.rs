use crate::backend::{DEPTH_FORMAT, WgpuBackend, WgpuProgram};
use crate::error::RenderError;
use crate::texture::{self, TextureImage};
use cubelit_common::SceneConfig;
use cubelit_scene::{FrameMatrices, SceneLayout, cube_mesh, light_marker_model};
use cubelit_shader::{
    ProgramHandle, ShaderProgram, ShaderProgramManager, StageKind, Uniform, UniformBlock,
    UniformKind, UniformLocation, UniformValue,
};
use glam::Vec3;
use std::collections::BTreeMap;
use std::sync::Arc;
use wgpu::util::DeviceExt;

const OBJECT_BLOCK: &str = "object";
/// Uniforms the light marker program must declare.
const MARKER_UNIFORMS: [Uniform; 3] = [Uniform::Mvp, Uniform::Model, Uniform::View];
const CHECKERBOARD_SIZE: u32 = 256;
const CHECKERBOARD_CELLS: u32 = 8;

/// Round `size` up to a multiple of `alignment`.
pub fn align_to(size: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        return size;
    }
    size.div_ceil(alignment) * alignment
}

/// Draws the lit cube instances and the light marker.
///
/// Every draw gets its own slot in one object uniform buffer, so all
/// per-instance matrices for a frame are uploaded before the pass starts.
pub struct SceneRenderer {
    programs: ShaderProgramManager<WgpuBackend>,
    lighting: ProgramHandle,
    light_source: ProgramHandle,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    object_group: u32,
    object_block: UniformBlock,
    object_buffer: wgpu::Buffer,
    slot_stride: u64,
    lighting_slots: Vec<wgpu::BindGroup>,
    marker_slot: wgpu::BindGroup,
    frame_block: UniformBlock,
    frame_buffer: wgpu::Buffer,
    lighting_groups: Vec<(u32, wgpu::BindGroup)>,
    depth_view: wgpu::TextureView,
}

impl SceneRenderer {
    /// Build both programs and upload static scene data.
    ///
    /// Any shader failure aborts construction with the full diagnostic.
    pub fn new(
        device: &Arc<wgpu::Device>,
        queue: &wgpu::Queue,
        color_format: wgpu::TextureFormat,
        (width, height): (u32, u32),
        config: &SceneConfig,
        layout: &SceneLayout,
    ) -> Result<Self, RenderError> {
        let mut programs =
            ShaderProgramManager::new(WgpuBackend::new(device.clone(), color_format));
        let (lighting, light_source) = {
            let paths = &config.shaders;
            let vertex = programs.load_stage(StageKind::Vertex, &paths.vertex)?;
            let scene = programs.load_stage(StageKind::Fragment, &paths.scene_fragment)?;
            let light = programs.load_stage(StageKind::Fragment, &paths.light_fragment)?;
            (
                programs.build_program("lighting", &[&vertex, &scene])?,
                programs.build_program("light_source", &[&vertex, &light])?,
            )
        };
        let lit = programs.program(lighting)?;
        let marker = programs.program(light_source)?;
        require_all(lit, &Uniform::ALL)?;
        require_all(marker, &MARKER_UNIFORMS)?;

        let (vertices, indices) = cube_mesh(layout.cube_extent);
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("cube_vertex_buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("cube_index_buffer"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        // One slot per cube plus one for the marker.
        let object_block = new_block(lit, OBJECT_BLOCK)?;
        let object_group = object_block.group();
        let block_size = object_block.bytes().len() as u64;
        let slot_stride = align_to(
            block_size,
            device.limits().min_uniform_buffer_offset_alignment as u64,
        );
        let slot_count = layout.instance_count() as u64 + 1;
        let object_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("object_uniforms"),
            size: slot_stride * slot_count,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let lighting_slots = (0..layout.instance_count() as u64)
            .map(|slot| slot_bind_group(device, lit, &object_buffer, slot * slot_stride, block_size))
            .collect::<Result<Vec<_>, _>>()?;
        let marker_slot = slot_bind_group(
            device,
            marker,
            &object_buffer,
            (slot_count - 1) * slot_stride,
            block_size,
        )?;

        let mut light_block = new_block(lit, "light")?;
        write(lit, &mut light_block, Uniform::LightPosition, config.light.position)?;
        write(lit, &mut light_block, Uniform::LightAmbient, config.light.ambient)?;
        write(lit, &mut light_block, Uniform::LightDiffuse, config.light.diffuse)?;
        write(lit, &mut light_block, Uniform::LightSpecular, config.light.specular)?;
        let mut material_block = new_block(lit, "material")?;
        write(lit, &mut material_block, Uniform::MaterialSpecular, config.material.specular)?;
        write(
            lit,
            &mut material_block,
            Uniform::MaterialShininess,
            config.material.shininess,
        )?;
        let frame_block = new_block(lit, "frame")?;

        let light_buffer = uniform_buffer(device, &light_block);
        let material_buffer = uniform_buffer(device, &material_block);
        let frame_buffer = uniform_buffer(device, &frame_block);

        let image = match &config.texture {
            Some(path) => TextureImage::load(path)?,
            None => {
                tracing::info!("no texture configured; using checkerboard");
                TextureImage::checkerboard(CHECKERBOARD_SIZE, CHECKERBOARD_CELLS)
            }
        };
        let diffuse_view = texture::upload(device, queue, &image);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("diffuse_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let texture_loc = require(lit, Uniform::MaterialDiffuse)?;
        let sampler_loc = require(lit, Uniform::MaterialSampler)?;
        let mut entries: BTreeMap<u32, Vec<wgpu::BindGroupEntry<'_>>> = BTreeMap::new();
        for (block, buffer) in [
            (&light_block, &light_buffer),
            (&material_block, &material_buffer),
            (&frame_block, &frame_buffer),
        ] {
            entries.entry(block.group()).or_default().push(wgpu::BindGroupEntry {
                binding: block.binding(),
                resource: buffer.as_entire_binding(),
            });
        }
        entries
            .entry(texture_loc.group)
            .or_default()
            .push(wgpu::BindGroupEntry {
                binding: texture_loc.binding,
                resource: wgpu::BindingResource::TextureView(&diffuse_view),
            });
        entries
            .entry(sampler_loc.group)
            .or_default()
            .push(wgpu::BindGroupEntry {
                binding: sampler_loc.binding,
                resource: wgpu::BindingResource::Sampler(&sampler),
            });
        let lighting_groups = entries
            .into_iter()
            .map(|(group, entries)| -> Result<_, RenderError> {
                let layout = group_layout(lit, group)?;
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("lighting_bind_group"),
                    layout,
                    entries: &entries,
                });
                Ok((group, bind_group))
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(
            instances = layout.instance_count(),
            slot_stride,
            programs = programs.len(),
            "scene renderer ready"
        );

        Ok(Self {
            programs,
            lighting,
            light_source,
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            object_group,
            object_block,
            object_buffer,
            slot_stride,
            lighting_slots,
            marker_slot,
            frame_block,
            frame_buffer,
            lighting_groups,
            depth_view: create_depth_view(device, width, height),
        })
    }

    pub fn programs(&self) -> &ShaderProgramManager<WgpuBackend> {
        &self.programs
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_view = create_depth_view(device, width, height);
    }

    /// Render one frame: lit cubes, then the light marker.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: &wgpu::TextureView,
        frame: &FrameMatrices,
        camera_position: Vec3,
        layout: &SceneLayout,
    ) -> Result<(), RenderError> {
        let lit = self.programs.use_program(self.lighting)?;
        write(lit, &mut self.frame_block, Uniform::CameraPosition, camera_position)?;
        queue.write_buffer(&self.frame_buffer, 0, self.frame_block.bytes());

        let mut drawn = 0;
        for (slot, transforms) in layout
            .instance_transforms(frame)
            .take(self.lighting_slots.len())
            .enumerate()
        {
            let block = &mut self.object_block;
            write(lit, block, Uniform::Mvp, transforms.mvp)?;
            write(lit, block, Uniform::Model, transforms.model)?;
            write(lit, block, Uniform::View, frame.view)?;
            write(lit, block, Uniform::NormalMatrix, transforms.normal_matrix)?;
            queue.write_buffer(
                &self.object_buffer,
                slot as u64 * self.slot_stride,
                self.object_block.bytes(),
            );
            drawn += 1;
        }

        let marker = self.programs.use_program(self.light_source)?;
        let marker_model = light_marker_model(layout.light_position, layout.light_marker_scale);
        let block = &mut self.object_block;
        write(marker, block, Uniform::Mvp, layout.light_marker_mvp(frame))?;
        write(marker, block, Uniform::Model, marker_model)?;
        write(marker, block, Uniform::View, frame.view)?;
        queue.write_buffer(
            &self.object_buffer,
            self.lighting_slots.len() as u64 * self.slot_stride,
            self.object_block.bytes(),
        );

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("scene_encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.1,
                            g: 0.1,
                            b: 0.1,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
            pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

            let lit = self.programs.use_program(self.lighting)?;
            pass.set_pipeline(lit.raw().pipeline());
            for (group, bind_group) in &self.lighting_groups {
                pass.set_bind_group(*group, bind_group, &[]);
            }
            for slot in &self.lighting_slots[..drawn] {
                pass.set_bind_group(self.object_group, slot, &[]);
                pass.draw_indexed(0..self.index_count, 0, 0..1);
            }

            let marker = self.programs.use_program(self.light_source)?;
            pass.set_pipeline(marker.raw().pipeline());
            pass.set_bind_group(self.object_group, &self.marker_slot, &[]);
            pass.draw_indexed(0..self.index_count, 0, 0..1);
        }
        queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}

fn new_block<P>(
    program: &ShaderProgram<P>,
    name: &'static str,
) -> Result<UniformBlock, RenderError> {
    program
        .new_block(name)
        .ok_or_else(|| RenderError::MissingUniform {
            program: program.label().to_string(),
            name,
        })
}

fn require<P>(
    program: &ShaderProgram<P>,
    uniform: Uniform,
) -> Result<UniformLocation, RenderError> {
    program
        .location(uniform)
        .copied()
        .ok_or_else(|| RenderError::MissingUniform {
            program: program.label().to_string(),
            name: uniform.name(),
        })
}

/// Fail on the first uniform in `uniforms` that `program` does not declare.
fn require_all<P>(program: &ShaderProgram<P>, uniforms: &[Uniform]) -> Result<(), RenderError> {
    uniforms
        .iter()
        .try_for_each(|&uniform| require(program, uniform).map(drop))
}

/// `set_uniform` that reports why a write was dropped.
fn write<P>(
    program: &ShaderProgram<P>,
    block: &mut UniformBlock,
    uniform: Uniform,
    value: impl UniformValue,
) -> Result<(), RenderError> {
    require(program, uniform)?;
    if program.set_uniform(block, uniform, value) {
        Ok(())
    } else {
        Err(RenderError::UniformLayout {
            program: program.label().to_string(),
            name: uniform.name(),
            block: block.name().to_string(),
        })
    }
}

fn group_layout(
    program: &ShaderProgram<WgpuProgram>,
    group: u32,
) -> Result<&wgpu::BindGroupLayout, RenderError> {
    program
        .raw()
        .bind_group_layout(group)
        .ok_or_else(|| RenderError::MissingUniform {
            program: program.label().to_string(),
            name: "bind group",
        })
}

fn slot_bind_group(
    device: &wgpu::Device,
    program: &ShaderProgram<WgpuProgram>,
    buffer: &wgpu::Buffer,
    offset: u64,
    size: u64,
) -> Result<wgpu::BindGroup, RenderError> {
    let location = program
        .location_by_name(OBJECT_BLOCK)
        .filter(|loc| loc.kind == UniformKind::Buffer)
        .ok_or_else(|| RenderError::MissingUniform {
            program: program.label().to_string(),
            name: OBJECT_BLOCK,
        })?;
    Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("object_slot"),
        layout: group_layout(program, location.group)?,
        entries: &[wgpu::BindGroupEntry {
            binding: location.binding,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer,
                offset,
                size: wgpu::BufferSize::new(size),
            }),
        }],
    }))
}

fn uniform_buffer(device: &wgpu::Device, block: &UniformBlock) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(block.name()),
        contents: block.bytes(),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&Default::default())
}
