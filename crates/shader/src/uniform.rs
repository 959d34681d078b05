use glam::{Mat4, Vec3, Vec4};

/// Resource class of a reflected uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    /// A uniform buffer block or one of its members.
    Buffer,
    Texture,
    Sampler,
}

/// Where a uniform lives once the program is linked.
///
/// For buffer members `offset`/`size` locate the value inside the block bound
/// at `group`/`binding`. Textures and samplers have zero offset and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation {
    pub group: u32,
    pub binding: u32,
    pub offset: u32,
    pub size: u32,
    pub kind: UniformKind,
}

/// Uniform names the viewer binds by key instead of by string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Uniform {
    Mvp,
    Model,
    View,
    NormalMatrix,
    CameraPosition,
    LightPosition,
    LightAmbient,
    LightDiffuse,
    LightSpecular,
    MaterialSpecular,
    MaterialShininess,
    MaterialDiffuse,
    MaterialSampler,
}

impl Uniform {
    pub const ALL: [Uniform; 13] = [
        Uniform::Mvp,
        Uniform::Model,
        Uniform::View,
        Uniform::NormalMatrix,
        Uniform::CameraPosition,
        Uniform::LightPosition,
        Uniform::LightAmbient,
        Uniform::LightDiffuse,
        Uniform::LightSpecular,
        Uniform::MaterialSpecular,
        Uniform::MaterialShininess,
        Uniform::MaterialDiffuse,
        Uniform::MaterialSampler,
    ];

    /// Reflected name: `block.member` for buffer members, the variable name
    /// for textures and samplers.
    pub fn name(self) -> &'static str {
        match self {
            Uniform::Mvp => "object.mvp",
            Uniform::Model => "object.model",
            Uniform::View => "object.view",
            Uniform::NormalMatrix => "object.normal_matrix",
            Uniform::CameraPosition => "frame.camera_position",
            Uniform::LightPosition => "light.position",
            Uniform::LightAmbient => "light.ambient",
            Uniform::LightDiffuse => "light.diffuse",
            Uniform::LightSpecular => "light.specular",
            Uniform::MaterialSpecular => "material.specular",
            Uniform::MaterialShininess => "material.shininess",
            Uniform::MaterialDiffuse => "material_diffuse",
            Uniform::MaterialSampler => "material_sampler",
        }
    }
}

/// A value that can be written into a uniform block.
pub trait UniformValue {
    fn to_bytes(&self) -> Vec<u8>;
}

impl UniformValue for f32 {
    fn to_bytes(&self) -> Vec<u8> {
        bytemuck::bytes_of(self).to_vec()
    }
}

impl UniformValue for Vec3 {
    fn to_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.to_array()).to_vec()
    }
}

impl UniformValue for Vec4 {
    fn to_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.to_array()).to_vec()
    }
}

impl UniformValue for Mat4 {
    fn to_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.to_cols_array()).to_vec()
    }
}

/// CPU-side contents of one uniform buffer binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBlock {
    name: String,
    group: u32,
    binding: u32,
    bytes: Vec<u8>,
}

impl UniformBlock {
    pub(crate) fn zeroed(name: &str, location: &UniformLocation) -> Self {
        Self {
            name: name.to_string(),
            group: location.group,
            binding: location.binding,
            bytes: vec![0; location.size as usize],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> u32 {
        self.group
    }

    pub fn binding(&self) -> u32 {
        self.binding
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Write `value` at `location`. Returns false if the location belongs to
    /// another binding or the value does not fit.
    pub fn write(&mut self, location: &UniformLocation, value: &impl UniformValue) -> bool {
        if location.kind != UniformKind::Buffer
            || location.group != self.group
            || location.binding != self.binding
        {
            return false;
        }
        let bytes = value.to_bytes();
        let start = location.offset as usize;
        let end = start + bytes.len();
        if bytes.len() > location.size as usize || end > self.bytes.len() {
            return false;
        }
        self.bytes[start..end].copy_from_slice(&bytes);
        true
    }
}
