use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Cube vertex: position, face normal and texture coordinate.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coord: [f32; 2],
}

/// Generate cube vertices and indices with one corner at the origin.
///
/// Each face has its own four vertices so normals stay flat per face.
/// Faces are emitted front, top, back, bottom, left, right.
pub fn cube_mesh(extent: Vec3) -> (Vec<Vertex>, Vec<u32>) {
    let (w, h, d) = (extent.x, extent.y, extent.z);
    let faces: [([[f32; 3]; 4], [f32; 3]); 6] = [
        // front
        ([[0.0, 0.0, d], [w, 0.0, d], [w, h, d], [0.0, h, d]], [0.0, 0.0, 1.0]),
        // top
        ([[0.0, h, d], [w, h, d], [w, h, 0.0], [0.0, h, 0.0]], [0.0, 1.0, 0.0]),
        // back
        ([[0.0, 0.0, 0.0], [w, 0.0, 0.0], [w, h, 0.0], [0.0, h, 0.0]], [0.0, 0.0, -1.0]),
        // bottom
        ([[0.0, 0.0, d], [w, 0.0, d], [w, 0.0, 0.0], [0.0, 0.0, 0.0]], [0.0, -1.0, 0.0]),
        // left
        ([[0.0, 0.0, d], [0.0, 0.0, 0.0], [0.0, h, 0.0], [0.0, h, d]], [-1.0, 0.0, 0.0]),
        // right
        ([[w, 0.0, d], [w, 0.0, 0.0], [w, h, 0.0], [w, h, d]], [1.0, 0.0, 0.0]),
    ];
    let tex_coords = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (corners, normal) in faces {
        let base = vertices.len() as u32;
        for (position, tex_coord) in corners.into_iter().zip(tex_coords) {
            vertices.push(Vertex {
                position,
                normal,
                tex_coord,
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
    (vertices, indices)
}
