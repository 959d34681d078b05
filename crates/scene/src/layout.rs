use crate::transform::{FrameMatrices, InstanceTransforms, cube_model_matrix};
use cubelit_common::SceneConfig;
use glam::{Mat4, Vec3};

/// Placement of the cube instances and the light marker.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneLayout {
    pub cube_extent: Vec3,
    /// Rotation applied to every cube about its own centre.
    pub rotation: Mat4,
    pub instances: Vec<Vec3>,
    pub light_position: Vec3,
    pub light_marker_scale: f32,
}

impl Default for SceneLayout {
    fn default() -> Self {
        Self::from_config(&SceneConfig::default())
    }
}

impl SceneLayout {
    pub fn from_config(config: &SceneConfig) -> Self {
        tracing::debug!(
            instances = config.scene.instances.len(),
            extent = %config.scene.cube_extent,
            light = %config.light.position,
            "scene layout"
        );
        Self {
            cube_extent: config.scene.cube_extent,
            rotation: Mat4::IDENTITY,
            instances: config.scene.instances.clone(),
            light_position: config.light.position,
            light_marker_scale: config.light.marker_scale,
        }
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Per-instance transforms for this frame, in instance order.
    pub fn instance_transforms<'a>(
        &'a self,
        frame: &'a FrameMatrices,
    ) -> impl Iterator<Item = InstanceTransforms> + 'a {
        self.instances.iter().map(move |&position| {
            frame.instance(cube_model_matrix(position, self.cube_extent, self.rotation))
        })
    }

    pub fn light_marker_mvp(&self, frame: &FrameMatrices) -> Mat4 {
        frame.light_marker_mvp(self.light_position, self.light_marker_scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_matches_config() {
        let layout = SceneLayout::default();
        assert_eq!(layout.instance_count(), 6);
        assert_eq!(layout.instances[0], Vec3::new(-200.0, 0.0, 0.0));
        assert_eq!(layout.light_position, Vec3::new(100.0, 0.0, 500.0));
        assert_eq!(layout.light_marker_scale, 0.5);
    }

    #[test]
    fn transforms_follow_instance_order() {
        let layout = SceneLayout::default();
        let frame = FrameMatrices::from_parts(Mat4::IDENTITY, Mat4::IDENTITY);
        let transforms: Vec<_> = layout.instance_transforms(&frame).collect();
        assert_eq!(transforms.len(), layout.instance_count());
        for (t, pos) in transforms.iter().zip(&layout.instances) {
            assert!(t.model.w_axis.truncate().abs_diff_eq(*pos, 1e-3));
            assert!(t.mvp.abs_diff_eq(t.model, 1e-6));
        }
    }

    #[test]
    fn light_marker_uses_view_projection() {
        let layout = SceneLayout::default();
        let vp = Mat4::from_translation(Vec3::new(0.0, 0.0, -10.0));
        let frame = FrameMatrices::from_parts(vp, Mat4::IDENTITY);
        let mvp = layout.light_marker_mvp(&frame);
        let marker_origin = mvp.transform_point3(Vec3::ZERO);
        assert!(marker_origin.abs_diff_eq(Vec3::new(50.0, 0.0, 240.0), 1e-3));
    }
}
