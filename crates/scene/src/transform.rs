use cubelit_camera::Camera;
use glam::{Mat3, Mat4, Vec3};

/// Right-handed perspective projection with a [0, 1] depth range.
///
/// `zoom_degrees` is the vertical field of view. A non-positive aspect
/// (zero-height viewport) is treated as 1.
pub fn projection_matrix(zoom_degrees: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let aspect = if aspect > 0.0 && aspect.is_finite() {
        aspect
    } else {
        1.0
    };
    Mat4::perspective_rh(zoom_degrees.to_radians(), aspect, near, far)
}

/// Model matrix for a cube authored with one corner at the origin.
///
/// Rotation is applied about the cube's own centre:
/// `translate(position) * translate(extent / 2) * rotation * translate(-extent / 2)`.
pub fn cube_model_matrix(position: Vec3, extent: Vec3, rotation: Mat4) -> Mat4 {
    let half = extent * 0.5;
    Mat4::from_translation(position)
        * Mat4::from_translation(half)
        * rotation
        * Mat4::from_translation(-half)
}

/// Model matrix for the light-source marker: `scale(k) * translate(light)`.
///
/// The scale applies after the translation, so it also scales the marker's
/// distance from the origin.
pub fn light_marker_model(light_position: Vec3, scale: f32) -> Mat4 {
    Mat4::from_scale(Vec3::splat(scale)) * Mat4::from_translation(light_position)
}

/// View and projection for one frame. Rebuilt every frame, never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameMatrices {
    pub view: Mat4,
    pub projection: Mat4,
    pub view_projection: Mat4,
}

impl FrameMatrices {
    pub fn from_parts(view: Mat4, projection: Mat4) -> Self {
        Self {
            view,
            projection,
            view_projection: projection * view,
        }
    }

    /// Projection from the camera's current zoom and the viewport aspect,
    /// view from the camera pose.
    pub fn new(camera: &Camera, aspect: f32, near: f32, far: f32) -> Self {
        Self::from_parts(
            camera.view_matrix(),
            projection_matrix(camera.zoom(), aspect, near, far),
        )
    }

    /// Derive the per-instance transforms for `model`.
    pub fn instance(&self, model: Mat4) -> InstanceTransforms {
        let model_view = self.view * model;
        InstanceTransforms {
            model,
            mvp: self.view_projection * model,
            normal_matrix: model_view.inverse().transpose(),
        }
    }

    pub fn light_marker_mvp(&self, light_position: Vec3, scale: f32) -> Mat4 {
        self.view_projection * light_marker_model(light_position, scale)
    }
}

/// Transforms uploaded for one cube draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceTransforms {
    pub model: Mat4,
    pub mvp: Mat4,
    /// Inverse-transpose of the model-view matrix. Only the upper 3x3 is
    /// meaningful; the 4x4 carrier matches the shader's uniform layout.
    pub normal_matrix: Mat4,
}

impl InstanceTransforms {
    pub fn normal_matrix3(&self) -> Mat3 {
        Mat3::from_mat4(self.normal_matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubelit_common::CameraConfig;

    const EXTENT: Vec3 = Vec3::new(100.0, 100.0, 100.0);

    fn fixed_frame() -> (Camera, FrameMatrices) {
        let camera = Camera::new(
            Vec3::new(0.0, 0.0, 25.0),
            Vec3::ZERO,
            Vec3::Y,
            &CameraConfig::default(),
        );
        let frame = FrameMatrices::new(&camera, 1200.0 / 800.0, 0.1, 10_000.0);
        (camera, frame)
    }

    #[test]
    fn identity_rotation_is_pure_translation() {
        let pos = Vec3::new(-200.0, 0.0, 0.0);
        let model = cube_model_matrix(pos, EXTENT, Mat4::IDENTITY);
        assert!(model.abs_diff_eq(Mat4::from_translation(pos), 1e-4));
    }

    #[test]
    fn rotation_pivots_about_cube_centre() {
        let rotation = Mat4::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let model = cube_model_matrix(Vec3::ZERO, EXTENT, rotation);
        let centre = EXTENT * 0.5;
        assert!(model.transform_point3(centre).abs_diff_eq(centre, 1e-3));
        // The origin corner swings around the centre rather than the origin.
        let corner = model.transform_point3(Vec3::ZERO);
        assert!(corner.abs_diff_eq(Vec3::new(0.0, 0.0, 100.0), 1e-3));
    }

    #[test]
    fn mvp_is_projection_view_model() {
        let (camera, frame) = fixed_frame();
        let positions = [
            Vec3::new(-100.0, -50.0, 0.0),
            Vec3::new(-200.0, 0.0, 0.0),
            Vec3::new(0.0, 100.0, -150.0),
            Vec3::new(100.0, -100.0, 50.0),
            Vec3::new(-200.0, -200.0, -150.0),
            Vec3::new(250.0, 0.0, 0.0),
            Vec3::new(-50.0, -150.0, -10.0),
        ];
        let projection = Mat4::perspective_rh(45.0_f32.to_radians(), 1.5, 0.1, 10_000.0);
        let view = Mat4::look_at_rh(camera.position(), camera.position() + Vec3::NEG_Z, Vec3::Y);

        for pos in positions {
            let half = EXTENT / 2.0;
            let expected_model = Mat4::from_translation(pos + half) * Mat4::from_translation(-half);
            let t = frame.instance(cube_model_matrix(pos, EXTENT, Mat4::IDENTITY));
            assert!(t.model.abs_diff_eq(expected_model, 1e-3));
            assert!(t.mvp.abs_diff_eq(projection * view * expected_model, 1e-3));
        }
    }

    #[test]
    fn normal_matrix_is_inverse_transpose_of_model_view() {
        let (_, frame) = fixed_frame();
        let model = Mat4::from_scale(Vec3::new(2.0, 0.5, 1.0)) * Mat4::from_translation(Vec3::X);
        let t = frame.instance(model);
        let expected = (frame.view * model).inverse().transpose();
        assert!(t.normal_matrix.abs_diff_eq(expected, 1e-4));

        // Under non-uniform scale a transformed normal stays perpendicular to
        // a transformed tangent; the plain model-view would not.
        let mv = frame.view * model;
        let tangent = mv.transform_vector3(Vec3::new(1.0, 1.0, 0.0));
        let normal = t.normal_matrix3() * Vec3::new(1.0, -1.0, 0.0);
        assert!(tangent.dot(normal).abs() < 1e-3);
        let naive = Mat3::from_mat4(mv) * Vec3::new(1.0, -1.0, 0.0);
        assert!(tangent.dot(naive).abs() > 1e-1);
    }

    #[test]
    fn light_marker_scales_its_translation() {
        let model = light_marker_model(Vec3::new(100.0, 0.0, 500.0), 0.5);
        let origin = model.transform_point3(Vec3::ZERO);
        assert!(origin.abs_diff_eq(Vec3::new(50.0, 0.0, 250.0), 1e-4));
    }

    #[test]
    fn degenerate_aspect_falls_back_to_square() {
        let a = projection_matrix(45.0, 0.0, 0.1, 100.0);
        let b = projection_matrix(45.0, 1.0, 0.1, 100.0);
        assert_eq!(a, b);
    }

    #[test]
    fn zoom_narrows_projection() {
        let wide = projection_matrix(45.0, 1.0, 0.1, 100.0);
        let narrow = projection_matrix(10.0, 1.0, 0.1, 100.0);
        // Smaller field of view means a larger focal scale.
        assert!(narrow.y_axis.y > wide.y_axis.y);
    }
}
