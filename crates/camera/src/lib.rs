//! First-person fly camera.
//!
//! # Invariants
//! - `front`, `right`, `up` form a right-handed orthonormal basis derived
//!   from `yaw`/`pitch` and the world up vector; they are recomputed on every
//!   angle change and never set directly.
//! - `pitch` stays within [-89°, 89°]; `yaw` is unbounded.
//! - `zoom` stays within the configured [min, max] range.
//! - No operation fails: out-of-range inputs are clamped.

use cubelit_common::{CameraConfig, Direction};
use glam::{Mat4, Vec3};

/// Pitch limit in degrees. Keeps `front` from becoming parallel to world up.
pub const PITCH_LIMIT: f32 = 89.0;

/// Squared length below which `front × world_up` is treated as zero.
const DEGENERATE_CROSS: f32 = 1e-8;

/// Fly camera with yaw/pitch orientation and a field-of-view zoom.
///
/// Angles are stored in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Vec3,
    front: Vec3,
    up: Vec3,
    right: Vec3,
    world_up: Vec3,
    yaw: f32,
    pitch: f32,
    zoom: f32,
    zoom_min: f32,
    zoom_max: f32,
    movement_speed: f32,
    mouse_sensitivity: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

impl Camera {
    /// Build a camera at `position` looking toward `target`.
    ///
    /// Tuning constants and the zoom range come from `config`; its own
    /// position/target/up are ignored.
    pub fn new(position: Vec3, target: Vec3, world_up: Vec3, config: &CameraConfig) -> Self {
        let (yaw, pitch) = match (target - position).try_normalize() {
            Some(dir) => (
                dir.z.atan2(dir.x).to_degrees(),
                dir.y.clamp(-1.0, 1.0).asin().to_degrees(),
            ),
            None => (-90.0, 0.0),
        };
        let zoom_min = config.zoom_min.min(config.zoom_max);
        let zoom_max = config.zoom_max.max(config.zoom_min);

        let mut camera = Self {
            position,
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            right: Vec3::X,
            world_up: world_up.try_normalize().unwrap_or(Vec3::Y),
            yaw,
            pitch: pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
            zoom: config.zoom.clamp(zoom_min, zoom_max),
            zoom_min,
            zoom_max,
            movement_speed: config.movement_speed,
            mouse_sensitivity: config.mouse_sensitivity,
        };
        camera.update_vectors();
        tracing::debug!(
            position = ?camera.position,
            yaw = camera.yaw,
            pitch = camera.pitch,
            "camera created"
        );
        camera
    }

    /// Build a camera from the config's initial pose.
    pub fn from_config(config: &CameraConfig) -> Self {
        Self::new(config.position, config.target, config.up, config)
    }

    /// Translate along `front` or `right` by `movement_speed * dt`.
    ///
    /// `dt` is seconds since the previous frame. Negative or non-finite values
    /// are treated as zero.
    pub fn handle_key_input(&mut self, direction: Direction, dt: f32) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let velocity = self.movement_speed * dt;
        match direction {
            Direction::Forward => self.position += self.front * velocity,
            Direction::Backward => self.position -= self.front * velocity,
            Direction::Left => self.position -= self.right * velocity,
            Direction::Right => self.position += self.right * velocity,
        }
    }

    /// Rotate by a pointer delta in pixels. Positive `dy` looks up.
    pub fn handle_mouse_input(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.mouse_sensitivity;
        self.pitch = (self.pitch + dy * self.mouse_sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.update_vectors();
    }

    /// Narrow the field of view on positive `y_offset` (scroll up zooms in).
    pub fn handle_mouse_scroll_input(&mut self, _x_offset: f32, y_offset: f32) {
        self.zoom = (self.zoom - y_offset).clamp(self.zoom_min, self.zoom_max);
    }

    /// Look-at transform from `position` toward `position + front`.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    /// Current field of view in degrees.
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn zoom_range(&self) -> (f32, f32) {
        (self.zoom_min, self.zoom_max)
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn movement_speed(&self) -> f32 {
        self.movement_speed
    }

    pub fn mouse_sensitivity(&self) -> f32 {
        self.mouse_sensitivity
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos())
            .normalize();
        // Looking along world_up leaves the cross product degenerate.
        let right = self.front.cross(self.world_up);
        self.right = if right.length_squared() > DEGENERATE_CROSS {
            right.normalize()
        } else {
            self.front.any_orthonormal_vector()
        };
        self.up = self.right.cross(self.front).normalize();
    }
}

pub fn crate_info() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn camera_at(position: Vec3, target: Vec3) -> Camera {
        Camera::new(position, target, Vec3::Y, &CameraConfig::default())
    }

    fn assert_orthonormal(cam: &Camera) {
        assert!((cam.front().length() - 1.0).abs() < EPS);
        assert!((cam.right().length() - 1.0).abs() < EPS);
        assert!((cam.up().length() - 1.0).abs() < EPS);
        assert!(cam.front().dot(cam.right()).abs() < EPS);
        assert!(cam.front().dot(cam.up()).abs() < EPS);
        assert!(cam.right().dot(cam.up()).abs() < EPS);
        // Right-handed: right x up = -front (camera looks down its -Z).
        assert!(cam.right().cross(cam.up()).abs_diff_eq(-cam.front(), EPS));
    }

    #[test]
    fn default_camera_looks_down_negative_z() {
        let cam = Camera::default();
        assert_eq!(cam.position(), Vec3::new(0.0, 0.0, 400.0));
        assert!(cam.front().abs_diff_eq(Vec3::NEG_Z, EPS));
        assert!(cam.up().abs_diff_eq(Vec3::Y, EPS));
        assert!(cam.right().abs_diff_eq(Vec3::X, EPS));
        assert!((cam.yaw() + 90.0).abs() < EPS);
        assert_eq!(cam.zoom(), 45.0);
    }

    #[test]
    fn initial_orientation_follows_target() {
        let cam = camera_at(Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0));
        assert!((cam.yaw() - 0.0).abs() < EPS);
        assert!((cam.pitch() - 45.0).abs() < EPS);
        assert!(cam.front().abs_diff_eq(Vec3::new(1.0, 1.0, 0.0).normalize(), EPS));
    }

    #[test]
    fn straight_up_target_is_clamped() {
        let cam = camera_at(Vec3::ZERO, Vec3::new(0.0, 10.0, 0.0));
        assert_eq!(cam.pitch(), PITCH_LIMIT);
        assert_orthonormal(&cam);
    }

    #[test]
    fn coincident_target_defaults_heading() {
        let cam = camera_at(Vec3::ONE, Vec3::ONE);
        assert!(cam.front().abs_diff_eq(Vec3::NEG_Z, EPS));
    }

    #[test]
    fn quarter_turn_faces_positive_x() {
        let mut cam = camera_at(Vec3::new(0.0, 0.0, 25.0), Vec3::ZERO);
        assert!(cam.front().abs_diff_eq(Vec3::NEG_Z, EPS));
        let start_yaw = cam.yaw();

        cam.handle_mouse_input(90.0 / cam.mouse_sensitivity(), 0.0);

        assert!((cam.yaw() - start_yaw - 90.0).abs() < 1e-3);
        assert!(cam.front().abs_diff_eq(Vec3::X, EPS));
        assert!(cam.right().abs_diff_eq(Vec3::Z, EPS));
        assert!(cam.up().abs_diff_eq(Vec3::Y, EPS));
    }

    #[test]
    fn pitch_stays_clamped() {
        let mut cam = Camera::default();
        let deltas = [5_000.0, -12_345.0, 889.0, 1.0, -1.0, 1e6, -1e6, 42.0];
        for dy in deltas {
            cam.handle_mouse_input(13.0, dy);
            assert!(cam.pitch() <= PITCH_LIMIT && cam.pitch() >= -PITCH_LIMIT);
            assert_orthonormal(&cam);
        }
    }

    #[test]
    fn yaw_is_not_clamped() {
        let mut cam = Camera::default();
        for _ in 0..10 {
            cam.handle_mouse_input(3_600.0, 0.0);
        }
        assert!(cam.yaw() > 3_000.0);
        assert_orthonormal(&cam);
    }

    #[test]
    fn basis_stays_orthonormal_after_mouse_input() {
        let mut cam = Camera::default();
        for i in 0..200 {
            let f = i as f32;
            cam.handle_mouse_input((f * 0.37).sin() * 40.0, (f * 0.11).cos() * 25.0);
            assert_orthonormal(&cam);
        }
    }

    #[test]
    fn zoom_stays_within_range() {
        let mut cam = Camera::default();
        let (min, max) = cam.zoom_range();
        for y in [1.0, 10.0, 100.0, -3.0, -500.0, 0.5, 44.0, -0.25] {
            cam.handle_mouse_scroll_input(0.0, y);
            assert!(cam.zoom() >= min && cam.zoom() <= max);
        }
    }

    #[test]
    fn scroll_up_zooms_in() {
        let mut cam = Camera::default();
        cam.handle_mouse_scroll_input(0.0, 5.0);
        assert_eq!(cam.zoom(), 40.0);
        cam.handle_mouse_scroll_input(7.0, 0.0);
        assert_eq!(cam.zoom(), 40.0);
    }

    #[test]
    fn forward_then_backward_returns_home() {
        let mut cam = Camera::default();
        cam.handle_mouse_input(123.0, -45.0);
        let start = cam.position();
        for dir in Direction::ALL {
            cam.handle_key_input(dir, 0.016);
            assert!(!cam.position().abs_diff_eq(start, EPS));
            cam.handle_key_input(dir.opposite(), 0.016);
            assert!(cam.position().abs_diff_eq(start, 1e-3));
        }
    }

    #[test]
    fn up_parallel_to_view_keeps_a_finite_basis() {
        // world_up along the initial view direction
        let cam = Camera::new(
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, -10.0),
            Vec3::NEG_Z,
            &CameraConfig::default(),
        );
        for v in [cam.front(), cam.right(), cam.up()] {
            assert!(v.is_finite());
            assert!((v.length() - 1.0).abs() < EPS);
        }
        assert!(cam.front().dot(cam.right()).abs() < EPS);
        assert!(cam.front().dot(cam.up()).abs() < EPS);
        assert!(cam.right().dot(cam.up()).abs() < EPS);
        assert!(cam.view_matrix().is_finite());
    }

    #[test]
    fn strafing_moves_along_right_axis() {
        let mut cam = Camera::default();
        cam.handle_key_input(Direction::Right, 0.5);
        let expected = Vec3::new(0.0, 0.0, 400.0) + cam.right() * cam.movement_speed() * 0.5;
        assert!(cam.position().abs_diff_eq(expected, EPS));
        cam.handle_key_input(Direction::Left, 0.5);
        assert!(cam.position().abs_diff_eq(Vec3::new(0.0, 0.0, 400.0), EPS));
    }

    #[test]
    fn zero_and_negative_dt_are_no_ops() {
        let mut cam = Camera::default();
        let start = cam.position();
        cam.handle_key_input(Direction::Forward, 0.0);
        cam.handle_key_input(Direction::Left, -1.0);
        cam.handle_key_input(Direction::Right, f32::NAN);
        assert_eq!(cam.position(), start);
    }

    #[test]
    fn inverse_view_maps_origin_to_position() {
        let mut cam = camera_at(Vec3::new(12.0, -3.0, 40.0), Vec3::new(0.0, 5.0, 0.0));
        cam.handle_mouse_input(30.0, 12.0);
        cam.handle_key_input(Direction::Forward, 0.2);

        let inv = cam.view_matrix().inverse();
        assert!(inv.w_axis.truncate().abs_diff_eq(cam.position(), 1e-3));
        assert!(inv.transform_point3(Vec3::ZERO).abs_diff_eq(cam.position(), 1e-3));
        // Eye-space -Z maps back onto the front vector.
        assert!(inv.transform_vector3(Vec3::NEG_Z).abs_diff_eq(cam.front(), EPS));
    }

    #[test]
    fn view_matrix_has_no_side_effects() {
        let cam = Camera::default();
        let before = cam.clone();
        let _ = cam.view_matrix();
        assert_eq!(cam, before);
    }
}
