use glam::{Mat4, Vec3};
use prism_common::SpatialTransform;
use prism_input::{InputState, Key};

pub const NEAR_PLANE: f32 = 0.01;
pub const FAR_PLANE: f32 = 1000.0;

/// Fly camera: a transform plus cached left-handed view and projection.
///
/// The view follows the transform's forward vector with world +Y as up.
/// Pitch is not clamped, so looking straight up or down degenerates the
/// view basis.
#[derive(Debug, Clone)]
pub struct Camera {
    transform: SpatialTransform,
    view: Mat4,
    projection: Mat4,
    move_speed: f32,
    rotation_speed: f32,
    field_of_view: f32,
}

impl Camera {
    /// `field_of_view` is vertical, in radians.
    pub fn new(
        position: Vec3,
        move_speed: f32,
        rotation_speed: f32,
        field_of_view: f32,
        aspect_ratio: f32,
    ) -> Self {
        let mut transform = SpatialTransform::new();
        transform.set_position_vec(position);
        let mut camera = Self {
            transform,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            move_speed,
            rotation_speed,
            field_of_view,
        };
        camera.update_view_matrix();
        camera.update_projection_matrix(aspect_ratio);
        camera
    }

    /// Apply one frame of fly controls, then refresh the view.
    ///
    /// W/S move along forward, A/D along right, Space/Shift along up. While
    /// the primary button is held, pointer motion pitches (vertical) and
    /// yaws (horizontal).
    pub fn update(&mut self, dt: f32, input: &InputState) {
        let step = self.move_speed * dt;
        let moves = [
            (Key::W, Vec3::Z),
            (Key::S, Vec3::NEG_Z),
            (Key::A, Vec3::NEG_X),
            (Key::D, Vec3::X),
            (Key::Space, Vec3::Y),
            (Key::Shift, Vec3::NEG_Y),
        ];
        for (key, dir) in moves {
            if input.key_down(key) {
                let d = dir * step;
                self.transform.move_relative(d.x, d.y, d.z);
            }
        }

        if input.primary_held() {
            let delta = input.pointer_delta();
            self.transform.rotate(
                delta.y * self.rotation_speed,
                delta.x * self.rotation_speed,
                0.0,
            );
        }

        self.update_view_matrix();
    }

    pub fn update_view_matrix(&mut self) {
        self.view = Mat4::look_to_lh(self.transform.position(), self.transform.forward(), Vec3::Y);
    }

    pub fn update_projection_matrix(&mut self, aspect_ratio: f32) {
        self.projection =
            Mat4::perspective_lh(self.field_of_view, aspect_ratio, NEAR_PLANE, FAR_PLANE);
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn transform(&self) -> &SpatialTransform {
        &self.transform
    }

    /// Mutable access for direct placement; call
    /// [`Camera::update_view_matrix`] afterwards.
    pub fn transform_mut(&mut self) -> &mut SpatialTransform {
        &mut self.transform
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position()
    }

    pub fn move_speed(&self) -> f32 {
        self.move_speed
    }

    pub fn set_move_speed(&mut self, speed: f32) {
        self.move_speed = speed;
    }

    pub fn rotation_speed(&self) -> f32 {
        self.rotation_speed
    }

    pub fn set_rotation_speed(&mut self, speed: f32) {
        self.rotation_speed = speed;
    }

    pub fn field_of_view(&self) -> f32 {
        self.field_of_view
    }

    /// Change the vertical field of view and rebuild the projection.
    pub fn set_field_of_view(&mut self, field_of_view: f32, aspect_ratio: f32) {
        self.field_of_view = field_of_view;
        self.update_projection_matrix(aspect_ratio);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_4;

    fn camera() -> Camera {
        Camera::new(Vec3::new(0.0, 1.0, -8.0), 5.0, 0.01, FRAC_PI_4, 16.0 / 9.0)
    }

    #[test]
    fn view_looks_down_forward() {
        let cam = camera();
        let ahead = cam.view().transform_point3(Vec3::new(0.0, 1.0, 0.0));
        assert!(ahead.z > 0.0);
        assert!(ahead.x.abs() < 1e-5);
    }

    #[test]
    fn projection_maps_near_and_far_to_unit_depth() {
        let cam = camera();
        let near = cam.projection().project_point3(Vec3::new(0.0, 0.0, NEAR_PLANE));
        let far = cam.projection().project_point3(Vec3::new(0.0, 0.0, FAR_PLANE));
        assert!(near.z.abs() < 1e-4);
        assert!((far.z - 1.0).abs() < 1e-4);
    }

    #[test]
    fn update_keeps_projection() {
        let mut cam = camera();
        let before = cam.projection();
        let mut input = InputState::new();
        input.press(Key::W);
        input.set_primary_button(true);
        input.add_pointer_delta(30.0, 10.0);
        cam.update(0.5, &input);
        assert_eq!(cam.projection(), before);
    }

    #[test]
    fn projection_changes_with_aspect() {
        let mut cam = camera();
        let before = cam.projection();
        cam.update_projection_matrix(16.0 / 9.0);
        assert_eq!(cam.projection(), before);
        cam.update_projection_matrix(4.0 / 3.0);
        assert_ne!(cam.projection(), before);
    }

    #[test]
    fn forward_key_moves_by_speed_times_dt() {
        let mut cam = camera();
        let mut input = InputState::new();
        input.press(Key::W);
        cam.update(0.5, &input);
        assert!(cam.position().abs_diff_eq(Vec3::new(0.0, 1.0, -5.5), 1e-5));
    }

    #[test]
    fn shift_moves_down_space_moves_up() {
        let mut cam = camera();
        let mut input = InputState::new();
        input.press(Key::Shift);
        cam.update(1.0, &input);
        assert!((cam.position().y - (-4.0)).abs() < 1e-5);
        input.release(Key::Shift);
        input.press(Key::Space);
        cam.update(1.0, &input);
        assert!((cam.position().y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn pointer_only_rotates_while_button_held() {
        let mut cam = camera();
        let mut input = InputState::new();
        input.add_pointer_delta(100.0, 0.0);
        cam.update(0.016, &input);
        assert_eq!(cam.transform().pitch_yaw_roll(), Vec3::ZERO);

        input.set_primary_button(true);
        cam.update(0.016, &input);
        assert!((cam.transform().pitch_yaw_roll().y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn captured_input_leaves_camera_still() {
        let mut cam = camera();
        let mut input = InputState::new();
        input.press(Key::D);
        input.set_primary_button(true);
        input.add_pointer_delta(50.0, 50.0);
        input.set_capture(true, true);
        cam.update(1.0, &input);
        assert_eq!(cam.position(), Vec3::new(0.0, 1.0, -8.0));
        assert_eq!(cam.transform().pitch_yaw_roll(), Vec3::ZERO);
    }
}
