use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Position, Euler rotation and scale of an object, with cached derived state.
///
/// Rotation is stored as accumulated `(pitch, yaw, roll)` radians and applied
/// roll first, then pitch, then yaw. Angles are never wrapped or clamped, so
/// the usual Euler gimbal lock applies when pitch reaches ±90°.
///
/// Coordinates are left-handed: +X right, +Y up, +Z forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TransformParts", into = "TransformParts")]
pub struct SpatialTransform {
    position: Vec3,
    rotation: Vec3,
    scale: Vec3,
    world: Mat4,
    world_inverse_transpose: Mat4,
    right: Vec3,
    up: Vec3,
    forward: Vec3,
}

/// Serialized form; caches are rebuilt on load.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct TransformParts {
    position: Vec3,
    rotation: Vec3,
    scale: Vec3,
}

impl From<TransformParts> for SpatialTransform {
    fn from(p: TransformParts) -> Self {
        Self::from_parts(p.position, p.rotation, p.scale)
    }
}

impl From<SpatialTransform> for TransformParts {
    fn from(t: SpatialTransform) -> Self {
        Self {
            position: t.position,
            rotation: t.rotation,
            scale: t.scale,
        }
    }
}

impl Default for SpatialTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            world: Mat4::IDENTITY,
            world_inverse_transpose: Mat4::IDENTITY,
            right: Vec3::X,
            up: Vec3::Y,
            forward: Vec3::Z,
        }
    }
}

impl SpatialTransform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a transform from explicit components.
    pub fn from_parts(position: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        let mut t = Self {
            position,
            rotation,
            scale,
            ..Self::default()
        };
        t.refresh_basis();
        t.refresh_matrices();
        t
    }

    pub fn set_position(&mut self, x: f32, y: f32, z: f32) {
        self.set_position_vec(Vec3::new(x, y, z));
    }

    pub fn set_position_vec(&mut self, position: Vec3) {
        self.position = position;
        self.refresh_matrices();
    }

    /// Overwrite the stored `(pitch, yaw, roll)` angles.
    ///
    /// Like [`Self::rotate`], this also refreshes the right/up/forward basis,
    /// so the basis always matches the stored angles.
    pub fn set_rotation(&mut self, pitch: f32, yaw: f32, roll: f32) {
        self.set_rotation_vec(Vec3::new(pitch, yaw, roll));
    }

    /// Vector form of [`Self::set_rotation`]; refreshes the basis too.
    pub fn set_rotation_vec(&mut self, rotation: Vec3) {
        self.rotation = rotation;
        self.refresh_basis();
        self.refresh_matrices();
    }

    pub fn set_scale(&mut self, x: f32, y: f32, z: f32) {
        self.set_scale_vec(Vec3::new(x, y, z));
    }

    pub fn set_scale_vec(&mut self, scale: Vec3) {
        self.scale = scale;
        self.refresh_matrices();
    }

    /// Translate along the world axes.
    pub fn move_absolute(&mut self, dx: f32, dy: f32, dz: f32) {
        self.position += Vec3::new(dx, dy, dz);
        self.refresh_matrices();
    }

    /// Translate along the object's own axes.
    pub fn move_relative(&mut self, dx: f32, dy: f32, dz: f32) {
        let offset = self.orientation() * Vec3::new(dx, dy, dz);
        self.position += offset;
        self.refresh_matrices();
    }

    /// Add to the stored Euler angles and recompute the basis vectors.
    pub fn rotate(&mut self, d_pitch: f32, d_yaw: f32, d_roll: f32) {
        self.rotation += Vec3::new(d_pitch, d_yaw, d_roll);
        self.refresh_basis();
        self.refresh_matrices();
    }

    /// Multiply the current scale component-wise.
    pub fn scale(&mut self, mx: f32, my: f32, mz: f32) {
        self.scale *= Vec3::new(mx, my, mz);
        self.refresh_matrices();
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// `(pitch, yaw, roll)` in radians.
    pub fn pitch_yaw_roll(&self) -> Vec3 {
        self.rotation
    }

    pub fn scale_factors(&self) -> Vec3 {
        self.scale
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn world_matrix(&self) -> Mat4 {
        self.world
    }

    /// Inverse-transpose of the world matrix, for transforming normals.
    ///
    /// Not finite when any scale component is zero.
    pub fn world_inverse_transpose_matrix(&self) -> Mat4 {
        self.world_inverse_transpose
    }

    /// Orientation quaternion for the current angles.
    pub fn orientation(&self) -> Quat {
        Quat::from_euler(
            EulerRot::YXZ,
            self.rotation.y,
            self.rotation.x,
            self.rotation.z,
        )
    }

    fn refresh_basis(&mut self) {
        let q = self.orientation();
        self.right = q * Vec3::X;
        self.up = q * Vec3::Y;
        self.forward = q * Vec3::Z;
    }

    fn refresh_matrices(&mut self) {
        self.world =
            Mat4::from_scale_rotation_translation(self.scale, self.orientation(), self.position);
        self.world_inverse_transpose = self.world.transpose().inverse();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn approx_vec(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn default_is_identity() {
        let t = SpatialTransform::new();
        assert_eq!(t.world_matrix(), Mat4::IDENTITY);
        assert_eq!(t.right(), Vec3::X);
        assert_eq!(t.up(), Vec3::Y);
        assert_eq!(t.forward(), Vec3::Z);
    }

    #[test]
    fn scale_then_translate() {
        let mut t = SpatialTransform::new();
        t.set_position(1.0, 2.0, 3.0);
        t.set_scale(2.0, 2.0, 2.0);
        let p = t.world_matrix().transform_point3(Vec3::X);
        assert!(approx_vec(p, Vec3::new(3.0, 2.0, 3.0)));
    }

    #[test]
    fn world_matrix_is_idempotent() {
        let mut t = SpatialTransform::new();
        t.set_position(4.0, -1.0, 2.0);
        t.rotate(0.3, 1.1, -0.2);
        assert_eq!(t.world_matrix(), t.world_matrix());
        assert_eq!(
            t.world_inverse_transpose_matrix(),
            t.world_inverse_transpose_matrix()
        );
    }

    #[test]
    fn world_matches_scale_rotation_translation() {
        let mut t = SpatialTransform::new();
        t.set_position(1.0, 2.0, 3.0);
        t.set_rotation(0.2, 0.4, 0.6);
        t.set_scale(1.0, 2.0, 3.0);
        let expected = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0))
            * Mat4::from_quat(t.orientation())
            * Mat4::from_scale(Vec3::new(1.0, 2.0, 3.0));
        assert!(t.world_matrix().abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn inverse_transpose_undoes_transpose() {
        let mut t = SpatialTransform::new();
        t.set_position(-2.0, 0.5, 7.0);
        t.set_rotation(0.7, -0.3, 1.2);
        t.set_scale(0.5, 3.0, 1.5);
        let product = t.world_inverse_transpose_matrix() * t.world_matrix().transpose();
        assert!(product.abs_diff_eq(Mat4::IDENTITY, 1e-4));
    }

    #[test]
    fn zero_rotation_keeps_basis() {
        let mut t = SpatialTransform::new();
        t.rotate(0.5, 0.25, 0.0);
        let (r, u, f) = (t.right(), t.up(), t.forward());
        t.rotate(0.0, 0.0, 0.0);
        assert!(approx_vec(t.right(), r));
        assert!(approx_vec(t.up(), u));
        assert!(approx_vec(t.forward(), f));
    }

    #[test]
    fn set_rotation_matches_rotate_from_identity() {
        let mut set = SpatialTransform::new();
        set.set_rotation(0.3, -1.2, 0.1);
        let mut rotated = SpatialTransform::new();
        rotated.rotate(0.3, -1.2, 0.1);
        assert!(approx_vec(set.right(), rotated.right()));
        assert!(approx_vec(set.up(), rotated.up()));
        assert!(approx_vec(set.forward(), rotated.forward()));

        set.set_rotation(0.0, 0.0, 0.0);
        assert!(approx_vec(set.forward(), Vec3::Z));
    }

    #[test]
    fn rotation_accumulates() {
        let mut a = SpatialTransform::new();
        a.rotate(0.1, 0.2, 0.3);
        a.rotate(0.4, 0.5, 0.6);
        let mut b = SpatialTransform::new();
        b.rotate(0.5, 0.7, 0.9);
        assert!(approx_vec(a.pitch_yaw_roll(), b.pitch_yaw_roll()));
        assert!(approx_vec(a.forward(), b.forward()));
    }

    #[test]
    fn move_relative_after_quarter_yaw_moves_along_x() {
        let mut t = SpatialTransform::new();
        t.rotate(0.0, FRAC_PI_2, 0.0);
        t.move_relative(0.0, 0.0, 1.0);
        assert!(approx_vec(t.position(), Vec3::X));
    }

    #[test]
    fn move_absolute_ignores_rotation() {
        let mut t = SpatialTransform::new();
        t.rotate(0.0, FRAC_PI_2, 0.0);
        t.move_absolute(0.0, 0.0, 1.0);
        assert!(approx_vec(t.position(), Vec3::Z));
    }

    #[test]
    fn scale_multiplies() {
        let mut t = SpatialTransform::new();
        t.set_scale(2.0, 3.0, 4.0);
        t.scale(0.5, 2.0, 1.0);
        assert!(approx_vec(t.scale_factors(), Vec3::new(1.0, 6.0, 4.0)));
    }

    #[test]
    fn basis_stays_orthonormal() {
        let mut t = SpatialTransform::new();
        t.rotate(0.9, -2.3, 0.4);
        assert!((t.right().length() - 1.0).abs() < 1e-5);
        assert!(t.right().dot(t.up()).abs() < 1e-5);
        assert!(t.up().dot(t.forward()).abs() < 1e-5);
        assert!(approx_vec(t.right().cross(t.up()), t.forward()));
    }

    #[test]
    fn zero_scale_is_not_finite() {
        let mut t = SpatialTransform::new();
        t.set_scale(0.0, 1.0, 1.0);
        assert!(!t.world_inverse_transpose_matrix().is_finite());
    }

    #[test]
    fn deserialized_transform_rebuilds_caches() {
        let mut t = SpatialTransform::new();
        t.set_position(1.0, 2.0, 3.0);
        t.rotate(0.0, FRAC_PI_2, 0.0);
        let json = serde_json::to_string(&t).unwrap();
        let back: SpatialTransform = serde_json::from_str(&json).unwrap();
        assert!(back.world_matrix().abs_diff_eq(t.world_matrix(), 1e-5));
        assert!(approx_vec(back.forward(), Vec3::X));
    }
}
