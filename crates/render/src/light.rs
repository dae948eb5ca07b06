use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Distance the shadow camera backs away from the origin along its light.
pub const SHADOW_DISTANCE: f32 = 20.0;
/// Width and height of the orthographic shadow volume.
pub const SHADOW_PROJECTION_SIZE: f32 = 15.0;
pub const SHADOW_NEAR: f32 = 1.0;
pub const SHADOW_FAR: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LightKind {
    #[default]
    Directional,
    Point,
    Spot,
}

impl LightKind {
    pub fn as_u32(self) -> u32 {
        match self {
            LightKind::Directional => 0,
            LightKind::Point => 1,
            LightKind::Spot => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LightKind::Directional => "Directional",
            LightKind::Point => "Point",
            LightKind::Spot => "Spot",
        }
    }
}

/// A scene light. Fields a kind does not use are ignored by the shader.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Light {
    pub kind: LightKind,
    pub direction: Vec3,
    pub range: f32,
    pub position: Vec3,
    pub intensity: f32,
    pub color: Vec3,
    pub spot_falloff: f32,
}

impl Light {
    pub fn directional(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            kind: LightKind::Directional,
            direction,
            color,
            intensity,
            ..Self::default()
        }
    }

    pub fn point(position: Vec3, range: f32, color: Vec3, intensity: f32) -> Self {
        Self {
            kind: LightKind::Point,
            position,
            range,
            color,
            intensity,
            ..Self::default()
        }
    }

    pub fn to_gpu(&self) -> GpuLight {
        GpuLight {
            kind: self.kind.as_u32(),
            direction: self.direction.to_array(),
            range: self.range,
            position: self.position.to_array(),
            intensity: self.intensity,
            color: self.color.to_array(),
            spot_falloff: self.spot_falloff,
            padding: [0.0; 3],
        }
    }
}

/// Shader-side light record, 64 bytes in four 16-byte rows.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct GpuLight {
    pub kind: u32,
    pub direction: [f32; 3],
    pub range: f32,
    pub position: [f32; 3],
    pub intensity: f32,
    pub color: [f32; 3],
    pub spot_falloff: f32,
    pub padding: [f32; 3],
}

/// Scene lights, ambient color, and the shadow camera of the caster.
#[derive(Debug, Clone)]
pub struct LightSet {
    lights: Vec<Light>,
    ambient: Vec3,
    shadow_caster: usize,
    light_view: Mat4,
    light_projection: Mat4,
}

impl Default for LightSet {
    fn default() -> Self {
        Self {
            lights: Vec::new(),
            ambient: Vec3::ZERO,
            shadow_caster: 0,
            light_view: Mat4::IDENTITY,
            light_projection: shadow_projection(),
        }
    }
}

impl LightSet {
    pub fn new(lights: Vec<Light>, ambient: Vec3) -> Self {
        let mut set = Self {
            lights,
            ambient,
            ..Self::default()
        };
        set.refresh_light_view();
        set
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Light> {
        self.lights.get(index)
    }

    /// Mutable access for fields that do not affect the shadow camera.
    /// Use [`LightSet::set_direction`] to re-aim a light.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Light> {
        self.lights.get_mut(index)
    }

    pub fn push(&mut self, light: Light) {
        self.lights.push(light);
        if self.lights.len() == 1 {
            self.refresh_light_view();
        }
    }

    pub fn ambient(&self) -> Vec3 {
        self.ambient
    }

    pub fn set_ambient(&mut self, ambient: Vec3) {
        self.ambient = ambient;
    }

    pub fn shadow_caster(&self) -> usize {
        self.shadow_caster
    }

    /// Re-aim a light. The edited light becomes the shadow caster and the
    /// shadow view follows it. Returns false for an unknown index.
    pub fn set_direction(&mut self, index: usize, direction: Vec3) -> bool {
        let Some(light) = self.lights.get_mut(index) else {
            return false;
        };
        light.direction = direction;
        self.shadow_caster = index;
        self.refresh_light_view();
        true
    }

    pub fn light_view(&self) -> Mat4 {
        self.light_view
    }

    pub fn light_projection(&self) -> Mat4 {
        self.light_projection
    }

    /// Packed [`GpuLight`] records for every light, in order.
    pub fn gpu_bytes(&self) -> Vec<u8> {
        let gpu: Vec<GpuLight> = self.lights.iter().map(Light::to_gpu).collect();
        bytemuck::cast_slice(&gpu).to_vec()
    }

    fn refresh_light_view(&mut self) {
        let Some(light) = self.lights.get(self.shadow_caster) else {
            return;
        };
        // A zero direction has no view; keep the previous one.
        if light.direction.length_squared() < 1e-12 {
            tracing::warn!(index = self.shadow_caster, "shadow caster has no direction");
            return;
        }
        self.light_view = shadow_view(light.direction);
    }
}

/// View from a point backed away from the origin, looking along `direction`.
pub fn shadow_view(direction: Vec3) -> Mat4 {
    let dir = direction.normalize();
    // Straight up or down needs a different up vector.
    let up = if dir.cross(Vec3::Y).length_squared() < 1e-6 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    Mat4::look_to_lh(-direction * SHADOW_DISTANCE, direction, up)
}

pub fn shadow_projection() -> Mat4 {
    let h = SHADOW_PROJECTION_SIZE * 0.5;
    Mat4::orthographic_lh(-h, h, -h, h, SHADOW_NEAR, SHADOW_FAR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_set() -> LightSet {
        LightSet::new(
            vec![
                Light::directional(Vec3::X, Vec3::ONE, 0.5),
                Light::directional(Vec3::new(-1.0, -0.25, 0.15), Vec3::X, 0.5),
                Light::default(),
            ],
            Vec3::ZERO,
        )
    }

    #[test]
    fn gpu_light_is_64_bytes() {
        assert_eq!(std::mem::size_of::<GpuLight>(), 64);
    }

    #[test]
    fn gpu_bytes_pack_every_light() {
        let set = demo_set();
        let bytes = set.gpu_bytes();
        assert_eq!(bytes.len(), 3 * 64);
        let first: GpuLight = bytemuck::pod_read_unaligned(&bytes[..64]);
        assert_eq!(first.kind, 0);
        assert_eq!(first.direction, [1.0, 0.0, 0.0]);
        assert_eq!(first.intensity, 0.5);
    }

    #[test]
    fn shadow_view_backs_away_from_origin() {
        let set = demo_set();
        // The origin sits SHADOW_DISTANCE ahead of the shadow camera.
        let origin = set.light_view().transform_point3(Vec3::ZERO);
        assert!((origin.z - SHADOW_DISTANCE).abs() < 1e-4);
    }

    #[test]
    fn projection_covers_fifteen_units() {
        let p = shadow_projection();
        let edge = p.transform_point3(Vec3::new(7.5, 7.5, 1.0));
        assert!((edge.x - 1.0).abs() < 1e-5);
        assert!((edge.y - 1.0).abs() < 1e-5);
        assert!(edge.z.abs() < 1e-5);
    }

    #[test]
    fn set_direction_moves_shadow_caster() {
        let mut set = demo_set();
        let before = set.light_view();
        assert!(set.set_direction(1, Vec3::new(0.0, -1.0, 1.0)));
        assert_eq!(set.shadow_caster(), 1);
        assert_ne!(set.light_view(), before);
        assert!(!set.set_direction(9, Vec3::Y));
    }

    #[test]
    fn zero_direction_keeps_previous_view() {
        let mut set = demo_set();
        let before = set.light_view();
        set.set_direction(2, Vec3::ZERO);
        assert_eq!(set.light_view(), before);
        assert!(set.light_view().is_finite());
    }

    #[test]
    fn straight_down_light_has_finite_view() {
        assert!(shadow_view(Vec3::NEG_Y).is_finite());
    }
}
