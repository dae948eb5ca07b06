//! The built-in demo scene: programs, textures, materials, meshes, entities,
//! cameras, lights and sky.

use crate::camera::Camera;
use crate::config::FrameConfig;
use crate::device::{
    RenderDevice, SamplerDesc, SamplerId, ShaderStage, TextureDesc, TextureFormat, TextureId,
    TextureKind,
};
use crate::entity::Entity;
use crate::error::RenderError;
use crate::frame::FrameOrchestrator;
use crate::geometry;
use crate::light::{Light, LightKind, LightSet};
use crate::material::{Material, SharedMaterial};
use crate::mesh::Mesh;
use crate::scene::Scene;
use crate::shader::{SimpleShader, programs};
use crate::sky::Sky;
use glam::{Vec3, Vec4};
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};
use std::rc::Rc;

/// Radians per second the showcase sphere turns about its yaw axis.
pub const SPIN_SPEED: f32 = 1.0;

const SKY_FACE_SIZE: u32 = 16;

/// Build the demo scene and the orchestrator that draws it.
pub fn build_demo_scene(
    device: &mut dyn RenderDevice,
    config: FrameConfig,
) -> Result<(Scene, FrameOrchestrator), RenderError> {
    let orchestrator = FrameOrchestrator::new(device, config)?;

    let lit_vs = Rc::new(SimpleShader::load(device, ShaderStage::Vertex, programs::LIT_VS)?);
    let lit_ps = Rc::new(SimpleShader::load(device, ShaderStage::Pixel, programs::LIT_PS)?);
    let sky_vs = Rc::new(SimpleShader::load(device, ShaderStage::Vertex, programs::SKY_VS)?);
    let sky_ps = Rc::new(SimpleShader::load(device, ShaderStage::Pixel, programs::SKY_PS)?);

    let basic_sampler = device.create_sampler(&SamplerDesc::wrap_anisotropic(16))?;

    let cube = upload(device, geometry::cube(1.0))?;
    let sphere = upload(device, geometry::sphere(0.5, 32, 16))?;
    let floor = upload(device, geometry::plane(10.0, 10.0))?;

    let shared = SharedResources {
        vertex_shader: lit_vs,
        pixel_shader: lit_ps,
        normal_map: solid_texture(device, "flat_normal", [128, 128, 255, 255])?,
        metalness: solid_texture(device, "non_metal", [0, 0, 0, 255])?,
        basic_sampler,
        shadow_map: orchestrator.shadow_map_texture(),
        shadow_sampler: orchestrator.shadow_sampler(),
    };
    let bronze = shared.material(
        device,
        "bronze",
        ([205, 127, 50, 255], [160, 95, 35, 255]),
        Vec4::ONE,
        0.35,
    )?;
    let stone = shared.material(
        device,
        "stone",
        ([150, 150, 150, 255], [110, 110, 110, 255]),
        Vec4::ONE,
        0.9,
    )?;
    let paint = shared.material(
        device,
        "paint",
        ([230, 230, 230, 255], [200, 200, 200, 255]),
        Vec4::new(0.3, 0.5, 1.0, 1.0),
        0.6,
    )?;

    let (width, height) = device.surface_size();
    let aspect = width as f32 / height.max(1) as f32;
    let cameras = vec![
        Camera::new(Vec3::new(0.0, 1.0, -8.0), 5.0, 0.01, FRAC_PI_4, aspect),
        Camera::new(Vec3::new(3.0, 10.0, -12.0), 5.0, 0.01, FRAC_PI_2, aspect),
    ];
    let mut scene = Scene::new(cameras)?;

    let mut ball = Entity::new("sphere", sphere, bronze);
    ball.transform_mut().set_position(0.0, 1.25, 0.0);
    scene.add_entity(ball);

    let mut ground = Entity::new("floor", floor, stone);
    ground.transform_mut().set_position(0.0, -0.5, 0.0);
    scene.add_entity(ground);

    let mut block = Entity::new("crate", Rc::clone(&cube), paint);
    block.transform_mut().set_position(2.5, 0.0, 1.0);
    block.transform_mut().rotate(0.0, 0.6, 0.0);
    scene.add_entity(block);

    scene.set_lights(demo_lights());

    let faces = sky_faces(SKY_FACE_SIZE);
    let cube_map = Sky::create_cube_map(device, SKY_FACE_SIZE, &faces)?;
    scene.set_sky(Sky::new(device, cube, cube_map, basic_sampler, sky_vs, sky_ps)?);

    tracing::info!(
        entities = scene.entities().len(),
        cameras = scene.cameras().len(),
        lights = scene.lights().len(),
        "demo scene built"
    );
    Ok((scene, orchestrator))
}

/// Resources every demo material shares.
struct SharedResources {
    vertex_shader: Rc<SimpleShader>,
    pixel_shader: Rc<SimpleShader>,
    normal_map: TextureId,
    metalness: TextureId,
    basic_sampler: SamplerId,
    shadow_map: Option<TextureId>,
    shadow_sampler: SamplerId,
}

impl SharedResources {
    fn material(
        &self,
        device: &mut dyn RenderDevice,
        name: &str,
        checker: ([u8; 4], [u8; 4]),
        tint: Vec4,
        roughness: f32,
    ) -> Result<SharedMaterial, RenderError> {
        let albedo = checker_texture(device, name, checker.0, checker.1)?;
        let r = (roughness * 255.0) as u8;
        let roughness_map = solid_texture(device, "roughness", [r, r, r, 255])?;

        let mut mat = Material::new(
            name,
            tint,
            roughness,
            Rc::clone(&self.vertex_shader),
            Rc::clone(&self.pixel_shader),
        );
        mat.add_texture_srv("Albedo", albedo);
        mat.add_texture_srv("NormalMap", self.normal_map);
        mat.add_texture_srv("RoughnessMap", roughness_map);
        mat.add_texture_srv("MetalnessMap", self.metalness);
        if let Some(shadow_map) = self.shadow_map {
            mat.add_texture_srv("ShadowMap", shadow_map);
        }
        mat.add_sampler("BasicSampler", self.basic_sampler);
        mat.add_sampler("ShadowSampler", self.shadow_sampler);
        Ok(mat.into_shared())
    }
}

/// Two lit directional lights and three unlit slots.
pub fn demo_lights() -> LightSet {
    let unlit_point = Light {
        kind: LightKind::Point,
        ..Light::default()
    };
    LightSet::new(
        vec![
            Light::directional(Vec3::X, Vec3::ONE, 0.5),
            Light::directional(Vec3::new(-1.0, -0.25, 0.15), Vec3::X, 0.5),
            Light::default(),
            unlit_point,
            unlit_point,
        ],
        Vec3::ZERO,
    )
}

/// Per-frame demo motion: spin the first entity.
pub fn animate(scene: &mut Scene, dt: f32) {
    if let Some(entity) = scene.entity_mut(0) {
        entity.transform_mut().rotate(0.0, SPIN_SPEED * dt, 0.0);
    }
}

fn upload(
    device: &mut dyn RenderDevice,
    data: geometry::MeshData,
) -> Result<Rc<Mesh>, RenderError> {
    Ok(Rc::new(Mesh::from_arrays(device, &data.vertices, &data.indices)?))
}

/// 1x1 linear texture, for data maps.
fn solid_texture(
    device: &mut dyn RenderDevice,
    label: &str,
    rgba: [u8; 4],
) -> Result<TextureId, RenderError> {
    let desc = TextureDesc {
        label: label.to_string(),
        width: 1,
        height: 1,
        kind: TextureKind::D2,
        format: TextureFormat::Rgba8Unorm,
    };
    Ok(device.create_texture(&desc, &rgba)?)
}

fn checker_texture(
    device: &mut dyn RenderDevice,
    label: &str,
    a: [u8; 4],
    b: [u8; 4],
) -> Result<TextureId, RenderError> {
    const SIZE: u32 = 8;
    let mut data = Vec::with_capacity((SIZE * SIZE * 4) as usize);
    for y in 0..SIZE {
        for x in 0..SIZE {
            data.extend_from_slice(if (x + y) % 2 == 0 { &a } else { &b });
        }
    }
    let desc = TextureDesc {
        label: label.to_string(),
        width: SIZE,
        height: SIZE,
        kind: TextureKind::D2,
        format: TextureFormat::Rgba8UnormSrgb,
    };
    Ok(device.create_texture(&desc, &data)?)
}

/// Vertical gradient faces: deep blue overhead, pale at the horizon.
fn sky_faces(size: u32) -> [Vec<u8>; 6] {
    let zenith = Vec3::new(0.15, 0.3, 0.65);
    let horizon = Vec3::new(0.75, 0.85, 0.95);
    let ground = Vec3::new(0.35, 0.33, 0.3);
    let row_color = |t: f32| -> [u8; 4] {
        // t runs from 1 at the top edge to 0 at the bottom edge of a side face
        let c = if t >= 0.5 {
            horizon.lerp(zenith, (t - 0.5) * 2.0)
        } else {
            ground.lerp(horizon, t * 2.0)
        };
        [(c.x * 255.0) as u8, (c.y * 255.0) as u8, (c.z * 255.0) as u8, 255]
    };
    let last_row = (size - 1).max(1) as f32;
    let side = gradient_face(size, |y| row_color(1.0 - y as f32 / last_row));
    let top = gradient_face(size, |_| row_color(1.0));
    let bottom = gradient_face(size, |_| row_color(0.0));
    [side.clone(), side.clone(), top, bottom, side.clone(), side]
}

fn gradient_face(size: u32, color_at_row: impl Fn(u32) -> [u8; 4]) -> Vec<u8> {
    let mut data = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        let texel = color_at_row(y);
        for _ in 0..size {
            data.extend_from_slice(&texel);
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingDevice;

    fn demo() -> (RecordingDevice, Scene, FrameOrchestrator) {
        let mut device = RecordingDevice::new(1280, 720);
        let (scene, orch) = build_demo_scene(&mut device, FrameConfig::default()).unwrap();
        (device, scene, orch)
    }

    #[test]
    fn demo_has_two_cameras_and_five_lights() {
        let (_, scene, _) = demo();
        assert_eq!(scene.cameras().len(), 2);
        assert_eq!(scene.cameras()[0].position(), Vec3::new(0.0, 1.0, -8.0));
        assert_eq!(scene.cameras()[1].field_of_view(), FRAC_PI_2);
        assert_eq!(scene.lights().len(), 5);
        assert_eq!(scene.lights().ambient(), Vec3::ZERO);
        assert!(scene.sky().is_some());
    }

    #[test]
    fn materials_carry_all_named_resources() {
        let (_, scene, _) = demo();
        for entity in scene.entities() {
            let mat = entity.material().borrow();
            for name in ["Albedo", "NormalMap", "RoughnessMap", "MetalnessMap", "ShadowMap"] {
                assert!(mat.textures().contains_key(name), "{} lacks {name}", mat.name());
            }
            for name in ["BasicSampler", "ShadowSampler"] {
                assert!(mat.samplers().contains_key(name));
            }
        }
    }

    #[test]
    fn sphere_sits_above_origin_and_spins() {
        let (_, mut scene, _) = demo();
        assert_eq!(scene.entities()[0].name(), "sphere");
        assert_eq!(
            scene.entities()[0].transform().position(),
            Vec3::new(0.0, 1.25, 0.0)
        );
        animate(&mut scene, 0.5);
        animate(&mut scene, 0.25);
        let yaw = scene.entities()[0].transform().pitch_yaw_roll().y;
        assert!((yaw - 0.75).abs() < 1e-6);
    }

    #[test]
    fn demo_frame_renders() {
        let (mut device, scene, mut orch) = demo();
        let stats = orch.render_frame(&mut device, &scene, 0.0).unwrap();
        assert_eq!(stats.shadow_draws, 3);
        // three entities, the sky, the blur
        assert_eq!(stats.color_draws, 5);
    }

    #[test]
    fn sky_faces_are_full_size() {
        let faces = sky_faces(4);
        assert!(faces.iter().all(|f| f.len() == 4 * 4 * 4));
    }
}
