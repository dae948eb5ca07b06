use crate::config::{FrameConfig, MAX_BLUR_RADIUS};
use crate::device::{
    ColorTarget, CullMode, DepthTarget, DeviceCommand, RasterizerDesc, RasterizerId, RenderDevice,
    SamplerDesc, SamplerId, ShaderStage, TextureId, Viewport,
};
use crate::error::RenderError;
use crate::pass::{PassDescriptor, PassKind};
use crate::scene::Scene;
use crate::shader::{SimpleShader, programs};
use std::rc::Rc;

/// Pixel-stage texture slots cleared after every present.
pub const PIXEL_RESOURCE_SLOTS: u32 = 128;

const SHADOW_DEPTH_BIAS: i32 = 1000;
const SHADOW_SLOPE_BIAS: f32 = 1.0;

/// What one call to [`FrameOrchestrator::render_frame`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameStats {
    pub frame: u64,
    pub passes: Vec<&'static str>,
    pub shadow_draws: u32,
    pub color_draws: u32,
    pub sync_interval: u32,
    pub allow_tearing: bool,
}

impl FrameStats {
    pub fn draw_calls(&self) -> u32 {
        self.shadow_draws + self.color_draws
    }
}

impl std::fmt::Display for FrameStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Frame {}: passes=[{}] draws={} (shadow={}, color={}) sync={}{}",
            self.frame,
            self.passes.join(", "),
            self.draw_calls(),
            self.shadow_draws,
            self.color_draws,
            self.sync_interval,
            if self.allow_tearing { " tearing" } else { "" }
        )
    }
}

/// Owns the frame-level GPU resources and runs the pass list each frame.
///
/// Passes run in a fixed order: shadow depth, main color, sky, post-process
/// blur, UI overlay. Then the frame is presented, the back buffer and depth
/// buffer are rebound, and every pixel-stage texture slot is cleared so the
/// next frame can write to targets this one sampled.
#[derive(Debug)]
pub struct FrameOrchestrator {
    config: FrameConfig,
    shadow_map: DepthTarget,
    shadow_rasterizer: RasterizerId,
    shadow_sampler: SamplerId,
    clamp_sampler: SamplerId,
    post_target: ColorTarget,
    shadow_vs: Rc<SimpleShader>,
    post_vs: Rc<SimpleShader>,
    post_ps: Rc<SimpleShader>,
    frame: u64,
}

impl FrameOrchestrator {
    pub fn new(device: &mut dyn RenderDevice, config: FrameConfig) -> Result<Self, RenderError> {
        let res = config.shadow_map_resolution;
        let shadow_map = device.create_depth_target("shadow_map", res, res, true)?;
        let shadow_rasterizer = device.create_rasterizer_state(&RasterizerDesc {
            cull: CullMode::Back,
            depth_bias: SHADOW_DEPTH_BIAS,
            slope_scaled_depth_bias: SHADOW_SLOPE_BIAS,
        })?;
        let shadow_sampler = device.create_sampler(&SamplerDesc::shadow_comparison())?;
        let clamp_sampler = device.create_sampler(&SamplerDesc::clamp_linear())?;

        let (width, height) = device.surface_size();
        let post_target = device.create_color_target("post_process", width, height)?;

        let shadow_vs = Rc::new(SimpleShader::load(
            device,
            ShaderStage::Vertex,
            programs::SHADOW_VS,
        )?);
        let post_vs = Rc::new(SimpleShader::load(
            device,
            ShaderStage::Vertex,
            programs::FULLSCREEN_VS,
        )?);
        let post_ps = Rc::new(SimpleShader::load(device, ShaderStage::Pixel, programs::BLUR_PS)?);

        tracing::info!(shadow_map = res, width, height, "frame resources created");
        Ok(Self {
            config,
            shadow_map,
            shadow_rasterizer,
            shadow_sampler,
            clamp_sampler,
            post_target,
            shadow_vs,
            post_vs,
            post_ps,
            frame: 0,
        })
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    pub fn set_vsync(&mut self, vsync: bool) {
        self.config.vsync = vsync;
    }

    pub fn set_post_process(&mut self, enabled: bool) {
        self.config.post_process = enabled;
    }

    /// Clamped to `0..=MAX_BLUR_RADIUS`.
    pub fn set_blur_radius(&mut self, radius: i32) {
        self.config.blur_radius = radius.clamp(0, MAX_BLUR_RADIUS);
    }

    /// Depth texture materials sample for shadowing.
    pub fn shadow_map_texture(&self) -> Option<TextureId> {
        self.shadow_map.texture
    }

    pub fn shadow_map(&self) -> &DepthTarget {
        &self.shadow_map
    }

    pub fn shadow_sampler(&self) -> SamplerId {
        self.shadow_sampler
    }

    pub fn post_target(&self) -> &ColorTarget {
        &self.post_target
    }

    /// Ordered pass list for the current configuration and surface.
    pub fn plan(&self, device: &dyn RenderDevice) -> Vec<PassDescriptor> {
        let (width, height) = device.surface_size();
        let back_buffer = device.back_buffer();
        let depth = device.depth_buffer();
        let main_viewport = Viewport::sized(width, height);
        let res = self.shadow_map.width;
        let clear = self.config.clear_color;

        let scene_target = if self.config.post_process {
            self.post_target.target
        } else {
            back_buffer
        };

        let mut passes = vec![
            PassDescriptor::new(
                "shadow",
                PassKind::ShadowDepth,
                None,
                Some(self.shadow_map.target),
                Viewport::sized(res, self.shadow_map.height),
            )
            .with_rasterizer(self.shadow_rasterizer)
            .without_pixel_shader()
            .clear_depth(self.shadow_map.target, 1.0),
            PassDescriptor::new(
                "main",
                PassKind::MainColor,
                Some(scene_target),
                Some(depth),
                main_viewport,
            )
            .clear_color(back_buffer, clear)
            .clear_color(self.post_target.target, clear)
            .clear_depth(depth, 1.0),
            PassDescriptor::new(
                "sky",
                PassKind::Sky,
                Some(scene_target),
                Some(depth),
                main_viewport,
            ),
        ];
        if self.config.post_process {
            passes.push(PassDescriptor::new(
                "post_process",
                PassKind::PostProcess,
                Some(back_buffer),
                None,
                main_viewport,
            ));
        }
        passes.push(PassDescriptor::new(
            "overlay",
            PassKind::Overlay,
            Some(back_buffer),
            None,
            main_viewport,
        ));
        passes
    }

    /// Swap interval and tearing flag for the next present.
    pub fn sync_parameters(&self, tearing_supported: bool) -> (u32, bool) {
        if self.config.vsync_required(tearing_supported) {
            (1, false)
        } else {
            (0, true)
        }
    }

    /// Record and present one frame of `scene` from its active camera.
    pub fn render_frame(
        &mut self,
        device: &mut dyn RenderDevice,
        scene: &Scene,
        total_time: f32,
    ) -> Result<FrameStats, RenderError> {
        self.frame += 1;
        let mut stats = FrameStats {
            frame: self.frame,
            ..FrameStats::default()
        };

        for pass in self.plan(device) {
            pass.apply(device);
            self.run_pass(device, scene, &pass, total_time, &mut stats);
            stats.passes.push(pass.name);
        }

        let (sync_interval, allow_tearing) = self.sync_parameters(device.supports_tearing());
        device.present(sync_interval, allow_tearing)?;
        stats.sync_interval = sync_interval;
        stats.allow_tearing = allow_tearing;

        let back_buffer = device.back_buffer();
        let depth = device.depth_buffer();
        device.set_render_targets(Some(back_buffer), Some(depth));
        device.unbind_shader_resources(ShaderStage::Pixel, PIXEL_RESOURCE_SLOTS);

        tracing::trace!(%stats, "frame presented");
        Ok(stats)
    }

    fn run_pass(
        &self,
        device: &mut dyn RenderDevice,
        scene: &Scene,
        pass: &PassDescriptor,
        total_time: f32,
        stats: &mut FrameStats,
    ) {
        let lights = scene.lights();
        match pass.kind {
            PassKind::ShadowDepth => {
                self.shadow_vs.set_shader(device);
                self.shadow_vs.set_matrix4x4("view", lights.light_view());
                self.shadow_vs
                    .set_matrix4x4("projection", lights.light_projection());
                for entity in scene.entities() {
                    self.shadow_vs
                        .set_matrix4x4("world", entity.transform().world_matrix());
                    self.shadow_vs.copy_all_buffer_data(device);
                    entity.mesh().draw(device);
                    stats.shadow_draws += 1;
                }
            }
            PassKind::MainColor => {
                let camera = scene.active_camera();
                let light_bytes = lights.gpu_bytes();
                for entity in scene.entities() {
                    let material = entity.material().borrow();
                    let vs = material.vertex_shader();
                    let ps = material.pixel_shader();
                    vs.set_matrix4x4("lightView", lights.light_view());
                    vs.set_matrix4x4("lightProjection", lights.light_projection());
                    ps.set_float3("ambient", lights.ambient());
                    ps.set_data("lights", &light_bytes);
                    ps.set_int("lightCount", lights.len() as i32);
                    material.prepare_material(device);
                    entity.draw(device, camera, total_time);
                    stats.color_draws += 1;
                }
            }
            PassKind::Sky => {
                if let Some(sky) = scene.sky() {
                    sky.draw(device, scene.active_camera());
                    stats.color_draws += 1;
                }
            }
            PassKind::PostProcess => {
                let (width, height) = device.surface_size();
                self.post_vs.set_shader(device);
                self.post_ps.set_shader(device);
                self.post_ps.set_int("blurRadius", self.config.blur_radius);
                self.post_ps
                    .set_float("pixelWidth", 1.0 / width.max(1) as f32);
                self.post_ps
                    .set_float("pixelHeight", 1.0 / height.max(1) as f32);
                self.post_ps
                    .set_shader_resource_view(device, "Pixels", Some(self.post_target.texture));
                self.post_ps
                    .set_sampler_state(device, "ClampSampler", self.clamp_sampler);
                self.post_ps.copy_all_buffer_data(device);
                device.draw(3);
                stats.color_draws += 1;
            }
            PassKind::Overlay => {
                device.record(DeviceCommand::Overlay);
            }
        }
    }

    /// Follow a window resize: swap chain, offscreen target, projections.
    ///
    /// A zero-sized surface (minimized window) is ignored. The shadow map
    /// keeps its resolution.
    pub fn resize(
        &mut self,
        device: &mut dyn RenderDevice,
        scene: &mut Scene,
        width: u32,
        height: u32,
    ) -> Result<(), RenderError> {
        if width == 0 || height == 0 {
            tracing::debug!(width, height, "ignoring zero-sized resize");
            return Ok(());
        }
        device.resize_surface(width, height)?;

        let old = self.post_target;
        self.post_target = device.create_color_target("post_process", width, height)?;
        device.release_color_target(old);

        scene.update_projections(width as f32 / height as f32);
        tracing::info!(width, height, "surface resized");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::entity::Entity;
    use crate::geometry;
    use crate::light::{Light, LightSet};
    use crate::material::Material;
    use crate::mesh::Mesh;
    use crate::recording::RecordingDevice;
    use crate::shader::ShaderValue;
    use glam::{Vec3, Vec4};

    fn scene(device: &mut RecordingDevice, entities: usize) -> Scene {
        let cam = Camera::new(Vec3::new(0.0, 1.0, -8.0), 5.0, 0.01, 1.0, 2.0);
        let mut scene = Scene::new(vec![cam]).unwrap();
        let vs = SimpleShader::load(device, ShaderStage::Vertex, programs::LIT_VS).unwrap();
        let ps = SimpleShader::load(device, ShaderStage::Pixel, programs::LIT_PS).unwrap();
        let (vs, ps) = (Rc::new(vs), Rc::new(ps));
        let mat = Material::new("m", Vec4::ONE, 0.5, vs, ps).into_shared();
        let data = geometry::cube(1.0);
        let mesh = Rc::new(Mesh::from_arrays(device, &data.vertices, &data.indices).unwrap());
        for i in 0..entities {
            let mut e = Entity::new(format!("e{i}"), Rc::clone(&mesh), Rc::clone(&mat));
            e.transform_mut().set_position(i as f32, 0.0, 0.0);
            scene.add_entity(e);
        }
        scene.set_lights(LightSet::new(
            vec![Light::directional(Vec3::X, Vec3::ONE, 0.5)],
            Vec3::ZERO,
        ));
        scene
    }

    fn setup(entities: usize) -> (RecordingDevice, Scene, FrameOrchestrator) {
        let mut device = RecordingDevice::new(800, 600);
        let orchestrator = FrameOrchestrator::new(&mut device, FrameConfig::default()).unwrap();
        let scene = scene(&mut device, entities);
        device.take_commands();
        (device, scene, orchestrator)
    }

    fn draws_between(cmds: &[DeviceCommand], from: usize, to: usize) -> usize {
        cmds[from..to]
            .iter()
            .filter(|c| matches!(c, DeviceCommand::DrawIndexed { .. }))
            .count()
    }

    fn target_binds(cmds: &[DeviceCommand]) -> Vec<(usize, DeviceCommand)> {
        cmds.iter()
            .enumerate()
            .filter(|(_, c)| matches!(c, DeviceCommand::SetRenderTargets { .. }))
            .map(|(i, c)| (i, c.clone()))
            .collect()
    }

    #[test]
    fn passes_run_in_order() {
        let (mut device, scene, mut orch) = setup(1);
        let stats = orch.render_frame(&mut device, &scene, 0.0).unwrap();
        assert_eq!(
            stats.passes,
            vec!["shadow", "main", "sky", "post_process", "overlay"]
        );
    }

    #[test]
    fn shadow_pass_binds_only_shadow_depth() {
        let (mut device, scene, mut orch) = setup(2);
        orch.render_frame(&mut device, &scene, 0.0).unwrap();
        let cmds = &device.frames()[0].commands;
        let binds = target_binds(cmds);
        assert_eq!(
            binds[0].1,
            DeviceCommand::SetRenderTargets {
                color: None,
                depth: Some(orch.shadow_map().target)
            }
        );
        assert_ne!(Some(orch.shadow_map().target), Some(device.depth_buffer()));
    }

    #[test]
    fn each_entity_drawn_once_per_pass() {
        let (mut device, scene, mut orch) = setup(3);
        let stats = orch.render_frame(&mut device, &scene, 0.0).unwrap();
        assert_eq!(stats.shadow_draws, 3);
        assert_eq!(stats.color_draws, 3 + 1);

        let cmds = &device.frames()[0].commands;
        let binds = target_binds(cmds);
        assert_eq!(draws_between(cmds, binds[0].0, binds[1].0), 3);
        assert_eq!(draws_between(cmds, binds[1].0, binds[2].0), 3);
    }

    #[test]
    fn post_process_samples_what_main_wrote() {
        let (mut device, scene, mut orch) = setup(1);
        orch.render_frame(&mut device, &scene, 0.0).unwrap();
        let cmds = &device.frames()[0].commands;
        let binds = target_binds(cmds);
        let post = orch.post_target();
        assert_eq!(
            binds[1].1,
            DeviceCommand::SetRenderTargets {
                color: Some(post.target),
                depth: Some(device.depth_buffer())
            }
        );
        assert!(cmds.contains(&DeviceCommand::BindTexture {
            stage: ShaderStage::Pixel,
            name: "Pixels".into(),
            texture: Some(post.texture),
        }));
        assert!(cmds.contains(&DeviceCommand::Draw { vertex_count: 3 }));
    }

    #[test]
    fn main_pass_clears_before_drawing() {
        let (mut device, scene, mut orch) = setup(1);
        orch.render_frame(&mut device, &scene, 0.0).unwrap();
        let cmds = &device.frames()[0].commands;
        let clear_bb = cmds
            .iter()
            .position(|c| {
                *c == DeviceCommand::ClearColor {
                    target: device.back_buffer(),
                    color: [0.4, 0.6, 0.75, 1.0],
                }
            })
            .unwrap();
        let first_color_draw = cmds
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c, DeviceCommand::DrawIndexed { .. }))
            .map(|(i, _)| i)
            .nth(1)
            .unwrap();
        assert!(clear_bb < first_color_draw);
    }

    #[test]
    fn main_targets_are_restored_before_clearing() {
        let (mut device, scene, mut orch) = setup(1);
        orch.render_frame(&mut device, &scene, 0.0).unwrap();
        let cmds = &device.frames()[0].commands;
        let binds = target_binds(cmds);
        let main_bind = binds[1].0;
        let clears: Vec<usize> = cmds
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                matches!(
                    c,
                    DeviceCommand::ClearColor { .. } | DeviceCommand::ClearDepth { .. }
                )
            })
            .map(|(i, _)| i)
            .collect();
        // one shadow depth clear, then back buffer, post target and depth
        assert_eq!(clears.len(), 4);
        assert!(clears[0] > binds[0].0 && clears[0] < main_bind);
        assert!(clears[1..].iter().all(|&i| i > main_bind));
        assert_eq!(cmds[main_bind + 1], DeviceCommand::SetRasterizer(None));
        assert_eq!(
            cmds[main_bind + 2],
            DeviceCommand::SetViewport(Viewport::sized(800, 600))
        );
    }

    #[test]
    fn lights_and_ambient_reach_the_pixel_program() {
        let (mut device, mut scene, mut orch) = setup(1);
        scene.lights_mut().set_ambient(Vec3::splat(0.1));
        orch.render_frame(&mut device, &scene, 0.0).unwrap();
        let ps = scene.entities()[0].material().borrow().pixel_shader();
        assert_eq!(ps.staged("ambient"), Some(ShaderValue::Float3(Vec3::splat(0.1))));
        assert_eq!(ps.staged("lightCount"), Some(ShaderValue::Int(1)));
        match ps.staged("lights") {
            Some(ShaderValue::Data(bytes)) => assert_eq!(bytes.len(), 64),
            other => panic!("expected light data, got {other:?}"),
        }
    }

    #[test]
    fn present_then_rebind_then_unbind() {
        let (mut device, scene, mut orch) = setup(1);
        orch.render_frame(&mut device, &scene, 0.0).unwrap();
        assert_eq!(device.frames().len(), 1);
        assert_eq!(
            device.commands(),
            &[
                DeviceCommand::SetRenderTargets {
                    color: Some(device.back_buffer()),
                    depth: Some(device.depth_buffer())
                },
                DeviceCommand::UnbindShaderResources {
                    stage: ShaderStage::Pixel,
                    count: PIXEL_RESOURCE_SLOTS
                },
            ]
        );
    }

    #[test]
    fn sync_interval_follows_vsync_and_tearing() {
        let mut device = RecordingDevice::new(100, 100).with_tearing(true);
        let mut orch = FrameOrchestrator::new(&mut device, FrameConfig::default()).unwrap();
        let scene = scene(&mut device, 0);
        let stats = orch.render_frame(&mut device, &scene, 0.0).unwrap();
        assert_eq!((stats.sync_interval, stats.allow_tearing), (0, true));

        orch.set_vsync(true);
        orch.render_frame(&mut device, &scene, 0.0).unwrap();
        let last = device.frames().last().unwrap();
        assert_eq!((last.sync_interval, last.allow_tearing), (1, false));
    }

    #[test]
    fn no_tearing_support_forces_vsync() {
        let (orch_device, _, orch) = setup(0);
        assert!(!orch_device.supports_tearing());
        assert_eq!(orch.sync_parameters(false), (1, false));
    }

    #[test]
    fn disabled_post_process_draws_to_back_buffer() {
        let (mut device, scene, mut orch) = setup(1);
        orch.set_post_process(false);
        let stats = orch.render_frame(&mut device, &scene, 0.0).unwrap();
        assert_eq!(stats.passes, vec!["shadow", "main", "sky", "overlay"]);
        let binds = target_binds(&device.frames()[0].commands);
        assert_eq!(
            binds[1].1,
            DeviceCommand::SetRenderTargets {
                color: Some(device.back_buffer()),
                depth: Some(device.depth_buffer())
            }
        );
    }

    #[test]
    fn resize_recreates_post_target_and_projections() {
        let (mut device, mut scene, mut orch) = setup(1);
        let old_post = *orch.post_target();
        let old_shadow = *orch.shadow_map();
        let old_proj = scene.active_camera().projection();

        orch.resize(&mut device, &mut scene, 1024, 512).unwrap();
        assert_eq!(device.surface_size(), (1024, 512));
        assert_ne!(orch.post_target().target, old_post.target);
        assert_eq!((orch.post_target().width, orch.post_target().height), (1024, 512));
        assert_eq!(device.live_color_targets(), vec![*orch.post_target()]);
        assert_eq!(*orch.shadow_map(), old_shadow);
        assert_ne!(scene.active_camera().projection(), old_proj);
    }

    #[test]
    fn zero_resize_is_ignored() {
        let (mut device, mut scene, mut orch) = setup(1);
        let old_post = *orch.post_target();
        orch.resize(&mut device, &mut scene, 0, 0).unwrap();
        assert_eq!(*orch.post_target(), old_post);
        assert_eq!(device.surface_size(), (800, 600));
    }

    #[test]
    fn blur_radius_is_clamped() {
        let (_, _, mut orch) = setup(0);
        orch.set_blur_radius(25);
        assert_eq!(orch.config().blur_radius, MAX_BLUR_RADIUS);
        orch.set_blur_radius(-3);
        assert_eq!(orch.config().blur_radius, 0);
    }

    #[test]
    fn shadow_map_is_sampleable_at_config_resolution() {
        let (device, _, orch) = setup(0);
        assert!(orch.shadow_map_texture().is_some());
        let depth = device.depth_target(orch.shadow_map().target).unwrap();
        assert_eq!((depth.width, depth.height), (1024, 1024));
    }
}
