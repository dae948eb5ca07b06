use crate::camera::Camera;
use crate::device::{
    CompareFunction, CullMode, DepthStencilDesc, DepthStencilId, RasterizerDesc, RasterizerId,
    RenderDevice, SamplerId, TextureDesc, TextureFormat, TextureId, TextureKind,
};
use crate::error::RenderError;
use crate::mesh::Mesh;
use crate::shader::SimpleShader;
use std::rc::Rc;

/// Cube-mapped backdrop drawn after opaque geometry.
///
/// The sky mesh is seen from inside, so front faces are culled, and its depth
/// is pushed to the far plane by the vertex program, so the depth test must
/// accept equal depth.
#[derive(Debug)]
pub struct Sky {
    mesh: Rc<Mesh>,
    cube_map: TextureId,
    sampler: SamplerId,
    vertex_shader: Rc<SimpleShader>,
    pixel_shader: Rc<SimpleShader>,
    rasterizer: RasterizerId,
    depth_state: DepthStencilId,
}

impl Sky {
    pub fn new(
        device: &mut dyn RenderDevice,
        mesh: Rc<Mesh>,
        cube_map: TextureId,
        sampler: SamplerId,
        vertex_shader: Rc<SimpleShader>,
        pixel_shader: Rc<SimpleShader>,
    ) -> Result<Self, RenderError> {
        let rasterizer = device.create_rasterizer_state(&RasterizerDesc {
            cull: CullMode::Front,
            ..RasterizerDesc::default()
        })?;
        let depth_state = device.create_depth_stencil_state(&DepthStencilDesc {
            depth_compare: CompareFunction::LessEqual,
            depth_write: true,
        })?;
        Ok(Self {
            mesh,
            cube_map,
            sampler,
            vertex_shader,
            pixel_shader,
            rasterizer,
            depth_state,
        })
    }

    /// Upload six square RGBA8 faces (+X, -X, +Y, -Y, +Z, -Z) as a cube map.
    pub fn create_cube_map(
        device: &mut dyn RenderDevice,
        face_size: u32,
        faces: &[Vec<u8>; 6],
    ) -> Result<TextureId, RenderError> {
        let desc = TextureDesc {
            label: "sky_cube_map".into(),
            width: face_size,
            height: face_size,
            kind: TextureKind::Cube,
            format: TextureFormat::Rgba8UnormSrgb,
        };
        let data = faces.concat();
        Ok(device.create_texture(&desc, &data)?)
    }

    pub fn cube_map(&self) -> TextureId {
        self.cube_map
    }

    pub fn draw(&self, device: &mut dyn RenderDevice, camera: &Camera) {
        device.set_rasterizer(Some(self.rasterizer));
        device.set_depth_stencil(Some(self.depth_state));

        self.vertex_shader.set_shader(device);
        self.pixel_shader.set_shader(device);

        self.vertex_shader.set_matrix4x4("view", camera.view());
        self.vertex_shader
            .set_matrix4x4("projection", camera.projection());
        self.vertex_shader.copy_all_buffer_data(device);

        self.pixel_shader
            .set_shader_resource_view(device, "CubeMap", Some(self.cube_map));
        self.pixel_shader
            .set_sampler_state(device, "BasicSampler", self.sampler);

        self.mesh.draw(device);

        device.set_rasterizer(None);
        device.set_depth_stencil(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceCommand, SamplerDesc, ShaderStage};
    use crate::geometry;
    use crate::recording::RecordingDevice;
    use crate::shader::programs;
    use glam::Vec3;

    fn sky(device: &mut RecordingDevice) -> Sky {
        let data = geometry::cube(1.0);
        let mesh = Rc::new(Mesh::from_arrays(device, &data.vertices, &data.indices).unwrap());
        let faces: [Vec<u8>; 6] = std::array::from_fn(|_| vec![255; 4 * 4 * 4]);
        let cube = Sky::create_cube_map(device, 4, &faces).unwrap();
        let sampler = device
            .create_sampler(&SamplerDesc::wrap_anisotropic(16))
            .unwrap();
        let vs = SimpleShader::load(device, ShaderStage::Vertex, programs::SKY_VS).unwrap();
        let ps = SimpleShader::load(device, ShaderStage::Pixel, programs::SKY_PS).unwrap();
        let (vs, ps) = (Rc::new(vs), Rc::new(ps));
        Sky::new(device, mesh, cube, sampler, vs, ps).unwrap()
    }

    #[test]
    fn sky_states_cull_front_and_test_less_equal() {
        let mut device = RecordingDevice::new(64, 64);
        let sky = sky(&mut device);
        assert_eq!(device.rasterizer(sky.rasterizer).unwrap().cull, CullMode::Front);
        assert_eq!(
            device.depth_state(sky.depth_state).unwrap().depth_compare,
            CompareFunction::LessEqual
        );
    }

    #[test]
    fn draw_sets_then_resets_state() {
        let mut device = RecordingDevice::new(64, 64);
        let sky = sky(&mut device);
        let cam = Camera::new(Vec3::ZERO, 1.0, 0.01, 1.0, 1.0);
        device.take_commands();
        sky.draw(&mut device, &cam);

        let cmds = device.commands();
        assert_eq!(cmds[0], DeviceCommand::SetRasterizer(Some(sky.rasterizer)));
        assert_eq!(cmds[1], DeviceCommand::SetDepthStencil(Some(sky.depth_state)));
        assert!(cmds.contains(&DeviceCommand::BindTexture {
            stage: ShaderStage::Pixel,
            name: "CubeMap".into(),
            texture: Some(sky.cube_map()),
        }));
        let n = cmds.len();
        assert!(matches!(cmds[n - 3], DeviceCommand::DrawIndexed { index_count: 36, .. }));
        assert_eq!(cmds[n - 2], DeviceCommand::SetRasterizer(None));
        assert_eq!(cmds[n - 1], DeviceCommand::SetDepthStencil(None));
    }

    #[test]
    fn cube_map_needs_six_full_faces() {
        let mut device = RecordingDevice::new(64, 64);
        let mut faces: [Vec<u8>; 6] = std::array::from_fn(|_| vec![0; 2 * 2 * 4]);
        faces[5].truncate(4);
        assert!(Sky::create_cube_map(&mut device, 2, &faces).is_err());
    }
}
