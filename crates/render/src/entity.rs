use crate::camera::Camera;
use crate::device::RenderDevice;
use crate::material::SharedMaterial;
use crate::mesh::Mesh;
use prism_common::SpatialTransform;
use std::rc::Rc;

/// A drawable object: shared mesh, its own transform, swappable material.
#[derive(Debug, Clone)]
pub struct Entity {
    name: String,
    mesh: Rc<Mesh>,
    transform: SpatialTransform,
    material: SharedMaterial,
}

impl Entity {
    pub fn new(name: impl Into<String>, mesh: Rc<Mesh>, material: SharedMaterial) -> Self {
        Self {
            name: name.into(),
            mesh,
            transform: SpatialTransform::new(),
            material,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mesh(&self) -> &Rc<Mesh> {
        &self.mesh
    }

    pub fn transform(&self) -> &SpatialTransform {
        &self.transform
    }

    pub fn transform_mut(&mut self) -> &mut SpatialTransform {
        &mut self.transform
    }

    pub fn material(&self) -> &SharedMaterial {
        &self.material
    }

    pub fn set_material(&mut self, material: SharedMaterial) {
        self.material = material;
    }

    /// Activate the material's programs, stage per-object parameters,
    /// commit them, then draw the mesh.
    pub fn draw(&self, device: &mut dyn RenderDevice, camera: &Camera, total_time: f32) {
        let material = self.material.borrow();
        let vs = material.vertex_shader();
        let ps = material.pixel_shader();

        vs.set_shader(device);
        ps.set_shader(device);

        vs.set_matrix4x4("world", self.transform.world_matrix());
        vs.set_matrix4x4(
            "worldInvTranspose",
            self.transform.world_inverse_transpose_matrix(),
        );
        vs.set_matrix4x4("view", camera.view());
        vs.set_matrix4x4("projection", camera.projection());

        ps.set_float4("colorTint", material.color_tint());
        ps.set_float("roughness", material.roughness());
        ps.set_float3("cameraPosition", camera.position());
        ps.set_float("time", total_time);

        vs.copy_all_buffer_data(device);
        ps.copy_all_buffer_data(device);

        self.mesh.draw(device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceCommand, ShaderStage};
    use crate::geometry;
    use crate::material::Material;
    use crate::recording::RecordingDevice;
    use crate::shader::{ShaderValue, SimpleShader, programs};
    use glam::{Vec3, Vec4};

    fn entity(device: &mut RecordingDevice) -> Entity {
        let vs = SimpleShader::load(device, ShaderStage::Vertex, programs::LIT_VS).unwrap();
        let ps = SimpleShader::load(device, ShaderStage::Pixel, programs::LIT_PS).unwrap();
        let (vs, ps) = (Rc::new(vs), Rc::new(ps));
        let mat = Material::new("m", Vec4::ONE, 0.25, vs, ps).into_shared();
        let data = geometry::cube(1.0);
        let mesh = Rc::new(Mesh::from_arrays(device, &data.vertices, &data.indices).unwrap());
        Entity::new("cube", mesh, mat)
    }

    #[test]
    fn draw_orders_activation_params_commit_draw() {
        let mut device = RecordingDevice::new(64, 64);
        let mut e = entity(&mut device);
        e.transform_mut().set_position(1.0, 2.0, 3.0);
        let cam = Camera::new(Vec3::new(0.0, 0.0, -5.0), 1.0, 0.01, 1.0, 1.0);
        device.take_commands();

        e.draw(&mut device, &cam, 2.0);
        let cmds = device.commands();
        assert_eq!(cmds.len(), 5);
        assert!(matches!(cmds[0], DeviceCommand::SetShader { stage: ShaderStage::Vertex, .. }));
        assert!(matches!(cmds[1], DeviceCommand::SetShader { stage: ShaderStage::Pixel, .. }));
        assert!(matches!(cmds[2], DeviceCommand::UploadConstants { .. }));
        assert!(matches!(cmds[3], DeviceCommand::UploadConstants { .. }));
        assert_eq!(
            cmds[4],
            DeviceCommand::DrawIndexed {
                mesh: e.mesh().id(),
                index_count: 36
            }
        );
    }

    #[test]
    fn draw_uploads_transform_and_camera() {
        let mut device = RecordingDevice::new(64, 64);
        let mut e = entity(&mut device);
        e.transform_mut().set_scale(2.0, 2.0, 2.0);
        let cam = Camera::new(Vec3::new(0.0, 0.0, -5.0), 1.0, 0.01, 1.0, 1.0);
        device.take_commands();
        e.draw(&mut device, &cam, 0.5);

        let DeviceCommand::UploadConstants { block: vs_block, .. } = &device.commands()[2] else {
            panic!("expected vertex upload");
        };
        assert_eq!(
            vs_block.get("world"),
            Some(&ShaderValue::Matrix(e.transform().world_matrix()))
        );
        assert_eq!(vs_block.get("view"), Some(&ShaderValue::Matrix(cam.view())));

        let DeviceCommand::UploadConstants { block: ps_block, .. } = &device.commands()[3] else {
            panic!("expected pixel upload");
        };
        assert_eq!(ps_block.get("time"), Some(&ShaderValue::Float(0.5)));
        assert_eq!(ps_block.get("roughness"), Some(&ShaderValue::Float(0.25)));
        assert_eq!(
            ps_block.get("cameraPosition"),
            Some(&ShaderValue::Float3(Vec3::new(0.0, 0.0, -5.0)))
        );
    }

    #[test]
    fn swapping_material_changes_programs() {
        let mut device = RecordingDevice::new(64, 64);
        let mut e = entity(&mut device);
        let vs = SimpleShader::load(&mut device, ShaderStage::Vertex, programs::LIT_VS).unwrap();
        let ps = SimpleShader::load(&mut device, ShaderStage::Pixel, programs::LIT_PS).unwrap();
        let (vs, ps) = (Rc::new(vs), Rc::new(ps));
        let ps_id = ps.id();
        e.set_material(Material::new("other", Vec4::ONE, 1.0, vs, ps).into_shared());
        let cam = Camera::new(Vec3::ZERO, 1.0, 0.01, 1.0, 1.0);
        device.take_commands();
        e.draw(&mut device, &cam, 0.0);
        assert_eq!(
            device.commands()[1],
            DeviceCommand::SetShader {
                stage: ShaderStage::Pixel,
                shader: Some(ps_id)
            }
        );
    }
}
