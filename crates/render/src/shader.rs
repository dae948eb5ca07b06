use crate::device::{DeviceCommand, RenderDevice, SamplerId, ShaderId, ShaderStage, TextureId};
use crate::error::DeviceError;
use glam::{Mat4, Vec3, Vec4};
use std::cell::RefCell;
use std::collections::BTreeMap;

/// Names of the shader programs a device is expected to provide.
pub mod programs {
    use crate::device::ShaderStage;

    pub const LIT_VS: &str = "lit_vs";
    pub const LIT_PS: &str = "lit_ps";
    pub const SHADOW_VS: &str = "shadow_vs";
    pub const SKY_VS: &str = "sky_vs";
    pub const SKY_PS: &str = "sky_ps";
    pub const FULLSCREEN_VS: &str = "fullscreen_vs";
    pub const BLUR_PS: &str = "blur_ps";

    pub const ALL: [&str; 7] = [
        LIT_VS,
        LIT_PS,
        SHADOW_VS,
        SKY_VS,
        SKY_PS,
        FULLSCREEN_VS,
        BLUR_PS,
    ];

    /// Stage a program compiles for, and the family whose vertex and pixel
    /// programs may be paired in one draw.
    pub fn resolve(name: &str) -> Option<(ShaderStage, &'static str)> {
        match name {
            LIT_VS => Some((ShaderStage::Vertex, "lit")),
            LIT_PS => Some((ShaderStage::Pixel, "lit")),
            SHADOW_VS => Some((ShaderStage::Vertex, "shadow")),
            SKY_VS => Some((ShaderStage::Vertex, "sky")),
            SKY_PS => Some((ShaderStage::Pixel, "sky")),
            FULLSCREEN_VS => Some((ShaderStage::Vertex, "blur")),
            BLUR_PS => Some((ShaderStage::Pixel, "blur")),
            _ => None,
        }
    }
}

/// A staged shader parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderValue {
    Float(f32),
    Float3(Vec3),
    Float4(Vec4),
    Int(i32),
    Matrix(Mat4),
    /// Raw bytes, e.g. a packed array of structs.
    Data(Vec<u8>),
}

/// Named parameters staged for one program, ordered by name.
pub type ParameterBlock = BTreeMap<String, ShaderValue>;

/// A shader program with a named-parameter staging area.
///
/// Setters only stage values; nothing reaches the device until
/// [`SimpleShader::copy_all_buffer_data`]. Resource and sampler binds go to
/// the device immediately, as slot binds do on the GPU. Staged values persist
/// across commits, so a parameter set once keeps its value until overwritten.
#[derive(Debug)]
pub struct SimpleShader {
    id: ShaderId,
    stage: ShaderStage,
    name: String,
    staged: RefCell<ParameterBlock>,
}

impl SimpleShader {
    /// Load the named program for `stage` from the device.
    pub fn load(
        device: &mut dyn RenderDevice,
        stage: ShaderStage,
        name: &str,
    ) -> Result<Self, DeviceError> {
        let id = device.create_shader(stage, name)?;
        tracing::debug!(%stage, name, id = id.0, "shader loaded");
        Ok(Self {
            id,
            stage,
            name: name.to_string(),
            staged: RefCell::new(ParameterBlock::new()),
        })
    }

    pub fn id(&self) -> ShaderId {
        self.id
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn stage_value(&self, name: &str, value: ShaderValue) {
        self.staged.borrow_mut().insert(name.to_string(), value);
    }

    pub fn set_matrix4x4(&self, name: &str, value: Mat4) {
        self.stage_value(name, ShaderValue::Matrix(value));
    }

    pub fn set_float(&self, name: &str, value: f32) {
        self.stage_value(name, ShaderValue::Float(value));
    }

    pub fn set_float3(&self, name: &str, value: Vec3) {
        self.stage_value(name, ShaderValue::Float3(value));
    }

    pub fn set_float4(&self, name: &str, value: Vec4) {
        self.stage_value(name, ShaderValue::Float4(value));
    }

    pub fn set_int(&self, name: &str, value: i32) {
        self.stage_value(name, ShaderValue::Int(value));
    }

    pub fn set_data(&self, name: &str, bytes: &[u8]) {
        self.stage_value(name, ShaderValue::Data(bytes.to_vec()));
    }

    /// Currently staged value for `name`, if any.
    pub fn staged(&self, name: &str) -> Option<ShaderValue> {
        self.staged.borrow().get(name).cloned()
    }

    pub fn set_shader_resource_view(
        &self,
        device: &mut dyn RenderDevice,
        name: &str,
        texture: Option<TextureId>,
    ) {
        device.record(DeviceCommand::BindTexture {
            stage: self.stage,
            name: name.to_string(),
            texture,
        });
    }

    pub fn set_sampler_state(&self, device: &mut dyn RenderDevice, name: &str, sampler: SamplerId) {
        device.record(DeviceCommand::BindSampler {
            stage: self.stage,
            name: name.to_string(),
            sampler,
        });
    }

    /// Make this the active program for its stage.
    pub fn set_shader(&self, device: &mut dyn RenderDevice) {
        device.record(DeviceCommand::SetShader {
            stage: self.stage,
            shader: Some(self.id),
        });
    }

    /// Upload every staged parameter in one batch.
    pub fn copy_all_buffer_data(&self, device: &mut dyn RenderDevice) {
        device.record(DeviceCommand::UploadConstants {
            shader: self.id,
            block: self.staged.borrow().clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingDevice;

    #[test]
    fn setters_stage_without_recording() {
        let mut device = RecordingDevice::new(64, 64);
        let vs = SimpleShader::load(&mut device, ShaderStage::Vertex, "lit_vs").unwrap();
        device.take_commands();
        vs.set_float("time", 1.5);
        vs.set_matrix4x4("world", Mat4::IDENTITY);
        assert!(device.commands().is_empty());
        assert_eq!(vs.staged("time"), Some(ShaderValue::Float(1.5)));
    }

    #[test]
    fn commit_uploads_all_staged_values() {
        let mut device = RecordingDevice::new(64, 64);
        let ps = SimpleShader::load(&mut device, ShaderStage::Pixel, "lit_ps").unwrap();
        ps.set_float3("ambient", Vec3::ONE);
        ps.set_int("lightCount", 2);
        ps.copy_all_buffer_data(&mut device);
        let uploads: Vec<_> = device
            .commands()
            .iter()
            .filter_map(|c| match c {
                DeviceCommand::UploadConstants { shader, block } => Some((*shader, block.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].0, ps.id());
        assert_eq!(uploads[0].1.len(), 2);
        assert_eq!(uploads[0].1.get("lightCount"), Some(&ShaderValue::Int(2)));
    }

    #[test]
    fn staged_values_persist_across_commits() {
        let mut device = RecordingDevice::new(64, 64);
        let ps = SimpleShader::load(&mut device, ShaderStage::Pixel, "lit_ps").unwrap();
        ps.set_float("roughness", 0.5);
        ps.copy_all_buffer_data(&mut device);
        ps.copy_all_buffer_data(&mut device);
        let last = device.commands().last().cloned();
        match last {
            Some(DeviceCommand::UploadConstants { block, .. }) => {
                assert_eq!(block.get("roughness"), Some(&ShaderValue::Float(0.5)));
            }
            other => panic!("expected upload, got {other:?}"),
        }
    }

    #[test]
    fn unknown_program_is_an_error() {
        let mut device = RecordingDevice::new(64, 64);
        let err = SimpleShader::load(&mut device, ShaderStage::Pixel, "toon_ps").unwrap_err();
        assert!(matches!(err, DeviceError::UnknownShader(_)));
    }

    #[test]
    fn every_program_has_a_family() {
        for name in programs::ALL {
            assert!(programs::resolve(name).is_some(), "{name} unresolved");
        }
        assert_eq!(
            programs::resolve(programs::FULLSCREEN_VS),
            Some((ShaderStage::Vertex, "blur"))
        );
        assert_eq!(
            programs::resolve(programs::BLUR_PS),
            Some((ShaderStage::Pixel, "blur"))
        );
        assert_eq!(programs::resolve("toon_ps"), None);
    }
}
