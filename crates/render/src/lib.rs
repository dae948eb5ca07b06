//! Backend-agnostic render core.
//!
//! Scene objects (entities, cameras, lights, sky) draw themselves through the
//! [`RenderDevice`] trait by staging named shader parameters and issuing
//! commands. The [`FrameOrchestrator`] turns a [`Scene`] into an ordered list
//! of [`PassDescriptor`]s and runs them through one generic pass runner.
//!
//! # Invariants
//! - Passes run shadow depth, main color, sky, post-process, overlay, then
//!   present, then pixel-stage resource unbinding.
//! - The shadow pass never binds the main depth buffer.
//! - An entity activates its programs, stages and commits its parameters,
//!   then draws, in that order.
//! - Only the device creates or releases GPU objects; the core holds ids.

pub mod camera;
pub mod config;
pub mod device;
pub mod entity;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod light;
pub mod material;
pub mod mesh;
pub mod pass;
pub mod recording;
pub mod scene;
pub mod setup;
pub mod shader;
pub mod sky;

pub use camera::Camera;
pub use config::FrameConfig;
pub use device::{DeviceCommand, RenderDevice, ShaderStage};
pub use entity::Entity;
pub use error::{ConfigError, DeviceError, RenderError};
pub use frame::{FrameOrchestrator, FrameStats};
pub use light::{GpuLight, Light, LightKind, LightSet};
pub use material::{Material, SharedMaterial};
pub use mesh::{Mesh, Vertex};
pub use pass::{PassDescriptor, PassKind};
pub use recording::RecordingDevice;
pub use scene::Scene;
pub use shader::{ParameterBlock, ShaderValue, SimpleShader};
pub use sky::Sky;

pub fn crate_info() -> &'static str {
    "prism-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
