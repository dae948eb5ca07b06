use prism_render::DeviceError;
use thiserror::Error;

/// Failures bringing up or driving the wgpu device.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("no compatible GPU adapter found")]
    NoAdapter,

    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported formats")]
    NoSurfaceFormat,

    #[error("{program} cannot pair with pixel program {pixel}")]
    ProgramMismatch { program: &'static str, pixel: String },

    #[error("{name} expects a {expected}")]
    BindingMismatch { name: String, expected: &'static str },

    #[error("draw into a color target needs a pixel program")]
    MissingPixelProgram,

    #[error("depth target {0} is not sampled and cannot be previewed")]
    UnsampledDepthTarget(u32),
}

impl From<BackendError> for DeviceError {
    fn from(err: BackendError) -> Self {
        DeviceError::Backend(err.to_string())
    }
}
