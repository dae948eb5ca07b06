use thiserror::Error;

/// Failures reported by a render device backend.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("unknown shader program: {0}")]
    UnknownShader(String),

    #[error("vertex program {vertex} cannot pair with pixel program {pixel}")]
    ProgramMismatch { vertex: String, pixel: String },

    #[error("texture data size mismatch: expected {expected} bytes, got {actual}")]
    TextureData { expected: usize, actual: usize },

    #[error("resource not found: {0}")]
    MissingResource(String),

    #[error("surface error: {0}")]
    Surface(String),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Errors from the render core.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    #[error("scene has no cameras")]
    NoCameras,

    #[error("mesh has no indices")]
    EmptyMesh,
}

/// Errors loading a [`crate::FrameConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
