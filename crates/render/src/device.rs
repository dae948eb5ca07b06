use crate::error::DeviceError;
use crate::mesh::Vertex;
use crate::shader::ParameterBlock;
use std::fmt;

macro_rules! resource_id {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(pub u32);
        )*
    };
}

resource_id!(
    /// Uploaded vertex/index buffer pair.
    MeshId,
    /// Compiled shader program for one stage.
    ShaderId,
    /// Sampleable texture view.
    TextureId,
    SamplerId,
    /// Render target view for color output.
    ColorTargetId,
    /// Depth target view.
    DepthTargetId,
    RasterizerId,
    DepthStencilId,
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    Vertex,
    Pixel,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "VS"),
            ShaderStage::Pixel => write!(f, "PS"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Full-target viewport with the standard `[0, 1]` depth range.
    pub fn sized(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    None,
    Front,
    #[default]
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    Never,
    Less,
    LessEqual,
    Equal,
    Greater,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RasterizerDesc {
    pub cull: CullMode,
    /// Constant depth bias in depth-buffer units.
    pub depth_bias: i32,
    pub slope_scaled_depth_bias: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthStencilDesc {
    pub depth_compare: CompareFunction,
    pub depth_write: bool,
}

impl Default for DepthStencilDesc {
    fn default() -> Self {
        Self {
            depth_compare: CompareFunction::Less,
            depth_write: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    Wrap,
    Clamp,
    /// Outside reads return the border value (opaque white / depth 1.0).
    Border,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Point,
    Linear,
    Anisotropic(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerDesc {
    pub address: AddressMode,
    pub filter: FilterMode,
    pub compare: Option<CompareFunction>,
}

impl SamplerDesc {
    pub fn wrap_anisotropic(max_anisotropy: u16) -> Self {
        Self {
            address: AddressMode::Wrap,
            filter: FilterMode::Anisotropic(max_anisotropy),
            compare: None,
        }
    }

    pub fn clamp_linear() -> Self {
        Self {
            address: AddressMode::Clamp,
            filter: FilterMode::Linear,
            compare: None,
        }
    }

    /// Comparison sampler for shadow lookups: outside the map counts as lit.
    pub fn shadow_comparison() -> Self {
        Self {
            address: AddressMode::Border,
            filter: FilterMode::Linear,
            compare: Some(CompareFunction::Less),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    D2,
    /// Six square faces in +X, -X, +Y, -Y, +Z, -Z order.
    Cube,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8Unorm,
    Rgba8UnormSrgb,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDesc {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub kind: TextureKind,
    pub format: TextureFormat,
}

impl TextureDesc {
    pub fn layer_count(&self) -> u32 {
        match self.kind {
            TextureKind::D2 => 1,
            TextureKind::Cube => 6,
        }
    }

    /// Byte length of tightly packed RGBA8 data for every layer.
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * 4 * self.layer_count() as usize
    }
}

/// Offscreen color target that can also be sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorTarget {
    pub target: ColorTargetId,
    pub texture: TextureId,
    pub width: u32,
    pub height: u32,
}

/// Depth target, optionally sampleable as a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthTarget {
    pub target: DepthTargetId,
    pub texture: Option<TextureId>,
    pub width: u32,
    pub height: u32,
}

/// One entry of the immediate-mode command stream.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    SetRenderTargets {
        color: Option<ColorTargetId>,
        depth: Option<DepthTargetId>,
    },
    ClearColor {
        target: ColorTargetId,
        color: [f32; 4],
    },
    ClearDepth {
        target: DepthTargetId,
        depth: f32,
    },
    SetViewport(Viewport),
    /// `None` restores the default rasterizer state.
    SetRasterizer(Option<RasterizerId>),
    /// `None` restores the default depth-stencil state.
    SetDepthStencil(Option<DepthStencilId>),
    /// Activate a program for a stage; `None` disables the stage.
    SetShader {
        stage: ShaderStage,
        shader: Option<ShaderId>,
    },
    /// Flush the staged named parameters of a program to the GPU.
    UploadConstants {
        shader: ShaderId,
        block: ParameterBlock,
    },
    BindTexture {
        stage: ShaderStage,
        name: String,
        texture: Option<TextureId>,
    },
    BindSampler {
        stage: ShaderStage,
        name: String,
        sampler: SamplerId,
    },
    DrawIndexed {
        mesh: MeshId,
        index_count: u32,
    },
    Draw {
        vertex_count: u32,
    },
    /// Paint the UI overlay onto the currently bound color target.
    Overlay,
    /// Clear the first `count` texture slots of a stage.
    UnbindShaderResources {
        stage: ShaderStage,
        count: u32,
    },
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceCommand::SetRenderTargets { color, depth } => write!(
                f,
                "set_targets color={} depth={}",
                color.map_or("null".to_string(), |c| c.0.to_string()),
                depth.map_or("null".to_string(), |d| d.0.to_string())
            ),
            DeviceCommand::ClearColor { target, color } => write!(
                f,
                "clear_color target={} rgba=({:.2}, {:.2}, {:.2}, {:.2})",
                target.0, color[0], color[1], color[2], color[3]
            ),
            DeviceCommand::ClearDepth { target, depth } => {
                write!(f, "clear_depth target={} depth={depth:.1}", target.0)
            }
            DeviceCommand::SetViewport(v) => {
                write!(f, "viewport {}x{}", v.width, v.height)
            }
            DeviceCommand::SetRasterizer(r) => write!(
                f,
                "rasterizer {}",
                r.map_or("default".to_string(), |r| r.0.to_string())
            ),
            DeviceCommand::SetDepthStencil(d) => write!(
                f,
                "depth_stencil {}",
                d.map_or("default".to_string(), |d| d.0.to_string())
            ),
            DeviceCommand::SetShader { stage, shader } => write!(
                f,
                "{stage} set_shader {}",
                shader.map_or("null".to_string(), |s| s.0.to_string())
            ),
            DeviceCommand::UploadConstants { shader, block } => {
                let names: Vec<&str> = block.keys().map(String::as_str).collect();
                write!(f, "upload shader={} [{}]", shader.0, names.join(", "))
            }
            DeviceCommand::BindTexture {
                stage,
                name,
                texture,
            } => write!(
                f,
                "{stage} srv {name}={}",
                texture.map_or("null".to_string(), |t| t.0.to_string())
            ),
            DeviceCommand::BindSampler {
                stage,
                name,
                sampler,
            } => write!(f, "{stage} sampler {name}={}", sampler.0),
            DeviceCommand::DrawIndexed { mesh, index_count } => {
                write!(f, "draw_indexed mesh={} indices={index_count}", mesh.0)
            }
            DeviceCommand::Draw { vertex_count } => write!(f, "draw vertices={vertex_count}"),
            DeviceCommand::Overlay => write!(f, "overlay"),
            DeviceCommand::UnbindShaderResources { stage, count } => {
                write!(f, "{stage} unbind_srvs count={count}")
            }
        }
    }
}

/// The graphics device and swap chain the render core draws through.
///
/// Resource creation is fallible; commands are recorded in program order and
/// take effect no later than the next [`RenderDevice::present`].
pub trait RenderDevice {
    fn create_mesh(&mut self, vertices: &[Vertex], indices: &[u32]) -> Result<MeshId, DeviceError>;

    /// Resolve a named shader program for a stage.
    fn create_shader(&mut self, stage: ShaderStage, name: &str) -> Result<ShaderId, DeviceError>;

    /// Upload tightly packed RGBA8 data, layer by layer.
    fn create_texture(&mut self, desc: &TextureDesc, data: &[u8]) -> Result<TextureId, DeviceError>;

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerId, DeviceError>;

    fn create_rasterizer_state(&mut self, desc: &RasterizerDesc)
    -> Result<RasterizerId, DeviceError>;

    fn create_depth_stencil_state(
        &mut self,
        desc: &DepthStencilDesc,
    ) -> Result<DepthStencilId, DeviceError>;

    fn create_color_target(
        &mut self,
        label: &str,
        width: u32,
        height: u32,
    ) -> Result<ColorTarget, DeviceError>;

    fn create_depth_target(
        &mut self,
        label: &str,
        width: u32,
        height: u32,
        sampled: bool,
    ) -> Result<DepthTarget, DeviceError>;

    fn release_color_target(&mut self, target: ColorTarget);

    /// Render target view of the current swap chain buffer.
    fn back_buffer(&self) -> ColorTargetId;

    /// Depth buffer that matches the swap chain size.
    fn depth_buffer(&self) -> DepthTargetId;

    fn surface_size(&self) -> (u32, u32);

    fn supports_tearing(&self) -> bool;

    /// Resize the swap chain buffers and the main depth buffer.
    fn resize_surface(&mut self, width: u32, height: u32) -> Result<(), DeviceError>;

    fn record(&mut self, command: DeviceCommand);

    /// Show the back buffer. `sync_interval` 0 presents immediately.
    fn present(&mut self, sync_interval: u32, allow_tearing: bool) -> Result<(), DeviceError>;

    fn set_render_targets(&mut self, color: Option<ColorTargetId>, depth: Option<DepthTargetId>) {
        self.record(DeviceCommand::SetRenderTargets { color, depth });
    }

    fn clear_color(&mut self, target: ColorTargetId, color: [f32; 4]) {
        self.record(DeviceCommand::ClearColor { target, color });
    }

    fn clear_depth(&mut self, target: DepthTargetId, depth: f32) {
        self.record(DeviceCommand::ClearDepth { target, depth });
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.record(DeviceCommand::SetViewport(viewport));
    }

    fn set_rasterizer(&mut self, state: Option<RasterizerId>) {
        self.record(DeviceCommand::SetRasterizer(state));
    }

    fn set_depth_stencil(&mut self, state: Option<DepthStencilId>) {
        self.record(DeviceCommand::SetDepthStencil(state));
    }

    fn draw_indexed(&mut self, mesh: MeshId, index_count: u32) {
        self.record(DeviceCommand::DrawIndexed { mesh, index_count });
    }

    fn draw(&mut self, vertex_count: u32) {
        self.record(DeviceCommand::Draw { vertex_count });
    }

    fn unbind_shader_resources(&mut self, stage: ShaderStage, count: u32) {
        self.record(DeviceCommand::UnbindShaderResources { stage, count });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_texture_has_six_layers() {
        let desc = TextureDesc {
            label: "sky".into(),
            width: 4,
            height: 4,
            kind: TextureKind::Cube,
            format: TextureFormat::Rgba8Unorm,
        };
        assert_eq!(desc.layer_count(), 6);
        assert_eq!(desc.byte_len(), 4 * 4 * 4 * 6);
    }

    #[test]
    fn viewport_covers_target() {
        let v = Viewport::sized(1280, 720);
        assert_eq!(v.width, 1280.0);
        assert_eq!(v.max_depth, 1.0);
    }

    #[test]
    fn command_display_is_compact() {
        let cmd = DeviceCommand::SetRenderTargets {
            color: None,
            depth: Some(DepthTargetId(3)),
        };
        assert_eq!(cmd.to_string(), "set_targets color=null depth=3");
        let cmd = DeviceCommand::UnbindShaderResources {
            stage: ShaderStage::Pixel,
            count: 128,
        };
        assert_eq!(cmd.to_string(), "PS unbind_srvs count=128");
    }
}
