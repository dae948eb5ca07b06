//! Turns the immediate-mode command stream into render-pass batches.
//!
//! wgpu draws inside render passes with fixed attachments, so commands are
//! grouped at every target change. A clear of a target that is about to be
//! bound becomes that pass's load op; a clear of a target that is never bound
//! again before the frame ends becomes a clear-only pass at the end.

use prism_render::device::{
    ColorTargetId, DepthStencilId, DepthTargetId, MeshId, RasterizerId, SamplerId, ShaderId,
    TextureId, Viewport,
};
use prism_render::{DeviceCommand, ParameterBlock, ShaderStage};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawKind {
    Indexed { mesh: MeshId, index_count: u32 },
    Vertices(u32),
}

/// Everything a draw call needs, captured at the moment it was recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub kind: DrawKind,
    pub viewport: Viewport,
    pub vertex_shader: Option<ShaderId>,
    pub pixel_shader: Option<ShaderId>,
    pub rasterizer: Option<RasterizerId>,
    pub depth_state: Option<DepthStencilId>,
    pub vertex_constants: ParameterBlock,
    pub pixel_constants: ParameterBlock,
    pub textures: BTreeMap<String, TextureId>,
    pub samplers: BTreeMap<String, SamplerId>,
}

/// One render pass: attachments, their load ops, and the draws into them.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub color: Option<ColorTargetId>,
    pub depth: Option<DepthTargetId>,
    pub color_clear: Option<[f32; 4]>,
    pub depth_clear: Option<f32>,
    pub draws: Vec<DrawCall>,
    /// Paint the UI overlay into `color` after the draws.
    pub overlay: bool,
}

impl Batch {
    fn new(color: Option<ColorTargetId>, depth: Option<DepthTargetId>) -> Self {
        Self {
            color,
            depth,
            color_clear: None,
            depth_clear: None,
            draws: Vec::new(),
            overlay: false,
        }
    }

    fn is_empty(&self) -> bool {
        self.draws.is_empty()
            && !self.overlay
            && self.color_clear.is_none()
            && self.depth_clear.is_none()
    }

    /// Nothing has been drawn yet, so a clear can still become the load op.
    fn untouched(&self) -> bool {
        self.draws.is_empty() && !self.overlay
    }
}

/// Pipeline state as the command stream leaves it. Persists across frames.
#[derive(Debug)]
pub struct CommandReplay {
    color: Option<ColorTargetId>,
    depth: Option<DepthTargetId>,
    viewport: Viewport,
    rasterizer: Option<RasterizerId>,
    depth_state: Option<DepthStencilId>,
    vertex_shader: Option<ShaderId>,
    pixel_shader: Option<ShaderId>,
    constants: BTreeMap<ShaderId, ParameterBlock>,
    vertex_textures: BTreeMap<String, TextureId>,
    pixel_textures: BTreeMap<String, TextureId>,
    vertex_samplers: BTreeMap<String, SamplerId>,
    pixel_samplers: BTreeMap<String, SamplerId>,
    pending_color: BTreeMap<ColorTargetId, [f32; 4]>,
    pending_depth: BTreeMap<DepthTargetId, f32>,
}

impl CommandReplay {
    pub fn new(color: ColorTargetId, depth: DepthTargetId, viewport: Viewport) -> Self {
        Self {
            color: Some(color),
            depth: Some(depth),
            viewport,
            rasterizer: None,
            depth_state: None,
            vertex_shader: None,
            pixel_shader: None,
            constants: BTreeMap::new(),
            vertex_textures: BTreeMap::new(),
            pixel_textures: BTreeMap::new(),
            vertex_samplers: BTreeMap::new(),
            pixel_samplers: BTreeMap::new(),
            pending_color: BTreeMap::new(),
            pending_depth: BTreeMap::new(),
        }
    }

    /// Drop pending clears and bindings of a released color target.
    pub fn forget_color_target(&mut self, target: ColorTargetId) {
        self.pending_color.remove(&target);
        if self.color == Some(target) {
            self.color = None;
        }
    }

    fn open(&mut self) -> Batch {
        let mut batch = Batch::new(self.color, self.depth);
        if let Some(color) = self.color {
            batch.color_clear = self.pending_color.remove(&color);
        }
        if let Some(depth) = self.depth {
            batch.depth_clear = self.pending_depth.remove(&depth);
        }
        batch
    }

    fn snapshot(&self, kind: DrawKind) -> DrawCall {
        let constants = |shader: Option<ShaderId>| {
            shader
                .and_then(|s| self.constants.get(&s).cloned())
                .unwrap_or_default()
        };
        let mut textures = self.vertex_textures.clone();
        textures.extend(self.pixel_textures.clone());
        let mut samplers = self.vertex_samplers.clone();
        samplers.extend(self.pixel_samplers.clone());
        DrawCall {
            kind,
            viewport: self.viewport,
            vertex_shader: self.vertex_shader,
            pixel_shader: self.pixel_shader,
            rasterizer: self.rasterizer,
            depth_state: self.depth_state,
            vertex_constants: constants(self.vertex_shader),
            pixel_constants: constants(self.pixel_shader),
            textures,
            samplers,
        }
    }

    /// Replay one frame's commands into passes, updating the tracked state.
    pub fn replay(&mut self, commands: &[DeviceCommand]) -> Vec<Batch> {
        let mut batches = Vec::new();
        let mut current = self.open();

        for command in commands {
            match command {
                DeviceCommand::SetRenderTargets { color, depth } => {
                    // clears of bound targets never go pending, so rebinding
                    // the same targets can keep the open pass
                    if (*color, *depth) == (current.color, current.depth) {
                        continue;
                    }
                    push(&mut batches, current);
                    self.color = *color;
                    self.depth = *depth;
                    current = self.open();
                }
                DeviceCommand::ClearColor { target, color } => {
                    if current.color == Some(*target) {
                        if !current.untouched() {
                            push(&mut batches, current);
                            current = Batch::new(self.color, self.depth);
                        }
                        current.color_clear = Some(*color);
                    } else {
                        self.pending_color.insert(*target, *color);
                    }
                }
                DeviceCommand::ClearDepth { target, depth } => {
                    if current.depth == Some(*target) {
                        if !current.untouched() {
                            push(&mut batches, current);
                            current = Batch::new(self.color, self.depth);
                        }
                        current.depth_clear = Some(*depth);
                    } else {
                        self.pending_depth.insert(*target, *depth);
                    }
                }
                DeviceCommand::SetViewport(viewport) => self.viewport = *viewport,
                DeviceCommand::SetRasterizer(state) => self.rasterizer = *state,
                DeviceCommand::SetDepthStencil(state) => self.depth_state = *state,
                DeviceCommand::SetShader { stage, shader } => match stage {
                    ShaderStage::Vertex => self.vertex_shader = *shader,
                    ShaderStage::Pixel => self.pixel_shader = *shader,
                },
                DeviceCommand::UploadConstants { shader, block } => {
                    self.constants.insert(*shader, block.clone());
                }
                DeviceCommand::BindTexture {
                    stage,
                    name,
                    texture,
                } => {
                    let table = match stage {
                        ShaderStage::Vertex => &mut self.vertex_textures,
                        ShaderStage::Pixel => &mut self.pixel_textures,
                    };
                    match texture {
                        Some(texture) => {
                            table.insert(name.clone(), *texture);
                        }
                        None => {
                            table.remove(name);
                        }
                    }
                }
                DeviceCommand::BindSampler {
                    stage,
                    name,
                    sampler,
                } => {
                    let table = match stage {
                        ShaderStage::Vertex => &mut self.vertex_samplers,
                        ShaderStage::Pixel => &mut self.pixel_samplers,
                    };
                    table.insert(name.clone(), *sampler);
                }
                DeviceCommand::DrawIndexed { mesh, index_count } => {
                    if current.overlay {
                        push(&mut batches, current);
                        current = Batch::new(self.color, self.depth);
                    }
                    current.draws.push(self.snapshot(DrawKind::Indexed {
                        mesh: *mesh,
                        index_count: *index_count,
                    }));
                }
                DeviceCommand::Draw { vertex_count } => {
                    if current.overlay {
                        push(&mut batches, current);
                        current = Batch::new(self.color, self.depth);
                    }
                    current
                        .draws
                        .push(self.snapshot(DrawKind::Vertices(*vertex_count)));
                }
                DeviceCommand::Overlay => current.overlay = true,
                // Named bindings have no slot order, so any count clears them all.
                DeviceCommand::UnbindShaderResources { stage, count } => {
                    if *count > 0 {
                        match stage {
                            ShaderStage::Vertex => self.vertex_textures.clear(),
                            ShaderStage::Pixel => self.pixel_textures.clear(),
                        }
                    }
                }
            }
        }
        push(&mut batches, current);

        for (target, color) in std::mem::take(&mut self.pending_color) {
            let mut batch = Batch::new(Some(target), None);
            batch.color_clear = Some(color);
            batches.push(batch);
        }
        for (target, depth) in std::mem::take(&mut self.pending_depth) {
            let mut batch = Batch::new(None, Some(target));
            batch.depth_clear = Some(depth);
            batches.push(batch);
        }
        batches
    }
}

fn push(batches: &mut Vec<Batch>, batch: Batch) {
    if !batch.is_empty() {
        batches.push(batch);
    }
}
