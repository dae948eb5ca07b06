use crate::device::{
    ColorTarget, ColorTargetId, DepthStencilDesc, DepthStencilId, DepthTarget, DepthTargetId,
    DeviceCommand, MeshId, RasterizerDesc, RasterizerId, RenderDevice, SamplerDesc, SamplerId,
    ShaderId, ShaderStage, TextureDesc, TextureId,
};
use crate::error::DeviceError;
use crate::mesh::Vertex;
use crate::shader::programs;
use std::collections::BTreeMap;

/// A presented frame: the swap parameters and the commands that built it.
#[derive(Debug, Clone)]
pub struct PresentedFrame {
    pub sync_interval: u32,
    pub allow_tearing: bool,
    pub commands: Vec<DeviceCommand>,
}

/// In-memory device that records everything it is asked to do.
///
/// Used headless: by tests, and by the CLI to trace a frame.
#[derive(Debug)]
pub struct RecordingDevice {
    next_id: u32,
    width: u32,
    height: u32,
    tearing: bool,
    back_buffer: ColorTargetId,
    depth_buffer: DepthTargetId,
    commands: Vec<DeviceCommand>,
    frames: Vec<PresentedFrame>,
    meshes: BTreeMap<MeshId, (usize, usize)>,
    shaders: BTreeMap<ShaderId, (ShaderStage, String)>,
    textures: BTreeMap<TextureId, TextureDesc>,
    color_targets: BTreeMap<ColorTargetId, ColorTarget>,
    depth_targets: BTreeMap<DepthTargetId, DepthTarget>,
    rasterizers: BTreeMap<RasterizerId, RasterizerDesc>,
    depth_states: BTreeMap<DepthStencilId, DepthStencilDesc>,
    samplers: BTreeMap<SamplerId, SamplerDesc>,
    /// Programs bound as of the last present; binds outlive frames.
    vertex_shader: Option<ShaderId>,
    pixel_shader: Option<ShaderId>,
}

impl RecordingDevice {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            next_id: 2,
            width,
            height,
            tearing: false,
            back_buffer: ColorTargetId(0),
            depth_buffer: DepthTargetId(1),
            commands: Vec::new(),
            frames: Vec::new(),
            meshes: BTreeMap::new(),
            shaders: BTreeMap::new(),
            textures: BTreeMap::new(),
            color_targets: BTreeMap::new(),
            depth_targets: BTreeMap::new(),
            rasterizers: BTreeMap::new(),
            depth_states: BTreeMap::new(),
            samplers: BTreeMap::new(),
            vertex_shader: None,
            pixel_shader: None,
        }
    }

    /// Report tearing support, as a flip-model swap chain would.
    pub fn with_tearing(mut self, supported: bool) -> Self {
        self.tearing = supported;
        self
    }

    fn next(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Commands recorded since the last present or `take_commands`.
    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DeviceCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn frames(&self) -> &[PresentedFrame] {
        &self.frames
    }

    pub fn mesh_sizes(&self, mesh: MeshId) -> Option<(usize, usize)> {
        self.meshes.get(&mesh).copied()
    }

    pub fn shader_name(&self, shader: ShaderId) -> Option<&str> {
        self.shaders.get(&shader).map(|(_, name)| name.as_str())
    }

    pub fn texture(&self, texture: TextureId) -> Option<&TextureDesc> {
        self.textures.get(&texture)
    }

    /// Offscreen color targets still alive.
    pub fn live_color_targets(&self) -> Vec<ColorTarget> {
        self.color_targets.values().copied().collect()
    }

    pub fn depth_target(&self, target: DepthTargetId) -> Option<&DepthTarget> {
        self.depth_targets.get(&target)
    }

    pub fn rasterizer(&self, state: RasterizerId) -> Option<&RasterizerDesc> {
        self.rasterizers.get(&state)
    }

    pub fn depth_state(&self, state: DepthStencilId) -> Option<&DepthStencilDesc> {
        self.depth_states.get(&state)
    }

    pub fn sampler(&self, sampler: SamplerId) -> Option<&SamplerDesc> {
        self.samplers.get(&sampler)
    }

    fn family(&self, shader: ShaderId) -> Option<&'static str> {
        let (_, name) = self.shaders.get(&shader)?;
        programs::resolve(name).map(|(_, family)| family)
    }

    /// Walk a frame's binds and reject any draw whose pixel program belongs
    /// to another family than its vertex program.
    fn check_program_pairs(&mut self, commands: &[DeviceCommand]) -> Result<(), DeviceError> {
        for command in commands {
            match command {
                DeviceCommand::SetShader { stage, shader } => match stage {
                    ShaderStage::Vertex => self.vertex_shader = *shader,
                    ShaderStage::Pixel => self.pixel_shader = *shader,
                },
                DeviceCommand::Draw { .. } | DeviceCommand::DrawIndexed { .. } => {
                    let (Some(vs), Some(ps)) = (self.vertex_shader, self.pixel_shader) else {
                        continue;
                    };
                    if self.family(vs) != self.family(ps) {
                        let name =
                            |id: ShaderId| self.shader_name(id).unwrap_or("unknown").to_string();
                        return Err(DeviceError::ProgramMismatch {
                            vertex: name(vs),
                            pixel: name(ps),
                        });
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl RenderDevice for RecordingDevice {
    fn create_mesh(&mut self, vertices: &[Vertex], indices: &[u32]) -> Result<MeshId, DeviceError> {
        let id = MeshId(self.next());
        self.meshes.insert(id, (vertices.len(), indices.len()));
        Ok(id)
    }

    fn create_shader(&mut self, stage: ShaderStage, name: &str) -> Result<ShaderId, DeviceError> {
        match programs::resolve(name) {
            Some((s, _)) if s == stage => {}
            _ => return Err(DeviceError::UnknownShader(name.to_string())),
        }
        let id = ShaderId(self.next());
        self.shaders.insert(id, (stage, name.to_string()));
        Ok(id)
    }

    fn create_texture(
        &mut self,
        desc: &TextureDesc,
        data: &[u8],
    ) -> Result<TextureId, DeviceError> {
        if data.len() != desc.byte_len() {
            return Err(DeviceError::TextureData {
                expected: desc.byte_len(),
                actual: data.len(),
            });
        }
        let id = TextureId(self.next());
        self.textures.insert(id, desc.clone());
        Ok(id)
    }

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerId, DeviceError> {
        let id = SamplerId(self.next());
        self.samplers.insert(id, *desc);
        Ok(id)
    }

    fn create_rasterizer_state(
        &mut self,
        desc: &RasterizerDesc,
    ) -> Result<RasterizerId, DeviceError> {
        let id = RasterizerId(self.next());
        self.rasterizers.insert(id, *desc);
        Ok(id)
    }

    fn create_depth_stencil_state(
        &mut self,
        desc: &DepthStencilDesc,
    ) -> Result<DepthStencilId, DeviceError> {
        let id = DepthStencilId(self.next());
        self.depth_states.insert(id, *desc);
        Ok(id)
    }

    fn create_color_target(
        &mut self,
        _label: &str,
        width: u32,
        height: u32,
    ) -> Result<ColorTarget, DeviceError> {
        let target = ColorTarget {
            target: ColorTargetId(self.next()),
            texture: TextureId(self.next()),
            width,
            height,
        };
        self.color_targets.insert(target.target, target);
        Ok(target)
    }

    fn create_depth_target(
        &mut self,
        _label: &str,
        width: u32,
        height: u32,
        sampled: bool,
    ) -> Result<DepthTarget, DeviceError> {
        let target = DepthTargetId(self.next());
        let texture = sampled.then(|| TextureId(self.next()));
        let depth = DepthTarget {
            target,
            texture,
            width,
            height,
        };
        self.depth_targets.insert(target, depth);
        Ok(depth)
    }

    fn release_color_target(&mut self, target: ColorTarget) {
        self.color_targets.remove(&target.target);
    }

    fn back_buffer(&self) -> ColorTargetId {
        self.back_buffer
    }

    fn depth_buffer(&self) -> DepthTargetId {
        self.depth_buffer
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn supports_tearing(&self) -> bool {
        self.tearing
    }

    fn resize_surface(&mut self, width: u32, height: u32) -> Result<(), DeviceError> {
        self.width = width;
        self.height = height;
        Ok(())
    }

    fn record(&mut self, command: DeviceCommand) {
        self.commands.push(command);
    }

    fn present(&mut self, sync_interval: u32, allow_tearing: bool) -> Result<(), DeviceError> {
        let commands = self.take_commands();
        self.check_program_pairs(&commands)?;
        self.frames.push(PresentedFrame {
            sync_interval,
            allow_tearing,
            commands,
        });
        Ok(())
    }
}
