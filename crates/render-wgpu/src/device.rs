use crate::error::BackendError;
use crate::preview::DepthPreview;
use crate::replay::{Batch, CommandReplay, DrawCall, DrawKind};
use crate::shaders::{BindingKind, Program, TextureSlot};
use crate::uniforms;
use prism_render::device::{
    AddressMode, ColorTarget, ColorTargetId, CompareFunction, CullMode, DepthStencilDesc,
    DepthStencilId, DepthTarget, DepthTargetId, FilterMode, MeshId, RasterizerDesc, RasterizerId,
    SamplerDesc, SamplerId, ShaderId, TextureDesc, TextureFormat, TextureId, TextureKind, Viewport,
};
use prism_render::{DeviceCommand, DeviceError, RenderDevice, ShaderStage, Vertex};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use wgpu::util::DeviceExt;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const BACK_BUFFER: ColorTargetId = ColorTargetId(0);
const DEPTH_BUFFER: DepthTargetId = DepthTargetId(1);

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
    0 => Float32x3,
    1 => Float32x3,
    2 => Float32x2,
    3 => Float32x3,
];

/// GPU handles an overlay painter draws with.
pub struct OverlayContext<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub format: wgpu::TextureFormat,
    pub size: (u32, u32),
}

/// Paints UI on top of the back buffer when the frame reaches its overlay
/// pass. The painter must load, not clear, the target.
pub trait OverlayPainter {
    fn paint(
        &mut self,
        gpu: &OverlayContext<'_>,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
    );
}

impl<T: OverlayPainter> OverlayPainter for Rc<RefCell<T>> {
    fn paint(
        &mut self,
        gpu: &OverlayContext<'_>,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
    ) {
        self.borrow_mut().paint(gpu, encoder, target);
    }
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
}

struct GpuShader {
    program: Program,
    stage: ShaderStage,
    name: String,
}

struct GpuTexture {
    view: wgpu::TextureView,
    slot: TextureSlot,
}

struct GpuSampler {
    sampler: wgpu::Sampler,
    comparison: bool,
}

struct GpuColorTarget {
    view: wgpu::TextureView,
    format: wgpu::TextureFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PipelineKey {
    program: Program,
    rasterizer: Option<RasterizerId>,
    depth_state: Option<DepthStencilId>,
    /// `None` builds a depth-only pipeline without a fragment stage.
    color_format: Option<wgpu::TextureFormat>,
    depth: bool,
}

struct PreparedDraw {
    key: PipelineKey,
    bind_group: wgpu::BindGroup,
    kind: DrawKind,
    viewport: Viewport,
}

/// [`RenderDevice`] over a wgpu surface.
///
/// Commands are buffered and replayed at [`RenderDevice::present`]: grouped
/// into render passes, each draw gets a pipeline from a cache keyed by its
/// program and fixed-function state, and a bind group built from its named
/// parameters, textures and samplers.
pub struct WgpuDevice {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    tearing: bool,
    depth_view: wgpu::TextureView,
    modules: HashMap<Program, wgpu::ShaderModule>,
    layouts: HashMap<Program, (wgpu::BindGroupLayout, wgpu::PipelineLayout)>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    next_id: u32,
    meshes: HashMap<MeshId, GpuMesh>,
    shaders: HashMap<ShaderId, GpuShader>,
    textures: HashMap<TextureId, GpuTexture>,
    samplers: HashMap<SamplerId, GpuSampler>,
    rasterizers: HashMap<RasterizerId, RasterizerDesc>,
    depth_states: HashMap<DepthStencilId, DepthStencilDesc>,
    color_targets: HashMap<ColorTargetId, GpuColorTarget>,
    depth_targets: HashMap<DepthTargetId, wgpu::TextureView>,
    commands: Vec<DeviceCommand>,
    replay: CommandReplay,
    overlay: Option<Box<dyn OverlayPainter>>,
    depth_preview: Option<DepthPreview>,
}

impl WgpuDevice {
    /// Bring up an adapter, device and swap chain for `target`.
    pub async fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> Result<Self, BackendError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(target)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(BackendError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("prism_device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or(BackendError::NoSurfaceFormat)?;
        let tearing = caps.present_modes.contains(&wgpu::PresentMode::Immediate);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let mut modules = HashMap::new();
        let mut layouts = HashMap::new();
        for program in Program::ALL {
            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(program.label()),
                source: wgpu::ShaderSource::Wgsl(program.source().into()),
            });
            let bind_group_layout = create_bind_group_layout(&device, program);
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(program.label()),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });
            modules.insert(program, module);
            layouts.insert(program, (bind_group_layout, pipeline_layout));
        }

        let depth_view =
            create_depth_view(&device, "depth_buffer", config.width, config.height, false);

        tracing::info!(
            backend = adapter.get_info().backend.to_str(),
            ?format,
            tearing,
            "GPU initialized"
        );

        Ok(Self {
            replay: CommandReplay::new(
                BACK_BUFFER,
                DEPTH_BUFFER,
                Viewport::sized(config.width, config.height),
            ),
            surface,
            device,
            queue,
            config,
            tearing,
            depth_view,
            modules,
            layouts,
            pipelines: HashMap::new(),
            next_id: 2,
            meshes: HashMap::new(),
            shaders: HashMap::new(),
            textures: HashMap::new(),
            samplers: HashMap::new(),
            rasterizers: HashMap::new(),
            depth_states: HashMap::new(),
            color_targets: HashMap::new(),
            depth_targets: HashMap::new(),
            commands: Vec::new(),
            overlay: None,
            depth_preview: None,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Install the painter that runs at each frame's overlay pass.
    pub fn set_overlay(&mut self, painter: impl OverlayPainter + 'static) {
        self.overlay = Some(Box::new(painter));
    }

    /// Keep a color copy of `target` that UI code can display, refreshed
    /// after every pass that renders into it. The target must be sampled.
    pub fn enable_depth_preview(&mut self, target: &DepthTarget) -> Result<(), BackendError> {
        let view = target
            .texture
            .and_then(|id| self.textures.get(&id))
            .map(|texture| &texture.view)
            .ok_or(BackendError::UnsampledDepthTarget(target.target.0))?;
        let preview = DepthPreview::new(
            &self.device,
            target.target,
            view,
            target.width,
            target.height,
        );
        tracing::debug!(
            target = target.target.0,
            width = target.width,
            height = target.height,
            "depth preview enabled"
        );
        self.depth_preview = Some(preview);
        Ok(())
    }

    /// The color copy kept by [`Self::enable_depth_preview`].
    pub fn depth_preview(&self) -> Option<&wgpu::TextureView> {
        self.depth_preview.as_ref().map(DepthPreview::view)
    }

    fn next(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn color_format(&self, target: ColorTargetId) -> Result<wgpu::TextureFormat, DeviceError> {
        if target == BACK_BUFFER {
            return Ok(self.config.format);
        }
        self.color_targets
            .get(&target)
            .map(|t| t.format)
            .ok_or_else(|| DeviceError::MissingResource(format!("color target {}", target.0)))
    }

    fn ensure_pipeline(&mut self, key: PipelineKey) -> Result<(), DeviceError> {
        if self.pipelines.contains_key(&key) {
            return Ok(());
        }
        let raster = match key.rasterizer {
            Some(id) => *self.rasterizers.get(&id).ok_or_else(|| {
                DeviceError::MissingResource(format!("rasterizer state {}", id.0))
            })?,
            None => RasterizerDesc::default(),
        };
        let depth = match key.depth_state {
            Some(id) => *self.depth_states.get(&id).ok_or_else(|| {
                DeviceError::MissingResource(format!("depth-stencil state {}", id.0))
            })?,
            None => DepthStencilDesc::default(),
        };
        let missing = || DeviceError::MissingResource(format!("{} program", key.program.label()));
        let module = self.modules.get(&key.program).ok_or_else(missing)?;
        let (_, layout) = self.layouts.get(&key.program).ok_or_else(missing)?;

        let vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &VERTEX_ATTRIBUTES,
        };
        let buffers: &[wgpu::VertexBufferLayout] = if key.program.uses_mesh() {
            std::slice::from_ref(&vertex_layout)
        } else {
            &[]
        };
        let targets = [key.color_format.map(|format| wgpu::ColorTargetState {
            format,
            blend: Some(wgpu::BlendState::REPLACE),
            write_mask: wgpu::ColorWrites::ALL,
        })];

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(key.program.label()),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers,
                },
                fragment: key.color_format.map(|_| wgpu::FragmentState {
                    module,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &targets,
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Cw,
                    cull_mode: cull_face(raster.cull),
                    ..Default::default()
                },
                depth_stencil: key.depth.then(|| wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: depth.depth_write,
                    depth_compare: compare_function(depth.depth_compare),
                    stencil: Default::default(),
                    bias: wgpu::DepthBiasState {
                        constant: raster.depth_bias,
                        slope_scale: raster.slope_scaled_depth_bias,
                        clamp: 0.0,
                    },
                }),
                multisample: Default::default(),
                multiview: None,
                cache: None,
            });
        tracing::debug!(
            program = key.program.label(),
            color = ?key.color_format,
            depth = key.depth,
            "pipeline created"
        );
        self.pipelines.insert(key, pipeline);
        Ok(())
    }

    fn uniform_buffer(&self, label: &str, bytes: &[u8]) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytes,
                usage: wgpu::BufferUsages::UNIFORM,
            })
    }

    fn prepare_draw(
        &mut self,
        draw: &DrawCall,
        color_format: Option<wgpu::TextureFormat>,
        has_depth: bool,
    ) -> Result<PreparedDraw, DeviceError> {
        let vs = draw
            .vertex_shader
            .ok_or_else(|| DeviceError::MissingResource("vertex program".into()))?;
        let program = match self.shaders.get(&vs) {
            Some(shader) if shader.stage == ShaderStage::Vertex => shader.program,
            _ => return Err(DeviceError::MissingResource(format!("vertex program {}", vs.0))),
        };
        match draw.pixel_shader.map(|ps| self.shaders.get(&ps)) {
            None => {
                if color_format.is_some() {
                    return Err(BackendError::MissingPixelProgram.into());
                }
            }
            Some(Some(shader))
                if shader.stage == ShaderStage::Pixel && shader.program == program => {}
            Some(shader) => {
                return Err(BackendError::ProgramMismatch {
                    program: program.label(),
                    pixel: shader.map_or_else(|| "unknown".to_string(), |s| s.name.clone()),
                }
                .into());
            }
        }
        if color_format.is_some() && !program.has_fragment() {
            return Err(BackendError::MissingPixelProgram.into());
        }
        if let DrawKind::Indexed { mesh, .. } = draw.kind {
            if !self.meshes.contains_key(&mesh) {
                return Err(DeviceError::MissingResource(format!("mesh {}", mesh.0)));
            }
        }

        let key = PipelineKey {
            program,
            rasterizer: draw.rasterizer,
            depth_state: draw.depth_state,
            color_format,
            depth: has_depth,
        };
        self.ensure_pipeline(key)?;

        let vertex_uniforms = uniforms::vertex_bytes(program, &draw.vertex_constants)
            .map(|bytes| self.uniform_buffer("vertex_uniforms", &bytes));
        let pixel_uniforms = uniforms::pixel_bytes(program, &draw.pixel_constants)
            .map(|bytes| self.uniform_buffer("pixel_uniforms", &bytes));

        let missing =
            |name: &str| DeviceError::MissingResource(format!("{name} for {}", program.label()));
        let mut entries = Vec::with_capacity(program.bindings().len());
        for (index, binding) in program.bindings().iter().enumerate() {
            let resource = match binding.kind {
                BindingKind::VertexUniforms => vertex_uniforms
                    .as_ref()
                    .ok_or_else(|| missing(binding.name))?
                    .as_entire_binding(),
                BindingKind::PixelUniforms => pixel_uniforms
                    .as_ref()
                    .ok_or_else(|| missing(binding.name))?
                    .as_entire_binding(),
                BindingKind::Texture(slot) => {
                    let texture = draw
                        .textures
                        .get(binding.name)
                        .and_then(|id| self.textures.get(id))
                        .ok_or_else(|| missing(binding.name))?;
                    if texture.slot != slot {
                        return Err(BackendError::BindingMismatch {
                            name: binding.name.to_string(),
                            expected: slot.label(),
                        }
                        .into());
                    }
                    wgpu::BindingResource::TextureView(&texture.view)
                }
                BindingKind::Sampler { comparison } => {
                    let sampler = draw
                        .samplers
                        .get(binding.name)
                        .and_then(|id| self.samplers.get(id))
                        .ok_or_else(|| missing(binding.name))?;
                    if sampler.comparison != comparison {
                        return Err(BackendError::BindingMismatch {
                            name: binding.name.to_string(),
                            expected: if comparison {
                                "comparison sampler"
                            } else {
                                "filtering sampler"
                            },
                        }
                        .into());
                    }
                    wgpu::BindingResource::Sampler(&sampler.sampler)
                }
            };
            entries.push(wgpu::BindGroupEntry {
                binding: index as u32,
                resource,
            });
        }

        let (layout, _) = self
            .layouts
            .get(&program)
            .ok_or_else(|| missing("bind group layout"))?;
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(program.label()),
            layout,
            entries: &entries,
        });

        Ok(PreparedDraw {
            key,
            bind_group,
            kind: draw.kind,
            viewport: draw.viewport,
        })
    }

    fn encode_batch(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        batch: &Batch,
        back_buffer: &wgpu::TextureView,
    ) -> Result<(), DeviceError> {
        let color_format = batch.color.map(|id| self.color_format(id)).transpose()?;
        let prepared = batch
            .draws
            .iter()
            .map(|draw| self.prepare_draw(draw, color_format, batch.depth.is_some()))
            .collect::<Result<Vec<_>, _>>()?;

        let color_view = match batch.color {
            Some(BACK_BUFFER) => Some(back_buffer),
            Some(id) => Some(
                &self
                    .color_targets
                    .get(&id)
                    .ok_or_else(|| DeviceError::MissingResource(format!("color target {}", id.0)))?
                    .view,
            ),
            None => None,
        };
        let depth_view = match batch.depth {
            Some(DEPTH_BUFFER) => Some(&self.depth_view),
            Some(id) => Some(self.depth_targets.get(&id).ok_or_else(|| {
                DeviceError::MissingResource(format!("depth target {}", id.0))
            })?),
            None => None,
        };

        {
            let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = color_view
                .map(|view| {
                    Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: match batch.color_clear {
                                Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
                                    r: r as f64,
                                    g: g as f64,
                                    b: b as f64,
                                    a: a as f64,
                                }),
                                None => wgpu::LoadOp::Load,
                            },
                            store: wgpu::StoreOp::Store,
                        },
                    })
                })
                .into_iter()
                .collect();

            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("batch_pass"),
                color_attachments: &color_attachments,
                depth_stencil_attachment: depth_view.map(|view| {
                    wgpu::RenderPassDepthStencilAttachment {
                        view,
                        depth_ops: Some(wgpu::Operations {
                            load: batch.depth_clear.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }
                }),
                ..Default::default()
            });

            for draw in &prepared {
                let Some(pipeline) = self.pipelines.get(&draw.key) else {
                    continue;
                };
                let v = draw.viewport;
                pass.set_pipeline(pipeline);
                pass.set_viewport(v.x, v.y, v.width, v.height, v.min_depth, v.max_depth);
                pass.set_bind_group(0, &draw.bind_group, &[]);
                match draw.kind {
                    DrawKind::Indexed { mesh, index_count } => {
                        let Some(mesh) = self.meshes.get(&mesh) else {
                            continue;
                        };
                        pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                        pass.set_index_buffer(
                            mesh.index_buffer.slice(..),
                            wgpu::IndexFormat::Uint32,
                        );
                        pass.draw_indexed(0..index_count, 0, 0..1);
                    }
                    DrawKind::Vertices(count) => pass.draw(0..count, 0..1),
                }
            }
        }

        if batch.overlay {
            if let (Some(painter), Some(target)) = (self.overlay.as_mut(), color_view) {
                let gpu = OverlayContext {
                    device: &self.device,
                    queue: &self.queue,
                    format: self.config.format,
                    size: (self.config.width, self.config.height),
                };
                painter.paint(&gpu, encoder, target);
            }
        }
        Ok(())
    }
}

impl RenderDevice for WgpuDevice {
    fn create_mesh(&mut self, vertices: &[Vertex], indices: &[u32]) -> Result<MeshId, DeviceError> {
        let id = MeshId(self.next());
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh_vertices"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh_indices"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        self.meshes.insert(
            id,
            GpuMesh {
                vertex_buffer,
                index_buffer,
            },
        );
        Ok(id)
    }

    fn create_shader(&mut self, stage: ShaderStage, name: &str) -> Result<ShaderId, DeviceError> {
        let program = match Program::resolve(name) {
            Some((program, s)) if s == stage => program,
            _ => return Err(DeviceError::UnknownShader(name.to_string())),
        };
        let id = ShaderId(self.next());
        self.shaders.insert(
            id,
            GpuShader {
                program,
                stage,
                name: name.to_string(),
            },
        );
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
        if desc.width == 0 || desc.height == 0 {
            return Err(DeviceError::Backend(format!("texture {} has no texels", desc.label)));
        }
        let format = match desc.format {
            TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
            TextureFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        };
        let texture = self.device.create_texture_with_data(
            &self.queue,
            &wgpu::TextureDescriptor {
                label: Some(&desc.label),
                size: wgpu::Extent3d {
                    width: desc.width,
                    height: desc.height,
                    depth_or_array_layers: desc.layer_count(),
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );
        let (dimension, slot) = match desc.kind {
            TextureKind::D2 => (wgpu::TextureViewDimension::D2, TextureSlot::Color),
            TextureKind::Cube => (wgpu::TextureViewDimension::Cube, TextureSlot::Cube),
        };
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            dimension: Some(dimension),
            ..Default::default()
        });
        let id = TextureId(self.next());
        self.textures.insert(id, GpuTexture { view, slot });
        tracing::debug!(label = %desc.label, id = id.0, "texture uploaded");
        Ok(id)
    }

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerId, DeviceError> {
        let address = address_mode(desc.address);
        let (filter, anisotropy_clamp) = filter_mode(desc.filter);
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("sampler"),
            address_mode_u: address,
            address_mode_v: address,
            address_mode_w: address,
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter: filter,
            compare: desc.compare.map(compare_function),
            anisotropy_clamp,
            ..Default::default()
        });
        let id = SamplerId(self.next());
        self.samplers.insert(
            id,
            GpuSampler {
                sampler,
                comparison: desc.compare.is_some(),
            },
        );
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
        label: &str,
        width: u32,
        height: u32,
    ) -> Result<ColorTarget, DeviceError> {
        let format = self.config.format;
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let target = ColorTarget {
            target: ColorTargetId(self.next()),
            texture: TextureId(self.next()),
            width,
            height,
        };
        self.color_targets.insert(
            target.target,
            GpuColorTarget {
                view: texture.create_view(&Default::default()),
                format,
            },
        );
        self.textures.insert(
            target.texture,
            GpuTexture {
                view: texture.create_view(&Default::default()),
                slot: TextureSlot::Color,
            },
        );
        Ok(target)
    }

    fn create_depth_target(
        &mut self,
        label: &str,
        width: u32,
        height: u32,
        sampled: bool,
    ) -> Result<DepthTarget, DeviceError> {
        let texture = create_depth_texture(&self.device, label, width, height, sampled);
        let target = DepthTarget {
            target: DepthTargetId(self.next()),
            texture: sampled.then(|| TextureId(self.next())),
            width,
            height,
        };
        self.depth_targets
            .insert(target.target, texture.create_view(&Default::default()));
        if let Some(id) = target.texture {
            self.textures.insert(
                id,
                GpuTexture {
                    view: texture.create_view(&Default::default()),
                    slot: TextureSlot::Depth,
                },
            );
        }
        Ok(target)
    }

    fn release_color_target(&mut self, target: ColorTarget) {
        self.color_targets.remove(&target.target);
        self.textures.remove(&target.texture);
        self.replay.forget_color_target(target.target);
    }

    fn back_buffer(&self) -> ColorTargetId {
        BACK_BUFFER
    }

    fn depth_buffer(&self) -> DepthTargetId {
        DEPTH_BUFFER
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn supports_tearing(&self) -> bool {
        self.tearing
    }

    fn resize_surface(&mut self, width: u32, height: u32) -> Result<(), DeviceError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_view(&self.device, "depth_buffer", width, height, false);
        tracing::debug!(width, height, "swap chain resized");
        Ok(())
    }

    fn record(&mut self, command: DeviceCommand) {
        self.commands.push(command);
    }

    fn present(&mut self, sync_interval: u32, allow_tearing: bool) -> Result<(), DeviceError> {
        let present_mode = present_mode(sync_interval, allow_tearing, self.tearing);
        if present_mode != self.config.present_mode {
            self.config.present_mode = present_mode;
            self.surface.configure(&self.device, &self.config);
            tracing::debug!(?present_mode, "present mode changed");
        }

        let commands = std::mem::take(&mut self.commands);
        let batches = self.replay.replay(&commands);

        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                tracing::warn!("surface outdated, frame dropped");
                return Ok(());
            }
            Err(e) => return Err(DeviceError::Surface(e.to_string())),
        };
        let back_buffer = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });
        for batch in &batches {
            self.encode_batch(&mut encoder, batch, &back_buffer)?;
            if let Some(preview) = &self.depth_preview {
                if preview.follows(batch.depth) {
                    preview.encode(&mut encoder);
                }
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        tracing::trace!(passes = batches.len(), "frame submitted");
        Ok(())
    }
}

fn create_bind_group_layout(device: &wgpu::Device, program: Program) -> wgpu::BindGroupLayout {
    let entries: Vec<wgpu::BindGroupLayoutEntry> = program
        .bindings()
        .iter()
        .enumerate()
        .map(|(index, binding)| wgpu::BindGroupLayoutEntry {
            binding: index as u32,
            visibility: match binding.kind {
                BindingKind::VertexUniforms => wgpu::ShaderStages::VERTEX,
                _ => wgpu::ShaderStages::FRAGMENT,
            },
            ty: match binding.kind {
                BindingKind::VertexUniforms | BindingKind::PixelUniforms => {
                    wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    }
                }
                BindingKind::Texture(slot) => wgpu::BindingType::Texture {
                    sample_type: match slot {
                        TextureSlot::Depth => wgpu::TextureSampleType::Depth,
                        TextureSlot::Color | TextureSlot::Cube => {
                            wgpu::TextureSampleType::Float { filterable: true }
                        }
                    },
                    view_dimension: match slot {
                        TextureSlot::Cube => wgpu::TextureViewDimension::Cube,
                        TextureSlot::Color | TextureSlot::Depth => wgpu::TextureViewDimension::D2,
                    },
                    multisampled: false,
                },
                BindingKind::Sampler { comparison } => wgpu::BindingType::Sampler(if comparison {
                    wgpu::SamplerBindingType::Comparison
                } else {
                    wgpu::SamplerBindingType::Filtering
                }),
            },
            count: None,
        })
        .collect();
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(program.label()),
        entries: &entries,
    })
}

fn create_depth_texture(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    sampled: bool,
) -> wgpu::Texture {
    let mut usage = wgpu::TextureUsages::RENDER_ATTACHMENT;
    if sampled {
        usage |= wgpu::TextureUsages::TEXTURE_BINDING;
    }
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage,
        view_formats: &[],
    })
}

fn create_depth_view(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    sampled: bool,
) -> wgpu::TextureView {
    create_depth_texture(device, label, width, height, sampled).create_view(&Default::default())
}

/// Border addressing clamps; the lit program treats reads outside the
/// shadow map as lit itself.
fn address_mode(mode: AddressMode) -> wgpu::AddressMode {
    match mode {
        AddressMode::Wrap => wgpu::AddressMode::Repeat,
        AddressMode::Clamp | AddressMode::Border => wgpu::AddressMode::ClampToEdge,
    }
}

fn filter_mode(mode: FilterMode) -> (wgpu::FilterMode, u16) {
    match mode {
        FilterMode::Point => (wgpu::FilterMode::Nearest, 1),
        FilterMode::Linear => (wgpu::FilterMode::Linear, 1),
        FilterMode::Anisotropic(max) => (wgpu::FilterMode::Linear, max.clamp(1, 16)),
    }
}

fn compare_function(function: CompareFunction) -> wgpu::CompareFunction {
    match function {
        CompareFunction::Never => wgpu::CompareFunction::Never,
        CompareFunction::Less => wgpu::CompareFunction::Less,
        CompareFunction::LessEqual => wgpu::CompareFunction::LessEqual,
        CompareFunction::Equal => wgpu::CompareFunction::Equal,
        CompareFunction::Greater => wgpu::CompareFunction::Greater,
        CompareFunction::Always => wgpu::CompareFunction::Always,
    }
}

fn cull_face(mode: CullMode) -> Option<wgpu::Face> {
    match mode {
        CullMode::None => None,
        CullMode::Front => Some(wgpu::Face::Front),
        CullMode::Back => Some(wgpu::Face::Back),
    }
}

/// Swap interval 0 with tearing allowed presents immediately when the
/// surface can; everything else waits for vertical blank.
fn present_mode(
    sync_interval: u32,
    allow_tearing: bool,
    tearing_supported: bool,
) -> wgpu::PresentMode {
    if sync_interval == 0 && allow_tearing && tearing_supported {
        wgpu::PresentMode::Immediate
    } else {
        wgpu::PresentMode::Fifo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn present_mode_follows_sync_parameters() {
        assert_eq!(present_mode(0, true, true), wgpu::PresentMode::Immediate);
        assert_eq!(present_mode(1, false, true), wgpu::PresentMode::Fifo);
        assert_eq!(present_mode(0, true, false), wgpu::PresentMode::Fifo);
    }

    #[test]
    fn anisotropy_is_clamped_to_wgpu_range() {
        assert_eq!(filter_mode(FilterMode::Anisotropic(64)), (wgpu::FilterMode::Linear, 16));
        assert_eq!(filter_mode(FilterMode::Anisotropic(0)), (wgpu::FilterMode::Linear, 1));
        assert_eq!(filter_mode(FilterMode::Point), (wgpu::FilterMode::Nearest, 1));
    }

    #[test]
    fn border_addressing_clamps() {
        assert_eq!(address_mode(AddressMode::Border), wgpu::AddressMode::ClampToEdge);
        assert_eq!(address_mode(AddressMode::Wrap), wgpu::AddressMode::Repeat);
    }

    #[test]
    fn cull_modes_map() {
        assert_eq!(cull_face(CullMode::None), None);
        assert_eq!(cull_face(CullMode::Front), Some(wgpu::Face::Front));
    }

    #[test]
    fn vertex_layout_covers_the_vertex() {
        let last = VERTEX_ATTRIBUTES[3];
        assert_eq!(
            last.offset + last.format.size(),
            std::mem::size_of::<Vertex>() as u64
        );
    }
}
