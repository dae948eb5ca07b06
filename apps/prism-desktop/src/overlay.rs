use prism_render_wgpu::{OverlayContext, OverlayPainter};

/// Tessellated egui output waiting for the frame's overlay pass.
struct PendingFrame {
    paint_jobs: Vec<egui::ClippedPrimitive>,
    textures_delta: egui::TexturesDelta,
    screen: egui_wgpu::ScreenDescriptor,
}

/// Paints the inspector UI when the device reaches the overlay pass.
pub struct EguiOverlay {
    renderer: egui_wgpu::Renderer,
    pending: Option<PendingFrame>,
}

impl EguiOverlay {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        Self {
            renderer: egui_wgpu::Renderer::new(device, format, None, 1, false),
            pending: None,
        }
    }

    /// Make a GPU texture drawable from egui, e.g. with `egui::Image`.
    pub fn register_texture(
        &mut self,
        device: &wgpu::Device,
        view: &wgpu::TextureView,
    ) -> egui::TextureId {
        self.renderer
            .register_native_texture(device, view, wgpu::FilterMode::Linear)
    }

    /// Queue this frame's UI. Texture updates of a frame that was never
    /// painted carry over so the font atlas is not lost.
    pub fn submit(
        &mut self,
        paint_jobs: Vec<egui::ClippedPrimitive>,
        mut textures_delta: egui::TexturesDelta,
        screen: egui_wgpu::ScreenDescriptor,
    ) {
        if let Some(stale) = self.pending.take() {
            let mut carried = stale.textures_delta;
            carried.append(textures_delta);
            textures_delta = carried;
        }
        self.pending = Some(PendingFrame {
            paint_jobs,
            textures_delta,
            screen,
        });
    }
}

impl OverlayPainter for EguiOverlay {
    fn paint(
        &mut self,
        gpu: &OverlayContext<'_>,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
    ) {
        let Some(frame) = self.pending.take() else {
            return;
        };
        for (id, image_delta) in &frame.textures_delta.set {
            self.renderer
                .update_texture(gpu.device, gpu.queue, *id, image_delta);
        }
        self.renderer.update_buffers(
            gpu.device,
            gpu.queue,
            encoder,
            &frame.paint_jobs,
            &frame.screen,
        );
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: target,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();
            self.renderer
                .render(&mut pass, &frame.paint_jobs, &frame.screen);
        }
        for id in &frame.textures_delta.free {
            self.renderer.free_texture(id);
        }
    }
}
