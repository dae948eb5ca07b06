use crate::device::{
    ColorTargetId, DepthTargetId, DeviceCommand, RasterizerId, RenderDevice, ShaderStage, Viewport,
};

/// What a pass draws once its state is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Scene depth from the shadow-casting light.
    ShadowDepth,
    /// Lit entities.
    MainColor,
    Sky,
    /// Full-screen blur of the offscreen color target.
    PostProcess,
    /// UI overlay on the back buffer.
    Overlay,
}

/// State a pass needs before its objects are drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct PassDescriptor {
    pub name: &'static str,
    pub kind: PassKind,
    pub color: Option<ColorTargetId>,
    pub depth: Option<DepthTargetId>,
    pub viewport: Viewport,
    /// `None` is the default rasterizer state.
    pub rasterizer: Option<RasterizerId>,
    pub disable_pixel_shader: bool,
    pub color_clears: Vec<(ColorTargetId, [f32; 4])>,
    pub depth_clear: Option<(DepthTargetId, f32)>,
}

impl PassDescriptor {
    pub fn new(
        name: &'static str,
        kind: PassKind,
        color: Option<ColorTargetId>,
        depth: Option<DepthTargetId>,
        viewport: Viewport,
    ) -> Self {
        Self {
            name,
            kind,
            color,
            depth,
            viewport,
            rasterizer: None,
            disable_pixel_shader: false,
            color_clears: Vec::new(),
            depth_clear: None,
        }
    }

    pub fn with_rasterizer(mut self, rasterizer: RasterizerId) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    pub fn without_pixel_shader(mut self) -> Self {
        self.disable_pixel_shader = true;
        self
    }

    pub fn clear_color(mut self, target: ColorTargetId, color: [f32; 4]) -> Self {
        self.color_clears.push((target, color));
        self
    }

    pub fn clear_depth(mut self, target: DepthTargetId, depth: f32) -> Self {
        self.depth_clear = Some((target, depth));
        self
    }

    /// Bind targets, then set rasterizer and viewport, then clear.
    pub fn apply(&self, device: &mut dyn RenderDevice) {
        device.set_render_targets(self.color, self.depth);
        device.set_rasterizer(self.rasterizer);
        device.set_viewport(self.viewport);
        for (target, color) in &self.color_clears {
            device.clear_color(*target, *color);
        }
        if let Some((target, depth)) = self.depth_clear {
            device.clear_depth(target, depth);
        }
        if self.disable_pixel_shader {
            device.record(DeviceCommand::SetShader {
                stage: ShaderStage::Pixel,
                shader: None,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingDevice;

    #[test]
    fn apply_binds_targets_before_clearing() {
        let mut device = RecordingDevice::new(64, 64);
        let pass = PassDescriptor::new(
            "shadow",
            PassKind::ShadowDepth,
            None,
            Some(DepthTargetId(7)),
            Viewport::sized(1024, 1024),
        )
        .with_rasterizer(RasterizerId(3))
        .without_pixel_shader()
        .clear_depth(DepthTargetId(7), 1.0);
        pass.apply(&mut device);

        assert_eq!(
            device.commands(),
            &[
                DeviceCommand::SetRenderTargets {
                    color: None,
                    depth: Some(DepthTargetId(7))
                },
                DeviceCommand::SetRasterizer(Some(RasterizerId(3))),
                DeviceCommand::SetViewport(Viewport::sized(1024, 1024)),
                DeviceCommand::ClearDepth {
                    target: DepthTargetId(7),
                    depth: 1.0
                },
                DeviceCommand::SetShader {
                    stage: ShaderStage::Pixel,
                    shader: None
                },
            ]
        );
    }

    #[test]
    fn default_pass_resets_rasterizer() {
        let mut device = RecordingDevice::new(64, 64);
        PassDescriptor::new(
            "main",
            PassKind::MainColor,
            Some(ColorTargetId(0)),
            Some(DepthTargetId(1)),
            Viewport::sized(64, 64),
        )
        .apply(&mut device);
        assert_eq!(device.commands()[1], DeviceCommand::SetRasterizer(None));
    }
}
