//! wgpu backend for the prism render device.
//!
//! Replays the recorded command stream as render passes at present time and
//! hands the overlay pass to an [`OverlayPainter`] such as an egui renderer.
//! A sampled depth target can be mirrored into a color texture for display
//! with [`WgpuDevice::enable_depth_preview`].
//!
//! # Invariants
//! - Front faces wind clockwise; back faces are culled unless the
//!   rasterizer state says otherwise.
//! - A draw's pixel program belongs to the same family as its vertex program.
//! - Texture and sampler bindings are checked against the family's layout
//!   before any bind group is built.
//! - A lost or outdated surface drops the frame, never the device.

mod device;
mod error;
mod preview;
mod replay;
mod shaders;
mod uniforms;

pub use device::{DEPTH_FORMAT, OverlayContext, OverlayPainter, WgpuDevice};
pub use error::BackendError;
pub use preview::PREVIEW_FORMAT;

pub fn crate_info() -> &'static str {
    "prism-render-wgpu v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("wgpu"));
    }
}
