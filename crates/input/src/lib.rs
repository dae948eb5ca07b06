//! Per-frame input state for the desktop embodiment.
//!
//! The window host feeds raw events into an [`InputState`] and hands it to
//! whatever consumes input (cameras, the app loop) by reference. There is no
//! global input singleton.
//!
//! # Invariants
//! - Pointer motion accumulates until [`InputState::begin_frame`] clears it.
//! - Input captured by the UI overlay reads as idle to scene consumers.

pub mod state;

pub use state::{InputState, Key};

pub fn crate_info() -> &'static str {
    "prism-input v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("input"));
    }
}
