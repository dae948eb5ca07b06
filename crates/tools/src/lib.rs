//! Developer tooling: the scene inspector model behind the desktop panel and
//! the CLI `inspect` command.
//!
//! # Invariants
//! - Queries never mutate the scene.
//! - Edits go through the owning type's setters, so cached matrices and the
//!   shadow view stay consistent.

pub mod inspector;

pub use inspector::{
    CameraInfo, EntityEdit, EntityInfo, LightInfo, SceneInspector, SceneSummary, TransformInfo,
};

pub fn crate_info() -> &'static str {
    "prism-tools v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("tools"));
    }
}
