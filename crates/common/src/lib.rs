//! Shared math for the prism renderer.
//!
//! # Invariants
//! - A transform's cached matrices and basis vectors always match its
//!   position, rotation and scale after any mutation returns.
//! - World matrices place the object by scaling, then rotating, then
//!   translating.

pub mod transform;

pub use transform::SpatialTransform;

pub fn crate_info() -> &'static str {
    "prism-common v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("common"));
    }
}
