//! Shared types for the extquad workspace.
//!
//! # Invariants
//! - A `ContextId` is never reused within a process.
//! - Surface transforms are column-major 4x4 matrices, the layout GL uniforms expect.

mod types;

pub use types::{ContextId, SurfaceTransform};

pub fn crate_info() -> &'static str {
    "extquad-common v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("common"));
    }
}
