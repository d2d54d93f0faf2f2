//! External-texture quad renderer.
//!
//! Draws a frame held in a platform "external" texture (camera or video
//! decoder output) onto a full-viewport quad, applying the per-frame surface
//! transform its producer supplies.
//!
//! # Invariants
//! - At most one linked program is live per renderer; a shader swap releases
//!   the old program only after the replacement has linked.
//! - Every GL call that can fail is followed by an error check naming it.
//! - The renderer only ever talks to the context it was set up on.
//!
//! # Backends
//! The renderer is written against [`GlApi`]. [`RecordingGl`] is a software
//! backend for tests and tooling; the `extquad-render-glow` crate drives a
//! real OpenGL ES / OpenGL context.

mod config;
mod error;
mod geometry;
mod gl;
mod program;
mod recording;
mod renderer;
pub mod shaders;

pub use config::{MAX_TEXTURE_UNITS, RendererConfig};
pub use error::{ConfigError, LocationKind, RenderError, check_gl};
pub use geometry::{QuadGeometry, QuadVertex, VERTEX_STRIDE_BYTES};
pub use gl::{ClearBuffers, GlApi, GlErrorCode, NO_ERROR, ShaderStage, TexParam, TexValue};
pub use program::{AttributeBindings, ShaderProgram, compile_shader, create_program};
pub use recording::{DrawRecord, GlCall, RecordingGl};
pub use renderer::{SurfaceTextureRenderer, TextureSource};

pub fn crate_info() -> &'static str {
    "extquad-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
