//! glow backend for the extquad renderer.
//!
//! Wraps a current `glow::Context` as an [`extquad_render::GlApi`]. Context
//! creation and making it current belong to the embedder's windowing or EGL
//! layer; this crate only issues calls against it.
//!
//! # Invariants
//! - A `GlowContext` is `!Send`: GL calls stay on the thread that owns the context.
//! - External textures are bound on `GL_TEXTURE_EXTERNAL_OES`.

mod context;
mod enums;

pub use context::GlowContext;
pub use enums::TEXTURE_EXTERNAL_OES;

pub fn crate_info() -> &'static str {
    "extquad-render-glow v0.1.0"
}
