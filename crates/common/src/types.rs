use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one GPU context.
///
/// Backends allocate one per context they wrap. The renderer records the id it
/// was set up with and refuses to run against any other context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContextId(pub u64);

impl ContextId {
    /// Allocate a process-unique id.
    pub fn next() -> Self {
        Self(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}

/// Constructors for the texture-coordinate transforms a frame producer hands out.
///
/// All matrices act on `(u, v, 0, 1)` texture coordinates.
pub struct SurfaceTransform;

impl SurfaceTransform {
    /// Scale texture coordinates about the origin, so `scale(0.5)` samples the
    /// lower-left quarter of the frame.
    pub fn scale(factor: f32) -> Mat4 {
        Mat4::from_scale(Vec3::new(factor, factor, 1.0))
    }

    /// Flip the frame vertically, the usual correction for decoders that write
    /// rows top-down.
    pub fn vertical_flip() -> Mat4 {
        Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0)) * Mat4::from_scale(Vec3::new(1.0, -1.0, 1.0))
    }

    /// Crop to the `[u0, u1] x [v0, v1]` window of the frame.
    pub fn crop(u0: f32, v0: f32, u1: f32, v1: f32) -> Mat4 {
        Mat4::from_translation(Vec3::new(u0, v0, 0.0))
            * Mat4::from_scale(Vec3::new(u1 - u0, v1 - v0, 1.0))
    }

    /// Build a transform from the 16-float column-major array producers expose.
    pub fn from_column_major(values: &[f32; 16]) -> Mat4 {
        Mat4::from_cols_array(values)
    }

    /// Map a texture coordinate through `transform`, returning the sampled UV.
    pub fn apply(transform: &Mat4, uv: [f32; 2]) -> [f32; 2] {
        let p = *transform * glam::Vec4::new(uv[0], uv[1], 0.0, 1.0);
        [p.x, p.y]
    }
}
