use bytemuck::{Pod, Zeroable};

/// One interleaved quad vertex: X, Y, Z, U, V.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

/// Floats per vertex.
pub const FLOATS_PER_VERTEX: usize = 5;
/// Vertex stride in bytes.
pub const VERTEX_STRIDE_BYTES: i32 = (FLOATS_PER_VERTEX * std::mem::size_of::<f32>()) as i32;
/// Byte offset of the position within a vertex.
pub const POSITION_OFFSET_BYTES: i32 = 0;
/// Byte offset of the texture coordinate within a vertex.
pub const UV_OFFSET_BYTES: i32 = (3 * std::mem::size_of::<f32>()) as i32;
pub const POSITION_COMPONENTS: i32 = 3;
pub const UV_COMPONENTS: i32 = 2;

#[rustfmt::skip]
const QUAD: [QuadVertex; 4] = [
    QuadVertex { position: [-1.0, -1.0, 0.0], uv: [0.0, 0.0] },
    QuadVertex { position: [ 1.0, -1.0, 0.0], uv: [1.0, 0.0] },
    QuadVertex { position: [-1.0,  1.0, 0.0], uv: [0.0, 1.0] },
    QuadVertex { position: [ 1.0,  1.0, 0.0], uv: [1.0, 1.0] },
];

/// Full-viewport quad, ordered for a triangle strip.
///
/// Immutable for the renderer's lifetime; the identity model-view-projection
/// matrix maps it onto the whole viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadGeometry {
    vertices: [QuadVertex; 4],
}

impl QuadGeometry {
    pub const VERTEX_COUNT: i32 = 4;

    pub fn new() -> Self {
        Self { vertices: QUAD }
    }

    pub fn vertices(&self) -> &[QuadVertex; 4] {
        &self.vertices
    }

    /// Interleaved vertex data as uploaded to the array buffer.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

impl Default for QuadGeometry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_vertices_cover_clip_space_and_texture_space() {
        let quad = QuadGeometry::new();
        let v = quad.vertices();
        assert_eq!(v.len() as i32, QuadGeometry::VERTEX_COUNT);

        let xs: Vec<f32> = v.iter().map(|v| v.position[0]).collect();
        let ys: Vec<f32> = v.iter().map(|v| v.position[1]).collect();
        let us: Vec<f32> = v.iter().map(|v| v.uv[0]).collect();
        let vs: Vec<f32> = v.iter().map(|v| v.uv[1]).collect();
        assert_eq!(xs.iter().cloned().fold(f32::MAX, f32::min), -1.0);
        assert_eq!(xs.iter().cloned().fold(f32::MIN, f32::max), 1.0);
        assert_eq!(ys.iter().cloned().fold(f32::MAX, f32::min), -1.0);
        assert_eq!(ys.iter().cloned().fold(f32::MIN, f32::max), 1.0);
        assert_eq!(us.iter().cloned().fold(f32::MAX, f32::min), 0.0);
        assert_eq!(us.iter().cloned().fold(f32::MIN, f32::max), 1.0);
        assert_eq!(vs.iter().cloned().fold(f32::MAX, f32::min), 0.0);
        assert_eq!(vs.iter().cloned().fold(f32::MIN, f32::max), 1.0);
    }

    #[test]
    fn uv_tracks_position() {
        for v in QuadGeometry::new().vertices() {
            assert_eq!(v.uv[0], (v.position[0] + 1.0) / 2.0);
            assert_eq!(v.uv[1], (v.position[1] + 1.0) / 2.0);
        }
    }

    #[test]
    fn interleaved_layout_matches_stride() {
        assert_eq!(std::mem::size_of::<QuadVertex>() as i32, VERTEX_STRIDE_BYTES);
        assert_eq!(VERTEX_STRIDE_BYTES, 20);
        assert_eq!(UV_OFFSET_BYTES, 12);
        assert_eq!(QuadGeometry::new().as_bytes().len(), 4 * 20);
    }
}
