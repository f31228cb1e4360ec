use crate::errors::Result;
use crate::gpu::{FLOATS_PER_VERTEX, GpuApi};

/// Two triangles covering clip space, in the interleaved vertex layout.
///
/// UVs span `0..1`; normals face +Z; tangents are zero.
#[rustfmt::skip]
pub const FULL_SCREEN_QUAD: [f32; 6 * FLOATS_PER_VERTEX] = [
    //  position          uv        normal           tangent
     1.0, -1.0, 0.0,   1.0, 0.0,   0.0, 0.0, 1.0,   0.0, 0.0, 0.0, 0.0,
    -1.0,  1.0, 0.0,   0.0, 1.0,   0.0, 0.0, 1.0,   0.0, 0.0, 0.0, 0.0,
    -1.0, -1.0, 0.0,   0.0, 0.0,   0.0, 0.0, 1.0,   0.0, 0.0, 0.0, 0.0,
     1.0, -1.0, 0.0,   1.0, 0.0,   0.0, 0.0, 1.0,   0.0, 0.0, 0.0, 0.0,
     1.0,  1.0, 0.0,   1.0, 1.0,   0.0, 0.0, 1.0,   0.0, 0.0, 0.0, 0.0,
    -1.0,  1.0, 0.0,   0.0, 1.0,   0.0, 0.0, 1.0,   0.0, 0.0, 0.0, 0.0,
];

pub fn create_full_screen_quad<A: GpuApi>(api: &A) -> Result<A::Geometry> {
    api.create_geometry(&FULL_SCREEN_QUAD)
}
