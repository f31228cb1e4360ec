//! CPU-side vertex data and geometry file dispatch.

use std::path::Path;

use glam::{Vec2, Vec3, Vec4};

use super::obj;
use crate::errors::{Result, UmbraError};
use crate::gpu::FLOATS_PER_VERTEX;

/// One vertex of the interleaved layout.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    pub position: Vec3,
    pub uv: Vec2,
    pub normal: Vec3,
    /// `xyz` tangent, `w` bitangent handedness (±1).
    pub tangent: Vec4,
}

impl Vertex {
    #[must_use]
    pub fn new(position: Vec3, uv: Vec2, normal: Vec3) -> Self {
        Self {
            position,
            uv,
            normal,
            tangent: Vec4::ZERO,
        }
    }
}

/// A triangle list: every three vertices form one face.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
}

impl MeshData {
    /// Wraps `vertices` and computes their tangents.
    #[must_use]
    pub fn new(vertices: Vec<Vertex>) -> Self {
        let mut mesh = Self { vertices };
        mesh.recalculate_tangents();
        mesh
    }

    /// Per-face tangents from uv derivatives, orthogonalized against each
    /// vertex normal. Faces with degenerate uvs get a zero tangent.
    pub fn recalculate_tangents(&mut self) {
        for face in self.vertices.chunks_exact_mut(3) {
            let (p1, p2, p3) = (face[0].position, face[1].position, face[2].position);
            let (uv1, uv2, uv3) = (face[0].uv, face[1].uv, face[2].uv);

            let e1 = p2 - p1;
            let e2 = p3 - p1;
            let d1 = uv2 - uv1;
            let d2 = uv3 - uv1;

            let det = d1.x * d2.y - d2.x * d1.y;
            let (sdir, tdir) = if det.abs() > f32::EPSILON {
                let r = det.recip();
                ((e1 * d2.y - e2 * d1.y) * r, (e2 * d1.x - e1 * d2.x) * r)
            } else {
                (Vec3::ZERO, Vec3::ZERO)
            };

            for vertex in face {
                let n = vertex.normal;
                let tangent = -(sdir - n * n.dot(sdir)).normalize_or_zero();
                let handedness = if n.cross(sdir).dot(tdir) < 0.0 { -1.0 } else { 1.0 };
                vertex.tangent = tangent.extend(handedness);
            }
        }
    }

    /// Replaces every normal with its face normal.
    pub fn recalculate_normals_flat(&mut self) {
        for face in self.vertices.chunks_exact_mut(3) {
            let normal = (face[1].position - face[0].position)
                .cross(face[2].position - face[0].position)
                .normalize_or_zero();
            for vertex in face {
                vertex.normal = normal;
            }
        }
    }

    /// Flattens to 12 floats per vertex: position, uv, normal, tangent.
    #[must_use]
    pub fn to_interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.vertices.len() * FLOATS_PER_VERTEX);
        for v in &self.vertices {
            out.extend_from_slice(&v.position.to_array());
            out.extend_from_slice(&v.uv.to_array());
            out.extend_from_slice(&v.normal.to_array());
            out.extend_from_slice(&v.tangent.to_array());
        }
        out
    }
}

/// Reads a little-endian `f32` dump.
pub fn parse_raw(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(UmbraError::MeshParse {
            line: 0,
            message: format!("{} bytes is not a whole number of f32 values", bytes.len()),
        });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Dispatches on the extension of `path`: `.obj` or `.raw`.
pub fn parse_geometry(path: &str, bytes: &[u8]) -> Result<Vec<f32>> {
    let without_query = path.split(['?', '#']).next().unwrap_or(path);
    let extension = Path::new(without_query)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("obj") => {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| UmbraError::InvalidText(format!("{path}: {e}")))?;
            Ok(obj::parse(text)?.to_interleaved())
        }
        Some("raw") => parse_raw(bytes),
        _ => Err(UmbraError::UnsupportedAsset(format!(
            "{path}: expected a .obj or .raw model"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn quad_face() -> Vec<Vertex> {
        vec![
            Vertex::new(Vec3::ZERO, Vec2::ZERO, Vec3::Z),
            Vertex::new(Vec3::X, Vec2::X, Vec3::Z),
            Vertex::new(Vec3::Y, Vec2::Y, Vec3::Z),
        ]
    }

    #[test]
    fn tangent_follows_u_axis_negated() {
        let mesh = MeshData::new(quad_face());
        for vertex in &mesh.vertices {
            assert!((vertex.tangent.truncate() - Vec3::NEG_X).length() < EPSILON);
            assert!((vertex.tangent.w - 1.0).abs() < EPSILON);
        }
    }

    #[test]
    fn mirrored_uvs_flip_handedness() {
        let mut face = quad_face();
        face[2].uv = Vec2::new(0.0, -1.0);
        let mesh = MeshData::new(face);
        assert!((mesh.vertices[0].tangent.w + 1.0).abs() < EPSILON);
    }

    #[test]
    fn degenerate_uvs_give_zero_tangent() {
        let mut face = quad_face();
        for vertex in &mut face {
            vertex.uv = Vec2::ZERO;
        }
        let mesh = MeshData::new(face);
        assert_eq!(mesh.vertices[0].tangent.truncate(), Vec3::ZERO);
    }

    #[test]
    fn flat_normals_follow_winding() {
        let mut mesh = MeshData::new(quad_face());
        for vertex in &mut mesh.vertices {
            vertex.normal = Vec3::X;
        }
        mesh.recalculate_normals_flat();
        assert!(mesh.vertices.iter().all(|v| v.normal == Vec3::Z));
    }

    #[test]
    fn raw_rejects_partial_floats() {
        assert!(parse_raw(&[0, 0, 128]).is_err());
        let floats = parse_raw(&1.5f32.to_le_bytes()).unwrap();
        assert_eq!(floats, vec![1.5]);
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let err = parse_geometry("model.fbx", &[]).unwrap_err();
        assert!(matches!(err, UmbraError::UnsupportedAsset(_)));
        assert!(parse_geometry("model.raw?v=2", &[]).unwrap().is_empty());
    }
}
