//! Wavefront OBJ subset.
//!
//! | Line              | Meaning                                         |
//! |-------------------|-------------------------------------------------|
//! | `v x y z`         | position                                        |
//! | `vt u v`          | texture coordinate                              |
//! | `vn x y z`        | normal                                          |
//! | `f a/b/c` ×3      | triangle: position/uv/normal indices (1-based)  |
//! | `f a//c` ×3       | triangle without uvs; uv is taken from normal.xy |
//!
//! Everything else is skipped. Faces with more or fewer than three corners are
//! skipped with a warning; the input is expected to be triangulated.

use glam::{Vec2, Vec3};

use super::mesh::{MeshData, Vertex};
use crate::errors::{Result, UmbraError};

/// One face corner: position, optional uv, normal (0-based).
type Corner = (usize, Option<usize>, usize);

fn parse_floats<const N: usize>(rest: &[&str], line: usize) -> [f32; N] {
    let mut out = [0.0; N];
    for (i, slot) in out.iter_mut().enumerate() {
        match rest.get(i).map(|token| token.parse::<f32>()) {
            Some(Ok(value)) => *slot = value,
            _ => log::warn!("OBJ line {line}: component {i} missing or malformed, using 0"),
        }
    }
    out
}

fn parse_index(token: &str, count: usize, line: usize) -> Result<usize> {
    let index = token.parse::<usize>().map_err(|_| UmbraError::MeshParse {
        line,
        message: format!("invalid index '{token}'"),
    })?;
    if index == 0 || index > count {
        return Err(UmbraError::MeshParse {
            line,
            message: format!("index {index} out of range 1..={count}"),
        });
    }
    Ok(index - 1)
}

fn parse_corner(token: &str, counts: (usize, usize, usize), line: usize) -> Result<Option<Corner>> {
    let parts: Vec<&str> = token.split('/').collect();
    let [position, uv, normal] = parts.as_slice() else {
        return Ok(None);
    };
    let position = parse_index(position, counts.0, line)?;
    let uv = if uv.is_empty() {
        None
    } else {
        Some(parse_index(uv, counts.1, line)?)
    };
    let normal = parse_index(normal, counts.2, line)?;
    Ok(Some((position, uv, normal)))
}

/// Parses `text` into a triangle list with tangents.
pub fn parse(text: &str) -> Result<MeshData> {
    let mut positions = Vec::<Vec3>::new();
    let mut uvs = Vec::<Vec2>::new();
    let mut normals = Vec::<Vec3>::new();
    let mut vertices = Vec::new();

    for (i, raw) in text.lines().enumerate() {
        let line = i + 1;
        let mut tokens = raw.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };
        let rest: Vec<&str> = tokens.collect();

        match keyword {
            "v" => positions.push(Vec3::from_array(parse_floats::<3>(&rest, line))),
            "vt" => uvs.push(Vec2::from_array(parse_floats::<2>(&rest, line))),
            "vn" => normals.push(Vec3::from_array(parse_floats::<3>(&rest, line))),
            "f" => {
                if rest.len() != 3 {
                    log::warn!("OBJ line {line}: skipping face with {} corners", rest.len());
                    continue;
                }
                let counts = (positions.len(), uvs.len(), normals.len());
                let mut corners = [None; 3];
                for (slot, token) in corners.iter_mut().zip(&rest) {
                    *slot = parse_corner(token, counts, line)?;
                }
                let [Some(a), Some(b), Some(c)] = corners else {
                    log::warn!("OBJ line {line}: skipping face without normals");
                    continue;
                };
                if a.1.is_some() != b.1.is_some() || a.1.is_some() != c.1.is_some() {
                    log::warn!("OBJ line {line}: skipping face mixing corner formats");
                    continue;
                }
                for (position, uv, normal) in [a, b, c] {
                    let normal = normals[normal];
                    let uv = uv.map_or(normal.truncate(), |uv| uvs[uv]);
                    vertices.push(Vertex::new(positions[position], uv, normal));
                }
            }
            _ => {}
        }
    }

    Ok(MeshData::new(vertices))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_and_unknown_lines_are_skipped() {
        let mesh = parse("# comment\no cube\nusemtl none\ns off\n").unwrap();
        assert!(mesh.vertices.is_empty());
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let err = parse("v 0 0 0\nvn 0 0 1\nf 1//1 2//1 1//1\n").unwrap_err();
        assert!(matches!(err, UmbraError::MeshParse { line: 3, .. }));
    }

    #[test]
    fn quads_are_skipped() {
        let text = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1 4//1\n";
        assert!(parse(text).unwrap().vertices.is_empty());
    }

    #[test]
    fn uv_falls_back_to_normal_xy() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0.25 0.5 0.75\nf 1//1 2//1 3//1\n";
        let mesh = parse(text).unwrap();
        assert_eq!(mesh.vertices[0].uv, Vec2::new(0.25, 0.5));
    }
}
