//! Target surface description: UV-parameterized mesh data for the flat
//! plane and (optionally) an imported model. Immutable once loaded;
//! replacing it tears down and recreates the accumulation state.

use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::path::Path;

use bytemuck::{Pod, Zeroable};

/// Default accumulation grid resolution (texels per axis).
const DEFAULT_GRID_RESOLUTION: u32 = 256;
/// Plane half-extent in world units.
const PLANE_HALF_EXTENT: f32 = 5.0;
/// Plane subdivisions per axis.
const PLANE_SUBDIVISIONS: u32 = 16;

/// Vertex layout shared by all heat-overlay surfaces.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SurfaceVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// CPU-side mesh data for one renderable surface.
pub struct SurfaceMeshData {
    pub vertices: Vec<SurfaceVertex>,
    pub indices: Vec<u32>,
}

/// The loaded surface set the heatmap projects onto.
pub struct HeatmapModelData {
    pub plane: SurfaceMeshData,
    pub model: Option<SurfaceMeshData>,
    /// Accumulation texture resolution (square).
    pub grid_resolution: u32,
}

impl HeatmapModelData {
    /// Build the plane and, if a path is given, import the model mesh.
    pub fn load(model_path: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        let plane = generate_plane(PLANE_HALF_EXTENT, PLANE_SUBDIVISIONS);

        let model = match model_path {
            Some(path) => {
                let text = fs::read_to_string(path)?;
                let mesh = parse_obj(&text)?;
                log::info!(
                    "imported model {:?}: {} vertices, {} triangles",
                    path,
                    mesh.vertices.len(),
                    mesh.indices.len() / 3
                );
                Some(mesh)
            }
            None => None,
        };

        Ok(Self {
            plane,
            model,
            grid_resolution: DEFAULT_GRID_RESOLUTION,
        })
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }
}

/// Generate a Y-up flat plane centered at the origin, UV spanning [0, 1]².
pub fn generate_plane(half_extent: f32, subdivisions: u32) -> SurfaceMeshData {
    let n = subdivisions.max(1);
    let verts_per_axis = n + 1;
    let mut vertices = Vec::with_capacity((verts_per_axis * verts_per_axis) as usize);
    let mut indices = Vec::with_capacity((n * n * 6) as usize);

    for j in 0..verts_per_axis {
        for i in 0..verts_per_axis {
            let u = i as f32 / n as f32;
            let v = j as f32 / n as f32;
            vertices.push(SurfaceVertex {
                position: [
                    (u * 2.0 - 1.0) * half_extent,
                    0.0,
                    (v * 2.0 - 1.0) * half_extent,
                ],
                normal: [0.0, 1.0, 0.0],
                uv: [u, v],
            });
        }
    }

    for j in 0..n {
        for i in 0..n {
            let a = j * verts_per_axis + i;
            let b = a + 1;
            let c = a + verts_per_axis;
            let d = c + 1;
            indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }

    SurfaceMeshData { vertices, indices }
}

/// Minimal Wavefront OBJ reader: v / vt / vn / f, fan-triangulated faces,
/// deduplicated on the full v/vt/vn index triple. Faces without vt are
/// rejected — the heatmap needs a UV parameterization to project onto.
pub fn parse_obj(text: &str) -> Result<SurfaceMeshData, Box<dyn Error>> {
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut uvs: Vec<[f32; 2]> = Vec::new();
    let mut normals: Vec<[f32; 3]> = Vec::new();

    let mut vertices: Vec<SurfaceVertex> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();
    let mut dedup: HashMap<(usize, usize, Option<usize>), u32> = HashMap::new();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("v") => positions.push(parse_vec3(&mut parts, line_no)?),
            Some("vt") => {
                let t = parse_vec2(&mut parts, line_no)?;
                // OBJ uses a bottom-left UV origin; textures are top-left.
                uvs.push([t[0], 1.0 - t[1]]);
            }
            Some("vn") => normals.push(parse_vec3(&mut parts, line_no)?),
            Some("f") => {
                let corners: Vec<&str> = parts.collect();
                if corners.len() < 3 {
                    return Err(format!("line {}: face with <3 corners", line_no + 1).into());
                }
                let mut resolved = Vec::with_capacity(corners.len());
                for corner in &corners {
                    resolved.push(resolve_corner(
                        corner, &positions, &uvs, &normals, &mut vertices, &mut dedup, line_no,
                    )?);
                }
                for k in 1..resolved.len() - 1 {
                    indices.extend_from_slice(&[resolved[0], resolved[k], resolved[k + 1]]);
                }
            }
            _ => {} // comments, o/g/s/usemtl and friends
        }
    }

    if indices.is_empty() {
        return Err("OBJ contains no faces".into());
    }
    Ok(SurfaceMeshData { vertices, indices })
}

fn parse_vec3<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
    line_no: usize,
) -> Result<[f32; 3], Box<dyn Error>> {
    let mut out = [0.0f32; 3];
    for slot in &mut out {
        *slot = parts
            .next()
            .ok_or_else(|| format!("line {}: short vector", line_no + 1))?
            .parse()?;
    }
    Ok(out)
}

fn parse_vec2<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
    line_no: usize,
) -> Result<[f32; 2], Box<dyn Error>> {
    let mut out = [0.0f32; 2];
    for slot in &mut out {
        *slot = parts
            .next()
            .ok_or_else(|| format!("line {}: short vector", line_no + 1))?
            .parse()?;
    }
    Ok(out)
}

#[allow(clippy::too_many_arguments)]
fn resolve_corner(
    corner: &str,
    positions: &[[f32; 3]],
    uvs: &[[f32; 2]],
    normals: &[[f32; 3]],
    vertices: &mut Vec<SurfaceVertex>,
    dedup: &mut HashMap<(usize, usize, Option<usize>), u32>,
    line_no: usize,
) -> Result<u32, Box<dyn Error>> {
    let mut ids = corner.split('/');
    let vi = parse_index(ids.next(), positions.len(), line_no)?
        .ok_or_else(|| format!("line {}: face corner without position", line_no + 1))?;
    let ti = parse_index(ids.next(), uvs.len(), line_no)?
        .ok_or_else(|| format!("line {}: face corner without UV", line_no + 1))?;
    let ni = parse_index(ids.next(), normals.len(), line_no)?;

    let key = (vi, ti, ni);
    if let Some(&idx) = dedup.get(&key) {
        return Ok(idx);
    }

    let idx = vertices.len() as u32;
    vertices.push(SurfaceVertex {
        position: positions[vi],
        normal: ni.map(|n| normals[n]).unwrap_or([0.0, 1.0, 0.0]),
        uv: uvs[ti],
    });
    dedup.insert(key, idx);
    Ok(idx)
}

/// Parse one OBJ face index: 1-based, negative counts from the end.
fn parse_index(
    field: Option<&str>,
    len: usize,
    line_no: usize,
) -> Result<Option<usize>, Box<dyn Error>> {
    let field = match field {
        Some(f) if !f.is_empty() => f,
        _ => return Ok(None),
    };
    let raw: i64 = field.parse()?;
    let idx = if raw < 0 {
        len as i64 + raw
    } else {
        raw - 1
    };
    if idx < 0 || idx as usize >= len {
        return Err(format!("line {}: index {} out of range", line_no + 1, raw).into());
    }
    Ok(Some(idx as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_spans_unit_uv() {
        let plane = generate_plane(5.0, 4);
        assert_eq!(plane.vertices.len(), 25);
        assert_eq!(plane.indices.len(), 4 * 4 * 6);
        assert_eq!(plane.vertices[0].uv, [0.0, 0.0]);
        assert_eq!(plane.vertices[24].uv, [1.0, 1.0]);
        for v in &plane.vertices {
            assert_eq!(v.normal, [0.0, 1.0, 0.0]);
            assert_eq!(v.position[1], 0.0);
        }
    }

    #[test]
    fn obj_quad_parses_and_triangulates() {
        let obj = "\
v 0 0 0
v 1 0 0
v 1 0 1
v 0 0 1
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 1 0
f 1/1/1 2/2/1 3/3/1 4/4/1
";
        let mesh = parse_obj(obj).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices.len(), 6); // quad -> two triangles
        // vt origin flip
        assert_eq!(mesh.vertices[0].uv, [0.0, 1.0]);
    }

    #[test]
    fn obj_without_uvs_is_rejected() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 0 1\nf 1 2 3\n";
        assert!(parse_obj(obj).is_err());
    }

    #[test]
    fn obj_negative_indices_resolve_from_end() {
        let obj = "\
v 0 0 0
v 1 0 0
v 0 0 1
vt 0 0
vt 1 0
vt 0 1
f -3/-3 -2/-2 -1/-1
";
        let mesh = parse_obj(obj).unwrap();
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
    }
}
