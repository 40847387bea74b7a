pub mod assets;

use std::collections::HashMap;
use std::fmt::Write as FmtWrite;

use glam::{Vec3, Vec4};

use crate::mesh::BaseMesh;

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    /// Wavefront text geometry.
    Obj,
    /// Binary triangulated format.
    Stl,
    /// Polygon data, text or binary encoding.
    Ply,
}

/// Determine the mesh format from a file name extension. Anything else is
/// None; callers treat that as "ignore the selection".
pub fn detect_format(name: &str) -> Option<MeshFormat> {
    let lower = name.to_lowercase();
    if lower.ends_with(".obj") {
        return Some(MeshFormat::Obj);
    }
    if lower.ends_with(".stl") {
        return Some(MeshFormat::Stl);
    }
    if lower.ends_with(".ply") {
        return Some(MeshFormat::Ply);
    }
    None
}

/// Populate `mesh` from raw file data. On any parse error the mesh is left
/// exactly as it was — parsing goes through temporaries and commits last.
pub fn import_mesh(format: MeshFormat, data: &[u8], mesh: &mut BaseMesh) -> Result<(), String> {
    match format {
        MeshFormat::Obj => import_obj(data, mesh),
        MeshFormat::Stl => import_stl(data, mesh),
        MeshFormat::Ply => import_ply(data, mesh),
    }
}

/// Import Wavefront OBJ text. Supports v/f statements, v/vt/vn face
/// references, negative (relative) indices, and n-gon fan triangulation.
pub fn import_obj(data: &[u8], mesh: &mut BaseMesh) -> Result<(), String> {
    let text = std::str::from_utf8(data).map_err(|e| format!("OBJ is not valid UTF-8: {e}"))?;

    let mut positions: Vec<Vec3> = Vec::new();
    let mut triangles: Vec<[u32; 3]> = Vec::new();

    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts[0] {
            "v" if parts.len() >= 4 => {
                let x: f32 = parts[1]
                    .parse()
                    .map_err(|_| format!("bad vertex on line {}", lineno + 1))?;
                let y: f32 = parts[2]
                    .parse()
                    .map_err(|_| format!("bad vertex on line {}", lineno + 1))?;
                let z: f32 = parts[3]
                    .parse()
                    .map_err(|_| format!("bad vertex on line {}", lineno + 1))?;
                positions.push(Vec3::new(x, y, z));
            }
            "f" if parts.len() >= 4 => {
                let mut idx: Vec<u32> = Vec::with_capacity(parts.len() - 1);
                for &part in &parts[1..] {
                    // v, v/vt, v//vn, v/vt/vn — only the position index matters.
                    let vtok = part.split('/').next().unwrap_or("");
                    let raw: i64 = vtok
                        .parse()
                        .map_err(|_| format!("bad face index on line {}", lineno + 1))?;
                    let resolved = if raw < 0 {
                        positions.len() as i64 + raw
                    } else {
                        raw - 1
                    };
                    if resolved < 0 || resolved >= positions.len() as i64 {
                        return Err(format!("face index out of range on line {}", lineno + 1));
                    }
                    idx.push(resolved as u32);
                }
                for k in 1..idx.len() - 1 {
                    triangles.push([idx[0], idx[k], idx[k + 1]]);
                }
            }
            _ => {}
        }
    }

    if positions.is_empty() || triangles.is_empty() {
        return Err("no geometry found in OBJ data".to_string());
    }

    mesh.positions = positions;
    mesh.triangles = triangles;
    Ok(())
}

fn read_f32(data: &[u8], off: usize) -> f32 {
    f32::from_le_bytes([data[off], data[off + 1], data[off + 2], data[off + 3]])
}

/// Import binary STL: 80-byte header, u32 triangle count, 50 bytes per
/// triangle. Identical corner positions are welded into shared vertices
/// so the sculpt topology has real adjacency.
pub fn import_stl(data: &[u8], mesh: &mut BaseMesh) -> Result<(), String> {
    if data.len() < 84 {
        return Err("STL data too small for a binary header".to_string());
    }
    let count = u32::from_le_bytes([data[80], data[81], data[82], data[83]]) as usize;
    if count == 0 {
        return Err("no geometry found in STL data".to_string());
    }
    let expected = 84 + count * 50;
    if data.len() < expected {
        return Err(format!(
            "truncated STL: {count} triangles declared, {} bytes present",
            data.len()
        ));
    }

    let mut positions: Vec<Vec3> = Vec::new();
    let mut triangles: Vec<[u32; 3]> = Vec::new();
    let mut welded: HashMap<[u32; 3], u32> = HashMap::new();

    for i in 0..count {
        // 12 bytes of facet normal (ignored), then three corners.
        let tri_off = 84 + i * 50 + 12;
        let mut corners = [0u32; 3];
        for (k, corner) in corners.iter_mut().enumerate() {
            let off = tri_off + k * 12;
            let p = Vec3::new(
                read_f32(data, off),
                read_f32(data, off + 4),
                read_f32(data, off + 8),
            );
            let key = [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()];
            *corner = *welded.entry(key).or_insert_with(|| {
                positions.push(p);
                (positions.len() - 1) as u32
            });
        }
        triangles.push(corners);
    }

    mesh.positions = positions;
    mesh.triangles = triangles;
    Ok(())
}

// --- PLY parsing ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlyType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl PlyType {
    fn parse(token: &str) -> Option<Self> {
        Some(match token {
            "char" | "int8" => Self::I8,
            "uchar" | "uint8" => Self::U8,
            "short" | "int16" => Self::I16,
            "ushort" | "uint16" => Self::U16,
            "int" | "int32" => Self::I32,
            "uint" | "uint32" => Self::U32,
            "float" | "float32" => Self::F32,
            "double" | "float64" => Self::F64,
            _ => return None,
        })
    }

    fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    fn read(self, data: &[u8], off: usize) -> f64 {
        match self {
            Self::I8 => data[off] as i8 as f64,
            Self::U8 => data[off] as f64,
            Self::I16 => i16::from_le_bytes([data[off], data[off + 1]]) as f64,
            Self::U16 => u16::from_le_bytes([data[off], data[off + 1]]) as f64,
            Self::I32 => {
                i32::from_le_bytes([data[off], data[off + 1], data[off + 2], data[off + 3]]) as f64
            }
            Self::U32 => {
                u32::from_le_bytes([data[off], data[off + 1], data[off + 2], data[off + 3]]) as f64
            }
            Self::F32 => read_f32(data, off) as f64,
            Self::F64 => f64::from_le_bytes([
                data[off],
                data[off + 1],
                data[off + 2],
                data[off + 3],
                data[off + 4],
                data[off + 5],
                data[off + 6],
                data[off + 7],
            ]),
        }
    }
}

#[derive(Debug)]
enum PlyProperty {
    Scalar { name: String, ty: PlyType },
    List { count_ty: PlyType, item_ty: PlyType },
}

#[derive(Debug)]
struct PlyElement {
    name: String,
    count: usize,
    props: Vec<PlyProperty>,
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Import PLY polygon data, ASCII or binary little-endian encoding.
pub fn import_ply(data: &[u8], mesh: &mut BaseMesh) -> Result<(), String> {
    let header_tag = find_subslice(data, b"end_header").ok_or("PLY header not terminated")?;
    let body_start = header_tag
        + data[header_tag..]
            .iter()
            .position(|&b| b == b'\n')
            .ok_or("PLY header not terminated")?
        + 1;

    let header = std::str::from_utf8(&data[..header_tag])
        .map_err(|e| format!("PLY header is not valid UTF-8: {e}"))?;

    let mut lines = header.lines();
    if lines.next().map(str::trim) != Some("ply") {
        return Err("not a PLY file (missing magic)".to_string());
    }

    let mut ascii = None;
    let mut elements: Vec<PlyElement> = Vec::new();

    for line in lines {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.first().copied() {
            Some("format") => match parts.get(1).copied() {
                Some("ascii") => ascii = Some(true),
                Some("binary_little_endian") => ascii = Some(false),
                Some(other) => return Err(format!("unsupported PLY encoding {other}")),
                None => return Err("malformed PLY format line".to_string()),
            },
            Some("element") if parts.len() >= 3 => {
                let count: usize = parts[2]
                    .parse()
                    .map_err(|_| format!("bad element count {}", parts[2]))?;
                elements.push(PlyElement {
                    name: parts[1].to_string(),
                    count,
                    props: Vec::new(),
                });
            }
            Some("property") if parts.len() >= 3 => {
                let element = elements
                    .last_mut()
                    .ok_or("PLY property outside an element")?;
                if parts[1] == "list" {
                    if parts.len() < 5 {
                        return Err("malformed PLY list property".to_string());
                    }
                    let count_ty = PlyType::parse(parts[2])
                        .ok_or_else(|| format!("unknown PLY type {}", parts[2]))?;
                    let item_ty = PlyType::parse(parts[3])
                        .ok_or_else(|| format!("unknown PLY type {}", parts[3]))?;
                    element.props.push(PlyProperty::List { count_ty, item_ty });
                } else {
                    let ty = PlyType::parse(parts[1])
                        .ok_or_else(|| format!("unknown PLY type {}", parts[1]))?;
                    element.props.push(PlyProperty::Scalar {
                        name: parts[2].to_string(),
                        ty,
                    });
                }
            }
            Some("comment") | Some("obj_info") | None => {}
            Some(other) => return Err(format!("unexpected PLY header line {other}")),
        }
    }

    let ascii = ascii.ok_or("PLY header missing format line")?;
    let body = &data[body_start..];

    let mut positions: Vec<Vec3> = Vec::new();
    let mut normals: Vec<Vec3> = Vec::new();
    let mut colors: Vec<Vec4> = Vec::new();
    let mut triangles: Vec<[u32; 3]> = Vec::new();

    if ascii {
        let text = std::str::from_utf8(body)
            .map_err(|e| format!("PLY body is not valid UTF-8: {e}"))?;
        let mut tokens = text.split_whitespace();
        let mut next = |what: &str| -> Result<f64, String> {
            tokens
                .next()
                .ok_or_else(|| format!("truncated PLY data ({what})"))?
                .parse::<f64>()
                .map_err(|_| format!("bad PLY value ({what})"))
        };
        for element in &elements {
            for _ in 0..element.count {
                let mut row: Vec<(Option<&str>, f64)> = Vec::new();
                let mut list: Vec<f64> = Vec::new();
                for prop in &element.props {
                    match prop {
                        PlyProperty::Scalar { name, .. } => {
                            row.push((Some(name.as_str()), next(&element.name)?));
                        }
                        PlyProperty::List { .. } => {
                            let n = next(&element.name)? as usize;
                            list.clear();
                            for _ in 0..n {
                                list.push(next(&element.name)?);
                            }
                        }
                    }
                }
                consume_ply_row(
                    element,
                    &row,
                    &list,
                    &mut positions,
                    &mut normals,
                    &mut colors,
                    &mut triangles,
                )?;
            }
        }
    } else {
        let mut off = 0usize;
        let read = |off: &mut usize, ty: PlyType| -> Result<f64, String> {
            if *off + ty.size() > body.len() {
                return Err("truncated PLY data".to_string());
            }
            let v = ty.read(body, *off);
            *off += ty.size();
            Ok(v)
        };
        for element in &elements {
            for _ in 0..element.count {
                let mut row: Vec<(Option<&str>, f64)> = Vec::new();
                let mut list: Vec<f64> = Vec::new();
                for prop in &element.props {
                    match prop {
                        PlyProperty::Scalar { name, ty } => {
                            row.push((Some(name.as_str()), read(&mut off, *ty)?));
                        }
                        PlyProperty::List { count_ty, item_ty } => {
                            let n = read(&mut off, *count_ty)? as usize;
                            list.clear();
                            for _ in 0..n {
                                list.push(read(&mut off, *item_ty)?);
                            }
                        }
                    }
                }
                consume_ply_row(
                    element,
                    &row,
                    &list,
                    &mut positions,
                    &mut normals,
                    &mut colors,
                    &mut triangles,
                )?;
            }
        }
    }

    if positions.is_empty() || triangles.is_empty() {
        return Err("no geometry found in PLY data".to_string());
    }
    for tri in &triangles {
        if tri.iter().any(|&v| v as usize >= positions.len()) {
            return Err("PLY face index out of range".to_string());
        }
    }

    mesh.positions = positions;
    mesh.triangles = triangles;
    if !normals.is_empty() {
        mesh.normals = normals;
    }
    if !colors.is_empty() {
        mesh.colors = colors;
    }
    Ok(())
}

/// Fold one parsed PLY element row into the geometry accumulators.
fn consume_ply_row(
    element: &PlyElement,
    row: &[(Option<&str>, f64)],
    list: &[f64],
    positions: &mut Vec<Vec3>,
    normals: &mut Vec<Vec3>,
    colors: &mut Vec<Vec4>,
    triangles: &mut Vec<[u32; 3]>,
) -> Result<(), String> {
    let field = |name: &str| -> Option<f64> {
        row.iter()
            .find(|(n, _)| *n == Some(name))
            .map(|(_, v)| *v)
    };

    match element.name.as_str() {
        "vertex" => {
            let (Some(x), Some(y), Some(z)) = (field("x"), field("y"), field("z")) else {
                return Err("PLY vertex element lacks x/y/z".to_string());
            };
            positions.push(Vec3::new(x as f32, y as f32, z as f32));
            if let (Some(nx), Some(ny), Some(nz)) = (field("nx"), field("ny"), field("nz")) {
                normals.push(Vec3::new(nx as f32, ny as f32, nz as f32));
            }
            if let (Some(r), Some(g), Some(b)) = (field("red"), field("green"), field("blue")) {
                let scale = 1.0 / 255.0;
                colors.push(Vec4::new(
                    (r * scale) as f32,
                    (g * scale) as f32,
                    (b * scale) as f32,
                    1.0,
                ));
            }
        }
        "face" => {
            if list.len() < 3 {
                return Err("PLY face with fewer than 3 indices".to_string());
            }
            let idx: Vec<u32> = list.iter().map(|&v| v as u32).collect();
            for k in 1..idx.len() - 1 {
                triangles.push([idx[0], idx[k], idx[k + 1]]);
            }
        }
        _ => {}
    }
    Ok(())
}

/// Export the mesh as a Wavefront .obj file body.
pub fn export_obj(mesh: &BaseMesh) -> String {
    let mut out = String::new();
    writeln!(out, "# Exported from Clayforge").unwrap();
    writeln!(out).unwrap();

    for p in &mesh.positions {
        writeln!(out, "v {} {} {}", p.x, p.y, p.z).unwrap();
    }
    writeln!(out).unwrap();

    for tri in &mesh.triangles {
        // OBJ is 1-indexed
        writeln!(out, "f {} {} {}", tri[0] + 1, tri[1] + 1, tri[2] + 1).unwrap();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE_OBJ: &str = "# triangle\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

    #[test]
    fn format_detection_is_extension_based() {
        assert_eq!(detect_format("model.OBJ"), Some(MeshFormat::Obj));
        assert_eq!(detect_format("scan.stl"), Some(MeshFormat::Stl));
        assert_eq!(detect_format("bust.ply"), Some(MeshFormat::Ply));
        assert_eq!(detect_format("notes.txt"), None);
        assert_eq!(detect_format("noextension"), None);
    }

    #[test]
    fn obj_triangle_imports_three_vertices_one_face() {
        let mut mesh = BaseMesh::new();
        import_obj(TRIANGLE_OBJ.as_bytes(), &mut mesh).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.triangles[0], [0, 1, 2]);
    }

    #[test]
    fn obj_negative_indices_resolve_relative() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let mut mesh = BaseMesh::new();
        import_obj(src.as_bytes(), &mut mesh).unwrap();
        assert_eq!(mesh.triangles[0], [0, 1, 2]);
    }

    #[test]
    fn obj_bad_face_index_leaves_mesh_untouched() {
        let mut mesh = BaseMesh::new();
        import_obj(TRIANGLE_OBJ.as_bytes(), &mut mesh).unwrap();
        let err = import_obj(b"v 0 0 0\nf 1 2 9\n", &mut mesh).unwrap_err();
        assert!(err.contains("out of range"), "{err}");
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
    }

    fn binary_stl_one_triangle() -> Vec<u8> {
        let mut data = vec![0u8; 84];
        data[80..84].copy_from_slice(&1u32.to_le_bytes());
        // Facet normal
        for f in [0.0f32, 0.0, 1.0] {
            data.extend_from_slice(&f.to_le_bytes());
        }
        for corner in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            for f in corner {
                data.extend_from_slice(&f.to_le_bytes());
            }
        }
        data.extend_from_slice(&0u16.to_le_bytes());
        data
    }

    #[test]
    fn stl_binary_triangle_welds_vertices() {
        let data = binary_stl_one_triangle();
        let mut mesh = BaseMesh::new();
        import_stl(&data, &mut mesh).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn stl_truncated_is_an_error() {
        let mut data = binary_stl_one_triangle();
        data.truncate(100);
        let mut mesh = BaseMesh::new();
        assert!(import_stl(&data, &mut mesh).is_err());
        assert_eq!(mesh.vertex_count(), 0);
    }

    const TRIANGLE_PLY_ASCII: &str = "ply\nformat ascii 1.0\nelement vertex 3\nproperty float x\nproperty float y\nproperty float z\nproperty uchar red\nproperty uchar green\nproperty uchar blue\nelement face 1\nproperty list uchar int vertex_indices\nend_header\n0 0 0 255 0 0\n1 0 0 0 255 0\n0 1 0 0 0 255\n3 0 1 2\n";

    #[test]
    fn ply_ascii_triangle_with_colors() {
        let mut mesh = BaseMesh::new();
        import_ply(TRIANGLE_PLY_ASCII.as_bytes(), &mut mesh).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert!(mesh.colors[0].abs_diff_eq(Vec4::new(1.0, 0.0, 0.0, 1.0), 1e-3));
    }

    fn binary_ply_triangle() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(
            b"ply\nformat binary_little_endian 1.0\nelement vertex 3\nproperty float x\nproperty float y\nproperty float z\nelement face 1\nproperty list uchar int vertex_indices\nend_header\n",
        );
        for corner in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            for f in corner {
                data.extend_from_slice(&f.to_le_bytes());
            }
        }
        data.push(3);
        for i in [0i32, 1, 2] {
            data.extend_from_slice(&i.to_le_bytes());
        }
        data
    }

    #[test]
    fn ply_binary_triangle_imports() {
        let data = binary_ply_triangle();
        let mut mesh = BaseMesh::new();
        import_ply(&data, &mut mesh).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn ply_truncated_binary_leaves_mesh_untouched() {
        let mut mesh = BaseMesh::new();
        import_obj(TRIANGLE_OBJ.as_bytes(), &mut mesh).unwrap();

        let mut data = binary_ply_triangle();
        data.truncate(data.len() - 7);
        let err = import_ply(&data, &mut mesh).unwrap_err();
        assert!(err.contains("truncated"), "{err}");
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn export_obj_round_trips_through_import() {
        let mut mesh = BaseMesh::new();
        import_obj(TRIANGLE_OBJ.as_bytes(), &mut mesh).unwrap();
        let text = export_obj(&mesh);
        let mut back = BaseMesh::new();
        import_obj(text.as_bytes(), &mut back).unwrap();
        assert_eq!(back.vertex_count(), 3);
        assert_eq!(back.triangles, mesh.triangles);
    }
}
