// SPDX-License-Identifier: MIT
//
// Copyright (c) 2025 Alexandre Severino
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use tracing::debug;

use crate::{
    error::{MeshFlowError, Result},
    geometry::Vec3,
    mesh::{MeshData, SubMesh},
};

fn io_error(path: &Path, source: io::Error) -> MeshFlowError {
    MeshFlowError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn parse_error(line: usize, message: impl Into<String>) -> MeshFlowError {
    MeshFlowError::Parse {
        line,
        message: message.into(),
    }
}

/// Write `mesh` as Wavefront OBJ. Each sub-mesh becomes a `g` group; normals
/// are written when present and referenced as `v//vn`.
pub fn write_obj<P: AsRef<Path>>(mesh: &MeshData, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| io_error(path, e))?;
    let mut out = BufWriter::new(file);
    write_obj_to(mesh, &mut out)
        .and_then(|_| out.flush())
        .map_err(|e| io_error(path, e))
}

pub fn write_obj_to<W: Write>(mesh: &MeshData, out: &mut W) -> io::Result<()> {
    for p in &mesh.rest_positions {
        writeln!(out, "v {:?} {:?} {:?}", p.x, p.y, p.z)?;
    }
    let with_normals = !mesh.normals.is_empty() && mesh.normals.len() == mesh.vertex_count();
    if with_normals {
        for n in &mesh.normals {
            writeln!(out, "vn {:?} {:?} {:?}", n.x, n.y, n.z)?;
        }
    }

    for group in &mesh.sub_meshes {
        writeln!(out, "g {}", group.name)?;
        for [a, b, c] in &group.triangles {
            // OBJ is 1-based
            let (a, b, c) = (a + 1, b + 1, c + 1);
            if with_normals {
                writeln!(out, "f {a}//{a} {b}//{b} {c}//{c}")?;
            } else {
                writeln!(out, "f {a} {b} {c}")?;
            }
        }
    }
    Ok(())
}

/// Read a mesh from a Wavefront OBJ file.
pub fn read_obj<P: AsRef<Path>>(path: P) -> Result<MeshData> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    read_obj_from(BufReader::new(file)).map_err(|e| match e {
        MeshFlowError::Stream { source, .. } => io_error(path, source),
        other => other,
    })
}

/// Parses `v`, `vn`, `f` (`v`, `v/vt`, `v//vn`, `v/vt/vn`, negative indices,
/// polygons as fans) and starts a new sub-mesh at `g`, `o` and `usemtl`.
/// Other statements are ignored.
pub fn read_obj_from<R: BufRead>(reader: R) -> Result<MeshData> {
    let mut positions: Vec<Vec3<f32>> = Vec::new();
    let mut normal_pool: Vec<Vec3<f32>> = Vec::new();
    let mut vertex_normals: Vec<Option<u32>> = Vec::new();
    let mut sub_meshes: Vec<SubMesh> = Vec::new();
    let mut current = SubMesh::new("default", Vec::new());

    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let line = line.map_err(|source| MeshFlowError::Stream {
            line: line_no,
            source,
        })?;
        let line = line.split('#').next().unwrap_or("");
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("v") => {
                positions.push(parse_vec3(&mut parts, line_no)?);
                vertex_normals.push(None);
            }
            Some("vn") => normal_pool.push(parse_vec3(&mut parts, line_no)?),
            Some("f") => {
                let mut corners = Vec::with_capacity(4);
                for token in parts {
                    let (v, n) = parse_corner(token, positions.len(), normal_pool.len(), line_no)?;
                    if let Some(n) = n {
                        vertex_normals[v as usize] = Some(n);
                    }
                    corners.push(v);
                }
                if corners.len() < 3 {
                    return Err(parse_error(line_no, "face needs at least three vertices"));
                }
                for k in 1..corners.len() - 1 {
                    current.triangles.push([corners[0], corners[k], corners[k + 1]]);
                }
            }
            Some("g") | Some("o") | Some("usemtl") => {
                let name = parts.collect::<Vec<_>>().join(" ");
                if current.triangles.is_empty() {
                    current.name = name;
                } else {
                    sub_meshes.push(std::mem::replace(&mut current, SubMesh::new(name, Vec::new())));
                }
            }
            _ => {}
        }
    }
    if !current.triangles.is_empty() || sub_meshes.is_empty() {
        sub_meshes.push(current);
    }

    let normals = if vertex_normals.iter().any(Option::is_some) {
        vertex_normals
            .iter()
            .map(|n| n.map(|k| normal_pool[k as usize]).unwrap_or_else(Vec3::zero))
            .collect()
    } else {
        Vec::new()
    };

    debug!(
        vertices = positions.len(),
        groups = sub_meshes.len(),
        normals = !normals.is_empty(),
        "read obj"
    );
    Ok(MeshData {
        rest_positions: positions,
        normals,
        tangents: Vec::new(),
        sub_meshes,
    })
}

fn parse_vec3<'a>(parts: &mut impl Iterator<Item = &'a str>, line: usize) -> Result<Vec3<f32>> {
    let mut xyz = [0.0_f32; 3];
    for c in &mut xyz {
        let token = parts
            .next()
            .ok_or_else(|| parse_error(line, "expected three coordinates"))?;
        *c = token
            .parse()
            .map_err(|_| parse_error(line, format!("invalid coordinate `{token}`")))?;
    }
    Ok(Vec3::from_array(xyz))
}

/// Resolves a 1-based or negative (relative) OBJ index against `count`.
fn resolve_index(token: &str, count: usize, line: usize) -> Result<u32> {
    let raw: i64 = token
        .parse()
        .map_err(|_| parse_error(line, format!("invalid index `{token}`")))?;
    let resolved = match raw {
        r if r > 0 => r - 1,
        r if r < 0 => count as i64 + r,
        _ => return Err(parse_error(line, "index 0 is not valid in OBJ")),
    };
    if resolved < 0 || resolved >= count as i64 {
        return Err(parse_error(
            line,
            format!("index {raw} is outside the {count} elements defined so far"),
        ));
    }
    Ok(resolved as u32)
}

fn parse_corner(
    token: &str,
    vertex_count: usize,
    normal_count: usize,
    line: usize,
) -> Result<(u32, Option<u32>)> {
    let mut fields = token.split('/');
    let v = resolve_index(fields.next().unwrap_or(""), vertex_count, line)?;
    let _uv = fields.next();
    let n = match fields.next() {
        Some(t) if !t.is_empty() => Some(resolve_index(t, normal_count, line)?),
        _ => None,
    };
    Ok((v, n))
}
