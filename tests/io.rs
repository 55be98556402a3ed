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

use std::io::Cursor;

use meshflow::{
    MeshFlowError,
    geometry::Vec3,
    io::{read_obj, read_obj_from, write_obj},
    mesh::{MeshData, SubMesh},
};

fn quad() -> MeshData {
    MeshData {
        rest_positions: vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.5),
        ],
        normals: vec![Vec3::new(0.0, 0.0, 1.0); 4],
        tangents: Vec::new(),
        sub_meshes: vec![
            SubMesh::new("lower", vec![[0, 1, 2]]),
            SubMesh::new("upper", vec![[0, 2, 3]]),
        ],
    }
}

#[test]
fn obj_file_round_trip_keeps_groups_and_normals() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quad.obj");
    let mesh = quad();
    write_obj(&mesh, &path).unwrap();
    let back = read_obj(&path).unwrap();
    assert_eq!(back, mesh);
}

#[test]
fn polygons_are_fanned_and_groups_split() {
    let text = "\
# a pentagon and a triangle
v 0 0 0
v 1 0 0
v 2 1 0
v 1 2 0
v 0 1 0
o shape
f 1/1 2/2 3/3 4/4 5/5
usemtl red
f -1 -2 -3
";
    let mesh = read_obj_from(Cursor::new(text)).unwrap();
    assert_eq!(mesh.vertex_count(), 5);
    assert_eq!(mesh.sub_meshes.len(), 2);
    assert_eq!(mesh.sub_meshes[0].name, "shape");
    assert_eq!(mesh.sub_meshes[0].triangles, vec![[0, 1, 2], [0, 2, 3], [0, 3, 4]]);
    assert_eq!(mesh.sub_meshes[1].name, "red");
    assert_eq!(mesh.sub_meshes[1].triangles, vec![[4, 3, 2]]);
    assert!(mesh.normals.is_empty());
}

#[test]
fn face_normals_are_assigned_per_vertex() {
    let text = "\
v 0 0 0
v 1 0 0
v 0 1 0
vn 0 0 1
vn 0 0 -1
f 1//2 2//1 3/5/1
";
    let mesh = read_obj_from(Cursor::new(text)).unwrap();
    assert_eq!(
        mesh.normals,
        vec![
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, 1.0)
        ]
    );
}

#[test]
fn malformed_lines_report_their_position() {
    let cases = [
        ("v 0 0 0\nv 1 0\n", 2),
        ("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 9\n", 4),
        ("v 0 0 0\nf 1 1\n", 2),
        ("v 0 0 0\nv 1 0 0\nv 0 1 0\n\nf 0 1 2\n", 5),
        ("v a b c\n", 1),
    ];
    for (text, expected) in cases {
        match read_obj_from(Cursor::new(text)) {
            Err(MeshFlowError::Parse { line, .. }) => assert_eq!(line, expected, "{text:?}"),
            other => panic!("expected parse error for {text:?}, got {other:?}"),
        }
    }
}

#[test]
fn unreadable_stream_reports_its_line() {
    let bytes: &[u8] = b"v 0 0 0\n\xff\xfe\n";
    match read_obj_from(Cursor::new(bytes)) {
        Err(MeshFlowError::Stream { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected stream error, got {other:?}"),
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbled.obj");
    std::fs::write(&path, bytes).unwrap();
    match read_obj(&path) {
        Err(MeshFlowError::Io { path: p, .. }) => assert_eq!(p, path),
        other => panic!("expected io error, got {other:?}"),
    }
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.obj");
    match read_obj(&path) {
        Err(MeshFlowError::Io { path: p, .. }) => assert_eq!(p, path),
        other => panic!("expected io error, got {other:?}"),
    }
}
