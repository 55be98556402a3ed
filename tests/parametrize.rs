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

use meshflow::{
    MeshFlowError,
    geometry::Vec3,
    linear::{SolverConfig, SolverKind},
    mesh::{MeshData, find_seams},
    parametrize::{ParametrizeConfig, parametrize, parametrize_with_seams, tangent_frames},
};

/// Flat `w x h` vertex grid with unit spacing, tangents along +x.
fn flat_grid(w: u32, h: u32) -> MeshData {
    let mut positions = Vec::new();
    for j in 0..h {
        for i in 0..w {
            positions.push(Vec3::new(i as f32, j as f32, 0.0));
        }
    }
    let mut triangles = Vec::new();
    for j in 0..h - 1 {
        for i in 0..w - 1 {
            let v = j * w + i;
            triangles.push([v, v + 1, v + w + 1]);
            triangles.push([v, v + w + 1, v + w]);
        }
    }
    let n = positions.len();
    MeshData::new(positions, triangles)
        .with_normals(vec![Vec3::new(0.0, 0.0, 1.0); n])
        .with_tangents(vec![[1.0, 0.0, 0.0, 1.0]; n])
}

fn seam_gap(mesh: &MeshData, seams: &[(u32, u32)], weight: f64) -> f64 {
    let config = ParametrizeConfig::default().with_seam_weight(weight);
    let uv = parametrize_with_seams(mesh, seams.to_vec(), &config).unwrap();
    seams
        .iter()
        .map(|&(i, j)| (uv.u[i as usize] - uv.u[j as usize]).abs())
        .sum()
}

#[test]
fn aligned_fields_reproduce_grid_coordinates() {
    let mesh = flat_grid(4, 3);
    let uv = parametrize(&mesh, &ParametrizeConfig::default()).unwrap();
    assert!(uv.converged());
    assert!(uv.seams.is_empty());
    for (k, p) in mesh.rest_positions.iter().enumerate() {
        let [u, v] = uv.uv(k);
        assert!((u - p.x as f64).abs() < 1e-6, "u[{k}] = {u}");
        assert!((v - p.y as f64).abs() < 1e-6, "v[{k}] = {v}");
    }
}

#[test]
fn pinned_vertex_is_exactly_zero() {
    let mut mesh = flat_grid(3, 3);
    for p in &mut mesh.rest_positions {
        *p = *p + Vec3::new(10.0, -4.0, 0.0);
    }
    for solver in [SolverKind::BiCgStab, SolverKind::ConjugateGradient] {
        let config = ParametrizeConfig::default()
            .with_solver(SolverConfig::default().with_kind(solver));
        let uv = parametrize(&mesh, &config).unwrap();
        assert_eq!(uv.u[0], 0.0);
        assert_eq!(uv.v[0], 0.0);
    }

    let config = ParametrizeConfig {
        pinned_vertex: 4,
        ..Default::default()
    };
    let uv = parametrize(&mesh, &config).unwrap();
    assert_eq!(uv.uv(4), [0.0, 0.0]);
    assert!((uv.u[0] + 1.0).abs() < 1e-6);
}

#[test]
fn flipped_handedness_flips_v() {
    let mut mesh = flat_grid(3, 2);
    for t in &mut mesh.tangents {
        t[3] = -1.0;
    }
    let uv = parametrize(&mesh, &ParametrizeConfig::default()).unwrap();
    for (k, p) in mesh.rest_positions.iter().enumerate() {
        assert!((uv.v[k] + p.y as f64).abs() < 1e-6);
    }
}

#[test]
fn seam_pull_grows_with_weight() {
    // 3x2 strip; the left and right columns are declared seams
    let mesh = flat_grid(3, 2);
    let seams = [(0, 2), (3, 5)];

    let gaps: Vec<f64> = [0.0, 0.5, 2.0, 10.0, 100.0]
        .iter()
        .map(|&w| seam_gap(&mesh, &seams, w))
        .collect();
    assert!((gaps[0] - 4.0).abs() < 1e-6, "{gaps:?}");
    for w in gaps.windows(2) {
        assert!(w[1] < w[0], "{gaps:?}");
    }
    assert!(gaps[4] < 0.1, "{gaps:?}");
}

#[test]
fn zero_seam_weight_matches_no_seams() {
    let mesh = flat_grid(3, 2);
    let config = ParametrizeConfig::default().with_seam_weight(0.0);
    let with = parametrize_with_seams(&mesh, vec![(0, 2), (3, 5)], &config).unwrap();
    let without = parametrize_with_seams(&mesh, Vec::new(), &config).unwrap();
    assert_eq!(with.u, without.u);
    assert_eq!(with.v, without.v);
}

#[test]
fn duplicated_positions_become_seams() {
    let mut mesh = flat_grid(3, 2);
    // split vertex 4 into two coincident copies
    let n = mesh.vertex_count() as u32;
    mesh.rest_positions.push(mesh.rest_positions[4]);
    mesh.normals.push(Vec3::new(0.0, 0.0, 1.0));
    mesh.tangents.push([1.0, 0.0, 0.0, 1.0]);
    for tri in &mut mesh.sub_meshes[0].triangles {
        if tri.contains(&5) {
            for v in tri.iter_mut() {
                if *v == 4 {
                    *v = n;
                }
            }
        }
    }

    let uv = parametrize(&mesh, &ParametrizeConfig::default()).unwrap();
    assert_eq!(uv.seams, vec![(4, n)]);
    assert!((uv.u[4] - uv.u[n as usize]).abs() < 1e-6);
}

#[test]
fn seam_detection_is_sorted_and_free_of_self_pairs() {
    let a = Vec3::new(0.25, 0.5, 0.0);
    let b = Vec3::new(3.0, -1.0, 2.0);
    let positions = vec![a, b, a, Vec3::new(7.0, 7.0, 7.0), b, a + Vec3::new(1e-7, 0.0, 0.0)];
    let seams = find_seams(&positions, 1e-5);
    assert_eq!(seams, vec![(0, 2), (0, 5), (1, 4), (2, 5)]);
    assert!(seams.iter().all(|&(i, j)| i < j));
}

#[test]
fn missing_attributes_are_reported() {
    let mesh = MeshData::new(
        vec![Vec3::zero(), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)],
        vec![[0, 1, 2]],
    );
    assert!(matches!(tangent_frames(&mesh), Err(MeshFlowError::Config(_))));

    let short = mesh
        .clone()
        .with_normals(vec![Vec3::new(0.0, 0.0, 1.0); 3])
        .with_tangents(vec![[1.0, 0.0, 0.0, 1.0]; 2]);
    assert!(matches!(
        parametrize(&short, &ParametrizeConfig::default()),
        Err(MeshFlowError::BufferLength { buffer: "tangents", expected: 3, actual: 2 })
    ));
}

#[test]
fn negative_seam_weight_is_rejected() {
    let mesh = flat_grid(2, 2);
    let config = ParametrizeConfig::default().with_seam_weight(-1.0);
    assert!(matches!(parametrize(&mesh, &config), Err(MeshFlowError::Config(_))));
}

#[test]
fn iteration_cap_returns_best_iterate() {
    let mesh = flat_grid(6, 6);
    let config = ParametrizeConfig::default()
        .with_solver(SolverConfig::new(1e-14, 1).with_kind(SolverKind::ConjugateGradient));
    let uv = parametrize(&mesh, &config).unwrap();
    assert!(!uv.converged());
    assert_eq!(uv.u.len(), 36);
    assert!(uv.u.iter().chain(&uv.v).all(|x| x.is_finite()));
    assert_eq!(uv.u[0], 0.0);
}
