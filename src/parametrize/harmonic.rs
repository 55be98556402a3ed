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

//! Per-axis assembly and solve of the harmonic parametrization system.
//!
//! For every edge `(i, j)` with weight `w = 1 / max(eps, |v_j - v_i|)` and
//! projected length `p = (v_j - v_i) . d`:
//!
//! ```text
//! A_ii += w   A_jj += w   A_ij -= w   A_ji -= w
//! b_i  -= w p              b_j  += w p
//! ```
//!
//! Seams add the same stencil with weight `lambda` and no right-hand side.
//! The pinned vertex gets an identity row and column with `b = 0`.

use tracing::debug;

use crate::{
    error::{MeshFlowError, Result},
    geometry::{
        Vec3,
        util::{averaged_direction, clamped_inverse_length},
    },
    linear::{CsrBuilder, CsrMatrix, SolveReport, solve},
    mesh::CanonicalEdge,
    parametrize::ParametrizeConfig,
};

/// Right-hand side and matrix for one axis.
#[derive(Debug, Clone)]
pub struct AxisSystem {
    pub matrix: CsrMatrix<f64>,
    pub rhs: Vec<f64>,
}

/// Builds the system for one axis driven by `field`.
pub fn assemble_system(
    positions: &[Vec3<f32>],
    field: &[Vec3<f32>],
    edges: &[CanonicalEdge],
    seams: &[(u32, u32)],
    config: &ParametrizeConfig,
) -> Result<AxisSystem> {
    let n = positions.len();
    if n == 0 {
        return Err(MeshFlowError::EmptyMesh);
    }
    MeshFlowError::check_len("direction field", n, field.len())?;
    if config.pinned_vertex >= n {
        return Err(MeshFlowError::Config(format!(
            "pinned vertex {} is outside a mesh of {n} vertices",
            config.pinned_vertex
        )));
    }
    let out_of_range = |i: u32| (i as usize) >= n;
    if let Some(e) = edges.iter().find(|e| out_of_range(e.a) || out_of_range(e.b)) {
        return Err(MeshFlowError::DimensionMismatch(format!(
            "edge ({}, {}) references a vertex outside 0..{n}",
            e.a, e.b
        )));
    }
    if let Some(&(i, j)) = seams.iter().find(|&&(i, j)| out_of_range(i) || out_of_range(j)) {
        return Err(MeshFlowError::DimensionMismatch(format!(
            "seam ({i}, {j}) references a vertex outside 0..{n}"
        )));
    }

    let mut builder = CsrBuilder::<f64>::new_square(n);
    let mut rhs = vec![0.0_f64; n];

    for edge in edges {
        let (i, j) = (edge.a as usize, edge.b as usize);
        let vi = positions[i].cast::<f64>();
        let vj = positions[j].cast::<f64>();
        let delta = vj - vi;
        let w = clamped_inverse_length(&delta, config.edge_epsilon);

        let dir = averaged_direction(
            &field[i].cast::<f64>(),
            &field[j].cast::<f64>(),
            config.direction_threshold,
        );
        let proj = delta.dot(&dir);

        builder.add_laplacian_edge(i, j, w);
        rhs[i] -= w * proj;
        rhs[j] += w * proj;
    }

    // a zero weight leaves the matrix identical to the seamless one
    if config.seam_weight > 0.0 {
        for &(i, j) in seams {
            if i != j {
                builder.add_laplacian_edge(i as usize, j as usize, config.seam_weight);
            }
        }
    }

    let k = config.pinned_vertex;
    builder.pin(k);
    rhs[k] = 0.0;

    let matrix = builder.build();
    debug!(
        vertices = n,
        edges = edges.len(),
        seams = seams.len(),
        nnz = matrix.nnz(),
        "assembled parametrization system"
    );
    Ok(AxisSystem { matrix, rhs })
}

/// Assembles and solves one axis. The solution always has one entry per
/// vertex; a solve that runs out of iterations keeps its best iterate.
pub fn solve_axis(
    positions: &[Vec3<f32>],
    field: &[Vec3<f32>],
    edges: &[CanonicalEdge],
    seams: &[(u32, u32)],
    config: &ParametrizeConfig,
) -> Result<(Vec<f64>, SolveReport)> {
    let system = assemble_system(positions, field, edges, seams, config)?;
    let mut x = vec![0.0_f64; positions.len()];
    let report = solve(&config.solver, &system.matrix, &system.rhs, &mut x)?;
    // the solvers never move a pinned unknown away from its zero start, but
    // keep the guarantee independent of round-off
    x[config.pinned_vertex] = 0.0;
    Ok((x, report))
}
