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

//! Harmonic UV parametrization: one sparse Laplacian solve per axis.

pub mod harmonic;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::{MeshFlowError, Result},
    geometry::{
        Vec3,
        util::{DIRECTION_EPS, EDGE_EPS},
    },
    linear::{SolveReport, SolverConfig},
    mesh::{MeshData, TopologyBuilder, find_seams},
};

pub use harmonic::{AxisSystem, assemble_system, solve_axis};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParametrizeConfig {
    /// Strength `lambda >= 0` of the soft seam constraints.
    pub seam_weight: f64,
    /// Rest positions closer than this are treated as one seam.
    pub seam_tolerance: f32,
    /// Lower clamp for edge lengths before inversion.
    pub edge_epsilon: f64,
    /// Averaged directions shorter than this fall back to the first sample.
    pub direction_threshold: f64,
    pub pinned_vertex: usize,
    pub solver: SolverConfig,
}

impl Default for ParametrizeConfig {
    fn default() -> Self {
        Self {
            seam_weight: 1.0,
            seam_tolerance: 1e-5,
            edge_epsilon: EDGE_EPS,
            direction_threshold: DIRECTION_EPS,
            pinned_vertex: 0,
            solver: SolverConfig::default(),
        }
    }
}

impl ParametrizeConfig {
    pub fn with_seam_weight(mut self, seam_weight: f64) -> Self {
        self.seam_weight = seam_weight;
        self
    }

    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.seam_weight >= 0.0) || !self.seam_weight.is_finite() {
            return Err(MeshFlowError::Config(format!(
                "seam_weight must be finite and non-negative, got {}",
                self.seam_weight
            )));
        }
        if !(self.edge_epsilon > 0.0) {
            return Err(MeshFlowError::Config(format!(
                "edge_epsilon must be positive, got {}",
                self.edge_epsilon
            )));
        }
        if !(self.seam_tolerance >= 0.0) {
            return Err(MeshFlowError::Config(format!(
                "seam_tolerance must be non-negative, got {}",
                self.seam_tolerance
            )));
        }
        if !(self.solver.tolerance > 0.0) || self.solver.max_iterations == 0 {
            return Err(MeshFlowError::Config(
                "solver needs a positive tolerance and at least one iteration".into(),
            ));
        }
        Ok(())
    }
}

/// Per-vertex UV coordinates plus the report of each axis solve.
#[derive(Debug, Clone)]
pub struct Parametrization {
    pub u: Vec<f64>,
    pub v: Vec<f64>,
    /// `[u, v]`.
    pub reports: [SolveReport; 2],
    pub seams: Vec<(u32, u32)>,
}

impl Parametrization {
    pub fn converged(&self) -> bool {
        self.reports.iter().all(|r| r.converged)
    }

    pub fn uv(&self, vertex: usize) -> [f64; 2] {
        [self.u[vertex], self.v[vertex]]
    }
}

/// Tangent directions (`xyz`) and binormals `w * (normal x tangent)`.
pub fn tangent_frames(mesh: &MeshData) -> Result<(Vec<Vec3<f32>>, Vec<Vec3<f32>>)> {
    if mesh.tangents.is_empty() || mesh.normals.is_empty() {
        return Err(MeshFlowError::Config(
            "parametrization needs per-vertex normals and tangents".into(),
        ));
    }
    mesh.validate_attributes()?;

    let (tangents, binormals) = mesh
        .tangents
        .iter()
        .zip(&mesh.normals)
        .map(|(&[x, y, z, w], normal)| {
            let t = Vec3::new(x, y, z);
            let sign = if w < 0.0 { -1.0 } else { 1.0 };
            (t, normal.cross(&t).scale(sign))
        })
        .unzip();
    Ok((tangents, binormals))
}

/// Parametrizes `mesh`, detecting seams from coincident rest positions.
pub fn parametrize(mesh: &MeshData, config: &ParametrizeConfig) -> Result<Parametrization> {
    config.validate()?;
    let seams = find_seams(&mesh.rest_positions, config.seam_tolerance);
    parametrize_with_seams(mesh, seams, config)
}

/// Parametrizes `mesh` with a caller-supplied seam set.
pub fn parametrize_with_seams(
    mesh: &MeshData,
    seams: Vec<(u32, u32)>,
    config: &ParametrizeConfig,
) -> Result<Parametrization> {
    config.validate()?;
    let topology = TopologyBuilder::new(mesh.vertex_count()).build_mesh(mesh)?;
    let (tangents, binormals) = tangent_frames(mesh)?;
    let positions = &mesh.rest_positions;

    let (u, u_report) = solve_axis(positions, &tangents, topology.edges(), &seams, config)?;
    let (v, v_report) = solve_axis(positions, &binormals, topology.edges(), &seams, config)?;

    info!(
        vertices = mesh.vertex_count(),
        seams = seams.len(),
        u_iterations = u_report.iterations,
        v_iterations = v_report.iterations,
        converged = u_report.converged && v_report.converged,
        "parametrization finished"
    );
    Ok(Parametrization {
        u,
        v,
        reports: [u_report, v_report],
        seams,
    })
}
