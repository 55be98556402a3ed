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

use crate::{
    flow::{
        FlowConfig,
        buffers::{EigenFrame, FrameView},
        kernel::{FlowKernel, Incidence},
    },
    geometry::{Mat3, Vec3, symmetric_eigen, util::length_weighted_normal},
    mesh::AdjacencyKind,
};

/// Local deformation gradient from the triangle fan around a vertex.
///
/// Every incident triangle `(v, b, c)` contributes its two edge vectors and a
/// normal scaled to units of length, which keeps flat fans full rank:
///
/// ```text
/// P += c1 r1ᵀ + c2 r2ᵀ + nc nrᵀ
/// Q += r1 r1ᵀ + r2 r2ᵀ + nr nrᵀ
/// F  = P Q⁻¹,  C = Fᵀ F
/// ```
///
/// Post eigen-decomposes the right Cauchy-Green tensor `C` into an
/// [`EigenFrame`]. Isolated vertices and singular fans report the identity.
#[derive(Debug, Clone, Copy)]
pub struct DeformationKernel {
    pub edge_epsilon: f32,
}

impl DeformationKernel {
    pub fn new(config: &FlowConfig) -> Self {
        Self {
            edge_epsilon: config.edge_epsilon,
        }
    }

    pub fn gradient(&self, accum: &[f32; 18]) -> Option<Mat3<f32>> {
        let p = Mat3::from_row_major(&accum[..9]);
        let q = Mat3::from_row_major(&accum[9..]);
        let scale = q.trace();
        if !(scale > 0.0) {
            return None;
        }
        // relative to the fan's size so tiny meshes are not rejected outright
        let eps = 1e-9 * scale * scale * scale;
        q.try_inverse(eps).map(|q_inv| p * q_inv)
    }
}

impl Default for DeformationKernel {
    fn default() -> Self {
        Self::new(&FlowConfig::default())
    }
}

impl FlowKernel for DeformationKernel {
    // [P row-major, Q row-major]
    type Accum = [f32; 18];
    type Output = EigenFrame;

    const ADJACENCY: AdjacencyKind = AdjacencyKind::Wedge;

    fn name(&self) -> &'static str {
        "deformation"
    }

    fn contribute(&self, vertex: usize, incidence: Incidence, frame: &FrameView<'_>) -> [f32; 18] {
        let mut out = [0.0; 18];
        let Incidence::Wedge { b, c } = incidence else {
            return out;
        };
        let (b, c) = (b as usize, c as usize);

        let r1 = frame.rest_edge(vertex, b);
        let r2 = frame.rest_edge(vertex, c);
        let c1 = frame.current_edge(vertex, b);
        let c2 = frame.current_edge(vertex, c);

        let nr = length_weighted_normal(&r1.cross(&r2), self.edge_epsilon);
        let nc = c1
            .cross(&c2)
            .try_normalized(self.edge_epsilon)
            .map(|n| n.scale(nr.norm()))
            .unwrap_or_else(Vec3::zero);

        let p = Mat3::outer(&c1, &r1) + Mat3::outer(&c2, &r2) + Mat3::outer(&nc, &nr);
        let q = Mat3::outer(&r1, &r1) + Mat3::outer(&r2, &r2) + Mat3::outer(&nr, &nr);
        p.write_row_major(&mut out[..9]);
        q.write_row_major(&mut out[9..]);
        out
    }

    fn finish(
        &self,
        _vertex: usize,
        accum: &[f32; 18],
        degree: u32,
        _frame: &FrameView<'_>,
    ) -> EigenFrame {
        if degree == 0 {
            return EigenFrame::identity(0);
        }
        let Some(f) = self.gradient(accum) else {
            return EigenFrame::identity(degree);
        };
        let cauchy_green = f.transpose() * f;
        if !cauchy_green.is_finite() {
            return EigenFrame::identity(degree);
        }

        // f64 keeps the Jacobi sweeps stable for nearly repeated eigenvalues
        let eig = symmetric_eigen(&cauchy_green.cast::<f64>());
        let mut rows = [[0.0_f32; 4]; 4];
        for k in 0..3 {
            let v = eig.vectors[k];
            rows[k] = [v[0] as f32, v[1] as f32, v[2] as f32, eig.values[k] as f32];
        }
        rows[3] = [f.determinant(), degree as f32, 0.0, 0.0];
        EigenFrame { rows }
    }
}
