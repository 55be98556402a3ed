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
        buffers::{FrameView, StrainTensor},
        kernel::{FlowKernel, Incidence},
    },
    geometry::util::relative_stretch,
    mesh::AdjacencyKind,
};

/// Splits edge stretch into a compression row and a tension row.
///
/// Each edge adds `|s| * |dir|` to the row selected by the sign of its
/// relative stretch `s`, where `dir` is the unit current edge direction taken
/// component-wise absolute so the two endpoints agree. Post divides by degree.
#[derive(Debug, Clone, Copy)]
pub struct StrainKernel {
    pub edge_epsilon: f32,
}

impl StrainKernel {
    pub fn new(config: &FlowConfig) -> Self {
        Self {
            edge_epsilon: config.edge_epsilon,
        }
    }
}

impl Default for StrainKernel {
    fn default() -> Self {
        Self::new(&FlowConfig::default())
    }
}

impl FlowKernel for StrainKernel {
    // [compression.xyz, tension.xyz]
    type Accum = [f32; 6];
    type Output = StrainTensor;

    const ADJACENCY: AdjacencyKind = AdjacencyKind::Plain;

    fn name(&self) -> &'static str {
        "strain"
    }

    fn contribute(&self, vertex: usize, incidence: Incidence, frame: &FrameView<'_>) -> [f32; 6] {
        let mut out = [0.0; 6];
        let Incidence::Edge { to } = incidence else {
            return out;
        };
        let to = to as usize;
        let rest = frame.rest_edge(vertex, to);
        let current = frame.current_edge(vertex, to);
        let s = relative_stretch(&rest, &current, self.edge_epsilon);

        let dir = current
            .try_normalized(self.edge_epsilon)
            .or_else(|| rest.try_normalized(self.edge_epsilon))
            .map(|d| d.abs().scale(s.abs()));
        let Some(dir) = dir else {
            return out;
        };

        let row = if s < 0.0 { 0 } else { 3 };
        out[row..row + 3].copy_from_slice(&dir.to_array());
        out
    }

    fn finish(
        &self,
        _vertex: usize,
        accum: &[f32; 6],
        degree: u32,
        _frame: &FrameView<'_>,
    ) -> StrainTensor {
        if degree == 0 {
            return StrainTensor::default();
        }
        let inv = 1.0 / degree as f32;
        StrainTensor {
            compression: [accum[0] * inv, accum[1] * inv, accum[2] * inv],
            tension: [accum[3] * inv, accum[4] * inv, accum[5] * inv],
        }
    }
}
