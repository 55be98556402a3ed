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
        buffers::FrameView,
        kernel::{FlowKernel, Incidence},
    },
    geometry::util::relative_stretch,
    mesh::AdjacencyKind,
};

/// Mean relative stretch of a vertex's incident edges.
///
/// Positive under tension, negative under compression, `0` for an isolated
/// vertex.
#[derive(Debug, Clone, Copy)]
pub struct ElasticityKernel {
    pub edge_epsilon: f32,
}

impl ElasticityKernel {
    pub fn new(config: &FlowConfig) -> Self {
        Self {
            edge_epsilon: config.edge_epsilon,
        }
    }
}

impl Default for ElasticityKernel {
    fn default() -> Self {
        Self::new(&FlowConfig::default())
    }
}

impl FlowKernel for ElasticityKernel {
    type Accum = [f32; 1];
    type Output = f32;

    const ADJACENCY: AdjacencyKind = AdjacencyKind::Plain;

    fn name(&self) -> &'static str {
        "elasticity"
    }

    fn contribute(&self, vertex: usize, incidence: Incidence, frame: &FrameView<'_>) -> [f32; 1] {
        let Incidence::Edge { to } = incidence else {
            return [0.0];
        };
        let to = to as usize;
        [relative_stretch(
            &frame.rest_edge(vertex, to),
            &frame.current_edge(vertex, to),
            self.edge_epsilon,
        )]
    }

    fn finish(&self, _vertex: usize, accum: &[f32; 1], degree: u32, _frame: &FrameView<'_>) -> f32 {
        if degree == 0 {
            return 0.0;
        }
        accum[0] / degree as f32
    }
}
