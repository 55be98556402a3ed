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

use serde::{Deserialize, Serialize};

use crate::{
    error::{MeshFlowError, Result},
    flow::{
        FlowConfig,
        buffers::FrameView,
        kernel::{FlowKernel, Incidence},
    },
    geometry::Vec3,
    mesh::AdjacencyKind,
};

/// Whether Post may move a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VertexState {
    /// Pinned to its skinned position.
    Fixed,
    #[default]
    Float,
}

/// Laplacian smoothing of the current positions.
///
/// Floating vertices move `strength` of the way towards the mean of their
/// one-ring; fixed and isolated vertices pass through unchanged. Output is
/// `[x, y, z, 1]`.
///
/// With `tangential` set and normals supplied for the frame, the step is
/// projected onto the tangent plane so the surface does not shrink.
#[derive(Debug, Clone)]
pub struct SmoothKernel {
    pub strength: f32,
    pub tangential: bool,
    states: Vec<VertexState>,
}

impl SmoothKernel {
    /// Every vertex floating.
    pub fn new(config: &FlowConfig) -> Self {
        Self {
            strength: config.smoothing,
            tangential: false,
            states: Vec::new(),
        }
    }

    pub fn with_tangential(mut self, tangential: bool) -> Self {
        self.tangential = tangential;
        self
    }

    pub fn with_states(mut self, states: Vec<VertexState>) -> Self {
        self.states = states;
        self
    }

    #[inline]
    pub fn state(&self, vertex: usize) -> VertexState {
        self.states.get(vertex).copied().unwrap_or_default()
    }
}

impl FlowKernel for SmoothKernel {
    // [sum.xyz, count]
    type Accum = [f32; 4];
    type Output = [f32; 4];

    const ADJACENCY: AdjacencyKind = AdjacencyKind::Plain;

    fn name(&self) -> &'static str {
        "smooth"
    }

    fn validate(&self, vertex_count: usize) -> Result<()> {
        if !self.states.is_empty() {
            MeshFlowError::check_len("vertex states", vertex_count, self.states.len())?;
        }
        if !(0.0..=1.0).contains(&self.strength) {
            return Err(MeshFlowError::Config(format!(
                "smoothing strength {} is outside [0, 1]",
                self.strength
            )));
        }
        Ok(())
    }

    fn contribute(&self, _vertex: usize, incidence: Incidence, frame: &FrameView<'_>) -> [f32; 4] {
        let Incidence::Edge { to } = incidence else {
            return [0.0; 4];
        };
        let p = frame.current(to as usize);
        [p.x, p.y, p.z, 1.0]
    }

    fn finish(&self, vertex: usize, accum: &[f32; 4], degree: u32, frame: &FrameView<'_>) -> [f32; 4] {
        let p = frame.current(vertex);
        if degree == 0 || accum[3] <= 0.0 || self.state(vertex) == VertexState::Fixed {
            return [p.x, p.y, p.z, 1.0];
        }
        let inv = 1.0 / accum[3];
        let mean = Vec3::new(accum[0] * inv, accum[1] * inv, accum[2] * inv);
        let mut step = (mean - p).scale(self.strength);
        if self.tangential {
            if let Some(n) = frame.normal(vertex).and_then(|n| n.try_normalized(1e-12)) {
                step = step - n.scale(step.dot(&n));
            }
        }
        let q = p + step;
        [q.x, q.y, q.z, 1.0]
    }
}
