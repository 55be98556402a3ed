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

//! Per-frame flow solver: an Init -> Main -> Post kernel pipeline over the
//! mesh graph.

pub mod buffers;
pub mod kernel;
pub mod kernels;
pub mod pipeline;

use serde::{Deserialize, Serialize};

use crate::error::{MeshFlowError, Result};

pub use buffers::{
    Accumulator, EigenFrame, FixedPointLanes, FrameInput, FrameView, ResultBuffer, StrainTensor,
};
pub use kernel::{FlowKernel, Incidence};
pub use kernels::{DeformationKernel, ElasticityKernel, SmoothKernel, StrainKernel, VertexState};
pub use pipeline::{DispatchOutcome, FlowSolver, Stage};

/// How Main combines contributions that land on the same vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccumulationScheme {
    /// One invocation per vertex reading its own adjacency span.
    #[default]
    Gather,
    /// One invocation per edge or triangle adding into fixed-point atomics.
    Scatter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    pub scheme: AccumulationScheme,
    /// Lower clamp for rest edge lengths and normal magnitudes.
    pub edge_epsilon: f32,
    /// Blend factor of [`SmoothKernel`] towards the one-ring mean.
    pub smoothing: f32,
    /// Resolution of the scatter scheme's fixed-point lanes, in bits below the
    /// largest per-vertex sum of the frame.
    pub fixed_point_bits: u32,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            scheme: AccumulationScheme::Gather,
            edge_epsilon: 1e-6,
            smoothing: 0.5,
            fixed_point_bits: 48,
        }
    }
}

impl FlowConfig {
    pub fn with_scheme(mut self, scheme: AccumulationScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.edge_epsilon > 0.0) {
            return Err(MeshFlowError::Config(format!(
                "edge_epsilon must be positive, got {}",
                self.edge_epsilon
            )));
        }
        let max_bits = FixedPointLanes::MAX_PRECISION_BITS;
        if !(24..=max_bits).contains(&self.fixed_point_bits) {
            return Err(MeshFlowError::Config(format!(
                "fixed_point_bits must be in 24..={max_bits}, got {}",
                self.fixed_point_bits
            )));
        }
        Ok(())
    }
}
