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

use bytemuck::{Pod, Zeroable};

use crate::{
    error::Result,
    flow::buffers::{Accumulator, FrameView},
    mesh::AdjacencyKind,
};

/// One element of a vertex's neighbourhood as visited by the Main stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Incidence {
    /// Edge from the accumulating vertex to `to`.
    Edge { to: u32 },
    /// Incident triangle `(vertex, b, c)` in winding order.
    Wedge { b: u32, c: u32 },
}

/// Per-element contract of a three-stage flow kernel.
///
/// * Init calls [`seed`](FlowKernel::seed) once per vertex.
/// * Main calls [`contribute`](FlowKernel::contribute) once per incidence
///   of each vertex; contributions are summed lane-wise into the vertex's
///   accumulator, so implementations must not assume any visiting order.
/// * Post calls [`finish`](FlowKernel::finish) once per vertex.
///
/// Implementations are pure functions of their arguments.
pub trait FlowKernel: Send + Sync {
    type Accum: Accumulator;
    type Output: Pod + Send + Sync;

    const ADJACENCY: AdjacencyKind;

    fn name(&self) -> &'static str;

    /// Rejects kernel parameters that do not fit the mesh.
    fn validate(&self, _vertex_count: usize) -> Result<()> {
        Ok(())
    }

    fn seed(&self, _vertex: usize, _frame: &FrameView<'_>) -> Self::Accum {
        <Self::Accum as Zeroable>::zeroed()
    }

    fn contribute(&self, vertex: usize, incidence: Incidence, frame: &FrameView<'_>) -> Self::Accum;

    /// Must return a finite value for `degree == 0`.
    fn finish(
        &self,
        vertex: usize,
        accum: &Self::Accum,
        degree: u32,
        frame: &FrameView<'_>,
    ) -> Self::Output;
}
