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

//! Flat, upload-ready buffers derived from a [`Topology`].
//!
//! Adjacency lists are concatenated in vertex order and addressed through a
//! `(start, end)` span per vertex. Both layouts are immutable once built and
//! only need rebuilding when the triangle indices change.

use bytemuck::{Pod, Zeroable};
use tracing::debug;

use crate::mesh::topology::Topology;

/// Half-open element range `[start, end)` into a flat adjacency array.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct GpuSpan {
    pub start: u32,
    pub end: u32,
}

impl GpuSpan {
    #[inline]
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[inline]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start as usize..self.end as usize
    }
}

/// CSR one-ring layout: `adjacency[spans[i].range()]` are the neighbours of `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphLayout {
    adjacency: Vec<u32>,
    spans: Vec<GpuSpan>,
    degree: Vec<u32>,
}

impl GraphLayout {
    pub fn from_topology(topology: &Topology) -> Self {
        let n = topology.vertex_count();
        let mut adjacency = Vec::with_capacity(2 * topology.edge_count());
        let mut spans = Vec::with_capacity(n);
        let mut degree = Vec::with_capacity(n);

        for v in 0..n {
            let start = adjacency.len() as u32;
            adjacency.extend_from_slice(topology.neighbors(v));
            let end = adjacency.len() as u32;
            spans.push(GpuSpan { start, end });
            degree.push(end - start);
        }

        debug!(
            vertices = n,
            entries = adjacency.len(),
            bytes = adjacency.len() * 4 + spans.len() * 8 + degree.len() * 4,
            "packed graph layout"
        );

        Self {
            adjacency,
            spans,
            degree,
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.spans.len()
    }

    #[inline]
    pub fn neighbors(&self, v: usize) -> &[u32] {
        &self.adjacency[self.spans[v].range()]
    }

    #[inline]
    pub fn degree(&self, v: usize) -> u32 {
        self.degree[v]
    }

    pub fn adjacency(&self) -> &[u32] {
        &self.adjacency
    }

    pub fn spans(&self) -> &[GpuSpan] {
        &self.spans
    }

    pub fn degrees(&self) -> &[u32] {
        &self.degree
    }

    pub fn adjacency_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.adjacency)
    }

    pub fn span_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.spans)
    }

    pub fn degree_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.degree)
    }

    /// Contiguity, coverage and range checks over the packed arrays.
    pub fn is_consistent(&self) -> bool {
        let n = self.vertex_count() as u32;
        let contiguous = self.spans.windows(2).all(|w| w[0].end == w[1].start);
        let first = self.spans.first().is_none_or(|s| s.start == 0);
        let covers = self
            .spans
            .last()
            .is_none_or(|s| s.end as usize == self.adjacency.len());
        let degrees = self
            .spans
            .iter()
            .zip(&self.degree)
            .all(|(s, &d)| s.start <= s.end && s.len() as u32 == d);
        let in_range = self.adjacency.iter().all(|&v| v < n);
        contiguous && first && covers && degrees && in_range
    }
}

/// CSR layout over incident-triangle opposite pairs.
///
/// Each triangle contributes one pair to each of its corners, so the flat
/// array holds one pair per directed half-edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WedgeLayout {
    wedges: Vec<[u32; 2]>,
    spans: Vec<GpuSpan>,
}

impl WedgeLayout {
    /// `None` when the topology was built without wedges.
    pub fn from_topology(topology: &Topology) -> Option<Self> {
        if !topology.has_wedges() {
            return None;
        }
        let n = topology.vertex_count();
        let mut wedges = Vec::with_capacity(3 * topology.triangles().len());
        let mut spans = Vec::with_capacity(n);
        for v in 0..n {
            let start = wedges.len() as u32;
            wedges.extend_from_slice(topology.wedges(v)?);
            spans.push(GpuSpan {
                start,
                end: wedges.len() as u32,
            });
        }
        Some(Self { wedges, spans })
    }

    #[inline]
    pub fn wedges(&self, v: usize) -> &[[u32; 2]] {
        &self.wedges[self.spans[v].range()]
    }

    pub fn spans(&self) -> &[GpuSpan] {
        &self.spans
    }

    /// Flat `u32` view: two indices per half-edge.
    pub fn flat_indices(&self) -> &[u32] {
        bytemuck::cast_slice(&self.wedges)
    }

    pub fn wedge_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.wedges)
    }
}
