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

use ahash::AHashSet;
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::{
    error::{MeshFlowError, Result},
    mesh::{
        basic_types::{MeshData, SubMesh, Triangle},
        canonical_edge::CanonicalEdge,
    },
};

/// Which per-vertex neighbourhood a consumer walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdjacencyKind {
    /// One-ring neighbour indices, one entry per incident edge.
    Plain,
    /// The ordered opposite pair `(b, c)` of every incident triangle.
    Wedge,
}

pub type NeighborList = SmallVec<[u32; 8]>;
pub type WedgeList = SmallVec<[[u32; 2]; 8]>;

/// Edge set and adjacency derived from triangle indices.
#[derive(Debug, Clone)]
pub struct Topology {
    vertex_count: usize,
    edges: Vec<CanonicalEdge>,
    triangles: Vec<Triangle>,
    neighbors: Vec<NeighborList>,
    wedges: Option<Vec<WedgeList>>,
    degenerate_triangles: usize,
}

impl Topology {
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Deduplicated edges, sorted.
    #[inline]
    pub fn edges(&self) -> &[CanonicalEdge] {
        &self.edges
    }

    /// Non-degenerate triangles of all sub-meshes.
    #[inline]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    #[inline]
    pub fn neighbors(&self, v: usize) -> &[u32] {
        &self.neighbors[v]
    }

    #[inline]
    pub fn degree(&self, v: usize) -> usize {
        self.neighbors[v].len()
    }

    /// Incident-triangle opposite pairs of `v`, when the wedge variant was built.
    pub fn wedges(&self, v: usize) -> Option<&[[u32; 2]]> {
        self.wedges.as_ref().map(|w| w[v].as_slice())
    }

    pub fn has_wedges(&self) -> bool {
        self.wedges.is_some()
    }

    /// Triangles dropped because two of their corners share an index.
    pub fn degenerate_triangles(&self) -> usize {
        self.degenerate_triangles
    }

    pub fn are_adjacent(&self, a: u32, b: u32) -> bool {
        CanonicalEdge::new(a, b)
            .map(|e| self.edges.binary_search(&e).is_ok())
            .unwrap_or(false)
    }

    pub fn isolated_vertices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.vertex_count).filter(|&v| self.neighbors[v].is_empty())
    }
}

/// One-shot builder turning triangle groups into a [`Topology`].
#[derive(Debug, Clone)]
pub struct TopologyBuilder {
    vertex_count: usize,
    with_wedges: bool,
}

impl TopologyBuilder {
    pub fn new(vertex_count: usize) -> Self {
        Self {
            vertex_count,
            with_wedges: false,
        }
    }

    /// Also record the per-triangle opposite pairs of every vertex.
    pub fn with_wedges(mut self, enabled: bool) -> Self {
        self.with_wedges = enabled;
        self
    }

    pub fn for_kind(vertex_count: usize, kind: AdjacencyKind) -> Self {
        Self::new(vertex_count).with_wedges(kind == AdjacencyKind::Wedge)
    }

    pub fn build_mesh(&self, mesh: &MeshData) -> Result<Topology> {
        self.build(&mesh.sub_meshes)
    }

    pub fn build_triangles(&self, triangles: &[Triangle]) -> Result<Topology> {
        self.build_groups(std::iter::once(triangles))
    }

    pub fn build(&self, sub_meshes: &[SubMesh]) -> Result<Topology> {
        self.build_groups(sub_meshes.iter().map(|s| s.triangles.as_slice()))
    }

    fn build_groups<'a>(&self, groups: impl Iterator<Item = &'a [Triangle]> + Clone) -> Result<Topology> {
        let n = self.vertex_count;
        if n == 0 {
            return Err(MeshFlowError::EmptyMesh);
        }

        // fail fast before anything indexes per-vertex storage
        for (sub_mesh, tris) in groups.clone().enumerate() {
            for (triangle, tri) in tris.iter().enumerate() {
                if let Some(&index) = tri.iter().find(|&&v| v as usize >= n) {
                    return Err(MeshFlowError::VertexOutOfRange {
                        sub_mesh,
                        triangle,
                        index,
                        vertex_count: n,
                    });
                }
            }
        }

        let mut edge_set: AHashSet<CanonicalEdge> = AHashSet::default();
        let mut triangles = Vec::new();
        let mut wedges: Option<Vec<WedgeList>> =
            self.with_wedges.then(|| vec![WedgeList::new(); n]);
        let mut degenerate = 0usize;

        for tris in groups {
            for &[a, b, c] in tris {
                let mut emitted = 0;
                for (p, q) in [(a, b), (b, c), (c, a)] {
                    if let Some(e) = CanonicalEdge::new(p, q) {
                        edge_set.insert(e);
                        emitted += 1;
                    }
                }
                if emitted < 3 {
                    degenerate += 1;
                    continue;
                }
                triangles.push([a, b, c]);
                if let Some(w) = wedges.as_mut() {
                    w[a as usize].push([b, c]);
                    w[b as usize].push([c, a]);
                    w[c as usize].push([a, b]);
                }
            }
        }

        let mut edges: Vec<CanonicalEdge> = edge_set.into_iter().collect();
        edges.sort_unstable();

        let mut neighbors = vec![NeighborList::new(); n];
        for e in &edges {
            neighbors[e.a as usize].push(e.b);
            neighbors[e.b as usize].push(e.a);
        }

        if degenerate > 0 {
            warn!(degenerate, "skipped degenerate triangles while building topology");
        }
        debug!(
            vertices = n,
            edges = edges.len(),
            triangles = triangles.len(),
            wedges = self.with_wedges,
            "built mesh topology"
        );

        Ok(Topology {
            vertex_count: n,
            edges,
            triangles,
            neighbors,
            wedges,
            degenerate_triangles: degenerate,
        })
    }
}
