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

use meshflow::mesh::{GpuSpan, GraphLayout, TopologyBuilder, WedgeLayout};

/// Two quads split into four triangles on a 3x2 grid, plus one unused vertex.
fn strip_triangles() -> Vec<[u32; 3]> {
    vec![[0, 1, 4], [0, 4, 3], [1, 2, 5], [1, 5, 4]]
}

#[test]
fn spans_are_contiguous_and_cover_adjacency() {
    let topo = TopologyBuilder::new(7)
        .build_triangles(&strip_triangles())
        .unwrap();
    let layout = GraphLayout::from_topology(&topo);

    assert!(layout.is_consistent());
    assert_eq!(layout.vertex_count(), 7);
    assert_eq!(layout.adjacency().len(), 2 * topo.edge_count());
    assert_eq!(layout.spans()[0].start, 0);
    assert_eq!(layout.spans()[6].end as usize, layout.adjacency().len());
    for w in layout.spans().windows(2) {
        assert_eq!(w[0].end, w[1].start);
    }
}

#[test]
fn layout_mirrors_topology() {
    let topo = TopologyBuilder::new(7)
        .build_triangles(&strip_triangles())
        .unwrap();
    let layout = GraphLayout::from_topology(&topo);
    for v in 0..7 {
        assert_eq!(layout.neighbors(v), topo.neighbors(v));
        assert_eq!(layout.degree(v) as usize, topo.degree(v));
        assert_eq!(layout.spans()[v].len(), topo.degree(v));
    }
    assert!(layout.spans()[6].is_empty());
    assert_eq!(layout.degree(6), 0);
}

#[test]
fn byte_views_match_element_sizes() {
    let topo = TopologyBuilder::new(7)
        .build_triangles(&strip_triangles())
        .unwrap();
    let layout = GraphLayout::from_topology(&topo);
    assert_eq!(layout.adjacency_bytes().len(), 4 * layout.adjacency().len());
    assert_eq!(layout.span_bytes().len(), 8 * 7);
    assert_eq!(layout.degree_bytes().len(), 4 * 7);
    assert_eq!(std::mem::size_of::<GpuSpan>(), 8);
}

#[test]
fn wedge_layout_holds_one_pair_per_corner() {
    let tris = strip_triangles();
    let topo = TopologyBuilder::new(7)
        .with_wedges(true)
        .build_triangles(&tris)
        .unwrap();
    let wedges = WedgeLayout::from_topology(&topo).unwrap();

    assert_eq!(wedges.flat_indices().len(), 2 * 3 * tris.len());
    assert_eq!(wedges.wedge_bytes().len(), 4 * wedges.flat_indices().len());
    assert_eq!(wedges.spans().last().unwrap().end as usize, 3 * tris.len());
    // vertex 4 touches three of the four triangles
    assert_eq!(wedges.wedges(4).len(), 3);
    for pair in wedges.wedges(4) {
        assert!(pair.iter().all(|&v| v != 4));
    }
}

#[test]
fn wedge_layout_requires_wedge_topology() {
    let topo = TopologyBuilder::new(7)
        .build_triangles(&strip_triangles())
        .unwrap();
    assert!(WedgeLayout::from_topology(&topo).is_none());
}
