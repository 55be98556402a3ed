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

//! Host-side dispatch of the Init -> Main -> Post kernel sequence.
//!
//! Each stage is a flat parallel loop over independent invocations. A stage
//! returns only after every invocation has finished, which is the barrier the
//! next stage relies on.

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::{
    error::{MeshFlowError, Result},
    flow::{
        AccumulationScheme, FlowConfig,
        buffers::{Accumulator, FixedPointLanes, FrameInput, FrameView, ResultBuffer},
        kernel::{FlowKernel, Incidence},
    },
    mesh::{
        AdjacencyKind, CanonicalEdge, GraphLayout, MeshData, Topology, TopologyBuilder,
        Triangle, WedgeLayout,
    },
};

/// Position of the solver in its per-frame cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Init,
    Main,
    Post,
}

impl Stage {
    #[inline]
    pub fn next(self) -> Stage {
        match self {
            Stage::Idle => Stage::Init,
            Stage::Init => Stage::Main,
            Stage::Main => Stage::Post,
            Stage::Post => Stage::Idle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// All three stages ran; results belong to `frame`.
    Completed { frame: u64 },
    /// No current vertex buffer was available; results were left untouched.
    Skipped,
}

// ---------- Stage entry points ----------

/// Init: seed every vertex accumulator.
pub fn init_stage<K: FlowKernel>(kernel: &K, frame: &FrameView<'_>, accum: &mut [K::Accum]) {
    accum
        .par_iter_mut()
        .enumerate()
        .for_each(|(v, a)| *a = kernel.seed(v, frame));
}

/// Main, gather form: each vertex pulls from its own neighbour list, so no
/// two invocations write the same slot.
pub fn main_gather<K: FlowKernel>(
    kernel: &K,
    frame: &FrameView<'_>,
    layout: &GraphLayout,
    wedges: Option<&WedgeLayout>,
    accum: &mut [K::Accum],
) {
    accum.par_iter_mut().enumerate().for_each(|(v, a)| {
        match (K::ADJACENCY, wedges) {
            (AdjacencyKind::Wedge, Some(w)) => {
                for &[b, c] in w.wedges(v) {
                    a.accumulate(&kernel.contribute(v, Incidence::Wedge { b, c }, frame));
                }
            }
            _ => {
                for &to in layout.neighbors(v) {
                    a.accumulate(&kernel.contribute(v, Incidence::Edge { to }, frame));
                }
            }
        }
    });
}

/// One Main invocation of the scatter form over a single edge. `emit`
/// receives the contribution for each endpoint.
pub fn scatter_edge<K, F>(kernel: &K, frame: &FrameView<'_>, edge: CanonicalEdge, emit: &F)
where
    K: FlowKernel,
    F: Fn(usize, &K::Accum) + ?Sized,
{
    let (a, b) = (edge.a as usize, edge.b as usize);
    emit(a, &kernel.contribute(a, Incidence::Edge { to: edge.b }, frame));
    emit(b, &kernel.contribute(b, Incidence::Edge { to: edge.a }, frame));
}

/// One Main invocation of the scatter form over a single triangle.
pub fn scatter_triangle<K, F>(kernel: &K, frame: &FrameView<'_>, [a, b, c]: Triangle, emit: &F)
where
    K: FlowKernel,
    F: Fn(usize, &K::Accum) + ?Sized,
{
    for (v, p, q) in [(a, b, c), (b, c, a), (c, a, b)] {
        let contribution = kernel.contribute(v as usize, Incidence::Wedge { b: p, c: q }, frame);
        emit(v as usize, &contribution);
    }
}

/// Runs every scatter invocation (one per edge, or per triangle for wedge
/// kernels) in parallel, handing each contribution to `emit`.
pub fn for_each_scatter<K, F>(kernel: &K, frame: &FrameView<'_>, topology: &Topology, emit: &F)
where
    K: FlowKernel,
    F: Fn(usize, &K::Accum) + Sync,
{
    match K::ADJACENCY {
        AdjacencyKind::Plain => topology
            .edges()
            .par_iter()
            .for_each(|&e| scatter_edge(kernel, frame, e, emit)),
        AdjacencyKind::Wedge => topology
            .triangles()
            .par_iter()
            .for_each(|&t| scatter_triangle(kernel, frame, t, emit)),
    }
}

/// Most values one vertex receives in a scatter Main, its seed included.
pub fn scatter_fan_in(topology: &Topology, kind: AdjacencyKind) -> usize {
    let mut counts = vec![0usize; topology.vertex_count()];
    match kind {
        AdjacencyKind::Plain => {
            for e in topology.edges() {
                counts[e.a as usize] += 1;
                counts[e.b as usize] += 1;
            }
        }
        AdjacencyKind::Wedge => {
            for t in topology.triangles() {
                for &v in t {
                    counts[v as usize] += 1;
                }
            }
        }
    }
    counts.into_iter().max().unwrap_or(0) + 1
}

/// Main, scatter form. Contributions are evaluated twice: the first pass
/// only measures their magnitudes to calibrate the lanes, the second adds
/// them. Seeds come in through `accum` and the sums go back out through it.
pub fn main_scatter<K: FlowKernel>(
    kernel: &K,
    frame: &FrameView<'_>,
    topology: &Topology,
    lanes: &mut FixedPointLanes,
    accum: &mut [K::Accum],
) {
    lanes.reset();
    {
        let lanes = &*lanes;
        accum.par_iter().for_each(|a| lanes.observe(a));
        for_each_scatter(kernel, frame, topology, &|_: usize, c: &K::Accum| lanes.observe(c));
    }
    lanes.calibrate();

    let lanes = &*lanes;
    accum.par_iter().enumerate().for_each(|(v, a)| lanes.store(v, a));
    for_each_scatter(kernel, frame, topology, &|v: usize, c: &K::Accum| lanes.add(v, c));
    accum.par_iter_mut().enumerate().for_each(|(v, a)| *a = lanes.load(v));
}

/// Post: finalize each vertex from its accumulator and degree.
pub fn post_stage<K: FlowKernel>(
    kernel: &K,
    frame: &FrameView<'_>,
    accum: &[K::Accum],
    degrees: &[u32],
    out: &mut [K::Output],
) {
    out.par_iter_mut()
        .zip(accum.par_iter().zip(degrees.par_iter()))
        .enumerate()
        .for_each(|(v, (o, (a, &d)))| *o = kernel.finish(v, a, d, frame));
}

// ---------- Solver ----------

/// Owns the immutable topology buffers plus the accumulator and result
/// buffers of one mesh, and runs one flow solve per frame.
pub struct FlowSolver<K: FlowKernel> {
    kernel: K,
    config: FlowConfig,
    topology: Topology,
    layout: GraphLayout,
    wedges: Option<WedgeLayout>,
    accum: Vec<K::Accum>,
    lanes: Option<FixedPointLanes>,
    results: ResultBuffer<K::Output>,
    stage: Stage,
    frames: u64,
}

impl<K: FlowKernel> FlowSolver<K> {
    /// Builds the topology and buffers for `mesh`.
    pub fn from_mesh(mesh: &MeshData, kernel: K, config: FlowConfig) -> Result<Self> {
        mesh.validate_attributes()?;
        let topology = TopologyBuilder::for_kind(mesh.vertex_count(), K::ADJACENCY).build_mesh(mesh)?;
        Self::new(topology, kernel, config)
    }

    pub fn new(topology: Topology, kernel: K, config: FlowConfig) -> Result<Self> {
        config.validate()?;
        let n = topology.vertex_count();
        kernel.validate(n)?;

        let wedges = match K::ADJACENCY {
            AdjacencyKind::Plain => None,
            AdjacencyKind::Wedge => Some(WedgeLayout::from_topology(&topology).ok_or_else(|| {
                MeshFlowError::Config(format!(
                    "kernel `{}` needs wedge adjacency but the topology was built without it",
                    kernel.name()
                ))
            })?),
        };
        let layout = GraphLayout::from_topology(&topology);

        let lanes = (config.scheme == AccumulationScheme::Scatter).then(|| {
            FixedPointLanes::new(
                n,
                <K::Accum as Accumulator>::lane_count(),
                scatter_fan_in(&topology, K::ADJACENCY),
                config.fixed_point_bits,
            )
        });

        debug!(
            kernel = kernel.name(),
            scheme = ?config.scheme,
            vertices = n,
            edges = topology.edge_count(),
            "flow solver ready"
        );

        Ok(Self {
            accum: vec![<K::Accum as bytemuck::Zeroable>::zeroed(); n],
            results: ResultBuffer::zeroed(n),
            kernel,
            config,
            topology,
            layout,
            wedges,
            lanes,
            stage: Stage::Idle,
            frames: 0,
        })
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.topology.vertex_count()
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn layout(&self) -> &GraphLayout {
        &self.layout
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Results of the last completed frame.
    pub fn results(&self) -> &ResultBuffer<K::Output> {
        &self.results
    }

    fn barrier(&mut self, next: Stage) {
        debug_assert_eq!(self.stage.next(), next, "flow stages out of order");
        trace!(from = ?self.stage, to = ?next, "stage barrier");
        self.stage = next;
    }

    /// Runs Init, Main and Post for one frame.
    ///
    /// A frame without a current vertex buffer is skipped entirely. Buffers
    /// whose length does not match the topology are rejected before any
    /// stage runs.
    pub fn dispatch(&mut self, input: &FrameInput<'_>) -> Result<DispatchOutcome> {
        let Some(current) = input.current else {
            debug!(kernel = self.kernel.name(), "no current vertex buffer, skipping frame");
            return Ok(DispatchOutcome::Skipped);
        };
        let n = self.vertex_count();
        MeshFlowError::check_len("current positions", n, current.len())?;
        MeshFlowError::check_len("rest positions", n, input.rest.len())?;
        if let Some(normals) = input.normals {
            MeshFlowError::check_len("normals", n, normals.len())?;
        }

        let frame = FrameView::new(current, input.rest, input.adjust).with_normals(input.normals);

        self.barrier(Stage::Init);
        init_stage(&self.kernel, &frame, &mut self.accum);

        self.barrier(Stage::Main);
        match &mut self.lanes {
            None => main_gather(
                &self.kernel,
                &frame,
                &self.layout,
                self.wedges.as_ref(),
                &mut self.accum,
            ),
            Some(lanes) => main_scatter(&self.kernel, &frame, &self.topology, lanes, &mut self.accum),
        }

        self.barrier(Stage::Post);
        post_stage(
            &self.kernel,
            &frame,
            &self.accum,
            self.layout.degrees(),
            self.results.write(),
        );

        self.barrier(Stage::Idle);
        self.frames += 1;
        self.results.mark_frame(self.frames);
        trace!(kernel = self.kernel.name(), frame = self.frames, "frame dispatched");
        Ok(DispatchOutcome::Completed { frame: self.frames })
    }
}
