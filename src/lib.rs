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

//! Mesh-graph flow solving for deforming meshes.
//!
//! * [`mesh`] builds the edge set and adjacency of a triangle mesh once and
//!   packs it into CSR buffers.
//! * [`flow`] runs a per-frame Init -> Main -> Post kernel pipeline over that
//!   graph, comparing current positions against the rest pose.
//! * [`parametrize`] solves a sparse harmonic system per axis to produce UVs.
//! * [`driver`] connects a host frame loop to a [`flow::FlowSolver`].

pub mod config;
pub mod driver;
pub mod error;
pub mod flow;
pub mod geometry;
pub mod io;
pub mod linear;
pub mod mesh;
pub mod parametrize;

pub use config::MeshFlowConfig;
pub use error::{MeshFlowError, Result};
pub use flow::{AccumulationScheme, DispatchOutcome, FlowConfig, FlowKernel, FlowSolver};
pub use mesh::{MeshData, SubMesh, Topology, TopologyBuilder};
pub use parametrize::{ParametrizeConfig, Parametrization, parametrize};
