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

//! Boundary between the host frame loop and a [`FlowSolver`].
//!
//! The host supplies buffers through [`FrameSource`] and receives results
//! through [`FlowConsumer`]; [`drive_frame`] glues one frame together.

use bytemuck::Pod;
use tracing::trace;

use crate::{
    error::Result,
    flow::{DispatchOutcome, FlowKernel, FlowSolver, FrameInput, ResultBuffer},
    geometry::{Affine3, Vec3},
};

/// Per-frame vertex data owned by the host.
pub trait FrameSource {
    /// Rest pose the topology was built from.
    fn rest_positions(&self) -> &[Vec3<f32>];

    /// This frame's deformed positions, `None` while they are not available.
    fn current_positions(&self) -> Option<&[Vec3<f32>]>;

    fn normals(&self) -> Option<&[Vec3<f32>]> {
        None
    }

    /// Maps rest-space data into the current frame's space.
    fn adjust_transform(&self) -> Affine3<f32> {
        Affine3::identity()
    }

    fn frame_input(&self) -> FrameInput<'_> {
        FrameInput {
            current: self.current_positions(),
            rest: self.rest_positions(),
            normals: self.normals(),
            adjust: self.adjust_transform(),
        }
    }
}

/// Receives the result buffer after each completed frame.
pub trait FlowConsumer<T: Pod> {
    fn consume(&mut self, frame: u64, results: &ResultBuffer<T>);
}

impl<T: Pod, F: FnMut(u64, &ResultBuffer<T>)> FlowConsumer<T> for F {
    fn consume(&mut self, frame: u64, results: &ResultBuffer<T>) {
        self(frame, results)
    }
}

/// Host buffers kept in plain vectors.
#[derive(Debug, Clone, Default)]
pub struct OwnedFrame {
    pub rest: Vec<Vec3<f32>>,
    pub current: Option<Vec<Vec3<f32>>>,
    pub normals: Option<Vec<Vec3<f32>>>,
    pub adjust: Affine3<f32>,
}

impl OwnedFrame {
    pub fn new(rest: Vec<Vec3<f32>>) -> Self {
        Self {
            rest,
            ..Default::default()
        }
    }

    pub fn set_current(&mut self, current: Vec<Vec3<f32>>) {
        self.current = Some(current);
    }

    pub fn clear_current(&mut self) {
        self.current = None;
    }
}

impl FrameSource for OwnedFrame {
    fn rest_positions(&self) -> &[Vec3<f32>] {
        &self.rest
    }

    fn current_positions(&self) -> Option<&[Vec3<f32>]> {
        self.current.as_deref()
    }

    fn normals(&self) -> Option<&[Vec3<f32>]> {
        self.normals.as_deref()
    }

    fn adjust_transform(&self) -> Affine3<f32> {
        self.adjust
    }
}

/// Dispatches one frame and hands completed results to `consumer`.
/// Skipped frames are not forwarded.
pub fn drive_frame<K, S, C>(
    solver: &mut FlowSolver<K>,
    source: &S,
    consumer: &mut C,
) -> Result<DispatchOutcome>
where
    K: FlowKernel,
    S: FrameSource + ?Sized,
    C: FlowConsumer<K::Output> + ?Sized,
{
    let outcome = solver.dispatch(&source.frame_input())?;
    if let DispatchOutcome::Completed { frame } = outcome {
        consumer.consume(frame, solver.results());
        trace!(frame, "results handed to consumer");
    }
    Ok(outcome)
}
