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

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

use bytemuck::{Pod, Zeroable};

use crate::geometry::{Affine3, Vec3};

/// Per-frame buffers handed in by the frame driver.
///
/// `current` is `None` while the host has not produced this frame's vertex
/// buffer yet; the solver then skips the frame. `normals` are the current
/// frame's vertex normals when the host has them.
#[derive(Debug, Clone, Copy)]
pub struct FrameInput<'a> {
    pub current: Option<&'a [Vec3<f32>]>,
    pub rest: &'a [Vec3<f32>],
    pub normals: Option<&'a [Vec3<f32>]>,
    pub adjust: Affine3<f32>,
}

impl<'a> FrameInput<'a> {
    pub fn new(current: &'a [Vec3<f32>], rest: &'a [Vec3<f32>], adjust: Affine3<f32>) -> Self {
        Self {
            current: Some(current),
            rest,
            normals: None,
            adjust,
        }
    }

    pub fn pending(rest: &'a [Vec3<f32>], adjust: Affine3<f32>) -> Self {
        Self {
            current: None,
            rest,
            normals: None,
            adjust,
        }
    }

    pub fn with_normals(mut self, normals: &'a [Vec3<f32>]) -> Self {
        self.normals = Some(normals);
        self
    }
}

/// Borrowed view of one frame's vertex data, as seen by kernel invocations.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    current: &'a [Vec3<f32>],
    rest: &'a [Vec3<f32>],
    normals: Option<&'a [Vec3<f32>]>,
    adjust: Affine3<f32>,
}

impl<'a> FrameView<'a> {
    pub fn new(current: &'a [Vec3<f32>], rest: &'a [Vec3<f32>], adjust: Affine3<f32>) -> Self {
        Self {
            current,
            rest,
            normals: None,
            adjust,
        }
    }

    pub fn with_normals(mut self, normals: Option<&'a [Vec3<f32>]>) -> Self {
        self.normals = normals;
        self
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.current.len()
    }

    #[inline]
    pub fn current(&self, v: usize) -> Vec3<f32> {
        self.current[v]
    }

    #[inline]
    pub fn normal(&self, v: usize) -> Option<Vec3<f32>> {
        self.normals.map(|n| n[v])
    }

    /// Rest position of `v` brought into the current frame of reference.
    #[inline]
    pub fn rest(&self, v: usize) -> Vec3<f32> {
        self.adjust.transform_point(&self.rest[v])
    }

    #[inline]
    pub fn current_edge(&self, from: usize, to: usize) -> Vec3<f32> {
        self.current[to] - self.current[from]
    }

    #[inline]
    pub fn rest_edge(&self, from: usize, to: usize) -> Vec3<f32> {
        self.adjust.transform_vector(&(self.rest[to] - self.rest[from]))
    }
}

/// Per-vertex scratch state: any plain bundle of `f32` lanes.
pub trait Accumulator: Pod + Send + Sync {
    #[inline]
    fn lanes(&self) -> &[f32] {
        bytemuck::cast_slice(std::slice::from_ref(self))
    }

    #[inline]
    fn lanes_mut(&mut self) -> &mut [f32] {
        bytemuck::cast_slice_mut(std::slice::from_mut(self))
    }

    #[inline]
    fn lane_count() -> usize {
        std::mem::size_of::<Self>() / std::mem::size_of::<f32>()
    }

    /// Lane-wise sum.
    #[inline]
    fn accumulate(&mut self, other: &Self) {
        for (d, s) in self.lanes_mut().iter_mut().zip(other.lanes()) {
            *d += *s;
        }
    }
}

impl<const N: usize> Accumulator for [f32; N] {}

/// Fixed-point atomic accumulator lanes for the scatter scheme.
///
/// Integer addition is associative and commutative, so the final sums do not
/// depend on the order in which concurrent invocations land.
///
/// Each lane carries its own power-of-two scale, chosen once per frame by
/// [`calibrate`](Self::calibrate) from the largest magnitude
/// [`observe`](Self::observe)d on that lane. With at most `fan_in` values
/// landing on one vertex, every per-vertex sum stays below
/// `2^precision_bits` after scaling, whatever the units of the mesh.
#[derive(Debug)]
pub struct FixedPointLanes {
    data: Vec<AtomicI64>,
    bounds: Vec<AtomicU32>,
    scales: Vec<f64>,
    lanes: usize,
    fan_in: usize,
    precision_bits: u32,
}

impl FixedPointLanes {
    /// Largest `precision_bits` that cannot overflow an `i64` sum.
    pub const MAX_PRECISION_BITS: u32 = 62;

    /// `fan_in` is the most values (seed included) any vertex receives in one
    /// frame.
    pub fn new(vertex_count: usize, lanes: usize, fan_in: usize, precision_bits: u32) -> Self {
        let mut data = Vec::with_capacity(vertex_count * lanes);
        data.resize_with(vertex_count * lanes, || AtomicI64::new(0));
        let mut bounds = Vec::with_capacity(lanes);
        bounds.resize_with(lanes, || AtomicU32::new(0));
        Self {
            data,
            bounds,
            scales: vec![1.0; lanes],
            lanes,
            fan_in: fan_in.max(1),
            precision_bits: precision_bits.min(Self::MAX_PRECISION_BITS),
        }
    }

    /// Clears the sums and the observed magnitudes before a new frame.
    pub fn reset(&mut self) {
        for slot in &mut self.data {
            *slot.get_mut() = 0;
        }
        for bound in &mut self.bounds {
            *bound.get_mut() = 0;
        }
    }

    /// Records the magnitude of every lane of `value` for the next
    /// [`calibrate`](Self::calibrate).
    pub fn observe<A: Accumulator>(&self, value: &A) {
        for (bound, &x) in self.bounds.iter().zip(value.lanes()) {
            // non-negative floats order the same way as their bit patterns
            bound.fetch_max(x.abs().to_bits(), Ordering::Relaxed);
        }
    }

    /// Fixes each lane's scale from the magnitudes observed since
    /// [`reset`](Self::reset).
    pub fn calibrate(&mut self) {
        for (scale, bound) in self.scales.iter_mut().zip(&mut self.bounds) {
            let largest = f32::from_bits(*bound.get_mut()) as f64;
            let total = largest * self.fan_in as f64;
            *scale = if total.is_finite() && total > 0.0 {
                let exponent = total.log2().ceil() as i32;
                2f64.powi(self.precision_bits as i32 - exponent)
            } else {
                1.0
            };
        }
    }

    /// Current scale of `lane`; one unit of the stored integer is `1 / scale`.
    #[inline]
    pub fn scale(&self, lane: usize) -> f64 {
        self.scales[lane]
    }

    #[inline]
    fn encode(&self, lane: usize, x: f32) -> i64 {
        (x as f64 * self.scales[lane]).round() as i64
    }

    #[inline]
    fn decode(&self, lane: usize, q: i64) -> f32 {
        (q as f64 / self.scales[lane]) as f32
    }

    #[inline]
    fn slots(&self, vertex: usize) -> &[AtomicI64] {
        &self.data[vertex * self.lanes..(vertex + 1) * self.lanes]
    }

    pub fn store<A: Accumulator>(&self, vertex: usize, value: &A) {
        for (lane, (slot, &x)) in self.slots(vertex).iter().zip(value.lanes()).enumerate() {
            slot.store(self.encode(lane, x), Ordering::Relaxed);
        }
    }

    pub fn add<A: Accumulator>(&self, vertex: usize, value: &A) {
        for (lane, (slot, &x)) in self.slots(vertex).iter().zip(value.lanes()).enumerate() {
            slot.fetch_add(self.encode(lane, x), Ordering::Relaxed);
        }
    }

    pub fn load<A: Accumulator>(&self, vertex: usize) -> A {
        let mut out = A::zeroed();
        for (lane, (d, slot)) in out.lanes_mut().iter_mut().zip(self.slots(vertex)).enumerate() {
            *d = self.decode(lane, slot.load(Ordering::Relaxed));
        }
        out
    }
}

/// Per-vertex output of the last completed frame.
#[derive(Debug, Clone)]
pub struct ResultBuffer<T: Pod> {
    data: Vec<T>,
    frame: u64,
}

impl<T: Pod> ResultBuffer<T> {
    pub fn zeroed(vertex_count: usize) -> Self {
        Self {
            data: vec![T::zeroed(); vertex_count],
            frame: 0,
        }
    }

    /// Indexed lookup; the caller guarantees `index < len()`.
    #[inline]
    pub fn sample(&self, index: u32) -> T {
        debug_assert!((index as usize) < self.data.len(), "sample index {index} out of range");
        self.data[index as usize]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    /// Number of frames written so far; `0` until the first completed dispatch.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub(crate) fn write(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub(crate) fn mark_frame(&mut self, frame: u64) {
        self.frame = frame;
    }
}

/// 2x3 strain tensor: compression row and tension row.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct StrainTensor {
    pub compression: [f32; 3],
    pub tension: [f32; 3],
}

/// Eigen-decomposition of the local stretch tensor packed as a 4x4 block
/// (16 floats).
///
/// Rows 0..3 hold `[eigenvector.xyz, eigenvalue]` sorted by descending
/// eigenvalue; row 3 holds `[det F, degree, 0, 0]`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct EigenFrame {
    pub rows: [[f32; 4]; 4],
}

impl EigenFrame {
    pub fn identity(degree: u32) -> Self {
        Self {
            rows: [
                [1.0, 0.0, 0.0, 1.0],
                [0.0, 1.0, 0.0, 1.0],
                [0.0, 0.0, 1.0, 1.0],
                [1.0, degree as f32, 0.0, 0.0],
            ],
        }
    }

    #[inline]
    pub fn eigenvalue(&self, k: usize) -> f32 {
        self.rows[k][3]
    }

    #[inline]
    pub fn eigenvector(&self, k: usize) -> Vec3<f32> {
        Vec3::new(self.rows[k][0], self.rows[k][1], self.rows[k][2])
    }

    #[inline]
    pub fn volume_ratio(&self) -> f32 {
        self.rows[3][0]
    }

    pub fn as_floats(&self) -> &[f32; 16] {
        bytemuck::cast_ref(self)
    }
}
