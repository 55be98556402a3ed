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

use ahash::AHashMap;
use smallvec::SmallVec;
use tracing::debug;

use crate::geometry::Vec3;

/// Uniform grid over positions, keyed by packed integer cell coordinates.
///
/// Cells are at least as wide as the query radius, so every point within the
/// radius of a query lies in the 3x3x3 block around the query's cell.
#[derive(Debug, Clone)]
pub struct SpatialHash {
    hash_inv: f64,
    cells: AHashMap<u128, SmallVec<[u32; 4]>>,
}

impl SpatialHash {
    pub fn new(cell: f64) -> Self {
        let mut cell = cell.max(1e-12); // clamp to avoid INF
        if !cell.is_finite() {
            cell = 1e-5;
        }
        Self {
            hash_inv: 1.0 / cell,
            cells: AHashMap::default(),
        }
    }

    #[inline(always)]
    fn floor_sat_i64(x: f64) -> i64 {
        if !x.is_finite() {
            return if x.is_sign_positive() { i64::MAX } else { i64::MIN };
        }
        let i = x as i64;
        i - ((i as f64 > x) as i64)
    }

    #[inline(always)]
    fn pack_key3(kx: i64, ky: i64, kz: i64) -> u128 {
        // 3 x 42-bit signed lanes into 126 bits (fits typical ranges).
        let mask = (1u128 << 42) - 1;
        let ux = (kx as i128 as u128) & mask;
        let uy = (ky as i128 as u128) & mask;
        let uz = (kz as i128 as u128) & mask;
        ux | (uy << 42) | (uz << 84)
    }

    #[inline(always)]
    pub fn position_to_hash_key(&self, pos: &Vec3<f32>) -> (i64, i64, i64) {
        let inv = self.hash_inv;
        (
            Self::floor_sat_i64(pos.x as f64 * inv),
            Self::floor_sat_i64(pos.y as f64 * inv),
            Self::floor_sat_i64(pos.z as f64 * inv),
        )
    }

    pub fn insert(&mut self, pos: &Vec3<f32>, id: u32) {
        let (x, y, z) = self.position_to_hash_key(pos);
        self.cells
            .entry(Self::pack_key3(x, y, z))
            .or_default()
            .push(id);
    }

    /// Ids stored in the 27 cells around `pos`.
    pub fn candidates<'a>(&'a self, pos: &Vec3<f32>) -> impl Iterator<Item = u32> + 'a {
        let (cx, cy, cz) = self.position_to_hash_key(pos);
        (-1..=1).flat_map(move |dx| {
            (-1..=1).flat_map(move |dy| {
                (-1..=1).flat_map(move |dz| {
                    let key = Self::pack_key3(
                        cx.saturating_add(dx),
                        cy.saturating_add(dy),
                        cz.saturating_add(dz),
                    );
                    self.cells.get(&key).into_iter().flatten().copied()
                })
            })
        })
    }
}

/// Pairs `(i, j)`, `i < j`, of distinct vertices whose positions lie within
/// `tolerance` of each other. The result is sorted and free of duplicates.
pub fn find_seams(positions: &[Vec3<f32>], tolerance: f32) -> Vec<(u32, u32)> {
    let tol = tolerance.max(0.0);
    let tol2 = (tol as f64) * (tol as f64);
    let mut hash = SpatialHash::new(tol as f64);
    let mut seams = Vec::new();

    for (i, p) in positions.iter().enumerate() {
        let i = i as u32;
        for j in hash.candidates(p) {
            let q = &positions[j as usize];
            let d2 = (q.cast::<f64>() - p.cast::<f64>()).norm_squared();
            if d2 <= tol2 {
                seams.push((j, i));
            }
        }
        hash.insert(p, i);
    }

    // candidates only returns earlier ids, so pairs are already ordered
    seams.sort_unstable();
    seams.dedup();
    debug!(vertices = positions.len(), seams = seams.len(), tolerance, "detected seams");
    seams
}
