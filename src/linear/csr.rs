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

use std::collections::BTreeMap;

use num_traits::Float;
use rayon::prelude::*;

use crate::error::{MeshFlowError, Result};

/// Compressed sparse row matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix<T> {
    n_rows: usize,
    n_cols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<T>,
}

impl<T: Float + Send + Sync> CsrMatrix<T> {
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_square(&self) -> bool {
        self.n_rows == self.n_cols
    }

    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    pub fn col_idx(&self) -> &[usize] {
        &self.col_idx
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Stored value at `(row, col)`, zero when outside the pattern.
    pub fn get(&self, row: usize, col: usize) -> T {
        let range = self.row_ptr[row]..self.row_ptr[row + 1];
        self.col_idx[range.clone()]
            .binary_search(&col)
            .map(|k| self.values[range.start + k])
            .unwrap_or_else(|_| T::zero())
    }

    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, T)> + '_ {
        let range = self.row_ptr[row]..self.row_ptr[row + 1];
        self.col_idx[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    pub fn diagonal(&self) -> Vec<T> {
        (0..self.n_rows.min(self.n_cols))
            .map(|i| self.get(i, i))
            .collect()
    }

    /// y = A * x
    pub fn mul_vec(&self, x: &[T], y: &mut [T]) {
        debug_assert_eq!(x.len(), self.n_cols);
        debug_assert_eq!(y.len(), self.n_rows);
        y.par_iter_mut().enumerate().for_each(|(i, yi)| {
            let mut sum = T::zero();
            for k in self.row_ptr[i]..self.row_ptr[i + 1] {
                sum = sum + self.values[k] * x[self.col_idx[k]];
            }
            *yi = sum;
        });
    }

    pub fn is_symmetric(&self, tol: T) -> bool {
        self.is_square()
            && (0..self.n_rows)
                .all(|i| self.row(i).all(|(j, v)| (v - self.get(j, i)).abs() <= tol))
    }

    pub(crate) fn check_system(&self, b: &[T], x: &[T]) -> Result<()> {
        if !self.is_square() {
            return Err(MeshFlowError::NotSquare {
                rows: self.n_rows,
                cols: self.n_cols,
            });
        }
        if b.len() != self.n_rows || x.len() != self.n_cols {
            return Err(MeshFlowError::DimensionMismatch(format!(
                "{}x{} system with rhs of length {} and solution of length {}",
                self.n_rows,
                self.n_cols,
                b.len(),
                x.len()
            )));
        }
        Ok(())
    }
}

/// Row-wise accumulating builder; duplicate entries are summed.
#[derive(Debug, Clone)]
pub struct CsrBuilder<T> {
    n_rows: usize,
    n_cols: usize,
    rows: Vec<BTreeMap<usize, T>>,
}

impl<T: Float + Send + Sync> CsrBuilder<T> {
    #[inline]
    pub fn new_square(n: usize) -> Self {
        Self::new(n, n)
    }

    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            rows: vec![BTreeMap::new(); n_rows],
        }
    }

    /// Accumulate `value` into `(row, col)`.
    ///
    /// # Panics
    /// When `row` or `col` is out of range.
    pub fn add(&mut self, row: usize, col: usize, value: T) {
        assert!(col < self.n_cols, "column {col} out of range");
        let slot = self.rows[row].entry(col).or_insert_with(T::zero);
        *slot = *slot + value;
    }

    /// Overwrite `(row, col)`.
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        assert!(col < self.n_cols, "column {col} out of range");
        self.rows[row].insert(col, value);
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.rows[row].get(&col).copied().unwrap_or_else(T::zero)
    }

    /// Adds the symmetric graph-Laplacian stencil of edge `(i, j)` with weight `w`.
    pub fn add_laplacian_edge(&mut self, i: usize, j: usize, w: T) {
        self.add(i, i, w);
        self.add(j, j, w);
        self.add(i, j, -w);
        self.add(j, i, -w);
    }

    /// Replaces row and column `k` by the identity so that `x[k]` is fixed.
    ///
    /// The caller must zero `b[k]`; with a zero pinned value clearing the
    /// column leaves the solution unchanged and keeps the matrix symmetric.
    pub fn pin(&mut self, k: usize) {
        self.rows[k].clear();
        for row in &mut self.rows {
            if let Some(v) = row.get_mut(&k) {
                *v = T::zero();
            }
        }
        self.rows[k].insert(k, T::one());
    }

    #[inline]
    pub fn nnz(&self) -> usize {
        self.rows.iter().map(|r| r.len()).sum()
    }

    pub fn build(self) -> CsrMatrix<T> {
        let nnz = self.nnz();
        let mut row_ptr = Vec::with_capacity(self.n_rows + 1);
        let mut col_idx = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);

        row_ptr.push(0);
        for row_map in self.rows {
            for (col, val) in row_map {
                col_idx.push(col);
                values.push(val);
            }
            row_ptr.push(col_idx.len());
        }

        CsrMatrix {
            n_rows: self.n_rows,
            n_cols: self.n_cols,
            row_ptr,
            col_idx,
            values,
        }
    }
}
