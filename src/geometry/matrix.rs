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

use std::{
    array,
    ops::{Add, Index, IndexMut, Mul, Sub},
};

use num_traits::Float;
use serde::{Deserialize, Serialize};

use crate::geometry::vector_3::Vec3;

/// Generic row-major matrix R x C
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix<T, const R: usize, const C: usize>(pub [[T; C]; R]);

pub type Mat3<T> = Matrix<T, 3, 3>;
pub type Mat4<T> = Matrix<T, 4, 4>;

// ---------- Basics ----------
impl<T: Float, const R: usize, const C: usize> Matrix<T, R, C> {
    #[inline]
    pub fn new(data: [[T; C]; R]) -> Self {
        Matrix(data)
    }

    /// Matrix filled with a single value.
    #[inline]
    pub fn splat(val: T) -> Self {
        Matrix([[val; C]; R])
    }

    #[inline]
    pub fn zero() -> Self {
        Self::splat(T::zero())
    }

    /// Transpose into C x R.
    #[inline]
    pub fn transpose(&self) -> Matrix<T, C, R> {
        Matrix(array::from_fn(|j| array::from_fn(|i| self[i][j])))
    }

    /// Scale all entries by `s`.
    #[inline]
    pub fn scale(&self, s: T) -> Self {
        Matrix(array::from_fn(|i| array::from_fn(|j| self[i][j] * s)))
    }

    /// Build from columns.
    #[inline]
    pub fn from_cols(cols: [[T; R]; C]) -> Self {
        Matrix(array::from_fn(|i| array::from_fn(|j| cols[j][i])))
    }

    /// Cast element type.
    #[inline]
    pub fn cast<U: Float>(&self) -> Matrix<U, R, C> {
        Matrix(array::from_fn(|i| {
            array::from_fn(|j| U::from(self[i][j]).unwrap_or_else(U::nan))
        }))
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|row| row.iter().all(|x| x.is_finite()))
    }

    /// Row-major flattening into `out`, which must hold `R * C` values.
    pub fn write_row_major(&self, out: &mut [T]) {
        for i in 0..R {
            out[i * C..(i + 1) * C].copy_from_slice(&self[i]);
        }
    }
}

impl<T: Float, const N: usize> Matrix<T, N, N> {
    #[inline]
    pub fn identity() -> Self {
        Matrix(array::from_fn(|i| {
            array::from_fn(|j| if i == j { T::one() } else { T::zero() })
        }))
    }

    #[inline]
    pub fn trace(&self) -> T {
        (0..N).fold(T::zero(), |acc, i| acc + self[i][i])
    }

    /// Reads an `N*N` slice written by [`Matrix::write_row_major`].
    pub fn from_row_major(vals: &[T]) -> Self {
        Matrix(array::from_fn(|i| array::from_fn(|j| vals[i * N + j])))
    }
}

impl<T: Float> Mat3<T> {
    /// Outer product: a * bᵀ
    #[inline]
    pub fn outer(a: &Vec3<T>, b: &Vec3<T>) -> Self {
        let a = a.to_array();
        let b = b.to_array();
        Matrix(array::from_fn(|i| array::from_fn(|j| a[i] * b[j])))
    }

    #[inline]
    pub fn mul_vec(&self, v: &Vec3<T>) -> Vec3<T> {
        Vec3::new(
            self[0][0] * v.x + self[0][1] * v.y + self[0][2] * v.z,
            self[1][0] * v.x + self[1][1] * v.y + self[1][2] * v.z,
            self[2][0] * v.x + self[2][1] * v.y + self[2][2] * v.z,
        )
    }

    pub fn determinant(&self) -> T {
        let m = &self.0;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// Inverse via the adjugate, `None` when `|det| <= eps`.
    pub fn try_inverse(&self, eps: T) -> Option<Self> {
        let det = self.determinant();
        if !(det.abs() > eps) {
            return None;
        }
        let m = &self.0;
        let inv_det = T::one() / det;
        let cof = |r0: usize, r1: usize, c0: usize, c1: usize| {
            m[r0][c0] * m[r1][c1] - m[r0][c1] * m[r1][c0]
        };
        Some(Matrix([
            [cof(1, 2, 1, 2), -cof(0, 2, 1, 2), cof(0, 1, 1, 2)],
            [-cof(1, 2, 0, 2), cof(0, 2, 0, 2), -cof(0, 1, 0, 2)],
            [cof(1, 2, 0, 1), -cof(0, 2, 0, 1), cof(0, 1, 0, 1)],
        ])
        .scale(inv_det))
    }
}

// ---------- Indexing ----------
impl<T, const R: usize, const C: usize> Index<usize> for Matrix<T, R, C> {
    type Output = [T; C];
    #[inline]
    fn index(&self, i: usize) -> &Self::Output {
        &self.0[i]
    }
}
impl<T, const R: usize, const C: usize> IndexMut<usize> for Matrix<T, R, C> {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut Self::Output {
        &mut self.0[i]
    }
}

// ---------- Arithmetic ----------
impl<T: Float, const R: usize, const C: usize> Add for Matrix<T, R, C> {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Matrix(array::from_fn(|i| array::from_fn(|j| self[i][j] + rhs[i][j])))
    }
}

impl<T: Float, const R: usize, const C: usize> Sub for Matrix<T, R, C> {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Matrix(array::from_fn(|i| array::from_fn(|j| self[i][j] - rhs[i][j])))
    }
}

impl<T: Float, const R: usize, const K: usize, const C: usize> Mul<Matrix<T, K, C>>
    for Matrix<T, R, K>
{
    type Output = Matrix<T, R, C>;
    #[inline]
    fn mul(self, rhs: Matrix<T, K, C>) -> Matrix<T, R, C> {
        Matrix(array::from_fn(|i| {
            array::from_fn(|j| (0..K).fold(T::zero(), |acc, k| acc + self[i][k] * rhs[k][j]))
        }))
    }
}

/// Affine map `x -> linear * x + translation`.
///
/// This is the rest-pose to current-frame adjust transform handed in by the
/// frame driver each frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Affine3<T> {
    pub linear: [[T; 3]; 3],
    pub translation: Vec3<T>,
}

impl<T: Float> Affine3<T> {
    pub fn identity() -> Self {
        Self {
            linear: Mat3::identity().0,
            translation: Vec3::zero(),
        }
    }

    pub fn from_parts(linear: Mat3<T>, translation: Vec3<T>) -> Self {
        Self {
            linear: linear.0,
            translation,
        }
    }

    pub fn translation(t: Vec3<T>) -> Self {
        Self {
            translation: t,
            ..Self::identity()
        }
    }

    pub fn uniform_scale(s: T) -> Self {
        Self::from_parts(Mat3::identity().scale(s), Vec3::zero())
    }

    /// Reads the affine part of a column-major 4x4 matrix, the layout shader
    /// constant buffers use. The projective row is ignored.
    pub fn from_cols_array(m: &[T; 16]) -> Self {
        let linear = Matrix::from_cols([
            [m[0], m[1], m[2]],
            [m[4], m[5], m[6]],
            [m[8], m[9], m[10]],
        ]);
        Self::from_parts(linear, Vec3::new(m[12], m[13], m[14]))
    }

    pub fn to_mat4(&self) -> Mat4<T> {
        let l = &self.linear;
        let t = &self.translation;
        let (z, o) = (T::zero(), T::one());
        Matrix([
            [l[0][0], l[0][1], l[0][2], t.x],
            [l[1][0], l[1][1], l[1][2], t.y],
            [l[2][0], l[2][1], l[2][2], t.z],
            [z, z, z, o],
        ])
    }

    #[inline]
    pub fn linear(&self) -> Mat3<T> {
        Matrix(self.linear)
    }

    #[inline]
    pub fn transform_point(&self, p: &Vec3<T>) -> Vec3<T> {
        self.linear().mul_vec(p) + self.translation
    }

    #[inline]
    pub fn transform_vector(&self, v: &Vec3<T>) -> Vec3<T> {
        self.linear().mul_vec(v)
    }

    /// Composition that applies `self` first and `outer` second.
    pub fn then(&self, outer: &Self) -> Self {
        Self::from_parts(
            outer.linear() * self.linear(),
            outer.transform_point(&self.translation),
        )
    }
}

impl<T: Float> Default for Affine3<T> {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_round_trips_to_identity() {
        let m = Mat3::new([[2.0_f64, 1.0, 0.0], [0.0, 3.0, 1.0], [1.0, 0.0, 1.0]]);
        let inv = m.try_inverse(1e-12).unwrap();
        let id = m * inv;
        for i in 0..3 {
            for j in 0..3 {
                let expect = if i == j { 1.0 } else { 0.0 };
                assert!((id[i][j] - expect).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn singular_matrix_has_no_inverse() {
        let m = Mat3::new([[1.0_f32, 2.0, 3.0], [2.0, 4.0, 6.0], [0.0, 1.0, 0.0]]);
        assert!(m.try_inverse(1e-6).is_none());
    }

    #[test]
    fn column_major_matrix_reads_translation_from_last_column() {
        let mut cols = [0.0_f32; 16];
        cols[0] = 1.0;
        cols[5] = 1.0;
        cols[10] = 1.0;
        cols[15] = 1.0;
        cols[12] = 5.0;
        cols[13] = -2.0;
        let a = Affine3::from_cols_array(&cols);
        let p = a.transform_point(&Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(p, Vec3::new(6.0, -1.0, 1.0));
        assert_eq!(a.transform_vector(&Vec3::new(1.0, 1.0, 1.0)), Vec3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn composition_applies_inner_first() {
        let s = Affine3::<f64>::uniform_scale(2.0);
        let t = Affine3::translation(Vec3::new(1.0, 0.0, 0.0));
        let p = s.then(&t).transform_point(&Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(p, Vec3::new(3.0, 2.0, 2.0));
    }
}
