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

//! Cyclic Jacobi eigen-solver for small symmetric matrices.

use num_traits::Float;

use crate::geometry::matrix::Matrix;

/// Eigen-decomposition of a symmetric `N x N` matrix.
///
/// `vectors[k]` is the unit eigenvector belonging to `values[k]`; pairs are
/// sorted by descending eigenvalue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymmetricEigen<T, const N: usize> {
    pub values: [T; N],
    pub vectors: [[T; N]; N],
}

const MAX_SWEEPS: usize = 32;

pub fn symmetric_eigen<T: Float, const N: usize>(m: &Matrix<T, N, N>) -> SymmetricEigen<T, N> {
    let mut a = m.0;
    let mut v = Matrix::<T, N, N>::identity().0;
    let two = T::one() + T::one();

    for _ in 0..MAX_SWEEPS {
        let mut off = T::zero();
        for p in 0..N {
            for q in (p + 1)..N {
                off = off + a[p][q] * a[p][q];
            }
        }
        if off <= T::epsilon() * T::epsilon() * diag_scale(&a) {
            break;
        }

        for p in 0..N {
            for q in (p + 1)..N {
                if a[p][q] == T::zero() {
                    continue;
                }
                let theta = (a[q][q] - a[p][p]) / (two * a[p][q]);
                let sign = if theta >= T::zero() { T::one() } else { -T::one() };
                let t = sign / (theta.abs() + (theta * theta + T::one()).sqrt());
                let c = T::one() / (t * t + T::one()).sqrt();
                let s = t * c;

                for k in 0..N {
                    let akp = a[k][p];
                    let akq = a[k][q];
                    a[k][p] = c * akp - s * akq;
                    a[k][q] = s * akp + c * akq;
                }
                for k in 0..N {
                    let apk = a[p][k];
                    let aqk = a[q][k];
                    a[p][k] = c * apk - s * aqk;
                    a[q][k] = s * apk + c * aqk;
                }
                for k in 0..N {
                    let vkp = v[k][p];
                    let vkq = v[k][q];
                    v[k][p] = c * vkp - s * vkq;
                    v[k][q] = s * vkp + c * vkq;
                }
            }
        }
    }

    let mut order: [usize; N] = std::array::from_fn(|i| i);
    order.sort_by(|&i, &j| {
        a[j][j]
            .partial_cmp(&a[i][i])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    SymmetricEigen {
        values: std::array::from_fn(|k| a[order[k]][order[k]]),
        // columns of `v` are the eigenvectors
        vectors: std::array::from_fn(|k| std::array::from_fn(|r| v[r][order[k]])),
    }
}

fn diag_scale<T: Float, const N: usize>(a: &[[T; N]; N]) -> T {
    let s = (0..N).fold(T::zero(), |acc, i| acc + a[i][i] * a[i][i]);
    if s > T::zero() { s } else { T::min_positive_value() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagonal_matrix_is_already_decomposed() {
        let m = Matrix([[1.0_f64, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 2.0]]);
        let e = symmetric_eigen(&m);
        assert_eq!(e.values, [3.0, 2.0, 1.0]);
        assert_eq!(e.vectors[0], [0.0, 1.0, 0.0]);
    }

    #[test]
    fn reconstructs_symmetric_matrix() {
        let m = Matrix([[4.0_f64, 1.0, 0.5], [1.0, 3.0, 0.2], [0.5, 0.2, 1.0]]);
        let e = symmetric_eigen(&m);
        for i in 0..3 {
            for j in 0..3 {
                let r: f64 = (0..3).map(|k| e.values[k] * e.vectors[k][i] * e.vectors[k][j]).sum();
                assert!((r - m[i][j]).abs() < 1e-10, "entry ({i},{j}) = {r}");
            }
        }
    }

    #[test]
    fn handles_four_by_four() {
        let m = Matrix([
            [2.0_f32, 1.0, 0.0, 0.0],
            [1.0, 2.0, 0.0, 0.0],
            [0.0, 0.0, 5.0, 0.0],
            [0.0, 0.0, 0.0, -1.0],
        ]);
        let e = symmetric_eigen(&m);
        assert!((e.values[0] - 5.0).abs() < 1e-5);
        assert!((e.values[1] - 3.0).abs() < 1e-5);
        assert!((e.values[2] - 1.0).abs() < 1e-5);
        assert!((e.values[3] + 1.0).abs() < 1e-5);
    }
}
