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

use num_traits::Float;

use crate::linear::csr::CsrMatrix;

/// z = M⁻¹ r
pub trait Preconditioner<T>: Send + Sync {
    fn apply(&self, r: &[T], z: &mut [T]);

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityPreconditioner;

impl<T: Float + Send + Sync> Preconditioner<T> for IdentityPreconditioner {
    fn apply(&self, r: &[T], z: &mut [T]) {
        z.copy_from_slice(r);
    }

    fn name(&self) -> &'static str {
        "identity"
    }
}

/// Diagonal scaling; rows with a vanishing diagonal pass through unscaled.
#[derive(Debug, Clone)]
pub struct JacobiPreconditioner<T> {
    inv_diag: Vec<T>,
}

impl<T: Float + Send + Sync> JacobiPreconditioner<T> {
    pub fn from_matrix(matrix: &CsrMatrix<T>) -> Self {
        let tiny = T::min_positive_value().sqrt();
        let inv_diag = matrix
            .diagonal()
            .into_iter()
            .map(|d| if d.abs() > tiny { T::one() / d } else { T::one() })
            .collect();
        Self { inv_diag }
    }
}

impl<T: Float + Send + Sync> Preconditioner<T> for JacobiPreconditioner<T> {
    fn apply(&self, r: &[T], z: &mut [T]) {
        for ((zi, &ri), &d) in z.iter_mut().zip(r).zip(&self.inv_diag) {
            *zi = ri * d;
        }
    }

    fn name(&self) -> &'static str {
        "jacobi"
    }
}
