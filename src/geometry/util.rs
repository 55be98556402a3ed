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

use crate::geometry::vector_3::Vec3;

/// Default clamp for edge lengths before they are inverted.
pub const EDGE_EPS: f64 = 1e-8;

/// Default magnitude below which an averaged direction is treated as degenerate.
pub const DIRECTION_EPS: f64 = 1e-6;

#[inline(always)]
pub fn lit<T: Float>(v: f64) -> T {
    T::from(v).unwrap_or_else(T::epsilon)
}

/// `1 / max(eps, |v|)`.
#[inline(always)]
pub fn clamped_inverse_length<T: Float>(v: &Vec3<T>, eps: T) -> T {
    T::one() / v.norm().max(eps)
}

/// Relative stretch of `current` with respect to `rest`, clamped so that a
/// zero-length rest edge cannot blow up.
#[inline(always)]
pub fn relative_stretch<T: Float>(rest: &Vec3<T>, current: &Vec3<T>, eps: T) -> T {
    let r = rest.norm();
    (current.norm() - r) / r.max(eps)
}

/// Average of two direction samples, normalized when the sum is large enough.
/// Anti-parallel samples cancel out; in that case the first sample is
/// returned unchanged.
#[inline]
pub fn averaged_direction<T: Float>(a: &Vec3<T>, b: &Vec3<T>, threshold: T) -> Vec3<T> {
    let half = lit::<T>(0.5);
    let avg = (*a + *b).scale(half);
    avg.try_normalized(threshold).unwrap_or(*a)
}

/// Scales `n` so that its length is `sqrt(len)`, keeping units of length for
/// area-weighted normals.
#[inline]
pub fn length_weighted_normal<T: Float>(n: &Vec3<T>, eps: T) -> Vec3<T> {
    let len = n.norm();
    if len > eps { n.scale(len.sqrt() / len) } else { Vec3::zero() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anti_parallel_samples_fall_back_to_first() {
        let a = Vec3::new(1.0_f64, 0.0, 0.0);
        let b = Vec3::new(-1.0_f64, 0.0, 0.0);
        assert_eq!(averaged_direction(&a, &b, 1e-6), a);
    }

    #[test]
    fn coincident_points_do_not_blow_up() {
        let z = Vec3::<f32>::zero();
        assert_eq!(clamped_inverse_length(&z, 0.5), 2.0);
        assert_eq!(relative_stretch(&z, &z, 0.5), 0.0);
    }
}
