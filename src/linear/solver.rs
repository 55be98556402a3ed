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

//! Krylov solvers for the sparse systems assembled by the parametrizer.
//!
//! Both solvers stop at `max_iterations` without failing and hand back the
//! iterate with the smallest residual seen so far; whether that is good
//! enough is the caller's decision.

use num_traits::Float;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::{
    error::Result,
    linear::{
        csr::CsrMatrix,
        preconditioner::{IdentityPreconditioner, JacobiPreconditioner, Preconditioner},
        vector_ops::{axpy, copy, dot, norm2, sub_into},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    /// Requires a symmetric positive (semi-)definite system.
    ConjugateGradient,
    /// Works for general, including indefinite, systems.
    #[default]
    BiCgStab,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreconditionerKind {
    Identity,
    #[default]
    Jacobi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Stop once `‖b − Ax‖ <= tolerance * max(‖b‖, tiny)`.
    pub tolerance: f64,
    pub max_iterations: usize,
    pub kind: SolverKind,
    pub preconditioner: PreconditionerKind,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 2000,
            kind: SolverKind::BiCgStab,
            preconditioner: PreconditionerKind::Jacobi,
        }
    }
}

impl SolverConfig {
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
            ..Default::default()
        }
    }

    pub fn with_kind(mut self, kind: SolverKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_preconditioner(mut self, preconditioner: PreconditionerKind) -> Self {
        self.preconditioner = preconditioner;
        self
    }
}

/// Outcome of an iterative solve. The solution itself is written in place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveReport {
    pub converged: bool,
    pub iterations: usize,
    pub residual_norm: f64,
    pub relative_residual: f64,
}

pub trait IterativeSolver<T> {
    /// Solves `A x = b` starting from the contents of `x`.
    fn solve<P: Preconditioner<T>>(
        &mut self,
        matrix: &CsrMatrix<T>,
        b: &[T],
        x: &mut [T],
        precond: &P,
    ) -> Result<SolveReport>;

    fn name(&self) -> &'static str;
}

fn to_f64<T: Float>(v: T) -> f64 {
    v.to_f64().unwrap_or(f64::NAN)
}

struct Stopping<T> {
    b_norm: T,
    threshold: T,
}

impl<T: Float> Stopping<T> {
    fn new(config: &SolverConfig, b: &[T]) -> Self {
        let b_norm = norm2(b);
        let tol = T::from(config.tolerance).unwrap_or_else(T::epsilon);
        let scale = if b_norm > T::min_positive_value() { b_norm } else { T::one() };
        Self {
            b_norm,
            threshold: tol * scale,
        }
    }

    fn report(&self, converged: bool, iterations: usize, residual: T) -> SolveReport {
        let denom = if self.b_norm > T::zero() { self.b_norm } else { T::one() };
        SolveReport {
            converged,
            iterations,
            residual_norm: to_f64(residual),
            relative_residual: to_f64(residual / denom),
        }
    }
}

/// Preconditioned conjugate gradient.
#[derive(Debug, Clone)]
pub struct ConjugateGradient<T> {
    config: SolverConfig,
    r: Vec<T>,
    z: Vec<T>,
    p: Vec<T>,
    ap: Vec<T>,
    best: Vec<T>,
}

impl<T: Float + Send + Sync> ConjugateGradient<T> {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            r: Vec::new(),
            z: Vec::new(),
            p: Vec::new(),
            ap: Vec::new(),
            best: Vec::new(),
        }
    }

    fn ensure_workspace(&mut self, n: usize) {
        for v in [&mut self.r, &mut self.z, &mut self.p, &mut self.ap, &mut self.best] {
            v.clear();
            v.resize(n, T::zero());
        }
    }
}

impl<T: Float + Send + Sync> IterativeSolver<T> for ConjugateGradient<T> {
    fn solve<P: Preconditioner<T>>(
        &mut self,
        matrix: &CsrMatrix<T>,
        b: &[T],
        x: &mut [T],
        precond: &P,
    ) -> Result<SolveReport> {
        matrix.check_system(b, x)?;
        let n = b.len();
        self.ensure_workspace(n);
        let stop = Stopping::new(&self.config, b);

        // r = b - A*x
        matrix.mul_vec(x, &mut self.ap);
        sub_into(b, &self.ap, &mut self.r);

        let mut res_norm = norm2(&self.r);
        if res_norm <= stop.threshold {
            return Ok(stop.report(true, 0, res_norm));
        }
        let mut best_norm = res_norm;
        copy(x, &mut self.best);

        precond.apply(&self.r, &mut self.z);
        copy(&self.z, &mut self.p);
        let mut rz = dot(&self.r, &self.z);
        let mut iterations = 0;

        for iter in 0..self.config.max_iterations {
            matrix.mul_vec(&self.p, &mut self.ap);
            let pap = dot(&self.p, &self.ap);
            if !(pap.abs() > T::min_positive_value()) {
                // search direction collapsed
                break;
            }
            iterations = iter + 1;

            let alpha = rz / pap;
            axpy(alpha, &self.p, x);
            axpy(-alpha, &self.ap, &mut self.r);

            res_norm = norm2(&self.r);
            trace!(iter = iterations, residual = to_f64(res_norm), "cg");
            if res_norm <= stop.threshold {
                return Ok(stop.report(true, iterations, res_norm));
            }
            if res_norm < best_norm {
                best_norm = res_norm;
                copy(x, &mut self.best);
            }

            precond.apply(&self.r, &mut self.z);
            let rz_new = dot(&self.r, &self.z);
            let beta = rz_new / rz;
            rz = rz_new;
            for (p, &z) in self.p.iter_mut().zip(&self.z) {
                *p = z + beta * *p;
            }
        }

        // CG residuals are not monotone; hand back the best iterate seen
        copy(&self.best, x);
        Ok(stop.report(false, iterations, best_norm))
    }

    fn name(&self) -> &'static str {
        "cg"
    }
}

/// Preconditioned BiCGStab (right preconditioning).
#[derive(Debug, Clone)]
pub struct BiCgStab<T> {
    config: SolverConfig,
    r: Vec<T>,
    r0: Vec<T>,
    p: Vec<T>,
    v: Vec<T>,
    s: Vec<T>,
    t: Vec<T>,
    p_hat: Vec<T>,
    s_hat: Vec<T>,
    best: Vec<T>,
}

impl<T: Float + Send + Sync> BiCgStab<T> {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            r: Vec::new(),
            r0: Vec::new(),
            p: Vec::new(),
            v: Vec::new(),
            s: Vec::new(),
            t: Vec::new(),
            p_hat: Vec::new(),
            s_hat: Vec::new(),
            best: Vec::new(),
        }
    }

    fn ensure_workspace(&mut self, n: usize) {
        for v in [
            &mut self.r,
            &mut self.r0,
            &mut self.p,
            &mut self.v,
            &mut self.s,
            &mut self.t,
            &mut self.p_hat,
            &mut self.s_hat,
            &mut self.best,
        ] {
            v.clear();
            v.resize(n, T::zero());
        }
    }
}

impl<T: Float + Send + Sync> IterativeSolver<T> for BiCgStab<T> {
    fn solve<P: Preconditioner<T>>(
        &mut self,
        matrix: &CsrMatrix<T>,
        b: &[T],
        x: &mut [T],
        precond: &P,
    ) -> Result<SolveReport> {
        matrix.check_system(b, x)?;
        let n = b.len();
        self.ensure_workspace(n);
        let stop = Stopping::new(&self.config, b);
        let tiny = T::min_positive_value();

        matrix.mul_vec(x, &mut self.t);
        sub_into(b, &self.t, &mut self.r);
        copy(&self.r, &mut self.r0);

        let mut res_norm = norm2(&self.r);
        let mut best_norm = res_norm;
        copy(x, &mut self.best);
        if res_norm <= stop.threshold {
            return Ok(stop.report(true, 0, res_norm));
        }

        let (mut rho, mut alpha, mut omega) = (T::one(), T::one(), T::one());
        let mut iterations = 0;

        for iter in 0..self.config.max_iterations {
            iterations = iter + 1;
            let rho_new = dot(&self.r0, &self.r);
            if !(rho_new.abs() > tiny) {
                break;
            }

            if iter == 0 {
                copy(&self.r, &mut self.p);
            } else {
                let beta = (rho_new / rho) * (alpha / omega);
                for ((p, &r), &v) in self.p.iter_mut().zip(&self.r).zip(&self.v) {
                    *p = r + beta * (*p - omega * v);
                }
            }
            rho = rho_new;

            precond.apply(&self.p, &mut self.p_hat);
            matrix.mul_vec(&self.p_hat, &mut self.v);
            let r0v = dot(&self.r0, &self.v);
            if !(r0v.abs() > tiny) {
                break;
            }
            alpha = rho / r0v;

            // s = r - alpha * v
            copy(&self.r, &mut self.s);
            axpy(-alpha, &self.v, &mut self.s);
            let s_norm = norm2(&self.s);
            if s_norm <= stop.threshold {
                axpy(alpha, &self.p_hat, x);
                return Ok(stop.report(true, iterations, s_norm));
            }

            precond.apply(&self.s, &mut self.s_hat);
            matrix.mul_vec(&self.s_hat, &mut self.t);
            let tt = dot(&self.t, &self.t);
            omega = if tt > tiny { dot(&self.t, &self.s) / tt } else { T::zero() };

            axpy(alpha, &self.p_hat, x);
            axpy(omega, &self.s_hat, x);

            // r = s - omega * t
            copy(&self.s, &mut self.r);
            axpy(-omega, &self.t, &mut self.r);
            res_norm = norm2(&self.r);
            trace!(iter = iterations, residual = to_f64(res_norm), "bicgstab");

            if res_norm < best_norm {
                best_norm = res_norm;
                copy(x, &mut self.best);
            }
            if res_norm <= stop.threshold {
                return Ok(stop.report(true, iterations, res_norm));
            }
            if !(omega.abs() > tiny) || !res_norm.is_finite() {
                break;
            }
        }

        // the recurrence residual can drift from the true one; report the best
        // iterate and recompute its residual directly
        copy(&self.best, x);
        matrix.mul_vec(x, &mut self.t);
        sub_into(b, &self.t, &mut self.r);
        let true_norm = norm2(&self.r);
        Ok(stop.report(true_norm <= stop.threshold, iterations, true_norm))
    }

    fn name(&self) -> &'static str {
        "bicgstab"
    }
}

/// Runs the solver and preconditioner selected by `config`.
pub fn solve<T: Float + Send + Sync>(
    config: &SolverConfig,
    matrix: &CsrMatrix<T>,
    b: &[T],
    x: &mut [T],
) -> Result<SolveReport> {
    match (config.kind, config.preconditioner) {
        (SolverKind::ConjugateGradient, PreconditionerKind::Identity) => run(
            ConjugateGradient::new(config.clone()),
            matrix,
            b,
            x,
            &IdentityPreconditioner,
        ),
        (SolverKind::ConjugateGradient, PreconditionerKind::Jacobi) => {
            let pc = JacobiPreconditioner::from_matrix(matrix);
            run(ConjugateGradient::new(config.clone()), matrix, b, x, &pc)
        }
        (SolverKind::BiCgStab, PreconditionerKind::Identity) => run(
            BiCgStab::new(config.clone()),
            matrix,
            b,
            x,
            &IdentityPreconditioner,
        ),
        (SolverKind::BiCgStab, PreconditionerKind::Jacobi) => {
            let pc = JacobiPreconditioner::from_matrix(matrix);
            run(BiCgStab::new(config.clone()), matrix, b, x, &pc)
        }
    }
}

fn run<T, S, P>(mut solver: S, matrix: &CsrMatrix<T>, b: &[T], x: &mut [T], pc: &P) -> Result<SolveReport>
where
    S: IterativeSolver<T>,
    P: Preconditioner<T>,
{
    let report = solver.solve(matrix, b, x, pc)?;
    if report.converged {
        debug!(
            solver = solver.name(),
            preconditioner = pc.name(),
            iterations = report.iterations,
            residual = report.residual_norm,
            "linear solve converged"
        );
    } else {
        warn!(
            solver = solver.name(),
            preconditioner = pc.name(),
            iterations = report.iterations,
            residual = report.residual_norm,
            "linear solve did not converge, keeping best iterate"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linear::csr::CsrBuilder;

    /// 1D Poisson matrix with the first unknown pinned.
    fn path_laplacian(n: usize) -> CsrMatrix<f64> {
        let mut builder = CsrBuilder::new_square(n);
        for i in 0..n - 1 {
            builder.add_laplacian_edge(i, i + 1, 1.0);
        }
        builder.pin(0);
        builder.build()
    }

    fn check(config: SolverConfig) {
        let n = 12;
        let a = path_laplacian(n);
        let expected: Vec<f64> = (0..n).map(|i| (i * i) as f64 * 0.1).collect();
        let mut b = vec![0.0; n];
        a.mul_vec(&expected, &mut b);

        let mut x = vec![0.0; n];
        let report = solve(&config, &a, &b, &mut x).unwrap();
        assert!(report.converged, "{report:?}");
        for (got, want) in x.iter().zip(&expected) {
            assert!((got - want).abs() < 1e-6, "{got} vs {want}");
        }
        assert_eq!(x[0], 0.0);
    }

    #[test]
    fn all_solver_combinations_agree() {
        for kind in [SolverKind::ConjugateGradient, SolverKind::BiCgStab] {
            for pc in [PreconditionerKind::Identity, PreconditionerKind::Jacobi] {
                check(SolverConfig::new(1e-12, 500).with_kind(kind).with_preconditioner(pc));
            }
        }
    }

    #[test]
    fn solvers_and_preconditioners_are_named() {
        assert_eq!(ConjugateGradient::<f64>::new(SolverConfig::default()).name(), "cg");
        assert_eq!(BiCgStab::<f64>::new(SolverConfig::default()).name(), "bicgstab");
        assert_eq!(Preconditioner::<f64>::name(&IdentityPreconditioner), "identity");
        let jacobi = JacobiPreconditioner::from_matrix(&path_laplacian(3));
        assert_eq!(jacobi.name(), "jacobi");
    }

    #[test]
    fn zero_rhs_converges_immediately() {
        let a = path_laplacian(4);
        let mut x = vec![0.0; 4];
        let report = solve(&SolverConfig::default(), &a, &[0.0; 4], &mut x).unwrap();
        assert!(report.converged);
        assert_eq!(report.iterations, 0);
    }

    #[test]
    fn iteration_cap_is_not_an_error() {
        let a = path_laplacian(30);
        let b: Vec<f64> = (0..30).map(|i| if i == 0 { 0.0 } else { 1.0 }).collect();
        let mut x = vec![0.0; 30];
        let config = SolverConfig::new(1e-14, 2).with_kind(SolverKind::ConjugateGradient);
        let report = solve(&config, &a, &b, &mut x).unwrap();
        assert!(!report.converged);
        assert!(x.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn mismatched_rhs_is_rejected() {
        let a = path_laplacian(4);
        let mut x = vec![0.0; 4];
        let err = solve(&SolverConfig::default(), &a, &[1.0; 3], &mut x).unwrap_err();
        assert!(matches!(err, crate::error::MeshFlowError::DimensionMismatch(_)));
    }
}
