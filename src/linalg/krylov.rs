//! Krylov solvers for the Newton correction.
//!
//! Both solvers start from a zero guess and stop when
//! `‖r‖ < rel_tol·‖b‖` or `‖r‖ < abs_tol`. Non-convergence is reported in
//! [`SolverStats`], never as an error.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::linalg::operator::{LinearOperator, dot, norm, residual};
use crate::linalg::preconditioner::Preconditioner;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SolverStats {
    pub iterations: usize,
    /// Final residual norm `‖b − A x‖` (GMRES: the least-squares estimate).
    pub residual_norm: f64,
    pub relative_residual: f64,
    pub converged: bool,
    /// Wall time in seconds.
    pub solve_time: f64,
}

impl SolverStats {
    fn trivial(start: Instant) -> Self {
        Self {
            converged: true,
            solve_time: start.elapsed().as_secs_f64(),
            ..Self::default()
        }
    }
}

/// Krylov method selected in the configuration.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinearSolverKind {
    Gmres { restart: usize },
    BiCgStab,
}

impl Default for LinearSolverKind {
    fn default() -> Self {
        LinearSolverKind::Gmres { restart: 50 }
    }
}

/// Configured Krylov solver.
#[derive(Clone, Debug, PartialEq)]
pub struct KrylovSolver {
    kind: LinearSolverKind,
    max_iterations: usize,
    abs_tolerance: f64,
}

impl KrylovSolver {
    pub fn new(kind: LinearSolverKind, max_iterations: usize, abs_tolerance: f64) -> Self {
        Self {
            kind,
            max_iterations,
            abs_tolerance,
        }
    }

    pub fn kind(&self) -> LinearSolverKind {
        self.kind
    }

    /// Solve `A x = b` to relative tolerance `rel_tol`.
    pub fn solve<O, P>(&self, a: &O, b: &[f64], precond: &P, rel_tol: f64) -> (Vec<f64>, SolverStats)
    where
        O: LinearOperator + ?Sized,
        P: Preconditioner + ?Sized,
    {
        match self.kind {
            LinearSolverKind::Gmres { restart } => gmres(
                a,
                b,
                precond,
                restart.max(1),
                self.max_iterations,
                rel_tol,
                self.abs_tolerance,
            ),
            LinearSolverKind::BiCgStab => {
                bicgstab(a, b, precond, self.max_iterations, rel_tol, self.abs_tolerance)
            }
        }
    }
}

fn givens_rotation(a: f64, b: f64) -> (f64, f64, f64) {
    if b.abs() < 1e-40 {
        (1.0, 0.0, a)
    } else if b.abs() > a.abs() {
        let tau = a / b;
        let s = 1.0 / (1.0 + tau * tau).sqrt();
        (s * tau, s, b * (1.0 + tau * tau).sqrt())
    } else {
        let tau = b / a;
        let c = 1.0 / (1.0 + tau * tau).sqrt();
        (c, c * tau, a * (1.0 + tau * tau).sqrt())
    }
}

/// Restarted GMRES with right preconditioning.
pub fn gmres<O, P>(
    a: &O,
    b: &[f64],
    precond: &P,
    restart: usize,
    max_iterations: usize,
    rel_tol: f64,
    abs_tol: f64,
) -> (Vec<f64>, SolverStats)
where
    O: LinearOperator + ?Sized,
    P: Preconditioner + ?Sized,
{
    let n = b.len();
    let start = Instant::now();
    let b_norm = norm(b);
    if b_norm < 1e-25 {
        return (vec![0.0; n], SolverStats::trivial(start));
    }
    let done = |res: f64| res < rel_tol * b_norm || res < abs_tol;

    let mut x = vec![0.0; n];
    let mut total_iter = 0;
    let mut converged = false;
    let mut final_res = b_norm;

    while total_iter < max_iterations {
        let r = residual(a, &x, b);
        let r_norm = norm(&r);
        final_res = r_norm;
        if done(r_norm) {
            converged = true;
            break;
        }

        let m = restart;
        let mut v = vec![vec![0.0; n]; m + 1];
        let mut h = vec![vec![0.0; m]; m + 1];
        v[0] = r.iter().map(|ri| ri / r_norm).collect();
        let mut g = vec![0.0; m + 1];
        g[0] = r_norm;
        let mut cs = vec![0.0; m];
        let mut sn = vec![0.0; m];

        let mut k = 0;
        for j in 0..m {
            if total_iter >= max_iterations {
                break;
            }
            let mut w = a.apply(&precond.apply(&v[j]));
            for i in 0..=j {
                h[i][j] = dot(&v[i], &w);
                for (wl, vl) in w.iter_mut().zip(&v[i]) {
                    *wl -= h[i][j] * vl;
                }
            }
            h[j + 1][j] = norm(&w);
            if h[j + 1][j].abs() > 1e-40 {
                v[j + 1] = w.iter().map(|wl| wl / h[j + 1][j]).collect();
            }

            for i in 0..j {
                let temp = cs[i] * h[i][j] + sn[i] * h[i + 1][j];
                h[i + 1][j] = -sn[i] * h[i][j] + cs[i] * h[i + 1][j];
                h[i][j] = temp;
            }
            let (c, s, rho) = givens_rotation(h[j][j], h[j + 1][j]);
            cs[j] = c;
            sn[j] = s;
            h[j][j] = rho;
            h[j + 1][j] = 0.0;
            g[j + 1] = -s * g[j];
            g[j] *= c;

            k = j + 1;
            total_iter += 1;
            final_res = g[k].abs();
            if done(final_res) {
                break;
            }
        }

        let mut y = vec![0.0; k];
        for i in (0..k).rev() {
            if h[i][i].abs() < 1e-40 {
                break;
            }
            let sum: f64 = ((i + 1)..k).map(|j| h[i][j] * y[j]).sum();
            y[i] = (g[i] - sum) / h[i][i];
        }
        let mut dy = vec![0.0; n];
        for (vj, yj) in v.iter().zip(&y) {
            for (d, vi) in dy.iter_mut().zip(vj) {
                *d += vi * yj;
            }
        }
        for (xi, di) in x.iter_mut().zip(precond.apply(&dy)) {
            *xi += di;
        }

        if done(final_res) {
            converged = true;
            break;
        }
    }

    log::debug!(
        "gmres: {} iterations, residual {:.3e} (relative {:.3e})",
        total_iter,
        final_res,
        final_res / b_norm
    );
    (
        x,
        SolverStats {
            iterations: total_iter,
            residual_norm: final_res,
            relative_residual: final_res / b_norm,
            converged,
            solve_time: start.elapsed().as_secs_f64(),
        },
    )
}

/// Right-preconditioned BiCGSTAB.
pub fn bicgstab<O, P>(
    a: &O,
    b: &[f64],
    precond: &P,
    max_iterations: usize,
    rel_tol: f64,
    abs_tol: f64,
) -> (Vec<f64>, SolverStats)
where
    O: LinearOperator + ?Sized,
    P: Preconditioner + ?Sized,
{
    let n = b.len();
    let start = Instant::now();
    let b_norm = norm(b);
    if b_norm < 1e-25 {
        return (vec![0.0; n], SolverStats::trivial(start));
    }
    let done = |res: f64| res < rel_tol * b_norm || res < abs_tol;

    let mut x = vec![0.0; n];
    let mut r = b.to_vec();
    let r_hat = r.clone();
    let mut rho = 1.0;
    let mut alpha = 1.0;
    let mut omega = 1.0;
    let mut v = vec![0.0; n];
    let mut p = vec![0.0; n];

    let mut total_iter = 0;
    let mut converged = false;
    let mut final_res = b_norm;

    while total_iter < max_iterations {
        let rho_prev = rho;
        rho = dot(&r_hat, &r);
        if rho.abs() < 1e-40 {
            break;
        }
        if total_iter == 0 {
            p.clone_from(&r);
        } else {
            let beta = (rho / rho_prev) * (alpha / omega);
            for i in 0..n {
                p[i] = r[i] + beta * (p[i] - omega * v[i]);
            }
        }

        let p_hat = precond.apply(&p);
        v = a.apply(&p_hat);
        let rhat_v = dot(&r_hat, &v);
        if rhat_v.abs() < 1e-40 {
            break;
        }
        alpha = rho / rhat_v;

        let s: Vec<f64> = r.iter().zip(&v).map(|(ri, vi)| ri - alpha * vi).collect();
        let s_norm = norm(&s);
        if done(s_norm) {
            for (xi, pi) in x.iter_mut().zip(&p_hat) {
                *xi += alpha * pi;
            }
            final_res = s_norm;
            total_iter += 1;
            converged = true;
            break;
        }

        let s_hat = precond.apply(&s);
        let t = a.apply(&s_hat);
        let t_t = dot(&t, &t);
        if t_t.abs() < 1e-40 {
            break;
        }
        omega = dot(&t, &s) / t_t;

        for i in 0..n {
            x[i] += alpha * p_hat[i] + omega * s_hat[i];
            r[i] = s[i] - omega * t[i];
        }
        final_res = norm(&r);
        total_iter += 1;
        if done(final_res) {
            converged = true;
            break;
        }
        if omega.abs() < 1e-40 {
            break;
        }
    }

    log::debug!(
        "bicgstab: {} iterations, residual {:.3e} (relative {:.3e})",
        total_iter,
        final_res,
        final_res / b_norm
    );
    (
        x,
        SolverStats {
            iterations: total_iter,
            residual_norm: final_res,
            relative_residual: final_res / b_norm,
            converged,
            solve_time: start.elapsed().as_secs_f64(),
        },
    )
}
