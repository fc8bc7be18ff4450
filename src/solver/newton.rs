//! Inexact Newton iteration with optional backtracking.
//!
//! Iterates `x ← x − ω δ` with `J δ = r(x)` solved to relative tolerance
//! `η`. Stops when `‖r‖ ≤ abs_tol + rel_tol·‖r₀‖`. The forcing term follows
//! Eisenstat–Walker (choice 2, `γ = 0.9`) and never exceeds `eta_max`.
//! Iterates are immutable values: each step produces a new solution.

use crate::data::block_vector::BlockVector;
use crate::fsi_error::FsiError;
use crate::linalg::krylov::SolverStats;
use crate::solver::config::{LineSearch, NewtonConfig};

const FORCING_GAMMA: f64 = 0.9;
const MAX_BACKTRACKS: usize = 10;
const SUFFICIENT_DECREASE: f64 = 1e-4;

/// Outcome of one linearized solve.
#[derive(Clone, Debug)]
pub enum LinearStep {
    Increment(BlockVector, SolverStats),
    NotConverged(SolverStats),
}

/// Residual and Jacobian-solve pair driven by [`solve`].
pub trait NonlinearProblem {
    /// `r(x)`. May mutate problem state (e.g. the fluid mesh).
    fn evaluate_residual(&mut self, solution: &BlockVector) -> Result<BlockVector, FsiError>;

    /// Solve `J δ = residual` to relative tolerance `rel_tol`, with `J` the
    /// Jacobian at the last evaluated solution.
    fn solve_linear_step(
        &mut self,
        residual: &BlockVector,
        rel_tol: f64,
    ) -> Result<LinearStep, FsiError>;

    /// Whether this process reports progress.
    fn is_leader(&self) -> bool {
        true
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NewtonStatus {
    Converged,
    MaxIterations,
    LinearSolveFailed,
    LineSearchFailed,
    /// The residual norm became infinite or NaN.
    Diverged,
}

#[derive(Clone, Debug)]
pub struct NewtonReport {
    pub status: NewtonStatus,
    pub iterations: usize,
    /// `‖r‖` at the initial guess and after every accepted update.
    pub residual_history: Vec<f64>,
    pub linear_iterations: usize,
    /// Last accepted iterate.
    pub solution: BlockVector,
}

impl NewtonReport {
    pub fn converged(&self) -> bool {
        self.status == NewtonStatus::Converged
    }
}

fn next_forcing(eta: f64, norm: f64, previous: f64, stop: f64, eta_max: f64) -> f64 {
    let ratio = norm / previous;
    let mut next = FORCING_GAMMA * ratio * ratio;
    let safeguard = FORCING_GAMMA * eta * eta;
    if safeguard > 0.1 {
        next = next.max(safeguard);
    }
    // no point in solving far below the nonlinear stopping tolerance
    next = next.max(0.5 * stop / norm);
    next.min(eta_max)
}

pub fn solve<P>(
    problem: &mut P,
    initial: BlockVector,
    params: &NewtonConfig,
) -> Result<NewtonReport, FsiError>
where
    P: NonlinearProblem + ?Sized,
{
    let leader = problem.is_leader();
    let mut x = initial;
    let mut r = problem.evaluate_residual(&x)?;
    let mut norm = r.norm();
    let stop = params.abs_tol + params.rel_tol * norm;
    let mut history = vec![norm];
    let mut eta = params.eta_max;
    let mut iterations = 0;
    let mut linear_iterations = 0;

    if leader {
        log::info!("Newton: initial residual {norm:e}, stopping tolerance {stop:e}");
    }

    let status = loop {
        if !norm.is_finite() {
            break NewtonStatus::Diverged;
        }
        if norm <= stop {
            break NewtonStatus::Converged;
        }
        if iterations == params.max_iterations {
            break NewtonStatus::MaxIterations;
        }
        iterations += 1;

        let delta = match problem.solve_linear_step(&r, eta)? {
            LinearStep::Increment(delta, stats) => {
                linear_iterations += stats.iterations;
                log::debug!(
                    "Newton {iterations}: linear solve in {} iterations, relative residual {:e}",
                    stats.iterations,
                    stats.relative_residual
                );
                delta
            }
            LinearStep::NotConverged(stats) => {
                linear_iterations += stats.iterations;
                log::warn!(
                    "Newton {iterations}: linear solve did not converge ({} iterations, residual {:e})",
                    stats.iterations,
                    stats.residual_norm
                );
                break NewtonStatus::LinearSolveFailed;
            }
        };

        let mut omega = 1.0;
        let mut trial = x.axpy(-omega, &delta)?;
        let mut trial_r = problem.evaluate_residual(&trial)?;
        let mut trial_norm = trial_r.norm();
        let mut line_search_failed = false;
        if params.line_search == LineSearch::Backtracking {
            let mut backtracks = 0;
            while !(trial_norm <= (1.0 - SUFFICIENT_DECREASE * omega) * norm) {
                if backtracks == MAX_BACKTRACKS {
                    line_search_failed = true;
                    break;
                }
                backtracks += 1;
                omega *= 0.5;
                trial = x.axpy(-omega, &delta)?;
                trial_r = problem.evaluate_residual(&trial)?;
                trial_norm = trial_r.norm();
            }
            if backtracks > 0 {
                log::debug!("Newton {iterations}: damped step ω = {omega}");
            }
        }

        eta = next_forcing(eta, trial_norm, norm, stop, params.eta_max);
        x = trial;
        r = trial_r;
        norm = trial_norm;
        history.push(norm);
        if leader {
            log::info!("Newton {iterations}: residual {norm:e}, forcing term {eta:e}");
        }
        if line_search_failed {
            log::warn!("Newton {iterations}: no sufficient decrease after {MAX_BACKTRACKS} backtracks");
            break NewtonStatus::LineSearchFailed;
        }
    };

    if leader && status != NewtonStatus::Converged {
        log::warn!("Newton stopped after {iterations} iterations: {status:?}");
    }
    Ok(NewtonReport {
        status,
        iterations,
        residual_history: history,
        linear_iterations,
        solution: x,
    })
}
