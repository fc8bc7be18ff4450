//! Time discretization of the field histories.
//!
//! The fluid velocity always uses [`Bdf`]. Structure and mesh displacement
//! use a [`TimeAdvance`], a closed choice between Newmark and BDF made from
//! the configuration. Every scheme exposes the same three things: a leading
//! coefficient, a history right-hand side and an extrapolation.

pub mod bdf;
pub mod newmark;

use serde::{Deserialize, Serialize};

pub use bdf::Bdf;
pub use newmark::Newmark;

use crate::fsi_error::FsiError;

/// Scheme for displacement fields, as read from the configuration.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimeAdvanceKind {
    Newmark { gamma: f64, beta: f64 },
    Bdf { order: usize },
}

impl Default for TimeAdvanceKind {
    fn default() -> Self {
        TimeAdvanceKind::Newmark {
            gamma: 0.5,
            beta: 0.25,
        }
    }
}

/// History of a displacement field.
#[derive(Clone, Debug, PartialEq)]
pub enum TimeAdvance {
    Newmark(Newmark),
    Bdf(Bdf),
}

impl TimeAdvance {
    /// Scheme for a field governed by a second time derivative (structure).
    pub fn second_order(kind: TimeAdvanceKind, dt: f64) -> Result<Self, FsiError> {
        Ok(match kind {
            TimeAdvanceKind::Newmark { gamma, beta } => {
                TimeAdvance::Newmark(Newmark::second_order(dt, gamma, beta)?)
            }
            TimeAdvanceKind::Bdf { order } => TimeAdvance::Bdf(Bdf::new(order, dt)?),
        })
    }

    /// Scheme for a field whose first derivative is needed (mesh velocity).
    pub fn first_order(kind: TimeAdvanceKind, dt: f64) -> Result<Self, FsiError> {
        Ok(match kind {
            TimeAdvanceKind::Newmark { gamma, .. } => {
                TimeAdvance::Newmark(Newmark::first_order(dt, gamma)?)
            }
            TimeAdvanceKind::Bdf { order } => TimeAdvance::Bdf(Bdf::new(order, dt)?),
        })
    }

    pub fn initialize(&mut self, u0: Vec<f64>) {
        match self {
            TimeAdvance::Newmark(nm) => nm.initialize(u0),
            TimeAdvance::Bdf(bdf) => bdf.initialize(u0),
        }
    }

    pub fn dt(&self) -> f64 {
        match self {
            TimeAdvance::Newmark(nm) => nm.dt(),
            TimeAdvance::Bdf(bdf) => bdf.dt(),
        }
    }

    /// `c₁` in `u' ≈ (c₁/dt) uⁿ⁺¹ − h₁`.
    pub fn first_derivative_coefficient(&self) -> f64 {
        match self {
            TimeAdvance::Newmark(nm) => nm.first_derivative_coefficient(),
            TimeAdvance::Bdf(bdf) => bdf.alpha(),
        }
    }

    /// `h₁`.
    pub fn rhs_first_derivative(&self) -> Vec<f64> {
        match self {
            TimeAdvance::Newmark(nm) => nm.rhs_first_derivative(),
            TimeAdvance::Bdf(bdf) => bdf.rhs_contribution(),
        }
    }

    /// `c₂` in `u'' ≈ (c₂/dt²) uⁿ⁺¹ − h₂`.
    pub fn second_derivative_coefficient(&self) -> Result<f64, FsiError> {
        match self {
            TimeAdvance::Newmark(nm) => nm.second_derivative_coefficient(),
            TimeAdvance::Bdf(bdf) => Ok(bdf.second_derivative_coefficient()),
        }
    }

    /// `h₂`.
    pub fn rhs_second_derivative(&self) -> Result<Vec<f64>, FsiError> {
        match self {
            TimeAdvance::Newmark(nm) => nm.rhs_second_derivative(),
            TimeAdvance::Bdf(bdf) => Ok(bdf.rhs_second_derivative()),
        }
    }

    /// Extrapolated first derivative at the new level.
    pub fn extrapolate_first_derivative(&self) -> Vec<f64> {
        match self {
            TimeAdvance::Newmark(nm) => nm.extrapolate_first_derivative(),
            TimeAdvance::Bdf(bdf) => bdf.extrapolate_rate(),
        }
    }

    pub fn shift(&mut self, u_new: Vec<f64>) -> Result<(), FsiError> {
        match self {
            TimeAdvance::Newmark(nm) => nm.shift(u_new),
            TimeAdvance::Bdf(bdf) => bdf.shift(u_new),
        }
    }

    /// Latest accepted value of the field.
    pub fn current(&self) -> &[f64] {
        match self {
            TimeAdvance::Newmark(nm) => nm.displacement(),
            TimeAdvance::Bdf(bdf) => bdf.current(),
        }
    }
}
