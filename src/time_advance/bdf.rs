//! Backward differentiation formulas of order 1 to 3.
//!
//! With history `u⁽ⁿ⁾, u⁽ⁿ⁻¹⁾, …` (newest first) the first derivative at the
//! new level is `(α₀ u⁽ⁿ⁺¹⁾ − Σ βᵢ u⁽ⁿ⁻ⁱ⁾) / dt`. The rate history is tracked
//! alongside the states so the same formula applied to rates yields a
//! second derivative for structure use.

use std::collections::VecDeque;

use crate::fsi_error::FsiError;

const ALPHA: [f64; 3] = [1.0, 1.5, 11.0 / 6.0];
const BETA: [&[f64]; 3] = [&[1.0], &[2.0, -0.5], &[3.0, -1.5, 1.0 / 3.0]];
const EXTRAPOLATION: [&[f64]; 3] = [&[1.0], &[2.0, -1.0], &[3.0, -3.0, 1.0]];

#[derive(Clone, Debug, PartialEq)]
pub struct Bdf {
    order: usize,
    dt: f64,
    states: VecDeque<Vec<f64>>,
    rates: VecDeque<Vec<f64>>,
}

fn weighted_sum(weights: &[f64], history: &VecDeque<Vec<f64>>) -> Vec<f64> {
    let n = history.front().map_or(0, Vec::len);
    let mut out = vec![0.0; n];
    for (w, snapshot) in weights.iter().zip(history) {
        for (o, s) in out.iter_mut().zip(snapshot) {
            *o += w * s;
        }
    }
    out
}

impl Bdf {
    pub fn new(order: usize, dt: f64) -> Result<Self, FsiError> {
        if !(1..=3).contains(&order) {
            return Err(FsiError::InvalidTimeAdvance(format!(
                "BDF order {order} not in 1..=3"
            )));
        }
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(FsiError::InvalidTimeAdvance(format!("time step {dt}")));
        }
        Ok(Self {
            order,
            dt,
            states: VecDeque::new(),
            rates: VecDeque::new(),
        })
    }

    /// Seed the history with `u0` repeated `order` times and zero rates.
    pub fn initialize(&mut self, u0: Vec<f64>) {
        let zeros = vec![0.0; u0.len()];
        self.states = std::iter::repeat_n(u0, self.order).collect();
        self.rates = std::iter::repeat_n(zeros, self.order).collect();
    }

    /// Seed from explicit snapshots, newest first. Exactly `order` are required.
    pub fn initialize_history(&mut self, states: Vec<Vec<f64>>) -> Result<(), FsiError> {
        if states.len() != self.order {
            return Err(FsiError::InvalidTimeAdvance(format!(
                "BDF{} needs {} snapshots, got {}",
                self.order,
                self.order,
                states.len()
            )));
        }
        let n = states[0].len();
        if states.iter().any(|s| s.len() != n) {
            return Err(FsiError::InvalidTimeAdvance("snapshots of unequal length".into()));
        }
        self.rates = std::iter::repeat_n(vec![0.0; n], self.order).collect();
        self.states = states.into();
        Ok(())
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Leading coefficient α₀.
    pub fn alpha(&self) -> f64 {
        ALPHA[self.order - 1]
    }

    fn beta(&self) -> &'static [f64] {
        BETA[self.order - 1]
    }

    /// `Σ βᵢ u⁽ⁿ⁻ⁱ⁾ / dt`, the history part of the time derivative.
    pub fn rhs_contribution(&self) -> Vec<f64> {
        let mut out = weighted_sum(self.beta(), &self.states);
        out.iter_mut().for_each(|v| *v /= self.dt);
        out
    }

    /// Polynomial extrapolation of order `order.min(self.order)` to the new level.
    pub fn extrapolate(&self, order: usize) -> Vec<f64> {
        let k = order.clamp(1, self.order);
        weighted_sum(EXTRAPOLATION[k - 1], &self.states)
    }

    /// Extrapolated first derivative, from the rate history.
    pub fn extrapolate_rate(&self) -> Vec<f64> {
        weighted_sum(EXTRAPOLATION[self.order - 1], &self.rates)
    }

    /// Coefficient `c₂` in `u'' ≈ (c₂/dt²) u⁽ⁿ⁺¹⁾ − h₂`.
    pub fn second_derivative_coefficient(&self) -> f64 {
        self.alpha() * self.alpha()
    }

    /// `h₂ = α₀ Σβᵢu⁽ⁿ⁻ⁱ⁾ / dt² + Σβᵢv⁽ⁿ⁻ⁱ⁾ / dt`.
    pub fn rhs_second_derivative(&self) -> Vec<f64> {
        let su = weighted_sum(self.beta(), &self.states);
        let sv = weighted_sum(self.beta(), &self.rates);
        let (a, dt) = (self.alpha(), self.dt);
        su.iter()
            .zip(&sv)
            .map(|(u, v)| a * u / (dt * dt) + v / dt)
            .collect()
    }

    /// Newest accepted state.
    pub fn current(&self) -> &[f64] {
        self.states.front().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Accept `u_new`: record its rate, drop the oldest snapshot.
    pub fn shift(&mut self, u_new: Vec<f64>) -> Result<(), FsiError> {
        if u_new.len() != self.current().len() {
            return Err(FsiError::LengthMismatch {
                what: "BDF snapshot",
                expected: self.current().len(),
                found: u_new.len(),
            });
        }
        let history = self.rhs_contribution();
        let rate = u_new
            .iter()
            .zip(&history)
            .map(|(u, h)| self.alpha() * u / self.dt - h)
            .collect();
        self.states.pop_back();
        self.states.push_front(u_new);
        self.rates.pop_back();
        self.rates.push_front(rate);
        Ok(())
    }
}
