//! Newmark scheme (second-order fields) and its θ-method reduction
//! (first-order fields such as the mesh displacement).
//!
//! For a second-order field with state `(u, v, a)` at level `n`:
//!
//! ```text
//!   p    = u + dt v + dt² (½ − β) a
//!   aⁿ⁺¹ = (c₂/dt²) uⁿ⁺¹ − h₂,   c₂ = 1/β,  h₂ = p / (β dt²)
//!   vⁿ⁺¹ = (c₁/dt)  uⁿ⁺¹ − h₁,   c₁ = γ/β,  h₁ = γ p / (β dt) − v − dt (1 − γ) a
//! ```
//!
//! The first-order variant keeps `(u, v)` and uses
//! `vⁿ⁺¹ = (1/(θ dt)) uⁿ⁺¹ − (u/(θ dt) + (1 − θ)/θ v)`.

use crate::fsi_error::FsiError;

#[derive(Copy, Clone, Debug, PartialEq)]
enum Variant {
    First { theta: f64 },
    Second { gamma: f64, beta: f64 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Newmark {
    variant: Variant,
    dt: f64,
    u: Vec<f64>,
    v: Vec<f64>,
    a: Vec<f64>,
}

fn check_dt(dt: f64) -> Result<(), FsiError> {
    if dt > 0.0 && dt.is_finite() {
        Ok(())
    } else {
        Err(FsiError::InvalidTimeAdvance(format!("time step {dt}")))
    }
}

impl Newmark {
    pub fn second_order(dt: f64, gamma: f64, beta: f64) -> Result<Self, FsiError> {
        check_dt(dt)?;
        if !(beta > 0.0) || !(0.0..=1.0).contains(&gamma) {
            return Err(FsiError::InvalidTimeAdvance(format!(
                "Newmark parameters gamma = {gamma}, beta = {beta}"
            )));
        }
        Ok(Self {
            variant: Variant::Second { gamma, beta },
            dt,
            u: Vec::new(),
            v: Vec::new(),
            a: Vec::new(),
        })
    }

    pub fn first_order(dt: f64, theta: f64) -> Result<Self, FsiError> {
        check_dt(dt)?;
        if !(theta > 0.0 && theta <= 1.0) {
            return Err(FsiError::InvalidTimeAdvance(format!("theta = {theta}")));
        }
        Ok(Self {
            variant: Variant::First { theta },
            dt,
            u: Vec::new(),
            v: Vec::new(),
            a: Vec::new(),
        })
    }

    /// Initial state; velocity and acceleration default to zero.
    pub fn initialize(&mut self, u0: Vec<f64>) {
        let zeros = vec![0.0; u0.len()];
        self.v = zeros.clone();
        self.a = zeros;
        self.u = u0;
    }

    pub fn set_initial_condition(&mut self, u0: Vec<f64>, v0: Vec<f64>, a0: Vec<f64>) -> Result<(), FsiError> {
        if v0.len() != u0.len() || a0.len() != u0.len() {
            return Err(FsiError::LengthMismatch {
                what: "Newmark initial condition",
                expected: u0.len(),
                found: if v0.len() != u0.len() { v0.len() } else { a0.len() },
            });
        }
        self.u = u0;
        self.v = v0;
        self.a = a0;
        Ok(())
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn is_second_order(&self) -> bool {
        matches!(self.variant, Variant::Second { .. })
    }

    pub fn displacement(&self) -> &[f64] {
        &self.u
    }

    pub fn velocity(&self) -> &[f64] {
        &self.v
    }

    pub fn acceleration(&self) -> &[f64] {
        &self.a
    }

    fn predictor(&self, beta: f64) -> Vec<f64> {
        let dt = self.dt;
        self.u
            .iter()
            .zip(&self.v)
            .zip(&self.a)
            .map(|((u, v), a)| u + dt * v + dt * dt * (0.5 - beta) * a)
            .collect()
    }

    /// `c₁`.
    pub fn first_derivative_coefficient(&self) -> f64 {
        match self.variant {
            Variant::First { theta } => 1.0 / theta,
            Variant::Second { gamma, beta } => gamma / beta,
        }
    }

    /// `h₁`.
    pub fn rhs_first_derivative(&self) -> Vec<f64> {
        let dt = self.dt;
        match self.variant {
            Variant::First { theta } => self
                .u
                .iter()
                .zip(&self.v)
                .map(|(u, v)| u / (theta * dt) + (1.0 - theta) / theta * v)
                .collect(),
            Variant::Second { gamma, beta } => self
                .predictor(beta)
                .iter()
                .zip(&self.v)
                .zip(&self.a)
                .map(|((p, v), a)| gamma * p / (beta * dt) - v - dt * (1.0 - gamma) * a)
                .collect(),
        }
    }

    /// `c₂`; only defined for second-order fields.
    pub fn second_derivative_coefficient(&self) -> Result<f64, FsiError> {
        match self.variant {
            Variant::Second { beta, .. } => Ok(1.0 / beta),
            Variant::First { .. } => Err(FsiError::InvalidTimeAdvance(
                "second derivative of a first-order Newmark field".into(),
            )),
        }
    }

    /// `h₂`; only defined for second-order fields.
    pub fn rhs_second_derivative(&self) -> Result<Vec<f64>, FsiError> {
        match self.variant {
            Variant::Second { beta, .. } => {
                let scale = 1.0 / (beta * self.dt * self.dt);
                Ok(self.predictor(beta).iter().map(|p| p * scale).collect())
            }
            Variant::First { .. } => Err(FsiError::InvalidTimeAdvance(
                "second derivative of a first-order Newmark field".into(),
            )),
        }
    }

    /// Velocity guess for the next level: the last accepted velocity.
    pub fn extrapolate_first_derivative(&self) -> Vec<f64> {
        self.v.clone()
    }

    /// Linear extrapolation of the displacement.
    pub fn extrapolate(&self) -> Vec<f64> {
        self.u
            .iter()
            .zip(&self.v)
            .map(|(u, v)| u + self.dt * v)
            .collect()
    }

    /// Accept `u_new` and update velocity and acceleration.
    pub fn shift(&mut self, u_new: Vec<f64>) -> Result<(), FsiError> {
        if u_new.len() != self.u.len() {
            return Err(FsiError::LengthMismatch {
                what: "Newmark snapshot",
                expected: self.u.len(),
                found: u_new.len(),
            });
        }
        let c1 = self.first_derivative_coefficient() / self.dt;
        let h1 = self.rhs_first_derivative();
        let v_new: Vec<f64> = u_new.iter().zip(&h1).map(|(u, h)| c1 * u - h).collect();
        if let Variant::Second { .. } = self.variant {
            let c2 = self.second_derivative_coefficient()? / (self.dt * self.dt);
            let h2 = self.rhs_second_derivative()?;
            self.a = u_new.iter().zip(&h2).map(|(u, h)| c2 * u - h).collect();
        }
        self.v = v_new;
        self.u = u_new;
        Ok(())
    }
}
