use sprs::CsMat;

use crate::linalg::operator::diagonal;

/// Approximate inverse `z = M⁻¹ r`, with `M ≈ A`.
pub trait Preconditioner {
    fn apply(&self, r: &[f64]) -> Vec<f64>;
}

/// No preconditioning.
#[derive(Copy, Clone, Debug, Default)]
pub struct IdentityPreconditioner;

impl Preconditioner for IdentityPreconditioner {
    fn apply(&self, r: &[f64]) -> Vec<f64> {
        r.to_vec()
    }
}

/// Diagonal scaling, `M = diag(A)`. Near-zero diagonal entries are left unscaled.
#[derive(Clone, Debug, PartialEq)]
pub struct JacobiPreconditioner {
    diag_inv: Vec<f64>,
}

impl JacobiPreconditioner {
    pub fn new(a: &CsMat<f64>) -> Self {
        Self::from_diagonal(&diagonal(a))
    }

    pub fn from_diagonal(diag: &[f64]) -> Self {
        let diag_inv = diag
            .iter()
            .map(|&d| if d.abs() > 1e-14 { 1.0 / d } else { 1.0 })
            .collect();
        Self { diag_inv }
    }

    pub fn len(&self) -> usize {
        self.diag_inv.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diag_inv.is_empty()
    }

    pub fn inverse_diagonal(&self) -> &[f64] {
        &self.diag_inv
    }
}

impl Preconditioner for JacobiPreconditioner {
    fn apply(&self, r: &[f64]) -> Vec<f64> {
        r.iter().zip(&self.diag_inv).map(|(ri, di)| ri * di).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_diagonal_falls_back_to_identity() {
        let p = JacobiPreconditioner::from_diagonal(&[2.0, 0.0, -4.0]);
        assert_eq!(p.apply(&[1.0, 1.0, 1.0]), vec![0.5, 1.0, -0.25]);
    }
}
