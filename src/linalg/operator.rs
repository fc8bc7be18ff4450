use sprs::CsMat;

/// Linear map `y = A x` over the monolithic (or a block) index space.
pub trait LinearOperator {
    /// out = A * v
    fn apply(&self, v: &[f64]) -> Vec<f64>;

    /// out += A * v
    fn apply_add(&self, v: &[f64], out: &mut [f64]) {
        for (o, r) in out.iter_mut().zip(self.apply(v)) {
            *o += r;
        }
    }

    /// Output dimension.
    fn rows(&self) -> usize;

    /// Input dimension.
    fn cols(&self) -> usize;
}

impl LinearOperator for CsMat<f64> {
    fn apply(&self, v: &[f64]) -> Vec<f64> {
        let mut result = vec![0.0; self.rows()];
        self.apply_add(v, &mut result);
        result
    }

    fn apply_add(&self, v: &[f64], out: &mut [f64]) {
        for (row_idx, row) in self.outer_iterator().enumerate() {
            let mut sum = 0.0;
            for (col_idx, &val) in row.iter() {
                sum += val * v[col_idx];
            }
            out[row_idx] += sum;
        }
    }

    fn rows(&self) -> usize {
        CsMat::rows(self)
    }

    fn cols(&self) -> usize {
        CsMat::cols(self)
    }
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn norm(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}

/// r = b - A x
pub fn residual<O: LinearOperator + ?Sized>(a: &O, x: &[f64], b: &[f64]) -> Vec<f64> {
    b.iter().zip(a.apply(x)).map(|(bi, axi)| bi - axi).collect()
}

/// Diagonal of a square sparse matrix; missing entries read as zero.
pub fn diagonal(a: &CsMat<f64>) -> Vec<f64> {
    (0..a.rows().min(a.cols()))
        .map(|i| a.get(i, i).copied().unwrap_or(0.0))
        .collect()
}
