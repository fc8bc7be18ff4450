//! Node coordinates of one DOF set.
//!
//! Coordinates are stored flat, `dimension` values per node, in the local
//! order of the owning [`DofSet`](crate::data::dof_set::DofSet).

use crate::fsi_error::FsiError;

/// Coordinate storage with an attached dimension.
#[derive(Clone, Debug, PartialEq)]
pub struct Coordinates {
    dimension: usize,
    values: Vec<f64>,
}

impl Coordinates {
    /// Wrap flat coordinate values, validating that they split evenly into points.
    pub fn try_new(dimension: usize, values: Vec<f64>) -> Result<Self, FsiError> {
        if dimension == 0 || values.len() % dimension != 0 {
            return Err(FsiError::DimensionMismatch {
                expected: dimension,
                found: values.len(),
            });
        }
        Ok(Self { dimension, values })
    }

    /// Build from a list of points; every point must have `dimension` entries.
    pub fn from_points<P: AsRef<[f64]>>(dimension: usize, points: &[P]) -> Result<Self, FsiError> {
        let mut values = Vec::with_capacity(points.len() * dimension);
        for p in points {
            let p = p.as_ref();
            if p.len() != dimension {
                return Err(FsiError::DimensionMismatch {
                    expected: dimension,
                    found: p.len(),
                });
            }
            values.extend_from_slice(p);
        }
        Self::try_new(dimension, values)
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len() / self.dimension
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Coordinates of the point at local position `i`.
    #[inline]
    pub fn point(&self, i: usize) -> &[f64] {
        &self.values[i * self.dimension..(i + 1) * self.dimension]
    }
}

/// Euclidean distance between two points of equal dimension.
pub fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
