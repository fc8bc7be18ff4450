//! Boundary conditions selected by boundary marker.
//!
//! A [`BoundaryConditionSet`] holds essential, natural and mixed (Robin)
//! conditions. Before use it is resolved against a [`DofSet`] with
//! [`BoundaryConditionSet::update`], which turns each marker into the list
//! of constrained global DOFs together with their node coordinates.
//!
//! Essential conditions replace matrix rows by identity rows and set the
//! right-hand side entry to `scale * g(t, x)`; columns are left untouched so
//! the same rows stay valid inside a Newton residual. Natural conditions add
//! a lumped nodal load `scale * g(t, x)`. Mixed conditions add their
//! coefficient to the diagonal and a nodal load like natural ones.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use sprs::{CsMat, TriMat};

use crate::data::dof_set::DofSet;
use crate::fsi_error::FsiError;

/// Boundary data `g(t, x, component)`.
pub type BcFunction = Arc<dyn Fn(f64, &[f64], usize) -> f64 + Send + Sync>;

/// Zero boundary data.
pub fn zero_function() -> BcFunction {
    Arc::new(|_, _, _| 0.0)
}

/// Constant boundary data, same value for every component.
pub fn constant_function(value: f64) -> BcFunction {
    Arc::new(move |_, _, _| value)
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum BcKind {
    Essential,
    Natural,
    Mixed { coefficient: f64 },
}

/// Components a condition acts on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BcComponents {
    /// Every component of the field.
    Full,
    /// The listed components only.
    Listed(Vec<usize>),
}

#[derive(Clone)]
pub struct BoundaryCondition {
    name: String,
    marker: i32,
    kind: BcKind,
    components: BcComponents,
    function: BcFunction,
}

impl BoundaryCondition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn marker(&self) -> i32 {
        self.marker
    }

    pub fn kind(&self) -> BcKind {
        self.kind
    }
}

impl fmt::Debug for BoundaryCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundaryCondition")
            .field("name", &self.name)
            .field("marker", &self.marker)
            .field("kind", &self.kind)
            .field("components", &self.components)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
struct ResolvedDof {
    dof: usize,
    component: usize,
    point: Vec<f64>,
}

#[derive(Clone, Debug, Default)]
pub struct BoundaryConditionSet {
    conditions: Vec<BoundaryCondition>,
    resolved: Option<Vec<Vec<ResolvedDof>>>,
    num_dofs: usize,
}

impl BoundaryConditionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a condition. Invalidates any previous [`update`](Self::update).
    pub fn add_bc(
        &mut self,
        name: impl Into<String>,
        marker: i32,
        kind: BcKind,
        components: BcComponents,
        function: BcFunction,
    ) -> &mut Self {
        self.conditions.push(BoundaryCondition {
            name: name.into(),
            marker,
            kind,
            components,
            function,
        });
        self.resolved = None;
        self
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> &[BoundaryCondition] {
        &self.conditions
    }

    pub fn is_updated(&self) -> bool {
        self.resolved.is_some()
    }

    /// Resolve every marker into constrained DOFs of `dofs`.
    ///
    /// A condition whose marker matches no local node is valid (the rank
    /// simply does not touch that boundary).
    pub fn update(&mut self, dofs: &DofSet) -> Result<(), FsiError> {
        let mut resolved = Vec::with_capacity(self.conditions.len());
        for bc in &self.conditions {
            let components: Vec<usize> = match &bc.components {
                BcComponents::Full => (0..dofs.components()).collect(),
                BcComponents::Listed(list) => list.clone(),
            };
            if let Some(&bad) = components.iter().find(|&&c| c >= dofs.components()) {
                return Err(FsiError::BoundaryCondition {
                    name: bc.name.clone(),
                    message: format!(
                        "component {bad} out of range for a {}-component field",
                        dofs.components()
                    ),
                });
            }
            let mut entries = Vec::new();
            for node in dofs.boundary_nodes(bc.marker) {
                let point = dofs.point(node)?;
                for &component in &components {
                    entries.push(ResolvedDof {
                        dof: dofs.component_dof(node, component),
                        component,
                        point: point.to_vec(),
                    });
                }
            }
            resolved.push(entries);
        }
        self.resolved = Some(resolved);
        self.num_dofs = dofs.num_dofs();
        Ok(())
    }

    fn resolved(&self) -> Result<&[Vec<ResolvedDof>], FsiError> {
        match &self.resolved {
            Some(r) => Ok(r.as_slice()),
            None if self.conditions.is_empty() => Ok(&[]),
            None => Err(FsiError::BoundaryCondition {
                name: self.conditions[0].name.clone(),
                message: "boundary conditions used before update".into(),
            }),
        }
    }

    fn check_len(&self, len: usize) -> Result<(), FsiError> {
        if self.resolved.is_some() && len != self.num_dofs {
            return Err(FsiError::LengthMismatch {
                what: "boundary condition target",
                expected: self.num_dofs,
                found: len,
            });
        }
        Ok(())
    }

    /// Global DOFs constrained by essential conditions, ascending and unique.
    pub fn essential_dofs(&self) -> Result<Vec<usize>, FsiError> {
        let mut dofs: Vec<usize> = self
            .conditions
            .iter()
            .zip(self.resolved()?)
            .filter(|(bc, _)| bc.kind == BcKind::Essential)
            .flat_map(|(_, entries)| entries.iter().map(|e| e.dof))
            .collect();
        dofs.sort_unstable();
        dofs.dedup();
        Ok(dofs)
    }

    /// Return `matrix` with essential rows replaced by identity rows and
    /// mixed coefficients added on the diagonal.
    pub fn apply_to_matrix(&self, matrix: &CsMat<f64>) -> Result<CsMat<f64>, FsiError> {
        self.check_len(matrix.rows())?;
        let resolved = self.resolved()?;
        let mut essential = vec![false; matrix.rows()];
        let mut robin: BTreeMap<usize, f64> = BTreeMap::new();
        for (bc, entries) in self.conditions.iter().zip(resolved) {
            for e in entries {
                match bc.kind {
                    BcKind::Essential => essential[e.dof] = true,
                    BcKind::Mixed { coefficient } => *robin.entry(e.dof).or_default() += coefficient,
                    BcKind::Natural => {}
                }
            }
        }

        let mut tri = TriMat::new((matrix.rows(), matrix.cols()));
        for (row_idx, row) in matrix.outer_iterator().enumerate() {
            if essential[row_idx] {
                tri.add_triplet(row_idx, row_idx, 1.0);
                continue;
            }
            for (col_idx, &val) in row.iter() {
                tri.add_triplet(row_idx, col_idx, val);
            }
            if let Some(&c) = robin.get(&row_idx) {
                tri.add_triplet(row_idx, row_idx, c);
            }
        }
        let out: CsMat<f64> = tri.to_csr();
        Ok(out)
    }

    /// Apply every condition to a right-hand side at `time`.
    ///
    /// Essential entries are overwritten with `scale * g`; natural and mixed
    /// entries are incremented by `scale * g`.
    pub fn apply_to_vector(&self, rhs: &mut [f64], time: f64, scale: f64) -> Result<(), FsiError> {
        self.check_len(rhs.len())?;
        for (bc, entries) in self.conditions.iter().zip(self.resolved()?) {
            for e in entries {
                let g = scale * (bc.function)(time, &e.point, e.component);
                match bc.kind {
                    BcKind::Essential => rhs[e.dof] = g,
                    BcKind::Natural | BcKind::Mixed { .. } => rhs[e.dof] += g,
                }
            }
        }
        Ok(())
    }

    /// Overwrite essential entries of a solution vector with their values at `time`.
    pub fn impose_essential(&self, solution: &mut [f64], time: f64) -> Result<(), FsiError> {
        self.check_len(solution.len())?;
        for (bc, entries) in self.conditions.iter().zip(self.resolved()?) {
            if bc.kind != BcKind::Essential {
                continue;
            }
            for e in entries {
                solution[e.dof] = (bc.function)(time, &e.point, e.component);
            }
        }
        Ok(())
    }
}
