mod util;

use fsi_blocks::data::coordinates::{Coordinates, distance};
use fsi_blocks::data::dof_set::DofSet;
use fsi_blocks::data::labels::LabelSet;
use fsi_blocks::fsi_error::FsiError;
use fsi_blocks::interface::matcher::InterfaceMatcher;
use proptest::prelude::*;
use util::{DIM, INTERFACE};

fn dofs(points: &[[f64; 2]], interface: &[usize]) -> DofSet {
    let mut labels = LabelSet::new();
    for &n in interface {
        labels.mark_boundary(n, INTERFACE);
    }
    DofSet::serial(Coordinates::from_points(DIM, points).unwrap(), DIM)
        .unwrap()
        .with_labels(labels)
        .unwrap()
}

#[test]
fn zero_tolerance_rejects_perturbed_structure() {
    let fluid_pts: Vec<[f64; 2]> = (0..4).map(|i| [i as f64, 0.0]).collect();
    let structure_pts: Vec<[f64; 2]> = fluid_pts.iter().map(|p| [p[0], p[1] + 1e-6]).collect();
    let all = [0, 1, 2, 3];
    let fluid = dofs(&fluid_pts, &all);
    let structure = dofs(&structure_pts, &all);

    let err = InterfaceMatcher::new(INTERFACE, 0.0)
        .unwrap()
        .match_dofs(&fluid, &structure)
        .unwrap_err();
    match err {
        FsiError::InterfacePartnerNotFound { nearest, .. } => {
            let nearest = nearest.unwrap();
            assert!((nearest - 1e-6).abs() < 1e-12);
        }
        other => panic!("unexpected error {other:?}"),
    }

    let local = InterfaceMatcher::new(INTERFACE, 1e-5)
        .unwrap()
        .match_dofs(&fluid, &structure)
        .unwrap();
    assert_eq!(local.len(), 4);
}

#[test]
fn nodes_off_the_interface_are_ignored() {
    let pts = [[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]];
    let fluid = dofs(&pts, &[2]);
    let structure = dofs(&[[5.0, 0.0], [2.0, 0.0]], &[1]);
    let local = InterfaceMatcher::new(INTERFACE, 1e-8)
        .unwrap()
        .match_dofs(&fluid, &structure)
        .unwrap();
    assert_eq!(local.iter().collect::<Vec<_>>(), vec![(2, 1)]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn pairs_are_injective_and_within_tolerance(
        cells in prop::collection::btree_set((0i32..20, 0i32..20), 0..25),
        seed in 0u64..1000,
        jitter in 0.0f64..0.4,
    ) {
        let tol = 1e-3;
        let fluid_pts: Vec<[f64; 2]> = cells.iter().map(|&(i, j)| [i as f64, j as f64]).collect();
        // reversed order and a deterministic sub-tolerance shift
        let structure_pts: Vec<[f64; 2]> = fluid_pts
            .iter()
            .rev()
            .enumerate()
            .map(|(k, p)| {
                let phase = ((k as u64 + seed) % 7) as f64 / 7.0 - 0.5;
                [p[0] + jitter * tol * phase, p[1] - jitter * tol * phase]
            })
            .collect();
        let n = fluid_pts.len();
        let all: Vec<usize> = (0..n).collect();
        let fluid = dofs(&fluid_pts, &all);
        let structure = dofs(&structure_pts, &all);

        let local = InterfaceMatcher::new(INTERFACE, tol).unwrap().match_dofs(&fluid, &structure).unwrap();
        prop_assert_eq!(local.len(), n);
        let mut used = vec![false; n];
        for (f, s) in local.iter() {
            prop_assert!(!used[s]);
            used[s] = true;
            prop_assert_eq!(s, n - 1 - f);
            let d = distance(fluid.point(f).unwrap(), structure.point(s).unwrap());
            prop_assert!(d <= tol);
        }
        prop_assert!(local.max_distance() <= tol);
    }
}
