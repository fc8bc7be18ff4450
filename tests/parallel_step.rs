mod util;

use std::thread;

use approx::assert_abs_diff_eq;
use fsi_blocks::algs::communicator::{LocalComm, NoComm};
use fsi_blocks::data::block_map::Block;
use fsi_blocks::solver::fsi::FsiSolver;
use util::{ToyParams, toy_config, toy_problem};

/// One step on every rank of a `LocalComm` world; returns each rank's
/// solution and the number of multipliers it owns.
fn step_on_ranks(size: usize) -> Vec<(Vec<f64>, usize)> {
    let handles: Vec<_> = LocalComm::world(size)
        .into_iter()
        .map(|comm| {
            thread::spawn(move || {
                let problem = toy_problem(&ToyParams::default());
                let mut solver = FsiSolver::setup(toy_config(), &comm, problem).unwrap();
                let report = solver.advance().unwrap();
                assert!(report.converged());
                let owned = solver
                    .setup_data()
                    .interface()
                    .numbering()
                    .multiplier_map()
                    .num_owned();
                (solver.state().solution().as_slice().to_vec(), owned)
            })
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

#[test]
fn replicated_ranks_match_the_serial_step() {
    let mut serial =
        FsiSolver::setup(toy_config(), &NoComm, toy_problem(&ToyParams::default())).unwrap();
    assert!(serial.advance().unwrap().converged());
    let expected = serial.state().solution();
    assert!(expected.block_norm(Block::StructureDisplacement) > 1e-8);

    let ranks = step_on_ranks(2);
    // the shared interface point is numbered by rank 0 only
    assert_eq!(ranks[0].1, util::DIM);
    assert_eq!(ranks[1].1, 0);
    for (solution, _) in &ranks {
        assert_eq!(solution.len(), expected.len());
        for block in Block::ALL {
            let range = expected.layout().range(block);
            for (a, b) in solution[range].iter().zip(expected.block(block)) {
                assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
            }
        }
    }
}
