mod util;

use approx::assert_abs_diff_eq;
use fsi_blocks::algs::communicator::NoComm;
use fsi_blocks::data::block_map::Block;
use fsi_blocks::fsi_error::FsiError;
use fsi_blocks::precond::PreconditionerKind;
use fsi_blocks::solver::exporter::MemoryExporter;
use fsi_blocks::solver::fsi::{FLUID_VELOCITY_FIELD, FsiSolver, STRUCTURE_DISPLACEMENT_FIELD};
use fsi_blocks::solver::newton::NewtonStatus;
use util::{ToyParams, toy_config, toy_problem};

#[test]
fn coupled_step_satisfies_interface_conditions() {
    let cfg = toy_config();
    let dt = cfg.time.dt;
    let mut solver = FsiSolver::setup(cfg, &NoComm, toy_problem(&ToyParams::default())).unwrap();

    let history = solver.state().structure_history();
    let c1 = history.first_derivative_coefficient();
    let h1 = history.rhs_first_derivative();

    let report = solver.advance().unwrap();
    assert_eq!(report.status, NewtonStatus::Converged);
    assert_abs_diff_eq!(solver.state().time(), 0.1, epsilon = 1e-12);

    let x = solver.state().solution();
    let u = x.block(Block::FluidVelocity);
    let d = x.block(Block::StructureDisplacement);
    let m = x.block(Block::MeshDisplacement);
    let pairs: Vec<_> = solver
        .setup_data()
        .interface()
        .local_map()
        .component_pairs()
        .collect();
    assert_eq!(pairs.len(), util::DIM);
    for (_, f, s) in pairs {
        let structure_velocity = c1 / dt * d[s] - h1[s];
        assert_abs_diff_eq!(structure_velocity, u[f], epsilon = 1e-6);
        assert_abs_diff_eq!(m[f], d[s], epsilon = 1e-7);
    }
    assert!(x.block_norm(Block::StructureDisplacement) > 1e-8);
    // wall and clamp stay fixed
    assert_abs_diff_eq!(u[0], 0.0, epsilon = 1e-10);
    assert_abs_diff_eq!(m[0], 0.0, epsilon = 1e-10);
    assert_abs_diff_eq!(d[2], 0.0, epsilon = 1e-10);
}

#[test]
fn time_loop_exports_every_accepted_step() {
    let mut solver =
        FsiSolver::setup(toy_config(), &NoComm, toy_problem(&ToyParams::default())).unwrap();
    let mut exporter = MemoryExporter::new();
    let reports = solver.run(&mut exporter).unwrap();

    assert_eq!(reports.len(), 3);
    assert!(reports.iter().all(|r| r.converged()));
    assert!(exporter.is_closed());
    let times: Vec<f64> = exporter.snapshots().iter().map(|s| s.time).collect();
    assert_eq!(times.len(), 4);
    for (t, expected) in times.iter().zip([0.0, 0.1, 0.2, 0.3]) {
        assert_abs_diff_eq!(*t, expected, epsilon = 1e-12);
    }
    let first = &exporter.snapshots()[0];
    assert!(first.fields[FLUID_VELOCITY_FIELD].iter().all(|&v| v == 0.0));
    let last = &exporter.snapshots()[3];
    assert_eq!(
        last.fields[STRUCTURE_DISPLACEMENT_FIELD],
        solver.state().solution().block(Block::StructureDisplacement)
    );
}

#[test]
fn mesh_dependent_fluid_needs_several_newton_iterations() {
    let params = ToyParams {
        kappa: 5.0,
        forcing: 4.0,
        ..ToyParams::default()
    };
    let mut cfg = toy_config();
    cfg.preconditioner = PreconditionerKind::BlockJacobi;
    let mut solver = FsiSolver::setup(cfg, &NoComm, toy_problem(&params)).unwrap();
    let report = solver.advance().unwrap();
    assert!(report.converged());
    assert!(report.newton_iterations >= 1);
    assert_eq!(
        solver.fluid().mesh_moves,
        report.residual_history.len(),
        "one mesh motion per residual evaluation"
    );
}

#[test]
fn failed_step_leaves_state_untouched() {
    let mut cfg = toy_config();
    cfg.newton.max_iterations = 0;
    let mut solver = FsiSolver::setup(cfg, &NoComm, toy_problem(&ToyParams::default())).unwrap();
    let mut exporter = MemoryExporter::new();
    let reports = solver.run(&mut exporter).unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].status, NewtonStatus::MaxIterations);
    assert_eq!(solver.state().time(), 0.0);
    assert_eq!(exporter.snapshots().len(), 1);
    assert!(solver.state().solution().as_slice().iter().all(|&v| v == 0.0));
}

#[test]
fn field_error_mid_step_restores_time() {
    let mut problem = toy_problem(&ToyParams::default());
    problem.fluid.fail_on_mesh_move = Some(1);
    let mut solver = FsiSolver::setup(toy_config(), &NoComm, problem).unwrap();

    let err = solver.advance().unwrap_err();
    assert!(matches!(err, FsiError::FieldSolver { field: "toy fluid", .. }));
    assert_eq!(solver.state().time(), 0.0);
    assert!(solver.state().step_data().is_none());
    assert!(solver.state().solution().as_slice().iter().all(|&v| v == 0.0));
}

#[test]
fn run_takes_the_configured_number_of_steps() {
    let mut cfg = toy_config();
    cfg.time.end_time = 0.32;
    let steps = cfg.num_steps();
    let mut solver = FsiSolver::setup(cfg, &NoComm, toy_problem(&ToyParams::default())).unwrap();
    let reports = solver.run(&mut MemoryExporter::new()).unwrap();
    assert_eq!(steps, 3);
    assert_eq!(reports.len(), steps);
}
