mod util;

use fsi_blocks::algs::communicator::NoComm;
use fsi_blocks::coupling::CouplingBlocks;
use fsi_blocks::data::block_map::BlockLayout;
use fsi_blocks::solver::setup::InterfaceSetup;
use util::{ToyParams, toy_config, toy_problem};

fn toy_coupling(params: &ToyParams) -> CouplingBlocks {
    let problem = toy_problem(params);
    let cfg = toy_config();
    let interface =
        InterfaceSetup::build(&cfg.interface, &problem.fluid_dofs, &problem.structure_dofs, &NoComm)
            .unwrap();
    let nu = params.n_fluid * util::DIM;
    let ns = params.n_structure * util::DIM;
    let layout = BlockLayout::new([nu, 1, ns, interface.numbering().num_multipliers(), nu]);
    CouplingBlocks::build(interface.local_map(), interface.numbering(), &layout, 20.0).unwrap()
}

#[test]
fn injection_touches_only_interface_entries() {
    let coupling = toy_coupling(&ToyParams::default());
    let t = coupling.transmission();
    let structure: Vec<f64> = (0..6).map(|i| i as f64 + 0.5).collect();
    let gamma = t.structure_to_interface(&structure).unwrap();
    // structure node 0 is the interface: dofs 0 (x) and 3 (y)
    assert_eq!(gamma, vec![0.5, 3.5]);

    let mut target = vec![-1.0; 6];
    t.interface_to_structure(&gamma, &mut target).unwrap();
    assert_eq!(target, vec![0.5, -1.0, -1.0, 3.5, -1.0, -1.0]);
    assert!(t.structure_to_interface(&structure[..5]).is_err());
}
