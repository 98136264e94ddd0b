//! End to end runs of the dynamic flux balance analysis

use approx::assert_relative_eq;
use dfba_core::configuration::{Configuration, ConfigurationBuilder};
use dfba_core::dfba::DynamicFba;
use dfba_core::metabolic_model::model::Model;
use dfba_core::optimize::solvers::clarabel::ClarabelSolver;
use dfba_core::optimize::OptimizationStatus;
use dfba_core::timeseries::Trajectory;

mod common;
use common::{chain_measurements, chain_model, same_values, test_data, FlakySolver, RecordingSolver};

fn is_solved(status: &OptimizationStatus) -> bool {
    matches!(
        status,
        OptimizationStatus::Optimal | OptimizationStatus::AlmostOptimal
    )
}

#[test]
fn chain_pathway_follows_the_measurements() {
    let session = DynamicFba::new(&chain_model(), Configuration::default()).unwrap();
    let mut solver = ClarabelSolver::default();
    let working = session.simulate(&chain_measurements(), &mut solver).unwrap();
    assert!(working.statuses.iter().all(is_solved));

    let result = session.assemble(&working);
    assert_eq!(result.len(), 3);
    // the first step is pinned to the measurements
    assert_relative_eq!(result.concentration("A", 0), 1.0, max_relative = 1e-5);
    assert_relative_eq!(result.concentration("C", 0), 0.1, max_relative = 1e-5);

    // A is consumed and C produced along the single pathway
    let r1 = result.flux("R1", 1);
    assert!(r1 > 0.);
    assert_relative_eq!(r1, result.flux("R2", 1), max_relative = 1e-9);
    assert!(result.concentration("A", 1) < result.concentration("A", 0));
    assert!(result.concentration("C", 1) > result.concentration("C", 0));
}

#[test]
fn runs_are_deterministic() {
    let model = Model::read_json(test_data("toy_pathway.json")).unwrap();
    let measurements = Trajectory::read_json(test_data("toy_measurements.json")).unwrap();
    let session = DynamicFba::new(&model, Configuration::default()).unwrap();

    let first = session
        .run(&measurements, &mut ClarabelSolver::default())
        .unwrap();
    let second = session
        .run(&measurements, &mut ClarabelSolver::default())
        .unwrap();
    assert!(same_values(&first.time, &second.time));
    for (id, values) in first.concentrations.iter().chain(first.fluxes.iter()) {
        let other = second
            .concentrations
            .get(id)
            .or_else(|| second.fluxes.get(id))
            .unwrap();
        assert!(same_values(values, other), "{} differs between runs", id);
    }
}

#[test]
fn output_uses_the_input_ids() {
    let model = Model::read_json(test_data("toy_pathway.json")).unwrap();
    let measurements = Trajectory::read_json(test_data("toy_measurements.json")).unwrap();
    let session = DynamicFba::new(&model, Configuration::default()).unwrap();
    assert_eq!(session.network().removed_transport, vec!["GLCt"]);

    let working = session
        .simulate(&measurements, &mut ClarabelSolver::default())
        .unwrap();
    assert!(is_solved(&working.statuses[0]));
    let result = session.assemble(&working);

    let species: Vec<&String> = result.concentrations.keys().collect();
    assert_eq!(species, vec!["glc_e", "glc_c", "g6p_c", "f6p_c", "pyr_c"]);
    let reactions: Vec<&String> = result.fluxes.keys().collect();
    assert_eq!(reactions, vec!["GLCt", "HEX", "PGI", "LOWER"]);
    assert!(result.fluxes["GLCt"].iter().all(|v| v.is_nan()));
    assert_relative_eq!(result.concentration("glc_c", 0), 10.0, max_relative = 1e-5);
    assert!(result.validate().is_ok());
}

#[test]
fn measurements_are_interpolated() {
    let model = Model::read_json(test_data("toy_pathway.json")).unwrap();
    let measurements = Trajectory::read_json(test_data("toy_measurements.json")).unwrap();
    let configuration = ConfigurationBuilder::default()
        .target_points(Some(7))
        .build()
        .unwrap();
    let session = DynamicFba::new(&model, configuration).unwrap();
    let result = session.run_with_default_solver(&measurements).unwrap();
    assert_eq!(result.time, vec![0., 0.5, 1., 1.5, 2., 3., 4.]);
    assert_eq!(result.fluxes["HEX"].len(), 7);
}

#[test]
fn failed_step_does_not_stop_the_run() {
    let session = DynamicFba::new(&chain_model(), Configuration::default()).unwrap();
    let mut solver = FlakySolver::new(1);
    let working = session.simulate(&chain_measurements(), &mut solver).unwrap();

    assert_eq!(working.statuses[1], OptimizationStatus::Infeasible);
    assert!(is_solved(&working.statuses[0]));
    assert!(is_solved(&working.statuses[2]));
    assert!(working.objective_values[1].is_nan());
    assert!(working.fluxes.row(1).iter().all(|v| v.is_nan()));
    assert!(working.concentrations.row(2).iter().all(|v| v.is_finite()));

    let result = session.assemble(&working);
    assert!(result.flux("R1", 1).is_nan());
    assert!(result.flux("R1", 2).is_finite());
}

#[test]
fn solver_is_reset_every_step() {
    let session = DynamicFba::new(&chain_model(), Configuration::default()).unwrap();
    let mut solver = RecordingSolver::default();
    session.simulate(&chain_measurements(), &mut solver).unwrap();

    assert_eq!(solver.resets, 3);
    assert_eq!(solver.variables_at_solve.len(), 3);
    let first = solver.variables_at_solve[0];
    assert!(first >= 13);
    assert!(solver.variables_at_solve.iter().all(|n| *n == first));
}

#[test]
fn result_written_as_json() {
    let session = DynamicFba::new(&chain_model(), Configuration::default()).unwrap();
    let result = session
        .run(&chain_measurements(), &mut FlakySolver::new(1))
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("result.json");
    result.write_json(&path).unwrap();

    let read = Trajectory::read_json(&path).unwrap();
    assert_eq!(read.time, result.time);
    assert!(read.flux("R1", 1).is_nan());
    assert!(same_values(&read.concentrations["B"], &result.concentrations["B"]));
}
