//! Dynamic flux balance analysis session
//!
//! A [`DynamicFba`] holds everything that is computed once per network: the augmented
//! network, its steady state basis, the species production of every basis vector and the
//! representative flux. Every run reuses them.
//!
//! # Example
//! ```no_run
//! use dfba_core::configuration::Configuration;
//! use dfba_core::dfba::DynamicFba;
//! use dfba_core::metabolic_model::model::Model;
//! use dfba_core::timeseries::Trajectory;
//!
//! let model = Model::read_json("model.json").unwrap();
//! let measurements = Trajectory::read_json("measurements.json").unwrap();
//! let session = DynamicFba::new(&model, Configuration::default()).unwrap();
//! let result = session.run_with_default_solver(&measurements).unwrap();
//! result.write_json("result.json").unwrap();
//! ```
pub mod assemble;
pub mod blocks;
pub mod driver;
pub mod formulation;

use std::path::Path;

use log::{info, warn};
use nalgebra::{DMatrix, DVector};
use thiserror::Error;

use crate::configuration::{Configuration, ConfigurationError};
use crate::dfba::assemble::ResultAssembler;
use crate::dfba::driver::{DynamicOptimizationLoop, MeasurementGrid, WorkingTrajectory};
use crate::dfba::formulation::{internal_production, Formulation};
use crate::io::json::JsonError;
use crate::metabolic_model::model::Model;
use crate::network::{AugmentedNetwork, StructuralError};
use crate::optimize::problem::ProblemError;
use crate::optimize::solvers::{new_solver, Solver, SolverError};
use crate::steady_state::{SteadyStateBasis, SteadyStateSolver};
use crate::timeseries::interpolate::interpolate;
use crate::timeseries::{Trajectory, TrajectoryError};

/// Dynamic flux balance analysis of one reaction network
#[derive(Clone, Debug)]
pub struct DynamicFba {
    model: Model,
    configuration: Configuration,
    network: AugmentedNetwork,
    basis: SteadyStateBasis,
    production: DMatrix<f64>,
    representative_flux: DVector<f64>,
}

impl DynamicFba {
    /// Set up a session for `model`
    ///
    /// # Errors
    /// An invalid configuration or a malformed network fails here, before any
    /// optimization takes place.
    pub fn new(model: &Model, configuration: Configuration) -> Result<Self, DfbaError> {
        configuration.validate()?;
        let network = AugmentedNetwork::build(model, &configuration.boundary_prefix)?;
        let basis = SteadyStateSolver::from_configuration(&configuration)
            .solve(&network.stoichiometry.matrix, &network.reverse_index_map);
        let production = internal_production(&network, &basis);
        let representative_flux = representative_flux(&network, &basis, &configuration);
        info!(
            "Steady state basis with {} vectors over {} reactions ({} degenerate removed)",
            basis.num_vectors(),
            basis.num_reactions(),
            basis.removed_degenerate
        );
        Ok(DynamicFba {
            model: model.clone(),
            configuration,
            network,
            basis,
            production,
            representative_flux,
        })
    }

    /// Set up a session for the model stored in a JSON file
    pub fn from_json_file<P: AsRef<Path>>(
        path: P,
        configuration: Configuration,
    ) -> Result<Self, DfbaError> {
        let model = Model::read_json(path)?;
        Self::new(&model, configuration)
    }

    // region Accessors
    /// The input model
    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn network(&self) -> &AugmentedNetwork {
        &self.network
    }

    pub fn basis(&self) -> &SteadyStateBasis {
        &self.basis
    }

    /// Species × basis vectors production matrix of the internal reactions
    pub fn production(&self) -> &DMatrix<f64> {
        &self.production
    }

    /// Representative steady state flux, without the basis vectors touching a target flux
    pub fn representative_flux(&self) -> &DVector<f64> {
        &self.representative_flux
    }
    // endregion Accessors

    // region Running
    /// Validate the measurements and interpolate them if a target point count is set
    pub fn prepare_measurements(&self, measurements: &Trajectory) -> Result<Trajectory, DfbaError> {
        measurements.validate()?;
        Ok(match self.configuration.target_points {
            Some(target_points) => interpolate(measurements, target_points),
            None => measurements.clone(),
        })
    }

    /// Run the optimization loop, returning the solution in augmented network space
    pub fn simulate(
        &self,
        measurements: &Trajectory,
        solver: &mut dyn Solver,
    ) -> Result<WorkingTrajectory, DfbaError> {
        let measurements = self.prepare_measurements(measurements)?;
        let grid = MeasurementGrid::from_trajectory(&self.network, &measurements);
        let formulation = Formulation::new(
            &self.network,
            &self.basis,
            &self.production,
            &self.configuration,
        );
        let working =
            DynamicOptimizationLoop::new(formulation, &self.representative_flux).run(&grid, solver)?;
        let failed = working.len() - working.num_solved();
        if failed > 0 {
            warn!("{} of {} time steps were not solved", failed, working.len());
        }
        info!(
            "Solved {} of {} time steps",
            working.num_solved(),
            working.len()
        );
        Ok(working)
    }

    /// Run the optimization loop and map the result onto the input network
    pub fn run(
        &self,
        measurements: &Trajectory,
        solver: &mut dyn Solver,
    ) -> Result<Trajectory, DfbaError> {
        let working = self.simulate(measurements, solver)?;
        Ok(self.assemble(&working))
    }

    /// [`DynamicFba::run`] with the solver selected by the configuration
    pub fn run_with_default_solver(&self, measurements: &Trajectory) -> Result<Trajectory, DfbaError> {
        let mut solver = new_solver(self.configuration.solver, self.configuration.max_iterations)?;
        self.run(measurements, solver.as_mut())
    }

    /// Read measurements from `measurements_path`, run with the configured solver and write
    /// the result to `output_path`
    pub fn run_json_files<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        measurements_path: P,
        output_path: Q,
    ) -> Result<Trajectory, DfbaError> {
        let measurements = Trajectory::read_json(measurements_path)?;
        let result = self.run_with_default_solver(&measurements)?;
        result.write_json(output_path)?;
        Ok(result)
    }

    /// Map a working trajectory onto the species and reactions of the input network
    pub fn assemble(&self, working: &WorkingTrajectory) -> Trajectory {
        ResultAssembler::new(&self.network, &self.model, self.configuration.net_flux_policy)
            .finalize(working)
    }
    // endregion Running
}

/// Representative flux of the basis, excluding the basis vectors that involve a target
/// flux (both halves of a split reaction)
fn representative_flux(
    network: &AugmentedNetwork,
    basis: &SteadyStateBasis,
    configuration: &Configuration,
) -> DVector<f64> {
    if configuration.target_fluxes.is_empty() {
        return basis.representative_flux.clone();
    }
    let mut excluded = Vec::new();
    for id in &configuration.target_fluxes {
        match network.net_index_of(id) {
            Some(j) => {
                excluded.push(j);
                excluded.extend(network.reverse_index_map.backward_of(j));
            }
            None => warn!("Target flux {} is not a reaction of the network", id),
        }
    }
    basis.representative_flux_excluding(|j| excluded.contains(&j))
}

/// Errors of a dynamic flux balance analysis
#[derive(Error, Debug)]
pub enum DfbaError {
    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Malformed network: {0}")]
    Structural(#[from] StructuralError),
    #[error("Ill-formed optimization problem: {0}")]
    Problem(#[from] ProblemError),
    #[error("Solver failure: {0}")]
    Solver(#[from] SolverError),
    #[error("Malformed measurements: {0}")]
    Trajectory(#[from] TrajectoryError),
    #[error("Unable to read or write JSON: {0}")]
    Json(#[from] JsonError),
}
