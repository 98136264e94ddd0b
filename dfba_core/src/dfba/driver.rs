//! The time stepping driver
//!
//! Every time point of the measurement grid poses one optimization problem. Steps run
//! in order since the mass balance of a step refers to the concentrations resolved by
//! the step before it.
use log::{debug, trace, warn};
use nalgebra::{DMatrix, DVector};

use crate::dfba::blocks::Block;
use crate::dfba::formulation::{rate_ratio, Formulation, StepInputs};
use crate::network::AugmentedNetwork;
use crate::optimize::problem::{Problem, ProblemError};
use crate::optimize::solvers::Solver;
use crate::optimize::{OptimizationStatus, ProblemSolution};
use crate::timeseries::Trajectory;

// region Measurements
/// Measurements laid out in the species and reaction order of an augmented network
#[derive(Clone, Debug, PartialEq)]
pub struct MeasurementGrid {
    pub time: Vec<f64>,
    /// time points × species, NaN when missing
    pub concentrations: DMatrix<f64>,
    /// time points × augmented reactions, magnitude of the measured flux, NaN when missing
    pub fluxes: DMatrix<f64>,
}

impl MeasurementGrid {
    /// Lay out a measurement table along an augmented network
    ///
    /// A measured flux of a split reaction is recorded on both halves. Columns naming no
    /// species or reaction of the network are ignored.
    pub fn from_trajectory(network: &AugmentedNetwork, measurements: &Trajectory) -> Self {
        let steps = measurements.len();
        let species = &network.stoichiometry.species;
        let concentrations =
            DMatrix::from_fn(steps, species.len(), |t, i| measurements.concentration(&species[i], t));

        let mut fluxes = DMatrix::from_element(steps, network.num_reactions(), f64::NAN);
        for (id, values) in measurements.fluxes.iter() {
            let Some(j) = network.net_index_of(id) else {
                debug!("Ignoring measured flux of {}, not part of the network", id);
                continue;
            };
            let partner = network.reverse_index_map.backward_of(j);
            for (t, v) in values.iter().enumerate() {
                fluxes[(t, j)] = v.abs();
                if let Some(b) = partner {
                    fluxes[(t, b)] = v.abs();
                }
            }
        }
        for id in measurements.concentrations.keys() {
            if !species.contains(id) {
                debug!("Ignoring measured concentration of {}, not part of the network", id);
            }
        }

        MeasurementGrid {
            time: measurements.time.clone(),
            concentrations,
            fluxes,
        }
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    fn concentration_row(&self, t: usize) -> Vec<f64> {
        self.concentrations.row(t).iter().copied().collect()
    }
}
// endregion Measurements

// region Working trajectory
/// Solutions of every time step in augmented species and reaction space
#[derive(Clone, Debug, PartialEq)]
pub struct WorkingTrajectory {
    pub time: Vec<f64>,
    /// time points × species
    pub concentrations: DMatrix<f64>,
    /// time points × augmented reactions
    pub fluxes: DMatrix<f64>,
    /// Solver status of every step
    pub statuses: Vec<OptimizationStatus>,
    /// Objective value of every step, NaN for a failed step
    pub objective_values: Vec<f64>,
}

impl WorkingTrajectory {
    fn with_capacity(time: Vec<f64>, num_species: usize, num_reactions: usize) -> Self {
        let steps = time.len();
        WorkingTrajectory {
            concentrations: DMatrix::from_element(steps, num_species, f64::NAN),
            fluxes: DMatrix::from_element(steps, num_reactions, f64::NAN),
            statuses: Vec::with_capacity(steps),
            objective_values: Vec::with_capacity(steps),
            time,
        }
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Number of steps whose problem was solved
    pub fn num_solved(&self) -> usize {
        self.statuses
            .iter()
            .filter(|s| matches!(s, OptimizationStatus::Optimal | OptimizationStatus::AlmostOptimal))
            .count()
    }
}
// endregion Working trajectory

// region Loop
/// Phase of the optimization loop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopPhase {
    Initialized,
    BuildVariables,
    BuildObjective,
    BuildConstraints,
    Solve,
    ExtractSolution,
    Accumulate,
    Finalized,
}

/// Solution of one time step
struct StepSolution {
    concentrations: Vec<f64>,
    fluxes: DVector<f64>,
}

/// Sequential driver posing and solving one problem per time point
#[derive(Debug)]
pub struct DynamicOptimizationLoop<'a> {
    formulation: Formulation<'a>,
    /// Flux used for the rate bound ratio where no flux was measured
    representative_flux: &'a DVector<f64>,
    phase: LoopPhase,
}

impl<'a> DynamicOptimizationLoop<'a> {
    pub fn new(formulation: Formulation<'a>, representative_flux: &'a DVector<f64>) -> Self {
        DynamicOptimizationLoop {
            formulation,
            representative_flux,
            phase: LoopPhase::Initialized,
        }
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    fn transition(&mut self, step: usize, next: LoopPhase) {
        trace!("Step {}: {:?} -> {:?}", step, self.phase, next);
        self.phase = next;
    }

    /// Run every time step of the grid
    ///
    /// The solver is reset at the start of every step. A step whose problem is not solved
    /// (infeasible, halted, or rejected by the solver) leaves NaN in its row, and the next
    /// step falls back to the measured concentrations of the failed step. Only an
    /// ill-formed problem is an error.
    pub fn run(
        mut self,
        grid: &MeasurementGrid,
        solver: &mut dyn Solver,
    ) -> Result<WorkingTrajectory, ProblemError> {
        let network = self.formulation.network;
        let mut working = WorkingTrajectory::with_capacity(
            grid.time.clone(),
            network.num_species(),
            network.num_reactions(),
        );
        let mut previous: Option<Vec<f64>> = None;

        for t in 0..grid.len() {
            solver.reset();
            let measured = grid.concentration_row(t);
            let resolved_previous = previous.as_ref().map(|p| {
                let fallback = grid.concentration_row(t - 1);
                p.iter()
                    .zip(fallback)
                    .map(|(p, m)| if p.is_nan() { m } else { *p })
                    .collect::<Vec<f64>>()
            });
            let flux_estimate: Vec<f64> = (0..network.num_reactions())
                .map(|j| {
                    let measured = grid.fluxes[(t, j)];
                    if measured.is_nan() {
                        self.representative_flux[j]
                    } else {
                        measured
                    }
                })
                .collect();
            let inputs = StepInputs {
                measured: &measured,
                previous: resolved_previous.as_deref(),
                time_step: if t == 0 { 0. } else { grid.time[t] - grid.time[t - 1] },
                rate_ratio: rate_ratio(network, &flux_estimate),
            };

            let problem = self.build(t, &inputs)?;

            self.transition(t, LoopPhase::Solve);
            let outcome = problem.solve(solver);

            self.transition(t, LoopPhase::ExtractSolution);
            let (status, objective_value, step) = match outcome {
                Ok(solution) if solution.is_usable() => {
                    let step = self.extract(&solution);
                    (solution.status, solution.objective_value, step)
                }
                Ok(solution) => {
                    warn!(
                        "Time step {} (t = {}) not solved: {:?}",
                        t, grid.time[t], solution.status
                    );
                    (solution.status, None, None)
                }
                Err(err) => {
                    warn!("Time step {} (t = {}) rejected by the solver: {}", t, grid.time[t], err);
                    (OptimizationStatus::Unoptimized, None, None)
                }
            };

            self.transition(t, LoopPhase::Accumulate);
            working.statuses.push(status);
            working.objective_values.push(objective_value.unwrap_or(f64::NAN));
            previous = match step {
                Some(step) => {
                    working.fluxes.set_row(t, &step.fluxes.transpose());
                    for (i, c) in step.concentrations.iter().enumerate() {
                        working.concentrations[(t, i)] = *c;
                    }
                    Some(step.concentrations)
                }
                None => Some(vec![f64::NAN; network.num_species()]),
            };
            debug!(
                "Time step {} (t = {}) finished with status {:?}",
                t, grid.time[t], status
            );
        }

        self.transition(grid.len(), LoopPhase::Finalized);
        Ok(working)
    }

    fn build(&mut self, t: usize, inputs: &StepInputs) -> Result<Problem, ProblemError> {
        let mut problem = Problem::new_minimization();
        self.transition(t, LoopPhase::BuildVariables);
        self.formulation.declare_variables(&mut problem)?;
        self.transition(t, LoopPhase::BuildObjective);
        self.formulation.add_objective(&mut problem, inputs)?;
        self.transition(t, LoopPhase::BuildConstraints);
        self.formulation.add_constraints(&mut problem, inputs)?;
        debug!(
            "Time step {}: {} variables, {} constraints",
            t,
            problem.num_variables(),
            problem.num_constraints()
        );
        Ok(problem)
    }

    fn extract(&self, solution: &ProblemSolution) -> Option<StepSolution> {
        let values = solution.variable_values.as_ref()?;
        let blocks = &self.formulation.blocks;
        if values.len() < blocks.len() {
            return None;
        }
        let coefficients = blocks.slice(Block::Flux, values);
        Some(StepSolution {
            concentrations: blocks
                .slice(Block::Concentration, values)
                .iter()
                .map(|x| x.exp())
                .collect(),
            fluxes: self.formulation.basis.flux(coefficients),
        })
    }
}
// endregion Loop
