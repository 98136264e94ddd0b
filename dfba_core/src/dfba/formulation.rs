//! Objective and constraints of the optimization problem posed at one time step
use log::debug;
use nalgebra::DMatrix;

use crate::configuration::Configuration;
use crate::dfba::blocks::{Block, BlockBounds, VariableBlocks};
use crate::network::AugmentedNetwork;
use crate::optimize::problem::{Problem, ProblemError};
use crate::steady_state::SteadyStateBasis;

/// Per step data entering the problem
#[derive(Clone, Debug, PartialEq)]
pub struct StepInputs<'a> {
    /// Measured (or interpolated) concentration of every species, NaN when missing
    pub measured: &'a [f64],
    /// Concentration of every species at the previous time point, None at the first step.
    /// Species without a known previous value are NaN.
    pub previous: Option<&'a [f64]>,
    /// Time elapsed since the previous time point
    pub time_step: f64,
    /// Largest flux to standard Gibbs energy ratio, None when no ratio is defined
    pub rate_ratio: Option<f64>,
}

/// Builds the problem of a time step from the data shared by every step
#[derive(Clone, Debug)]
pub struct Formulation<'a> {
    pub network: &'a AugmentedNetwork,
    pub basis: &'a SteadyStateBasis,
    /// Species production of every basis vector through the internal reactions
    pub production: &'a DMatrix<f64>,
    pub configuration: &'a Configuration,
    pub blocks: VariableBlocks,
}

impl<'a> Formulation<'a> {
    pub fn new(
        network: &'a AugmentedNetwork,
        basis: &'a SteadyStateBasis,
        production: &'a DMatrix<f64>,
        configuration: &'a Configuration,
    ) -> Self {
        Formulation {
            network,
            basis,
            production,
            configuration,
            blocks: VariableBlocks::new(
                basis.num_vectors(),
                network.num_species(),
                network.num_reactions(),
            ),
        }
    }

    fn bounds(&self) -> BlockBounds {
        BlockBounds {
            flux: (
                self.configuration.flux_lower_bound,
                self.configuration.flux_upper_bound,
            ),
            log_concentration: self.configuration.log_concentration_bounds(),
            unbounded_magnitude: self.configuration.unbounded_magnitude,
        }
    }

    /// Declare the five variable blocks
    pub fn declare_variables(&self, problem: &mut Problem) -> Result<(), ProblemError> {
        self.blocks.declare(problem, &self.bounds())
    }

    // region Objective
    /// Add the weighted objective terms
    pub fn add_objective(
        &self,
        problem: &mut Problem,
        inputs: &StepInputs,
    ) -> Result<(), ProblemError> {
        let weights = &self.configuration.weights;
        let blocks = &self.blocks;

        if weights.flux != 0. {
            for k in 0..self.basis.num_vectors() {
                let norm = self.basis.l1_norm(k);
                if norm != 0. {
                    problem.add_linear_objective_term(blocks.flux(k), weights.flux * norm)?;
                }
            }
        }

        if weights.concentration != 0. {
            let w = weights.concentration;
            let (lb, ub) = self.configuration.log_concentration_bounds();
            for (i, measured) in inputs.measured.iter().enumerate() {
                let x = blocks.concentration(i);
                if measured.is_nan() {
                    // one sided pull towards the lower bound
                    problem.add_linear_objective_term(x, w / (ub - lb))?;
                    problem.add_objective_constant(-w * lb / (ub - lb));
                } else {
                    let target = self.clamped_log(*measured);
                    problem.add_quadratic_objective_term(x, x, w)?;
                    problem.add_linear_objective_term(x, -2. * w * target)?;
                    problem.add_objective_constant(w * target * target);
                }
            }
        }

        for (block, weight) in [
            (Block::LoopLaw, weights.loop_law),
            (Block::Error, weights.error),
            (Block::Gibbs, weights.gibbs),
        ] {
            if weight == 0. {
                continue;
            }
            for (offset, var) in blocks.range(block).enumerate() {
                let id = format!("abs_{}_{}", block.prefix(), offset);
                problem.add_absolute_value_objective_term(&id, &[var], &[1.], weight)?;
            }
        }
        Ok(())
    }
    // endregion Objective

    // region Constraints
    /// Add every enabled constraint family
    pub fn add_constraints(
        &self,
        problem: &mut Problem,
        inputs: &StepInputs,
    ) -> Result<(), ProblemError> {
        let toggles = self.configuration.constraints;
        if toggles.sign_consistency || toggles.rate_bound {
            self.add_gibbs_definitions(problem)?;
        }
        if toggles.sign_consistency {
            self.add_sign_consistency(problem)?;
        }
        if toggles.rate_bound {
            match inputs.rate_ratio {
                Some(ratio) => self.add_rate_bounds(problem, ratio)?,
                None => debug!("No flux to Gibbs energy ratio defined, rate bound skipped"),
            }
        }
        if toggles.non_negative_net_flux {
            self.add_non_negative_net_flux(problem)?;
        }
        if toggles.loop_law {
            self.add_loop_law(problem)?;
        }
        if toggles.reversible_error_coupling {
            self.add_reversible_error_coupling(problem)?;
        }
        if toggles.mass_balance {
            self.add_mass_balance(problem, inputs)?;
        }
        Ok(())
    }

    /// `G_j - RT Σ_i N_ij x_i + e_j = ΔG°_j` for every reaction with a standard Gibbs energy
    fn add_gibbs_definitions(&self, problem: &mut Problem) -> Result<(), ProblemError> {
        let rt = self.configuration.rt();
        let matrix = &self.network.stoichiometry.matrix;
        for j in 0..self.network.num_reactions() {
            let Some(standard) = self.network.standard_gibbs(j) else {
                continue;
            };
            let mut variables = vec![self.blocks.gibbs(j), self.blocks.error(j)];
            let mut coefficients = vec![1., 1.];
            for (i, n) in matrix.column(j).iter().enumerate() {
                if *n != 0. {
                    variables.push(self.blocks.concentration(i));
                    coefficients.push(-rt * n);
                }
            }
            problem.add_equality_constraint(&variables, &coefficients, standard)?;
        }
        Ok(())
    }

    /// `G_j <= 0` for every net direction reaction with a standard Gibbs energy that can
    /// carry steady state flux
    fn add_sign_consistency(&self, problem: &mut Problem) -> Result<(), ProblemError> {
        for j in self.thermodynamic_reactions() {
            if self.basis.carries_flux(j) {
                problem.add_inequality_constraint(
                    &[self.blocks.gibbs(j)],
                    &[1.],
                    f64::NEG_INFINITY,
                    0.,
                )?;
            }
        }
        Ok(())
    }

    /// `net_j + r_max G_j <= 0` for every net direction reaction with a standard Gibbs energy
    fn add_rate_bounds(&self, problem: &mut Problem, ratio: f64) -> Result<(), ProblemError> {
        for j in self.thermodynamic_reactions() {
            let (mut variables, mut coefficients) = self.net_flux_terms(j);
            variables.push(self.blocks.gibbs(j));
            coefficients.push(ratio);
            problem.add_inequality_constraint(&variables, &coefficients, f64::NEG_INFINITY, 0.)?;
        }
        Ok(())
    }

    /// Net flux of every net direction reaction is non-negative
    fn add_non_negative_net_flux(&self, problem: &mut Problem) -> Result<(), ProblemError> {
        for j in (0..self.network.num_reactions()).filter(|j| self.network.is_net_direction(*j)) {
            let (variables, coefficients) = self.net_flux_terms(j);
            if variables.is_empty() {
                continue;
            }
            problem.add_inequality_constraint(&variables, &coefficients, 0., f64::INFINITY)?;
        }
        Ok(())
    }

    /// `L_k + Σ_j B_kj e_j = Σ_j B_kj ΔG°_j`, a missing standard Gibbs energy counts as zero
    fn add_loop_law(&self, problem: &mut Problem) -> Result<(), ProblemError> {
        for k in 0..self.basis.num_vectors() {
            let mut variables = vec![self.blocks.loop_law(k)];
            let mut coefficients = vec![1.];
            let mut rhs = 0.;
            for j in 0..self.basis.num_reactions() {
                let b = self.basis.coefficient(k, j);
                if b == 0. {
                    continue;
                }
                variables.push(self.blocks.error(j));
                coefficients.push(b);
                rhs += b * self.network.standard_gibbs(j).unwrap_or(0.);
            }
            problem.add_equality_constraint(&variables, &coefficients, rhs)?;
        }
        Ok(())
    }

    /// The Gibbs energies of the two halves of a split reaction cancel:
    /// `-e_f - e_b + RT Σ_i (N_if + N_ib) x_i = -(ΔG°_f + ΔG°_b)`
    fn add_reversible_error_coupling(&self, problem: &mut Problem) -> Result<(), ProblemError> {
        let rt = self.configuration.rt();
        let matrix = &self.network.stoichiometry.matrix;
        for (forward, backward) in self.network.reverse_index_map.pairs() {
            let mut variables = vec![self.blocks.error(forward), self.blocks.error(backward)];
            let mut coefficients = vec![-1., -1.];
            for i in 0..matrix.nrows() {
                let n = matrix[(i, forward)] + matrix[(i, backward)];
                if n != 0. {
                    variables.push(self.blocks.concentration(i));
                    coefficients.push(rt * n);
                }
            }
            let rhs = -(self.network.standard_gibbs(forward).unwrap_or(0.)
                + self.network.standard_gibbs(backward).unwrap_or(0.));
            problem.add_equality_constraint(&variables, &coefficients, rhs)?;
        }
        Ok(())
    }

    /// First step: pin every measured log-concentration. Later steps: first order
    /// expansion of `exp(x_i) = p_i + Δt (D c)_i` around the previous concentration `p_i`,
    /// `p_i x_i - Δt Σ_k D_ik c_k = p_i ln p_i`.
    fn add_mass_balance(&self, problem: &mut Problem, inputs: &StepInputs) -> Result<(), ProblemError> {
        let Some(previous) = inputs.previous else {
            for (i, measured) in inputs.measured.iter().enumerate() {
                if measured.is_nan() {
                    continue;
                }
                problem.add_equality_constraint(
                    &[self.blocks.concentration(i)],
                    &[1.],
                    self.clamped_log(*measured),
                )?;
            }
            return Ok(());
        };
        let (lower, upper) = (
            self.configuration.concentration_lower_bound,
            self.configuration.concentration_upper_bound,
        );
        for (i, p) in previous.iter().enumerate() {
            if p.is_nan() {
                debug!("No previous concentration for species {}, mass balance skipped", i);
                continue;
            }
            let p = p.clamp(lower, upper);
            let mut variables = vec![self.blocks.concentration(i)];
            let mut coefficients = vec![p];
            for k in 0..self.basis.num_vectors() {
                let d = self.production[(i, k)];
                if d != 0. {
                    variables.push(self.blocks.flux(k));
                    coefficients.push(-inputs.time_step * d);
                }
            }
            problem.add_equality_constraint(&variables, &coefficients, p * p.ln())?;
        }
        Ok(())
    }
    // endregion Constraints

    // region Helpers
    /// Net direction reactions annotated with a standard Gibbs energy
    fn thermodynamic_reactions(&self) -> Vec<usize> {
        (0..self.network.num_reactions())
            .filter(|j| self.network.is_net_direction(*j) && self.network.standard_gibbs(*j).is_some())
            .collect()
    }

    /// Net flux of reaction `j` as a combination of the basis coefficients: the forward
    /// minus the backward half for a split reaction, its own flux otherwise
    fn net_flux_terms(&self, j: usize) -> (Vec<usize>, Vec<f64>) {
        let partner = self.network.reverse_index_map.backward_of(j);
        let mut variables = Vec::new();
        let mut coefficients = Vec::new();
        for k in 0..self.basis.num_vectors() {
            let coefficient = self.basis.coefficient(k, j)
                - partner.map_or(0., |b| self.basis.coefficient(k, b));
            if coefficient != 0. {
                variables.push(self.blocks.flux(k));
                coefficients.push(coefficient);
            }
        }
        (variables, coefficients)
    }

    /// Log of a concentration clamped to the configured concentration range
    fn clamped_log(&self, concentration: f64) -> f64 {
        concentration
            .clamp(
                self.configuration.concentration_lower_bound,
                self.configuration.concentration_upper_bound,
            )
            .ln()
    }
    // endregion Helpers
}

/// Species production of every basis vector through the non boundary reactions,
/// `N_internal · B_internalᵀ` (species × basis vectors)
pub fn internal_production(network: &AugmentedNetwork, basis: &SteadyStateBasis) -> DMatrix<f64> {
    let internal = network.internal_reactions();
    let matrix = network.stoichiometry.matrix.select_columns(internal.iter());
    let vectors = basis.basis.select_columns(internal.iter());
    matrix * vectors.transpose()
}

/// Largest ratio `|flux| / |ΔG°|` over the reactions with a defined, nonzero standard
/// Gibbs energy and a finite flux estimate
///
/// None when no reaction qualifies or every ratio is zero.
pub fn rate_ratio(network: &AugmentedNetwork, flux: &[f64]) -> Option<f64> {
    let ratio = (0..network.num_reactions())
        .filter_map(|j| {
            let standard = network.standard_gibbs(j)?;
            let v = *flux.get(j)?;
            (standard != 0. && v.is_finite()).then(|| v.abs() / standard.abs())
        })
        .fold(0., f64::max);
    (ratio > 0.).then_some(ratio)
}
