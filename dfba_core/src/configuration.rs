//! Configuration of a dynamic flux balance analysis session
use derive_builder::Builder;
use thiserror::Error;

use crate::dfba::assemble::NetFluxPolicy;
use crate::optimize::solvers::SolverKind;

/// Settings for a [`crate::dfba::DynamicFba`] session
///
/// Fields left unset on the builder take their value from [`Configuration::default`].
///
/// # Examples
/// ```rust
/// use dfba_core::configuration::ConfigurationBuilder;
/// let configuration = ConfigurationBuilder::default()
///     .target_points(Some(50))
///     .build()
///     .unwrap();
/// assert!(configuration.validate().is_ok());
/// ```
#[derive(Builder, Clone, Debug, PartialEq)]
#[builder(default)]
pub struct Configuration {
    /// Lower bound of every steady state basis coefficient
    pub flux_lower_bound: f64,
    /// Upper bound of every steady state basis coefficient
    pub flux_upper_bound: f64,
    /// Smallest allowed concentration, the log-concentration bound is its logarithm
    pub concentration_lower_bound: f64,
    /// Largest allowed concentration, the log-concentration bound is its logarithm
    pub concentration_upper_bound: f64,
    /// Symmetric bound standing in for "unbounded" on the L, error and Gibbs terms
    pub unbounded_magnitude: f64,
    /// Weights of the five objective terms
    pub weights: ObjectiveWeights,
    /// Enable flags of the constraint families
    pub constraints: ConstraintToggles,
    /// Temperature in Kelvin
    pub temperature: f64,
    /// Gas constant in kJ/(mol K)
    pub gas_constant: f64,
    /// Magnitude below which a computed flux is snapped to zero
    pub zero_tolerance: f64,
    /// Magnitude at or below which an elimination entry counts as zero
    pub pivot_tolerance: f64,
    /// Sort species by participation count before the null space elimination
    pub reorder_rows: bool,
    /// Number of time points to interpolate the measurements to, None keeps the input grid
    pub target_points: Option<usize>,
    /// How split reactions are merged back into a net flux
    pub net_flux_policy: NetFluxPolicy,
    /// Reactions whose flux is fixed from outside, kept out of the representative flux
    pub target_fluxes: Vec<String>,
    /// Backend used by [`crate::dfba::DynamicFba::run_with_default_solver`]
    pub solver: SolverKind,
    /// Iteration cap handed to the solver
    pub max_iterations: u32,
    /// Prefix of the generated exchange reaction ids
    #[builder(setter(into))]
    pub boundary_prefix: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            flux_lower_bound: 0.,
            flux_upper_bound: 1000.,
            concentration_lower_bound: 1e-6,
            concentration_upper_bound: 1e3,
            unbounded_magnitude: 1e6,
            weights: ObjectiveWeights::default(),
            constraints: ConstraintToggles::default(),
            temperature: 298.15,
            gas_constant: 8.314462618e-3,
            zero_tolerance: 1e-15,
            pivot_tolerance: 1e-10,
            reorder_rows: true,
            target_points: None,
            net_flux_policy: NetFluxPolicy::default(),
            target_fluxes: Vec::new(),
            solver: SolverKind::default(),
            max_iterations: 200,
            boundary_prefix: "SB_".to_string(),
        }
    }
}

impl Configuration {
    /// Product of gas constant and temperature
    pub fn rt(&self) -> f64 {
        self.gas_constant * self.temperature
    }

    /// Bounds of the log-concentration variables
    pub fn log_concentration_bounds(&self) -> (f64, f64) {
        (
            self.concentration_lower_bound.ln(),
            self.concentration_upper_bound.ln(),
        )
    }

    /// Check that the settings describe a well posed problem
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(self.flux_lower_bound >= 0.) || !(self.flux_lower_bound <= self.flux_upper_bound) {
            return Err(ConfigurationError::InvalidFluxBounds {
                lower: self.flux_lower_bound,
                upper: self.flux_upper_bound,
            });
        }
        if !(self.concentration_lower_bound > 0.)
            || !(self.concentration_lower_bound < self.concentration_upper_bound)
            || !self.concentration_upper_bound.is_finite()
        {
            return Err(ConfigurationError::InvalidConcentrationBounds {
                lower: self.concentration_lower_bound,
                upper: self.concentration_upper_bound,
            });
        }
        if !(self.unbounded_magnitude > 0.) || !self.unbounded_magnitude.is_finite() {
            return Err(ConfigurationError::NonPositive("unbounded_magnitude"));
        }
        if !(self.temperature > 0.) {
            return Err(ConfigurationError::NonPositive("temperature"));
        }
        if !(self.gas_constant > 0.) {
            return Err(ConfigurationError::NonPositive("gas_constant"));
        }
        if !(self.zero_tolerance >= 0.) || !(self.pivot_tolerance >= 0.) {
            return Err(ConfigurationError::NegativeTolerance);
        }
        if self.max_iterations == 0 {
            return Err(ConfigurationError::NonPositive("max_iterations"));
        }
        self.weights.validate()
    }
}

/// Weights of the objective terms
#[derive(Builder, Clone, Copy, Debug, PartialEq)]
#[builder(default)]
pub struct ObjectiveWeights {
    /// L1 penalty on total flux
    pub flux: f64,
    /// Squared log-concentration fit
    pub concentration: f64,
    /// L1 penalty on the loop law terms
    pub loop_law: f64,
    /// L1 penalty on the Gibbs energy error terms
    pub error: f64,
    /// L1 penalty on the Gibbs energy terms
    pub gibbs: f64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        ObjectiveWeights {
            flux: 10.,
            concentration: 10.,
            loop_law: 10.,
            error: 0.01,
            gibbs: 1.,
        }
    }
}

impl ObjectiveWeights {
    fn validate(&self) -> Result<(), ConfigurationError> {
        for (name, weight) in [
            ("flux", self.flux),
            ("concentration", self.concentration),
            ("loop_law", self.loop_law),
            ("error", self.error),
            ("gibbs", self.gibbs),
        ] {
            if !(weight >= 0.) || !weight.is_finite() {
                return Err(ConfigurationError::InvalidWeight(name));
            }
        }
        Ok(())
    }
}

/// Enable flags of the constraint families, all enabled by default
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstraintToggles {
    /// Gibbs energy of a flux carrying reaction is non-positive
    pub sign_consistency: bool,
    /// Flux magnitude bounded by Gibbs energy magnitude
    pub rate_bound: bool,
    /// Net flux of every reaction is non-negative
    pub non_negative_net_flux: bool,
    /// Definition of the loop law terms
    pub loop_law: bool,
    /// Error terms of the halves of a split reaction cancel
    pub reversible_error_coupling: bool,
    /// Discretized mass balance between consecutive time points
    pub mass_balance: bool,
}

impl Default for ConstraintToggles {
    fn default() -> Self {
        ConstraintToggles {
            sign_consistency: true,
            rate_bound: true,
            non_negative_net_flux: true,
            loop_law: true,
            reversible_error_coupling: true,
            mass_balance: true,
        }
    }
}

impl ConstraintToggles {
    /// Every constraint family disabled
    pub fn none() -> Self {
        ConstraintToggles {
            sign_consistency: false,
            rate_bound: false,
            non_negative_net_flux: false,
            loop_law: false,
            reversible_error_coupling: false,
            mass_balance: false,
        }
    }
}

/// Errors associated with an invalid [`Configuration`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// Flux coefficients must be bounded below by a non-negative value
    #[error("Invalid flux coefficient bounds [{lower}, {upper}]")]
    InvalidFluxBounds { lower: f64, upper: f64 },
    /// Concentration bounds must be positive, finite and ordered
    #[error("Invalid concentration bounds [{lower}, {upper}]")]
    InvalidConcentrationBounds { lower: f64, upper: f64 },
    /// The named setting must be positive
    #[error("{0} must be positive")]
    NonPositive(&'static str),
    #[error("Tolerances must be non-negative")]
    NegativeTolerance,
    /// The named objective weight is negative or not finite
    #[error("Objective weight {0} must be finite and non-negative")]
    InvalidWeight(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_match_default() {
        let built = ConfigurationBuilder::default().build().unwrap();
        assert_eq!(built, Configuration::default());
        assert!(built.validate().is_ok());
        assert_eq!(built.boundary_prefix, "SB_");
        assert!((built.weights.error - 0.01).abs() < 1e-25);
        assert!(built.constraints.mass_balance);
        assert_eq!(ObjectiveWeightsBuilder::default().build().unwrap(), ObjectiveWeights::default());
    }

    #[test]
    fn builder_fills_unset_fields_from_default() {
        let built = ConfigurationBuilder::default()
            .temperature(310.)
            .weights(ObjectiveWeightsBuilder::default().gibbs(2.).build().unwrap())
            .build()
            .unwrap();
        assert_eq!(
            built,
            Configuration {
                temperature: 310.,
                weights: ObjectiveWeights {
                    gibbs: 2.,
                    ..ObjectiveWeights::default()
                },
                ..Configuration::default()
            }
        );
    }

    #[test]
    fn derived_values() {
        let configuration = Configuration::default();
        assert!((configuration.rt() - 2.478957).abs() < 1e-6);
        let (lb, ub) = configuration.log_concentration_bounds();
        assert!((lb - (1e-6f64).ln()).abs() < 1e-12);
        assert!((ub - (1e3f64).ln()).abs() < 1e-12);
    }

    #[test]
    fn invalid_settings() {
        let negative_flux = ConfigurationBuilder::default()
            .flux_lower_bound(-1.)
            .build()
            .unwrap();
        assert!(matches!(
            negative_flux.validate(),
            Err(ConfigurationError::InvalidFluxBounds { .. })
        ));

        let zero_concentration = ConfigurationBuilder::default()
            .concentration_lower_bound(0.)
            .build()
            .unwrap();
        assert!(matches!(
            zero_concentration.validate(),
            Err(ConfigurationError::InvalidConcentrationBounds { .. })
        ));

        let bad_weight = ConfigurationBuilder::default()
            .weights(ObjectiveWeights {
                gibbs: f64::NAN,
                ..ObjectiveWeights::default()
            })
            .build()
            .unwrap();
        assert_eq!(
            bad_weight.validate(),
            Err(ConfigurationError::InvalidWeight("gibbs"))
        );

        let no_iterations = ConfigurationBuilder::default()
            .max_iterations(0u32)
            .build()
            .unwrap();
        assert_eq!(
            no_iterations.validate(),
            Err(ConfigurationError::NonPositive("max_iterations"))
        );
    }
}
