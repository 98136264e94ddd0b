//! Provides struct representing an optimization problem
//!
//! Variables are positional: the index returned when a variable is added is the index its
//! value has in the solution vector.
use indexmap::IndexMap;
use log::trace;
use thiserror::Error;

use crate::optimize::constraint::Constraint;
use crate::optimize::objective::{Objective, ObjectiveSense, ObjectiveTerm};
use crate::optimize::solvers::{Solver, SolverError};
use crate::optimize::variable::{Variable, VariableBuilder};
use crate::optimize::ProblemSolution;

/// An optimization problem
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    /// Objective to optimize
    objective: Objective,
    /// Variables of the optimization problem, keyed by id, in index order
    variables: IndexMap<String, Variable>,
    /// Constraints of the optimization problem
    constraints: Vec<Constraint>,
}

impl Problem {
    // region Creation Functions
    /// Create a new optimization problem
    pub fn new(objective_sense: ObjectiveSense) -> Self {
        Self {
            objective: Objective::new(objective_sense),
            variables: IndexMap::new(),
            constraints: Vec::new(),
        }
    }

    /// Create a new minimization problem
    pub fn new_minimization() -> Self {
        Self::new(ObjectiveSense::Minimize)
    }

    /// Create a new maximization problem
    pub fn new_maximization() -> Self {
        Self::new(ObjectiveSense::Maximize)
    }
    // endregion Creation Functions

    // region Accessors
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Variable with the given id
    pub fn variable(&self, id: &str) -> Option<&Variable> {
        self.variables.get(id)
    }

    /// Index of the variable with the given id
    pub fn variable_index(&self, id: &str) -> Option<usize> {
        self.variables.get_index_of(id)
    }

    /// Iterator over the variables in index order
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }
    // endregion Accessors

    // region Adding Variables
    /// Create a new continuous variable and add it to the problem
    ///
    /// # Returns
    /// The index of the new variable
    pub fn add_variable(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<usize, ProblemError> {
        let variable = VariableBuilder::default()
            .id(id)
            .lower_bound(lower_bound)
            .upper_bound(upper_bound)
            .index(self.variables.len())
            .build()
            .map_err(|_| ProblemError::InvalidVariableBounds(id.to_string()))?;
        self.validate_variable(&variable)?;
        let index = variable.index;
        self.variables.insert(variable.id.clone(), variable);
        Ok(index)
    }
    // endregion Adding Variables

    // region Adding Constraints
    /// Add a constraint to the problem
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<(), ProblemError> {
        self.validate_constraint(&constraint)?;
        self.constraints.push(constraint);
        Ok(())
    }

    /// Create a new equality constraint and add it to the problem
    pub fn add_equality_constraint(
        &mut self,
        variables: &[usize],
        coefficients: &[f64],
        equals: f64,
    ) -> Result<(), ProblemError> {
        Self::check_lengths(variables, coefficients)?;
        self.add_constraint(Constraint::new_equality(variables, coefficients, equals))
    }

    /// Create a new inequality constraint and add it to the problem
    pub fn add_inequality_constraint(
        &mut self,
        variables: &[usize],
        coefficients: &[f64],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        Self::check_lengths(variables, coefficients)?;
        self.add_constraint(Constraint::new_inequality(
            variables,
            coefficients,
            lower_bound,
            upper_bound,
        ))
    }
    // endregion Adding Constraints

    // region Adding Objective Terms
    /// Add a new term to the objective
    pub fn add_objective_term(&mut self, objective_term: ObjectiveTerm) -> Result<(), ProblemError> {
        self.validate_objective_term(&objective_term)?;
        self.objective.add_term(objective_term);
        Ok(())
    }

    /// Add a new linear term to the objective
    pub fn add_linear_objective_term(
        &mut self,
        variable: usize,
        coefficient: f64,
    ) -> Result<(), ProblemError> {
        self.add_objective_term(ObjectiveTerm::Linear {
            var: variable,
            coef: coefficient,
        })
    }

    /// Add a new quadratic term `coefficient * variable1 * variable2` to the objective
    pub fn add_quadratic_objective_term(
        &mut self,
        variable1: usize,
        variable2: usize,
        coefficient: f64,
    ) -> Result<(), ProblemError> {
        self.add_objective_term(ObjectiveTerm::Quadratic {
            var1: variable1,
            var2: variable2,
            coef: coefficient,
        })
    }

    /// Add a constant offset to the objective
    pub fn add_objective_constant(&mut self, value: f64) {
        self.objective.add_constant(value);
    }

    /// Add `weight * |Σ coefficients·variables|` to a minimization objective
    ///
    /// The absolute value is expressed with a new variable `t >= 0` (with id `id`) and the
    /// two constraints `t - a·x >= 0` and `t + a·x >= 0`; `weight * t` enters the objective.
    ///
    /// # Returns
    /// The index of the new variable
    pub fn add_absolute_value_objective_term(
        &mut self,
        id: &str,
        variables: &[usize],
        coefficients: &[f64],
        weight: f64,
    ) -> Result<usize, ProblemError> {
        Self::check_lengths(variables, coefficients)?;
        self.validate_indices(variables)?;
        if weight < 0. || self.objective.sense() != ObjectiveSense::Minimize {
            return Err(ProblemError::NonConvexAbsoluteValue);
        }
        let epigraph = self.add_variable(id, 0., f64::INFINITY)?;
        let mut vars = Vec::with_capacity(variables.len() + 1);
        vars.push(epigraph);
        vars.extend_from_slice(variables);
        let mut above = vec![1.];
        above.extend(coefficients.iter().map(|c| -c));
        let mut below = vec![1.];
        below.extend_from_slice(coefficients);
        self.add_inequality_constraint(&vars, &above, 0., f64::INFINITY)?;
        self.add_inequality_constraint(&vars, &below, 0., f64::INFINITY)?;
        self.add_linear_objective_term(epigraph, weight)?;
        Ok(epigraph)
    }
    // endregion Adding Objective Terms

    /// Pass the problem to a solver and solve it
    ///
    /// The solver is expected to be empty, the constant objective offset is added to the
    /// reported objective value.
    pub fn solve(&self, solver: &mut dyn Solver) -> Result<ProblemSolution, SolverError> {
        for var in self.variables.values() {
            let index = solver.add_continuous_variable(var.lower_bound, var.upper_bound)?;
            if index != var.index {
                return Err(SolverError::IndexMismatch {
                    expected: var.index,
                    found: index,
                });
            }
        }
        for constraint in &self.constraints {
            match constraint {
                Constraint::Equality { equals, .. } => solver.add_equality_constraint(
                    &constraint.variables(),
                    &constraint.coefficients(),
                    *equals,
                )?,
                Constraint::Inequality {
                    lower_bound,
                    upper_bound,
                    ..
                } => solver.add_inequality_constraint(
                    &constraint.variables(),
                    &constraint.coefficients(),
                    *lower_bound,
                    *upper_bound,
                )?,
            }
        }
        for term in self.objective.terms() {
            match *term {
                ObjectiveTerm::Linear { var, coef } => {
                    solver.add_linear_objective_term(var, coef)?
                }
                ObjectiveTerm::Quadratic { var1, var2, coef } => {
                    solver.add_quadratic_objective_term(var1, var2, coef)?
                }
            }
        }
        solver.set_objective_sense(self.objective.sense())?;
        trace!(
            "Solving problem with {} variables and {} constraints",
            self.num_variables(),
            self.num_constraints()
        );
        let mut solution = solver.solve()?;
        let constant = self.objective.constant();
        solution.objective_value = solution.objective_value.map(|v| v + constant);
        Ok(solution)
    }

    // region Validation Functions
    /// Check that a variable to be added is valid to add to this problem
    fn validate_variable(&self, variable: &Variable) -> Result<(), ProblemError> {
        if self.variables.contains_key(&variable.id) {
            return Err(ProblemError::VariableIdAlreadyExists(variable.id.clone()));
        }
        if !variable.has_valid_bounds() {
            return Err(ProblemError::InvalidVariableBounds(variable.id.clone()));
        }
        Ok(())
    }

    /// Check that a constraint to be added is valid to add to this Problem
    fn validate_constraint(&self, constraint: &Constraint) -> Result<(), ProblemError> {
        if let Constraint::Inequality {
            lower_bound,
            upper_bound,
            ..
        } = constraint
        {
            if lower_bound.is_nan() || upper_bound.is_nan() || lower_bound > upper_bound {
                return Err(ProblemError::InvalidConstraintBounds);
            }
        }
        if constraint.coefficients().iter().any(|c| !c.is_finite()) {
            return Err(ProblemError::NonFiniteCoefficient);
        }
        if let Constraint::Equality { equals, .. } = constraint {
            if !equals.is_finite() {
                return Err(ProblemError::NonFiniteCoefficient);
            }
        }
        self.validate_indices(&constraint.variables())
            .map_err(|_| ProblemError::NonExistentVariablesInConstraint)
    }

    /// Check that an objective term to be added is valid to add to this Problem
    fn validate_objective_term(&self, objective_term: &ObjectiveTerm) -> Result<(), ProblemError> {
        let coef = match *objective_term {
            ObjectiveTerm::Linear { coef, .. } | ObjectiveTerm::Quadratic { coef, .. } => coef,
        };
        if !coef.is_finite() {
            return Err(ProblemError::NonFiniteCoefficient);
        }
        self.validate_indices(&objective_term.variables())
            .map_err(|_| ProblemError::NonExistentVariablesInObjective)
    }

    fn validate_indices(&self, variables: &[usize]) -> Result<(), ProblemError> {
        match variables.iter().find(|v| **v >= self.variables.len()) {
            Some(v) => Err(ProblemError::NonExistentVariable(format!("x{}", v))),
            None => Ok(()),
        }
    }

    fn check_lengths(variables: &[usize], coefficients: &[f64]) -> Result<(), ProblemError> {
        if variables.len() != coefficients.len() {
            return Err(ProblemError::MismatchedTerms {
                variables: variables.len(),
                coefficients: coefficients.len(),
            });
        }
        Ok(())
    }
    // endregion Validation Functions
}

/// Errors associated with the Problem
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    /// Error when trying to add a variable with the same id as an existing variable
    #[error("Tried to add variable {0} but a variable with the same id already exists")]
    VariableIdAlreadyExists(String),
    /// Error when trying to add variable with invalid bounds
    #[error("Tried to add variable {0} with lower_bound>upper_bound")]
    InvalidVariableBounds(String),
    /// Error when trying to add a constraint with invalid bounds
    #[error("Tried to add an inequality constraint with lower_bound > upper_bound")]
    InvalidConstraintBounds,
    /// Error when trying to add a constraint that contains variables not in the problem
    #[error("Tried to add a constraint with variables not in the problem")]
    NonExistentVariablesInConstraint,
    /// Error when trying to add an objective term which includes variables not in the problem
    #[error("Tried adding an objective term with variables not in the problem")]
    NonExistentVariablesInObjective,
    /// Error when trying to access a variable that doesn't exist
    #[error("Tried to access variable {0} which doesn't exist")]
    NonExistentVariable(String),
    /// Variables and coefficients of a term list differ in length
    #[error("Got {variables} variables but {coefficients} coefficients")]
    MismatchedTerms {
        variables: usize,
        coefficients: usize,
    },
    /// A coefficient or right hand side is NaN or infinite
    #[error("Constraint and objective coefficients must be finite")]
    NonFiniteCoefficient,
    /// Absolute values can only be penalized in a minimization
    #[error("Absolute value terms need a non-negative weight in a minimization")]
    NonConvexAbsoluteValue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_problem() {
        let max_problem = Problem::new_maximization();
        assert_eq!(max_problem.objective.sense(), ObjectiveSense::Maximize);

        let min_problem = Problem::new_minimization();
        assert_eq!(min_problem.objective.sense(), ObjectiveSense::Minimize);
        assert_eq!(min_problem.num_variables(), 0);
        assert_eq!(min_problem.num_constraints(), 0);
    }

    #[test]
    fn add_variables() {
        let mut problem = Problem::new_minimization();
        assert_eq!(problem.add_variable("x", 64., 100.).unwrap(), 0);
        assert_eq!(problem.add_variable("y", 0., 1.).unwrap(), 1);
        let var = problem.variable("x").unwrap();
        assert_eq!(var.index, 0);
        assert!(
            (var.lower_bound - 64.0).abs() < 1e-25,
            "Variable added with incorrect lower bound"
        );
        assert!(
            (var.upper_bound - 100.0).abs() < 1e-25,
            "Variable added with incorrect upper bound"
        );
        assert_eq!(problem.variable_index("y"), Some(1));
        assert_eq!(
            problem.add_variable("x", 0., 1.),
            Err(ProblemError::VariableIdAlreadyExists("x".to_string()))
        );
    }

    #[test]
    fn add_bad_variable() {
        let mut problem = Problem::new_minimization();
        let res = problem.add_variable("x", 100., 64.);
        if let Err(ProblemError::InvalidVariableBounds(_)) = res {
            // Intentionally blank
        } else {
            panic!("Invalid variable bounds not caught")
        }
        assert_eq!(problem.num_variables(), 0);
    }

    #[test]
    fn add_constraints() {
        let mut problem = Problem::new_minimization();
        problem.add_variable("x", 64., 100.).unwrap();
        problem.add_variable("y", 64., 100.).unwrap();
        problem
            .add_equality_constraint(&[0, 1], &[2., 3.], 200.)
            .unwrap();
        problem
            .add_inequality_constraint(&[0, 1], &[2., 3.], 100., 200.)
            .unwrap();
        assert_eq!(problem.num_constraints(), 2);
        match &problem.constraints()[1] {
            Constraint::Inequality {
                lower_bound,
                upper_bound,
                ..
            } => {
                assert!((lower_bound - 100.).abs() < 1e-25);
                assert!((upper_bound - 200.).abs() < 1e-25);
            }
            Constraint::Equality { .. } => panic!("Incorrect constraint type added"),
        }
    }

    #[test]
    fn add_bad_constraints() {
        let mut problem = Problem::new_minimization();
        problem.add_variable("x", 64., 100.).unwrap();
        assert_eq!(
            problem.add_inequality_constraint(&[0], &[2.], 200., 100.),
            Err(ProblemError::InvalidConstraintBounds)
        );
        assert_eq!(
            problem.add_equality_constraint(&[0, 3], &[1., 1.], 0.),
            Err(ProblemError::NonExistentVariablesInConstraint)
        );
        assert!(matches!(
            problem.add_equality_constraint(&[0], &[1., 1.], 0.),
            Err(ProblemError::MismatchedTerms { .. })
        ));
        assert_eq!(
            problem.add_equality_constraint(&[0], &[f64::NAN], 0.),
            Err(ProblemError::NonFiniteCoefficient)
        );
        assert_eq!(
            problem.add_linear_objective_term(4, 1.),
            Err(ProblemError::NonExistentVariablesInObjective)
        );
    }

    #[test]
    fn absolute_value_term() {
        let mut problem = Problem::new_minimization();
        problem.add_variable("x", -5., 5.).unwrap();
        problem.add_variable("y", -5., 5.).unwrap();
        let t = problem
            .add_absolute_value_objective_term("abs", &[0, 1], &[1., -2.], 3.)
            .unwrap();
        assert_eq!(t, 2);
        assert_eq!(problem.num_constraints(), 2);
        assert_eq!(problem.constraints()[0].coefficients(), vec![1., -1., 2.]);
        assert_eq!(problem.constraints()[1].coefficients(), vec![1., 1., -2.]);
        assert_eq!(
            problem.objective().terms()[0],
            ObjectiveTerm::Linear { var: 2, coef: 3. }
        );

        let mut maximization = Problem::new_maximization();
        maximization.add_variable("x", -5., 5.).unwrap();
        assert_eq!(
            maximization.add_absolute_value_objective_term("abs", &[0], &[1.], 1.),
            Err(ProblemError::NonConvexAbsoluteValue)
        );
    }

    #[test]
    fn only_index_based_building() {
        let mut problem = Problem::new_minimization();
        let x = problem.add_variable("x", 0., 1.).unwrap();
        assert_eq!(problem.variable_index("x"), Some(x));
        assert_eq!(
            problem.add_absolute_value_objective_term("abs", &[x, 7], &[1., 1.], 1.),
            Err(ProblemError::NonExistentVariable("x7".to_string()))
        );
        // a rejected term leaves the problem untouched
        assert_eq!(problem.num_variables(), 1);
        assert_eq!(problem.num_constraints(), 0);
        assert!(problem.objective().terms().is_empty());
    }
}
