//! Interface to the quadratic program solvers
//!
//! A [`Solver`] accumulates variables, constraints and objective terms by position, solves
//! the resulting problem, and can be reset to be reused for the next problem.
pub mod clarabel;
#[cfg(feature = "osqp")]
pub mod osqp;

use cfg_if::cfg_if;
use indexmap::IndexMap;
use nalgebra_sparse::{CooMatrix, CscMatrix};
use thiserror::Error;

use crate::optimize::objective::ObjectiveSense;
use crate::optimize::ProblemSolution;

/// Capability needed from a quadratic program solver
pub trait Solver {
    /// Add a continuous variable, returning its index
    fn add_continuous_variable(
        &mut self,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<usize, SolverError>;

    /// Add the constraint `Σ coefficients·variables = equals`
    fn add_equality_constraint(
        &mut self,
        variables: &[usize],
        coefficients: &[f64],
        equals: f64,
    ) -> Result<(), SolverError>;

    /// Add the constraint `lower_bound <= Σ coefficients·variables <= upper_bound`, an
    /// infinite side is left open
    fn add_inequality_constraint(
        &mut self,
        variables: &[usize],
        coefficients: &[f64],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError>;

    /// Add `coefficient * variable` to the objective
    fn add_linear_objective_term(
        &mut self,
        variable: usize,
        coefficient: f64,
    ) -> Result<(), SolverError>;

    /// Add `coefficient * variable1 * variable2` to the objective
    fn add_quadratic_objective_term(
        &mut self,
        variable1: usize,
        variable2: usize,
        coefficient: f64,
    ) -> Result<(), SolverError>;

    fn set_objective_sense(&mut self, objective_sense: ObjectiveSense) -> Result<(), SolverError>;

    /// Solve the accumulated problem
    fn solve(&mut self) -> Result<ProblemSolution, SolverError>;

    /// Remove every variable, constraint and objective term
    fn reset(&mut self);
}

/// Enum used to specify which solver backend to use
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SolverKind {
    /// Use the Clarabel interior point solver
    #[default]
    Clarabel,
    /// Use the OSQP Quadratic Program Solver, requires the osqp feature to be enabled
    Osqp,
}

/// Create a solver of the requested kind
pub fn new_solver(kind: SolverKind, max_iterations: u32) -> Result<Box<dyn Solver>, SolverError> {
    match kind {
        SolverKind::Clarabel => Ok(Box::new(clarabel::ClarabelSolver::new(max_iterations))),
        SolverKind::Osqp => osqp_solver(max_iterations),
    }
}

cfg_if! {
    if #[cfg(feature = "osqp")] {
        fn osqp_solver(max_iterations: u32) -> Result<Box<dyn Solver>, SolverError> {
            Ok(Box::new(osqp::OsqpSolver::new(max_iterations)))
        }
    } else {
        fn osqp_solver(_max_iterations: u32) -> Result<Box<dyn Solver>, SolverError> {
            Err(SolverError::Unavailable("osqp"))
        }
    }
}

/// Errors raised by a solver backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// The backend was not compiled in
    #[error("Solver {0} is not available, enable the corresponding feature")]
    Unavailable(&'static str),
    /// A term references a variable that was not added
    #[error("Variable {0} has not been added to the solver")]
    UnknownVariable(usize),
    /// Variables and coefficients differ in length
    #[error("Got {variables} variables but {coefficients} coefficients")]
    MismatchedTerms {
        variables: usize,
        coefficients: usize,
    },
    /// Variables were numbered differently by the solver and the problem
    #[error("Solver assigned index {found} to the variable with index {expected}")]
    IndexMismatch { expected: usize, found: usize },
    /// The backend rejected the problem or its settings
    #[error("Solver setup failed: {0}")]
    Setup(String),
}

/// A linear row `lower <= Σ a_i x_i <= upper`
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Row {
    pub variables: Vec<usize>,
    pub coefficients: Vec<f64>,
    pub lower: f64,
    pub upper: f64,
}

/// Problem data accumulated by the backends before solving
///
/// The objective is `½ xᵀPx + qᵀx` with only the upper triangle of P stored.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct QuadraticProgram {
    pub lower_bounds: Vec<f64>,
    pub upper_bounds: Vec<f64>,
    pub equalities: Vec<Row>,
    pub inequalities: Vec<Row>,
    pub linear: Vec<f64>,
    pub quadratic: IndexMap<(usize, usize), f64>,
    pub sense: ObjectiveSense,
}

impl QuadraticProgram {
    pub fn num_variables(&self) -> usize {
        self.lower_bounds.len()
    }

    pub fn add_variable(&mut self, lower_bound: f64, upper_bound: f64) -> usize {
        self.lower_bounds.push(lower_bound);
        self.upper_bounds.push(upper_bound);
        self.linear.push(0.);
        self.lower_bounds.len() - 1
    }

    fn row(
        &self,
        variables: &[usize],
        coefficients: &[f64],
        lower: f64,
        upper: f64,
    ) -> Result<Row, SolverError> {
        if variables.len() != coefficients.len() {
            return Err(SolverError::MismatchedTerms {
                variables: variables.len(),
                coefficients: coefficients.len(),
            });
        }
        self.check_variables(variables)?;
        Ok(Row {
            variables: variables.to_vec(),
            coefficients: coefficients.to_vec(),
            lower,
            upper,
        })
    }

    pub fn add_equality(
        &mut self,
        variables: &[usize],
        coefficients: &[f64],
        equals: f64,
    ) -> Result<(), SolverError> {
        let row = self.row(variables, coefficients, equals, equals)?;
        self.equalities.push(row);
        Ok(())
    }

    pub fn add_inequality(
        &mut self,
        variables: &[usize],
        coefficients: &[f64],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError> {
        let row = self.row(variables, coefficients, lower_bound, upper_bound)?;
        self.inequalities.push(row);
        Ok(())
    }

    pub fn add_linear(&mut self, variable: usize, coefficient: f64) -> Result<(), SolverError> {
        self.check_variables(&[variable])?;
        self.linear[variable] += coefficient;
        Ok(())
    }

    /// Add `coefficient * x_i * x_j`
    pub fn add_quadratic(
        &mut self,
        variable1: usize,
        variable2: usize,
        coefficient: f64,
    ) -> Result<(), SolverError> {
        self.check_variables(&[variable1, variable2])?;
        let key = (variable1.min(variable2), variable1.max(variable2));
        let value = if variable1 == variable2 {
            2. * coefficient
        } else {
            coefficient
        };
        *self.quadratic.entry(key).or_insert(0.) += value;
        Ok(())
    }

    fn check_variables(&self, variables: &[usize]) -> Result<(), SolverError> {
        match variables.iter().find(|v| **v >= self.num_variables()) {
            Some(v) => Err(SolverError::UnknownVariable(*v)),
            None => Ok(()),
        }
    }

    /// Sign applied to the objective so the backend always minimizes
    pub fn sense_sign(&self) -> f64 {
        match self.sense {
            ObjectiveSense::Minimize => 1.,
            ObjectiveSense::Maximize => -1.,
        }
    }

    /// Upper triangle of P, already multiplied by the sense sign
    pub fn quadratic_matrix(&self) -> CscMatrix<f64> {
        let n = self.num_variables();
        let sign = self.sense_sign();
        let mut coo = CooMatrix::new(n, n);
        for ((i, j), v) in &self.quadratic {
            coo.push(*i, *j, sign * v);
        }
        CscMatrix::from(&coo)
    }

    /// Linear objective vector, already multiplied by the sense sign
    pub fn linear_vector(&self) -> Vec<f64> {
        let sign = self.sense_sign();
        self.linear.iter().map(|v| sign * v).collect()
    }

    /// Variable bounds as rows, skipping infinite bounds
    pub fn bound_rows(&self) -> Vec<Row> {
        self.lower_bounds
            .iter()
            .zip(&self.upper_bounds)
            .enumerate()
            .filter(|(_, (lb, ub))| lb.is_finite() || ub.is_finite())
            .map(|(i, (lb, ub))| Row {
                variables: vec![i],
                coefficients: vec![1.],
                lower: *lb,
                upper: *ub,
            })
            .collect()
    }

    /// Sparse matrix with one row per entry of `rows`, each row multiplied by its scale
    pub fn row_matrix(&self, rows: &[(&Row, f64)]) -> CscMatrix<f64> {
        let mut coo = CooMatrix::new(rows.len(), self.num_variables());
        for (r, (row, scale)) in rows.iter().enumerate() {
            for (var, coef) in row.variables.iter().zip(&row.coefficients) {
                if *coef != 0. {
                    coo.push(r, *var, scale * coef);
                }
            }
        }
        CscMatrix::from(&coo)
    }

    pub fn clear(&mut self) {
        let sense = self.sense;
        *self = QuadraticProgram::default();
        self.sense = sense;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulate_program() {
        let mut program = QuadraticProgram::default();
        assert_eq!(program.add_variable(0., 1.), 0);
        assert_eq!(program.add_variable(f64::NEG_INFINITY, f64::INFINITY), 1);
        program.add_quadratic(0, 0, 1.5).unwrap();
        program.add_quadratic(1, 0, 2.).unwrap();
        program.add_linear(1, -1.).unwrap();
        program.add_linear(1, -1.).unwrap();
        assert_eq!(program.quadratic[&(0, 0)], 3.);
        assert_eq!(program.quadratic[&(0, 1)], 2.);
        assert_eq!(program.linear, vec![0., -2.]);
        assert_eq!(program.bound_rows().len(), 1);
        assert_eq!(
            program.add_linear(2, 1.),
            Err(SolverError::UnknownVariable(2))
        );

        program.sense = ObjectiveSense::Maximize;
        assert_eq!(program.linear_vector(), vec![0., 2.]);
        let p = program.quadratic_matrix();
        assert_eq!(p.nnz(), 2);

        program.clear();
        assert_eq!(program.num_variables(), 0);
        assert_eq!(program.sense, ObjectiveSense::Maximize);
    }

    #[test]
    fn unavailable_backend() {
        assert!(new_solver(SolverKind::Clarabel, 100).is_ok());
        if !cfg!(feature = "osqp") {
            assert!(matches!(
                new_solver(SolverKind::Osqp, 100),
                Err(SolverError::Unavailable("osqp"))
            ));
        }
    }
}
