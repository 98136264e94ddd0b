//! Implements a solver interface for Clarabel
use clarabel::algebra::*;
use clarabel::solver::*;
use log::debug;

use crate::optimize::objective::ObjectiveSense;
use crate::optimize::solvers::{QuadraticProgram, Row, Solver, SolverError};
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// Quadratic program solver backed by the Clarabel interior point method
#[derive(Clone, Debug)]
pub struct ClarabelSolver {
    program: QuadraticProgram,
    max_iterations: u32,
}

impl ClarabelSolver {
    pub fn new(max_iterations: u32) -> Self {
        ClarabelSolver {
            program: QuadraticProgram::default(),
            max_iterations,
        }
    }
}

impl Default for ClarabelSolver {
    fn default() -> Self {
        Self::new(200)
    }
}

/// Convert a nalgebra-sparse matrix into the Clarabel representation
fn to_clarabel(matrix: nalgebra_sparse::CscMatrix<f64>) -> CscMatrix<f64> {
    let (nrows, ncols) = (matrix.nrows(), matrix.ncols());
    let (col_offsets, row_indices, values) = matrix.disassemble();
    CscMatrix::new(nrows, ncols, col_offsets, row_indices, values)
}

fn convert_status(status: &SolverStatus) -> OptimizationStatus {
    match status {
        SolverStatus::Solved => OptimizationStatus::Optimal,
        SolverStatus::AlmostSolved => OptimizationStatus::AlmostOptimal,
        SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
            OptimizationStatus::Infeasible
        }
        SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
            OptimizationStatus::Unbounded
        }
        SolverStatus::MaxIterations | SolverStatus::MaxTime | SolverStatus::InsufficientProgress => {
            OptimizationStatus::SolverHalted
        }
        SolverStatus::NumericalError => OptimizationStatus::NumericalError,
        _ => OptimizationStatus::Unoptimized,
    }
}

impl Solver for ClarabelSolver {
    fn add_continuous_variable(
        &mut self,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<usize, SolverError> {
        Ok(self.program.add_variable(lower_bound, upper_bound))
    }

    fn add_equality_constraint(
        &mut self,
        variables: &[usize],
        coefficients: &[f64],
        equals: f64,
    ) -> Result<(), SolverError> {
        self.program.add_equality(variables, coefficients, equals)
    }

    fn add_inequality_constraint(
        &mut self,
        variables: &[usize],
        coefficients: &[f64],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError> {
        self.program
            .add_inequality(variables, coefficients, lower_bound, upper_bound)
    }

    fn add_linear_objective_term(
        &mut self,
        variable: usize,
        coefficient: f64,
    ) -> Result<(), SolverError> {
        self.program.add_linear(variable, coefficient)
    }

    fn add_quadratic_objective_term(
        &mut self,
        variable1: usize,
        variable2: usize,
        coefficient: f64,
    ) -> Result<(), SolverError> {
        self.program.add_quadratic(variable1, variable2, coefficient)
    }

    fn set_objective_sense(&mut self, objective_sense: ObjectiveSense) -> Result<(), SolverError> {
        self.program.sense = objective_sense;
        Ok(())
    }

    fn solve(&mut self) -> Result<ProblemSolution, SolverError> {
        let program = &self.program;
        // Clarabel form: Ax + s = b, equalities in the zero cone first, then every
        // finite side of the inequalities and bounds as a ≤ row in the nonnegative cone
        let bound_rows = program.bound_rows();
        let mut rows: Vec<(&Row, f64)> = Vec::new();
        let mut b: Vec<f64> = Vec::new();
        for row in &program.equalities {
            rows.push((row, 1.));
            b.push(row.upper);
        }
        let num_equalities = rows.len();
        for row in program.inequalities.iter().chain(bound_rows.iter()) {
            if row.upper.is_finite() {
                rows.push((row, 1.));
                b.push(row.upper);
            }
            if row.lower.is_finite() {
                rows.push((row, -1.));
                b.push(-row.lower);
            }
        }
        let num_inequalities = rows.len() - num_equalities;
        let mut cones = Vec::new();
        if num_equalities > 0 {
            cones.push(SupportedConeT::ZeroConeT(num_equalities));
        }
        if num_inequalities > 0 {
            cones.push(SupportedConeT::NonnegativeConeT(num_inequalities));
        }

        let p = to_clarabel(program.quadratic_matrix());
        let q = program.linear_vector();
        let a = to_clarabel(program.row_matrix(&rows));
        let settings = DefaultSettingsBuilder::default()
            .verbose(false)
            .max_iter(self.max_iterations)
            .build()
            .map_err(|err| SolverError::Setup(err.to_string()))?;

        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings);
        solver.solve();

        let status = convert_status(&solver.solution.status);
        debug!(
            "Clarabel finished with status {:?} after {} iterations",
            solver.solution.status, solver.solution.iterations
        );
        match status {
            OptimizationStatus::Optimal | OptimizationStatus::AlmostOptimal => Ok(ProblemSolution {
                status,
                objective_value: Some(program.sense_sign() * solver.solution.obj_val),
                variable_values: Some(solver.solution.x.clone()),
            }),
            _ => Ok(ProblemSolution::failed(status)),
        }
    }

    fn reset(&mut self) {
        self.program.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::problem::Problem;

    #[test]
    fn small_quadratic_program() {
        // min x² - 2x, x + y = 3, x in [0, 5], y >= 0
        let mut solver = ClarabelSolver::default();
        let x = solver.add_continuous_variable(0., 5.).unwrap();
        let y = solver.add_continuous_variable(0., f64::INFINITY).unwrap();
        solver.add_equality_constraint(&[x, y], &[1., 1.], 3.).unwrap();
        solver.add_quadratic_objective_term(x, x, 1.).unwrap();
        solver.add_linear_objective_term(x, -2.).unwrap();
        solver.set_objective_sense(ObjectiveSense::Minimize).unwrap();
        let solution = solver.solve().unwrap();
        assert_eq!(solution.status, OptimizationStatus::Optimal);
        let values = solution.variable_values.unwrap();
        assert!((values[0] - 1.).abs() < 1e-5);
        assert!((values[1] - 2.).abs() < 1e-5);
        assert!((solution.objective_value.unwrap() + 1.).abs() < 1e-5);
    }

    #[test]
    fn maximize_linear_program() {
        let mut problem = Problem::new_maximization();
        problem.add_variable("x", 0., 3.).unwrap();
        problem.add_variable("y", 0., 3.).unwrap();
        problem
            .add_inequality_constraint(&[0, 1], &[1., 1.], f64::NEG_INFINITY, 4.)
            .unwrap();
        problem.add_linear_objective_term(0, 1.).unwrap();
        problem.add_linear_objective_term(1, 1.).unwrap();
        problem.add_objective_constant(1.);
        let mut solver = ClarabelSolver::default();
        let solution = problem.solve(&mut solver).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Optimal);
        assert!((solution.objective_value.unwrap() - 5.).abs() < 1e-5);
    }

    #[test]
    fn infeasible_problem() {
        let mut solver = ClarabelSolver::default();
        let x = solver.add_continuous_variable(0., 1.).unwrap();
        solver.add_equality_constraint(&[x], &[1.], 2.).unwrap();
        solver.add_linear_objective_term(x, 1.).unwrap();
        let solution = solver.solve().unwrap();
        assert_eq!(solution.status, OptimizationStatus::Infeasible);
        assert!(solution.variable_values.is_none());
    }

    #[test]
    fn reset_clears_the_problem() {
        let mut solver = ClarabelSolver::default();
        let x = solver.add_continuous_variable(0., 1.).unwrap();
        solver.add_equality_constraint(&[x], &[1.], 2.).unwrap();
        solver.reset();
        assert_eq!(solver.add_continuous_variable(-1., 1.).unwrap(), 0);
        solver.add_linear_objective_term(0, 1.).unwrap();
        let solution = solver.solve().unwrap();
        assert_eq!(solution.status, OptimizationStatus::Optimal);
        assert!((solution.variable_values.unwrap()[0] + 1.).abs() < 1e-5);
    }
}
